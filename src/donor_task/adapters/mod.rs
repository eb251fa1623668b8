//! Adapter implementations of the donor gateway port.

pub mod http;
pub mod memory;

pub use http::HttpDonorGateway;
pub use memory::ScriptedDonorGateway;
