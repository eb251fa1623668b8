//! Port contracts for reading donor-sourced tasks.
//!
//! Ports define the upstream-agnostic interface the services depend on.

pub mod gateway;

pub use gateway::{DonorGatewayError, DonorGatewayResult, DonorTaskGateway, TransientFailure};
