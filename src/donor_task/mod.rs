//! Donor-sourced tasks for the GTD tracker.
//!
//! This module reads task records from the Donor Management service and
//! presents them as local GTD task views. The donor service stays the
//! owner of its data: nothing here writes back. The module follows
//! hexagonal architecture:
//!
//! - Domain types and the status mapping in [`domain`]
//! - The upstream gateway contract in [`ports`]
//! - HTTP and scripted gateways in [`adapters`]
//! - The caching, retrying facade in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
