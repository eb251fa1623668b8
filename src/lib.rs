//! GTD donor bridge: donor-sourced tasks for a GTD task tracker.
//!
//! This crate pulls task records from an independently deployed Donor
//! Management service and folds them into the local GTD model (inbox, next
//! actions, someday/maybe, completed, deleted). It is read-only towards the
//! donor service and tolerates schema drift, unknown status codes, and
//! upstream outages.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Remote records, local task views, and the status mapping
//!   with no infrastructure dependencies
//! - **Ports**: The gateway trait the services depend on
//! - **Adapters**: The HTTP gateway and an in-memory scripted gateway
//!
//! # Modules
//!
//! - [`cache`]: Time-bounded cache with single-flight loads
//! - [`clock`]: Adjustable clock for deterministic expiry handling
//! - [`config`]: Environment-driven configuration
//! - [`donor_task`]: The donor task integration itself

pub mod cache;
pub mod clock;
pub mod config;
pub mod donor_task;
