//! Domain layer for the contract administration backend.
//!
//! This crate contains:
//! - Domain models (contracts, renewals, complaints, partners, revenue)
//! - Business logic services (renewal statistics, expiry window,
//!   revenue aggregation, import row parsing, notification routing)
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;

pub use errors::{DomainError, DomainResult};
