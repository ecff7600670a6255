//! Persistence layer for the contract administration backend.
//!
//! This crate contains:
//! - Connection pool setup
//! - Entity definitions (database row mappings)
//! - Repositories, one per aggregate
//! - Query timing metrics
//!
//! SQL migrations live in `src/migrations` and are applied by the api binary.

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
