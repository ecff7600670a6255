//! Shared utilities for the contract administration backend.
//!
//! - Bearer token verification
//! - Page/limit pagination
//! - Common validation logic

pub mod jwt;
pub mod pagination;
pub mod validation;
