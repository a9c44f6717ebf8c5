//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - On-disk database fixtures
//! - Mock API server helpers
//! - Custom assertion macros

pub mod assertions;
pub mod database;

// Re-export commonly used utilities
pub use assertions::*;
pub use database::*;
pub use mock_server::*;
