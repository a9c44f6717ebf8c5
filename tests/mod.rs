//! Test suite for journey-sync
//!
//! This module organizes all tests

pub mod common;
pub mod integration;
