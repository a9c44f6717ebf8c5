//! Integration tests
//!
//! End-to-end scenarios against a mocked API and an on-disk database

mod drain_test;
mod operations_test;
mod service_test;
