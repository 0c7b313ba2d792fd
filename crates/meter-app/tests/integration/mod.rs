//! Integration tests for meter-app.
//!
//! These tests verify the interaction between components:
//! - Service lifecycle against the in-memory overlay
//! - HTTP broadcast and lookup against a mock overlay server
//! - Partial-failure tolerance of discovery

pub mod common;
