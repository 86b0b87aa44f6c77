//! Test utilities shared across the crate.
