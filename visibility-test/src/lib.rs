//! Test utilities for the visibility harness.
//!
//! This crate provides utilities to facilitate testing of the harness and its storage backends.
//! See the modules for all available utilities.

pub mod fixtures;
pub mod tracing;
