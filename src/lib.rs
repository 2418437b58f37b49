//! slowtest - slow-test regression detection for CI build history
//!
//! This library compares the test durations of a finished build with the
//! last successfully finished build of the same pipeline, and with the builds
//! in between, and raises a build problem for each test that became slower
//! than the configured threshold allows.

pub mod cli;
pub mod config;
pub mod model;
pub mod provider;
pub mod regression;
pub mod report;
pub mod store;
