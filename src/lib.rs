//! Operating-time tracking for equipment monitored through a boolean
//! "running" signal.
//!
//! - **domain**: samples, tick timestamps, the Reset/Operating/Hold state
//!   machine and the persisted record codec
//! - **application**: the per-cycle calculator and the evaluation service
//! - **infrastructure**: configuration, InfluxDB and in-memory streams
//! - **presentation**: HTTP endpoints the host uses to drive evaluations

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
