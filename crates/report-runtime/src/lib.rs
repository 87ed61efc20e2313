//! Runtime layer for the shift report engine.
//!
//! Wraps the data pipeline with a TTL-cached event loader and a periodic
//! live monitor for the in-progress day.

pub mod event_manager;
pub mod monitor;

pub use report_core as core;
pub use report_data as data;
