//! Core domain layer for the shift report engine.
//!
//! Holds the typed event model, the shift calendar (work window + breaks),
//! the interval clipping / break subtraction math, the per-group category
//! accumulator and the shared formatting and time helpers.

pub mod accumulator;
pub mod calendar;
pub mod clipping;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
