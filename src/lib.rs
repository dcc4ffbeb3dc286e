//! Library side of `cadence`: the recurring task generator, its date rules and
//! the JSON-file store behind the CLI.

pub mod commands;
pub mod error;
pub mod generator;
pub mod models;
pub mod schedule;
pub mod storage;
