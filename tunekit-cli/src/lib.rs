//! tunekit CLI: argument parsing, logging setup and driver wiring shared by
//! the `tunekit-train` and `tunekit-merge` binaries.

pub mod args;
pub mod commands;
pub mod logging;

pub use args::{CommonArgs, MergeArgs, TrainArgs};
