//! CLI module for cadence - command-line interface and subcommands.
//!
//! A thin front end: every command maps onto one SchedulerService call.

pub mod commands;

pub use commands::Cli;
