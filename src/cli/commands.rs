//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - schedule / review / due: the day-to-day review loop
//! - stats / plan / health: reporting
//! - suspend / resume / unschedule / reset-abandoned / cleanup: maintenance
//! - export / import / rebuild: backup and index repair

use cadence::domain::ScheduleStatus;
use cadence::engine::Quality;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cadence - spaced-repetition review scheduler
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Schedule one or more concepts for review
    Schedule {
        /// Concept IDs to schedule
        #[arg(required = true)]
        concept_ids: Vec<String>,

        /// Folder the new schedules belong to
        #[arg(short, long)]
        folder: Option<String>,

        /// Initial ease factor (single concept only)
        #[arg(long)]
        ease: Option<f64>,

        /// Initial interval in days (single concept only)
        #[arg(long)]
        interval: Option<u32>,

        /// Replace existing schedules instead of keeping them
        #[arg(long)]
        replace: bool,
    },

    /// Record an answer for a concept
    Review {
        /// Concept ID that was reviewed
        concept_id: String,

        /// Answer quality (forgot, hard, good, easy)
        quality: Quality,
    },

    /// List concepts due for review
    Due {
        /// Maximum number of concepts listed
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Only concepts in this folder
        #[arg(short, long)]
        folder: Option<String>,

        /// Only these statuses
        #[arg(short, long)]
        status: Vec<ScheduleStatus>,

        /// Hardest concepts first
        #[arg(long)]
        difficult: bool,
    },

    /// Show schedule statistics
    Stats {
        /// Also list the N most problematic concepts
        #[arg(short, long)]
        problematic: Option<usize>,
    },

    /// Show the review plan for the coming days
    Plan,

    /// Show overall system health
    Health,

    /// Suspend a concept (or a whole folder)
    Suspend {
        /// Concept ID to suspend
        #[arg(required_unless_present = "folder", conflicts_with = "folder")]
        concept_id: Option<String>,

        /// Suspend every concept in this folder
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Resume a suspended concept (or a whole folder)
    Resume {
        /// Concept ID to resume
        #[arg(required_unless_present = "folder", conflicts_with = "folder")]
        concept_id: Option<String>,

        /// Resume every concept in this folder
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Remove a concept's schedule
    Unschedule {
        /// Concept ID to unschedule
        concept_id: String,
    },

    /// Reset schedules with no review in the given number of days
    ResetAbandoned {
        /// Days since the last review
        #[arg(short, long)]
        days: i64,
    },

    /// Delete schedules for concepts not listed in a file (one ID per line)
    Cleanup {
        /// File with the valid concept IDs
        valid_ids: PathBuf,
    },

    /// Export schedules as JSON
    Export {
        /// Only these concepts
        concept_ids: Vec<String>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import schedules from a JSON export
    Import {
        /// Exported JSON file
        input: PathBuf,
    },

    /// Rebuild the schedule index from the schedule files
    Rebuild,
}
