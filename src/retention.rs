//! Age-based cleanup of the recorded clip tree.
//!
//! Two independent policies, both synchronous and run on demand:
//! - file-level: every file below the root older than the threshold;
//! - folder-level: the root's `YYYYMMDD` day folders older than the threshold.
//!
//! Negative thresholds and missing roots are rejected by deleting nothing.
//! Per-entry failures are logged and skipped.
//!
//! [`list_clip_dir`] browses the same tree one folder at a time.

pub mod cleanup;
pub mod listing;

pub use cleanup::{
    delete_files_older_than, delete_files_older_than_at, delete_folders_older_than,
    delete_folders_older_than_at, parse_folder_date,
};
pub use listing::{list_clip_dir, ClipEntry, ClipListing};

use serde::Deserialize;

/// Which policy a cleanup request applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupScope {
    #[default]
    Files,
    Folders,
}

impl CleanupScope {
    /// Runs the policy under `root`, returning the number of items removed.
    pub fn run(self, root: &std::path::Path, days: i64) -> u64 {
        match self {
            CleanupScope::Files => delete_files_older_than(root, days),
            CleanupScope::Folders => delete_folders_older_than(root, days),
        }
    }

    /// Noun used in the cleanup report.
    pub fn label(self) -> &'static str {
        match self {
            CleanupScope::Files => "Files",
            CleanupScope::Folders => "Folders",
        }
    }
}
