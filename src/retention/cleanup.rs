use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone};
use log::{debug, info, warn};
use regex::Regex;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

fn is_date_folder_name(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d{8}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Deletes every file under `root` last modified more than `days` calendar
/// days ago, counted in local time.
///
/// Returns the number of files removed.
pub fn delete_files_older_than(root: &Path, days: i64) -> u64 {
    delete_files_older_than_at(root, days, SystemTime::now())
}

/// [`delete_files_older_than`] against an explicit reference time.
pub fn delete_files_older_than_at(root: &Path, days: i64, now: SystemTime) -> u64 {
    let Some(cutoff) = cutoff(root, days, now) else {
        return 0;
    };

    let deleted = delete_files_before(root, cutoff);
    info!(
        "{} files older than {} days deleted under {}",
        deleted,
        days,
        root.display()
    );
    deleted
}

/// Deletes every immediate `YYYYMMDD` folder of `root` dated more than `days`
/// days ago, with all of its content.
///
/// Returns the number of folders removed.
pub fn delete_folders_older_than(root: &Path, days: i64) -> u64 {
    delete_folders_older_than_at(root, days, SystemTime::now())
}

/// [`delete_folders_older_than`] against an explicit reference time.
pub fn delete_folders_older_than_at(root: &Path, days: i64, now: SystemTime) -> u64 {
    let Some(cutoff) = cutoff(root, days, now) else {
        return 0;
    };

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Unable to list {}: {}", root.display(), e);
            return 0;
        }
    };

    let mut deleted = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Unable to read entry in {}: {}", root.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name();
        let Some(folder_date) = name.to_str().and_then(parse_folder_date) else {
            debug!("Skipping {}: not a dated folder", path.display());
            continue;
        };

        if folder_date >= cutoff {
            continue;
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => {
                info!("Deleted folder {}", path.display());
                deleted += 1;
            }
            Err(e) => warn!("Unable to delete folder {}: {}", path.display(), e),
        }
    }

    info!(
        "{} folders older than {} days deleted under {}",
        deleted,
        days,
        root.display()
    );
    deleted
}

/// Local midnight of a strict `YYYYMMDD` folder name.
pub fn parse_folder_date(name: &str) -> Option<SystemTime> {
    if !is_date_folder_name(name) {
        return None;
    }
    let date = NaiveDate::parse_from_str(name, "%Y%m%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    let local: DateTime<Local> = Local.from_local_datetime(&midnight).earliest()?;
    Some(local.into())
}

fn cutoff(root: &Path, days: i64, now: SystemTime) -> Option<SystemTime> {
    if days < 0 {
        debug!("Ignoring cleanup with negative age {}", days);
        return None;
    }
    if !root.is_dir() {
        warn!("Cleanup root {} is not a directory", root.display());
        return None;
    }
    // local calendar days; fixed-length days when that local time is invalid
    let local: DateTime<Local> = now.into();
    let cutoff = local
        .checked_sub_days(Days::new(days as u64))
        .map(SystemTime::from)
        .unwrap_or_else(|| {
            let age = Duration::from_secs((days as u64).saturating_mul(SECONDS_PER_DAY));
            now.checked_sub(age).unwrap_or(SystemTime::UNIX_EPOCH)
        });
    Some(cutoff)
}

fn delete_files_before(dir: &Path, cutoff: SystemTime) -> u64 {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Unable to list {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut deleted = 0;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Unable to read entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Unable to stat {}: {}", path.display(), e);
                continue;
            }
        };

        if metadata.is_dir() {
            deleted += delete_files_before(&path, cutoff);
            continue;
        }
        if !metadata.is_file() {
            continue;
        }

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Unable to read mtime of {}: {}", path.display(), e);
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted file {}", path.display());
                deleted += 1;
            }
            Err(e) => warn!("Unable to delete file {}: {}", path.display(), e),
        }
    }
    deleted
}
