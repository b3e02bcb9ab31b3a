//! Disk usage and runtime statistics reported by `/statistics`.

use std::path::Path;

use log::warn;
use serde::Serialize;

const UNITS: &[u8] = b"KMGTPE";

/// Byte counts of the filesystem holding a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskSpace {
    pub total: u64,
    pub free: u64,
    /// Space available to this (unprivileged) process.
    pub usable: u64,
}

impl DiskSpace {
    /// Queries the filesystem of `path`; every field is 0 when that fails.
    pub fn of(path: &Path) -> Self {
        let query = || -> std::io::Result<Self> {
            Ok(Self {
                total: fs2::total_space(path)?,
                free: fs2::free_space(path)?,
                usable: fs2::available_space(path)?,
            })
        };
        query().unwrap_or_else(|e| {
            warn!("Unable to read disk statistics of {}: {}", path.display(), e);
            Self::default()
        })
    }
}

/// Binary-prefixed human size: `"512 B"`, `"1.5 KB"`, `"3.2 GB"`.
pub fn format_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!(
        "{:.1} {}B",
        bytes as f64 / div as f64,
        UNITS[exp] as char
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    pub total_space: u64,
    pub total_space_formatted: String,
    pub free_space: u64,
    pub free_space_formatted: String,
    pub usable_space: u64,
    pub usable_space_formatted: String,
    pub server_start_time_millis: i64,
    pub recording_start_time_millis: i64,
    pub recording: bool,
    pub upstream_connected: bool,
    pub frames_received: u64,
    pub active_streams: usize,
}

impl StatisticsResponse {
    pub fn with_disk(disk: DiskSpace) -> Self {
        Self {
            total_space: disk.total,
            total_space_formatted: format_size(disk.total),
            free_space: disk.free,
            free_space_formatted: format_size(disk.free),
            usable_space: disk.usable,
            usable_space_formatted: format_size(disk.usable),
            server_start_time_millis: 0,
            recording_start_time_millis: -1,
            recording: false,
            upstream_connected: false,
            frames_received: 0,
            active_streams: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024 + 512 * 1024 * 1024), "5.5 GB");
        assert_eq!(format_size(u64::MAX), "16.0 EB");
    }

    #[test]
    fn test_missing_directory_reports_zero() {
        let disk = DiskSpace::of(Path::new("/definitely/not/a/real/camrelay/dir"));
        assert_eq!(disk, DiskSpace::default());
    }

    #[test]
    fn test_existing_directory_reports_space() {
        let dir = tempfile::TempDir::new().unwrap();
        let disk = DiskSpace::of(dir.path());
        assert!(disk.total > 0);
        assert!(disk.free <= disk.total);
        assert!(disk.usable <= disk.free);
    }

    #[test]
    fn test_response_uses_camel_case_keys() {
        let response = StatisticsResponse::with_disk(DiskSpace {
            total: 2048,
            free: 1024,
            usable: 512,
        });
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["totalSpace"], 2048);
        assert_eq!(json["totalSpaceFormatted"], "2.0 KB");
        assert_eq!(json["freeSpaceFormatted"], "1.0 KB");
        assert_eq!(json["usableSpaceFormatted"], "512 B");
        assert_eq!(json["recordingStartTimeMillis"], -1);
        assert!(json.get("serverStartTimeMillis").is_some());
        assert!(json.get("activeStreams").is_some());
    }
}
