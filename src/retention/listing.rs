use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::Serialize;

use crate::error_handling::types::BrowseError;

/// Extensions listed as clips, compared case-insensitively.
pub const CLIP_EXTENSIONS: [&str; 2] = ["mkv", "avi"];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClipEntry {
    pub name: String,
    /// Path relative to the clips root, `/`-separated.
    pub path: String,
}

/// Content of one folder of the clip tree.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ClipListing {
    /// Listed folder relative to the clips root; empty for the root itself.
    pub path: String,
    /// Folder one level up, absent at the root.
    pub parent: Option<String>,
    pub dirs: Vec<ClipEntry>,
    pub files: Vec<ClipEntry>,
}

/// Lists the sub folders and clip files of `sub_path` below `root`.
///
/// `sub_path` is `/`-separated and may not leave the root: `..` components
/// and backslashes are rejected.
pub fn list_clip_dir(root: &Path, sub_path: &str) -> Result<ClipListing, BrowseError> {
    let components = relative_components(sub_path)?;

    let mut dir = root.to_path_buf();
    dir.extend(components.iter());
    let path = components.join("/");
    let parent = components.split_last().map(|(_, rest)| rest.join("/"));

    if !dir.is_dir() {
        return Err(BrowseError::NotFound(path));
    }
    let entries = fs::read_dir(&dir).map_err(|e| {
        warn!("Unable to list {}: {}", dir.display(), e);
        e
    })?;

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            debug!("Skipping non UTF-8 entry in {}", dir.display());
            continue;
        };
        let file_type = entry.file_type()?;
        let clip = ClipEntry {
            path: join_relative(&path, &name),
            name,
        };

        if file_type.is_dir() {
            dirs.push(clip);
        } else if file_type.is_file() && is_clip_file(&entry.path()) {
            files.push(clip);
        }
    }
    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    files.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(ClipListing {
        path,
        parent,
        dirs,
        files,
    })
}

fn relative_components(sub_path: &str) -> Result<Vec<&str>, BrowseError> {
    if sub_path.contains('\\') {
        return Err(BrowseError::InvalidPath(sub_path.to_string()));
    }

    let mut components = Vec::new();
    for component in sub_path.split('/') {
        match component {
            "" | "." => continue,
            ".." => return Err(BrowseError::InvalidPath(sub_path.to_string())),
            other => components.push(other),
        }
    }
    Ok(components)
}

fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

fn is_clip_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            CLIP_EXTENSIONS
                .iter()
                .any(|clip| ext.eq_ignore_ascii_case(clip))
        })
}
