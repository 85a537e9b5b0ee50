// src/cleanup/macos.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use super::CleanupPaths;
use crate::fs::FileSystem;
use crate::sink::LogSink;

/// Volumes under `/Volumes` that are never reported as removable.
const SYSTEM_VOLUMES: &[&str] = &["Macintosh HD", "com.apple.TimeMachine.localsnapshots"];

const USER_FOLDERS: &[&str] = &["Desktop", "Documents", "Downloads"];

const CACHE_DIRS: &[&str] = &["Library/Caches", "Library/Saved Application State"];

const BROWSER_CACHES: &[&str] = &[
    "Library/Caches/Google/Chrome/Default/Cache",
    "Library/Caches/com.apple.Safari",
    "Library/Caches/Firefox/Profiles",
];

/// macOS cleanup. Only the Trash is actually deleted; everything else is
/// reported for manual review.
pub fn run(fs: &dyn FileSystem, paths: &CleanupPaths, sink: &dyn LogSink) {
    sink.emit("[Clean Files] Starting macOS cleanup...");

    sink.emit("[Clean Files] Checking User Folders (Desktop, Documents, Downloads)...");
    for folder in USER_FOLDERS {
        let dir = paths.home.join(folder);
        match fs.read_dir(&dir) {
            Ok(entries) => sink.emit(&format!(
                "  - {folder}: Contains {} files (Manual review recommended)",
                entries.len()
            )),
            Err(e) => {
                debug!(dir = ?dir, error = %e, "user folder not readable");
                sink.emit(&format!("  - {folder}: Not accessible"));
            }
        }
    }

    sink.emit("[Clean Files] Emptying Trash...");
    empty_trash(fs, &paths.home.join(".Trash"), sink);

    sink.emit("[Clean Files] Clearing Recent Items...");
    sink.emit(
        "  [INFO] Clearing Recent Items requires Finder restart (Skipping to avoid interruption).",
    );

    sink.emit("[Clean Files] Cleaning Temp Files...");
    let mut temp_dirs: Vec<PathBuf> = paths.temp_dir.iter().cloned().collect();
    temp_dirs.extend(CACHE_DIRS.iter().map(|d| paths.home.join(d)));
    for dir in &temp_dirs {
        sink.emit(&format!("  - Cleaning: {}", dir.display()));
        if Some(dir) == paths.temp_dir.as_ref() {
            sink.emit(
                "  [SKIP] System Temp cleanup on macOS is managed by OS. Skipping safe mode.",
            );
        }
    }

    sink.emit("[Clean Files] Cleaning Browser Caches...");
    for rel in BROWSER_CACHES {
        let cache = paths.home.join(rel);
        if fs.exists(&cache) {
            sink.emit(&format!("  - Found cache: {}", file_name(&cache)));
            sink.emit("    [INFO] Please clear browser data via settings for complete privacy.");
        }
    }

    sink.emit("[Clean Files] Checking Removable Drives...");
    if let Ok(volumes) = fs.read_dir(&paths.volumes) {
        for vol in volumes {
            let name = file_name(&vol);
            if !SYSTEM_VOLUMES.contains(&name.as_str()) {
                sink.emit(&format!(
                    "  [DETECTED] External Drive: {name} - Please verify contents."
                ));
            }
        }
    }

    sink.emit("[Clean Files] macOS Cleanup Summary Complete.");
}

fn empty_trash(fs: &dyn FileSystem, trash: &Path, sink: &dyn LogSink) {
    match fs.remove_dir_all(trash) {
        Err(e) => sink.emit(&format!("  [INFO] Trash empty or requires permission: {e}")),
        Ok(()) => {
            sink.emit("  [OK] Trash emptied.");
            if let Err(e) = fs.create_dir(trash) {
                debug!(path = ?trash, error = %e, "could not recreate trash directory");
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
