//! Directory-driven discovery.
//!
//! Walks the handler source directory and turns its layout into
//! declarations:
//!
//! - a sub-directory becomes a collection named after it;
//! - a file becomes a component named after its stem (`test.one.rs` →
//!   `test.one`), resolved against the [`HandlerCatalogue`] by its path
//!   relative to the source directory (`sub/sub.one`).
//!
//! Entries are visited in file-name order so discovery is deterministic.
//! Names starting with `.` are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use super::{Declaration, DiscoveryError, HandlerCatalogue};

/// Output of [`scan`].
pub struct Scan {
    pub declarations: Vec<Declaration>,
    /// Entries that could not be turned into declarations.
    pub failures: Vec<DiscoveryError>,
}

/// Walk `base_dir` recursively.
///
/// Fails only when `base_dir` is not a readable directory.
pub fn scan(base_dir: &Path, catalogue: &HandlerCatalogue) -> Result<Scan, DiscoveryError> {
    if !base_dir.is_dir() {
        return Err(DiscoveryError::NotADirectory(base_dir.to_path_buf()));
    }
    let mut scan = Scan {
        declarations: Vec::new(),
        failures: Vec::new(),
    };
    let entries = read_sorted(base_dir, &mut scan.failures).map_err(|source| DiscoveryError::Io {
        path: base_dir.to_path_buf(),
        source,
    })?;
    walk_entries(entries, &[], catalogue, &mut scan);
    Ok(scan)
}

fn walk(dir: &Path, prefix: &[String], catalogue: &HandlerCatalogue, scan: &mut Scan) {
    match read_sorted(dir, &mut scan.failures) {
        Ok(entries) => walk_entries(entries, prefix, catalogue, scan),
        Err(source) => scan.failures.push(DiscoveryError::Io {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

fn walk_entries(
    entries: Vec<(String, PathBuf)>,
    prefix: &[String],
    catalogue: &HandlerCatalogue,
    scan: &mut Scan,
) {
    for (name, path) in entries {
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            let mut child = prefix.to_vec();
            child.push(name);
            scan.declarations.push(Declaration::collection(child.clone()));
            walk(&path, &child, catalogue, scan);
            continue;
        }

        let Some(stem) = Path::new(&name).file_stem().and_then(|s| s.to_str()) else {
            scan.failures.push(DiscoveryError::InvalidName(name));
            continue;
        };
        let mut component = prefix.to_vec();
        component.push(stem.to_string());
        let key = component.join("/");
        match catalogue.loader(&key) {
            Some(loader) => scan
                .declarations
                .push(Declaration::component(component, loader)),
            None => scan.failures.push(DiscoveryError::Unregistered(key)),
        }
    }
}

/// Directory entries as `(name, path)`, sorted by name. Entries with
/// unreadable metadata or non-UTF-8 names are recorded as failures.
fn read_sorted(
    dir: &Path,
    failures: &mut Vec<DiscoveryError>,
) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(source) => {
                failures.push(DiscoveryError::Io {
                    path: dir.to_path_buf(),
                    source,
                });
                continue;
            }
        };
        match entry.file_name().into_string() {
            Ok(name) => entries.push((name, entry.path())),
            Err(raw) => failures.push(DiscoveryError::InvalidName(
                raw.to_string_lossy().into_owned(),
            )),
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}
