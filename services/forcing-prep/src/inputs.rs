//! Expansion of command-line inputs into NetCDF file paths.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

fn is_netcdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("nc"))
        .unwrap_or(false)
}

/// Expand inputs into a list of files.
///
/// Files are taken as given, in the order given. Directories are walked
/// recursively for `*.nc` files, which are appended sorted by path.
/// Duplicates keep their first position.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in walkdir::WalkDir::new(input) {
                let entry = entry.with_context(|| format!("Failed to walk {}", input.display()))?;
                if entry.file_type().is_file() && is_netcdf(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            debug!(dir = %input.display(), files = found.len(), "Scanned input directory");
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }

    let mut seen = std::collections::HashSet::new();
    files.retain(|path| seen.insert(path.clone()));

    anyhow::ensure!(!files.is_empty(), "No input files found in {:?}", inputs);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_directory_is_walked_for_netcdf() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2025").join("01");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("b.nc"), b"").unwrap();
        fs::write(nested.join("a.nc"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::write(dir.path().join("upper.NC"), b"").unwrap();

        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(
            files,
            vec![
                nested.join("a.nc"),
                dir.path().join("b.nc"),
                dir.path().join("upper.NC"),
            ]
        );
    }

    #[test]
    fn test_files_keep_given_order() {
        let dir = tempfile::tempdir().unwrap();
        let second = dir.path().join("z.nc");
        let first = dir.path().join("a.nc");

        let files = collect_inputs(&[second.clone(), first.clone(), second.clone()]).unwrap();
        assert_eq!(files, vec![second, first]);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_inputs(&[dir.path().to_path_buf()]).is_err());
    }
}
