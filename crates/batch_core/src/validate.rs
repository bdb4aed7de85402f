//! Candidate-path checks and folder discovery.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions accepted as images, lowercase and without the dot.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// True when the extension (case-insensitive) is one of [`ACCEPTED_EXTENSIONS`].
pub fn has_image_extension(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Accepted extension and an existing regular file right now.
///
/// The answer can go stale before processing; processors re-check.
pub fn is_valid_image(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    has_image_extension(path) && path.is_file()
}

/// Result of filtering a raw selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub valid: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Splits `paths` into valid images and skipped entries, keeping input order.
pub fn filter_valid<I, P>(paths: I) -> Selection
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let mut selection = Selection::default();
    for path in paths {
        let path = path.into();
        if is_valid_image(&path) {
            selection.valid.push(path);
        } else {
            tracing::debug!("skipping {}", path.display());
            selection.skipped.push(path);
        }
    }
    selection
}

/// Options controlling how folder scanning behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// When true, scan subdirectories recursively.
    pub recursive: bool,
}

/// Lists accepted images under `root`, sorted by path.
pub fn scan_folder(root: impl AsRef<Path>, opts: ScanOptions) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.exists() {
        anyhow::bail!("Path does not exist: {}", root.display());
    }
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }

    let walker = if opts.recursive {
        WalkDir::new(root)
    } else {
        WalkDir::new(root).max_depth(1)
    };

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("walkdir error: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && has_image_extension(path) {
            found.push(path.to_path_buf());
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[rstest]
    #[case("a.png", true)]
    #[case("a.JPG", true)]
    #[case("a.Jpeg", true)]
    #[case("a.txt", false)]
    #[case("a.gif", false)]
    #[case("png", false)]
    #[case("a.png.bak", false)]
    fn extension_check_is_case_insensitive(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(has_image_extension(Path::new(name)), expected);
    }

    #[test]
    fn valid_image_requires_existing_regular_file() -> Result<()> {
        let dir = tempdir()?;
        let present = dir.path().join("present.png");
        File::create(&present)?;
        let folder = dir.path().join("folder.jpg");
        fs::create_dir(&folder)?;

        assert!(is_valid_image(&present));
        assert!(!is_valid_image(dir.path().join("missing.png")));
        assert!(!is_valid_image(&folder));
        Ok(())
    }

    #[test]
    fn filter_valid_keeps_order_and_reports_skips() -> Result<()> {
        let dir = tempdir()?;
        let b = dir.path().join("b.jpg");
        let a = dir.path().join("a.png");
        let notes = dir.path().join("notes.txt");
        for p in [&b, &a, &notes] {
            File::create(p)?;
        }

        let sel = filter_valid([b.clone(), notes.clone(), a.clone()]);
        assert_eq!(sel.valid, vec![b, a]);
        assert_eq!(sel.skipped, vec![notes]);
        Ok(())
    }

    #[test]
    fn scan_folder_empty_returns_empty() -> Result<()> {
        let dir = tempdir()?;
        assert!(scan_folder(dir.path(), ScanOptions::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn scan_folder_rejects_missing_and_file_roots() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("a.png");
        File::create(&file)?;
        assert!(scan_folder(dir.path().join("nope"), ScanOptions::default()).is_err());
        assert!(scan_folder(&file, ScanOptions::default()).is_err());
        Ok(())
    }

    #[rstest]
    #[case(false, vec!["a.JPG", "b.jpeg", "c.png"])]
    #[case(true, vec!["a.JPG", "b.jpeg", "c.png", "d.jpg"])]
    fn scan_folder_honours_recursion(
        #[case] recursive: bool,
        #[case] expected: Vec<&str>,
    ) -> Result<()> {
        let dir = tempdir()?;
        File::create(dir.path().join("a.JPG"))?;
        File::create(dir.path().join("b.jpeg"))?;
        File::create(dir.path().join("c.png"))?;
        File::create(dir.path().join("not-image.txt"))?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;
        File::create(nested.join("d.jpg"))?;

        let found = scan_folder(dir.path(), ScanOptions { recursive })?;
        let mut names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, expected);
        Ok(())
    }
}
