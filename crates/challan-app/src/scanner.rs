//! Image file validation and folder scanning

use challan_types::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Supported image extensions
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff"];

/// Check if a path is a supported image file
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check that a path names an existing file with an image extension.
/// Decoding is left to the analysis itself.
pub fn validate_image(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.display().to_string()));
    }

    if !path.is_file() {
        return Err(Error::InvalidImageFormat(format!(
            "{} is not a file",
            path.display()
        )));
    }

    if !is_supported_image(path) {
        return Err(Error::InvalidImageFormat(format!(
            "Unsupported image format: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Scan a directory tree for image files, sorted by file name
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(Error::FileNotFound(dir.display().to_string()));
    }

    if !dir.is_dir() {
        return Err(Error::InvalidImageFormat(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_supported_image(p))
        .collect();

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("cam1.jpg")));
        assert!(is_supported_image(Path::new("cam1.JPEG")));
        assert!(is_supported_image(Path::new("cam1.png")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("cam1")));
    }

    #[test]
    fn test_validate_image() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("readme.txt");
        fs::write(&text, "x").unwrap();

        assert!(matches!(
            validate_image(&dir.path().join("missing.jpg")),
            Err(Error::FileNotFound(_))
        ));
        assert!(matches!(validate_image(&text), Err(Error::InvalidImageFormat(_))));
        assert!(matches!(validate_image(dir.path()), Err(Error::InvalidImageFormat(_))));
    }

    #[test]
    fn test_scan_directory_recurses_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("junction")).unwrap();
        fs::write(dir.path().join("b.jpg"), b"").unwrap();
        fs::write(dir.path().join("junction/a.png"), b"").unwrap();
        fs::write(dir.path().join("log.csv"), b"").unwrap();

        let found = scan_directory(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.png", "b.jpg"]);
    }
}
