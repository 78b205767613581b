// FILE: src/core/classifier.rs
//! The Classifier: maps a path (plus an optional MIME hint from the host) to a
//! [`Category`].
//!
//! Detection is an ordered chain of layers. The first layer that answers wins:
//! 1. MIME hint (the host OS knows best)
//! 2. File extension
//! 3. Binary signature sniffing (slow, reads the file)
//!
//! Anything that falls through every layer is `Others`. Classification never
//! fails.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::category::Category;

pub const APK_MIME: &str = "application/vnd.android.package-archive";

/// A single detection layer. `None` means "no opinion, ask the next layer".
pub type Layer = fn(&Path, &str) -> Option<Category>;

/// Evaluation order. Changing it changes the priority contract.
pub const LAYERS: &[Layer] = &[from_mime_hint, from_extension, from_signature];

const EXTENSIONS: &[(&str, Category)] = &[
    // Images
    ("jpg", Category::Images), ("jpeg", Category::Images), ("png", Category::Images),
    ("gif", Category::Images), ("webp", Category::Images), ("heic", Category::Images),
    ("bmp", Category::Images), ("svg", Category::Images),
    // Videos
    ("mp4", Category::Videos), ("mkv", Category::Videos), ("avi", Category::Videos),
    ("mov", Category::Videos), ("webm", Category::Videos),
    // Audio
    ("mp3", Category::Audio), ("flac", Category::Audio), ("wav", Category::Audio),
    ("ogg", Category::Audio), ("m4a", Category::Audio), ("aac", Category::Audio),
    // Documents
    ("pdf", Category::Documents), ("doc", Category::Documents), ("docx", Category::Documents),
    ("txt", Category::Documents), ("odt", Category::Documents), ("xls", Category::Documents),
    ("xlsx", Category::Documents), ("ppt", Category::Documents), ("pptx", Category::Documents),
    ("md", Category::Documents),
    // Archives
    ("zip", Category::Archives), ("rar", Category::Archives), ("7z", Category::Archives),
    ("tar", Category::Archives), ("gz", Category::Archives),
    // Packages
    ("apk", Category::ApplicationPackage),
    // Code
    ("cpp", Category::Code), ("h", Category::Code), ("hpp", Category::Code),
    ("c", Category::Code), ("kt", Category::Code), ("java", Category::Code),
    ("dart", Category::Code), ("rs", Category::Code), ("py", Category::Code),
    ("js", Category::Code), ("ts", Category::Code),
];

const SIGNATURES: &[(&[u8], Category)] = &[
    (b"\x89PNG", Category::Images),
    (b"%PDF", Category::Documents),
    (b"PK\x03\x04", Category::Archives),
];

/// Classify `path`, consulting `mime_hint` first when it is non-empty.
pub fn classify(path: &Path, mime_hint: &str) -> Category {
    LAYERS
        .iter()
        .find_map(|layer| layer(path, mime_hint))
        .unwrap_or(Category::Others)
}

pub fn from_mime_hint(_path: &Path, mime_hint: &str) -> Option<Category> {
    let mime = mime_hint.trim().to_lowercase();
    if mime.is_empty() {
        return None;
    }

    if mime.starts_with("image/") {
        Some(Category::Images)
    } else if mime.starts_with("video/") {
        Some(Category::Videos)
    } else if mime.starts_with("audio/") {
        Some(Category::Audio)
    } else if mime == APK_MIME {
        Some(Category::ApplicationPackage)
    } else if mime == "application/pdf" || mime.contains("document") {
        Some(Category::Documents)
    } else {
        None
    }
}

pub fn from_extension(path: &Path, _mime_hint: &str) -> Option<Category> {
    let ext = extension_of(path);
    if ext.is_empty() {
        return None;
    }
    EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, category)| *category)
}

/// Reads only as many bytes as the longest signature. Any read failure is a
/// non-match.
pub fn from_signature(path: &Path, _mime_hint: &str) -> Option<Category> {
    let max_len = SIGNATURES.iter().map(|(magic, _)| magic.len()).max().unwrap_or(0);
    let mut buf = vec![0u8; max_len];

    let mut file = File::open(path).ok()?;
    let mut filled = 0;
    while filled < max_len {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => return None,
        }
    }
    let head = &buf[..filled];

    SIGNATURES
        .iter()
        .find(|(magic, _)| head.starts_with(magic))
        .map(|(_, category)| *category)
}

/// Lowercased text after the last `.` of the whole path string, or `""`.
fn extension_of(path: &Path) -> String {
    let path_str = path.to_string_lossy();
    match path_str.rfind('.') {
        Some(idx) => path_str[idx + 1..].to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extension_table() {
        assert_eq!(classify(Path::new("a.jpg"), ""), Category::Images);
        assert_eq!(classify(Path::new("/sdcard/DCIM/IMG_001.JPG"), ""), Category::Images);
        assert_eq!(classify(Path::new("a.pdf"), ""), Category::Documents);
        assert_eq!(classify(Path::new("a.zip"), ""), Category::Archives);
        assert_eq!(classify(Path::new("app-release.apk"), ""), Category::ApplicationPackage);
        assert_eq!(classify(Path::new("main.kt"), ""), Category::Code);
        assert_eq!(classify(Path::new("song.flac"), ""), Category::Audio);
    }

    #[test]
    fn test_mime_hint_beats_extension() {
        assert_eq!(classify(Path::new("clip.jpg"), "video/mp4"), Category::Videos);
        assert_eq!(classify(Path::new("noext"), "VIDEO/x-matroska"), Category::Videos);
        assert_eq!(classify(Path::new("a.zip"), APK_MIME), Category::ApplicationPackage);
        assert_eq!(
            classify(Path::new("a.bin"), "application/vnd.oasis.opendocument.text"),
            Category::Documents
        );
    }

    #[test]
    fn test_unknown_mime_falls_through_to_extension() {
        assert_eq!(classify(Path::new("a.mp3"), "application/octet-stream"), Category::Audio);
    }

    #[test]
    fn test_missing_file_without_extension_is_others() {
        assert_eq!(classify(Path::new("/definitely/not/here/blob"), ""), Category::Others);
        assert_eq!(classify(Path::new(""), ""), Category::Others);
    }

    #[test]
    fn test_signature_sniffing() {
        let dir = TempDir::new().unwrap();

        let png = dir.path().join("picture");
        fs::write(&png, b"\x89PNG\r\n\x1a\nrest").unwrap();
        assert_eq!(classify(&png, ""), Category::Images);

        let pdf = dir.path().join("report.unknown");
        fs::write(&pdf, b"%PDF-1.7").unwrap();
        assert_eq!(classify(&pdf, ""), Category::Documents);

        let zip = dir.path().join("bundle");
        fs::write(&zip, b"PK\x03\x04....").unwrap();
        assert_eq!(classify(&zip, ""), Category::Archives);

        let short = dir.path().join("tiny");
        fs::write(&short, b"PK").unwrap();
        assert_eq!(classify(&short, ""), Category::Others);
    }

    #[test]
    fn test_extension_beats_signature() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"%PDF but really text").unwrap();
        assert_eq!(from_signature(&path, ""), Some(Category::Documents));

        let mislabeled = dir.path().join("archive.mp4");
        fs::write(&mislabeled, b"PK\x03\x04").unwrap();
        assert_eq!(classify(&mislabeled, ""), Category::Videos);
    }

    #[test]
    fn test_directory_is_not_sniffed_as_error() {
        let dir = TempDir::new().unwrap();
        assert_eq!(classify(dir.path(), ""), Category::Others);
    }

    #[test]
    fn test_layers_answer_independently() {
        assert_eq!(from_mime_hint(Path::new("x"), ""), None);
        assert_eq!(from_mime_hint(Path::new("x"), "text/plain"), None);
        assert_eq!(from_extension(Path::new("archive.tar.GZ"), ""), Some(Category::Archives));
        assert_eq!(from_extension(Path::new("Makefile"), ""), None);
        assert_eq!(from_signature(Path::new("/no/such/file"), ""), None);
    }
}
