//! Shared helper functions for CLI commands.

use std::path::Path;

/// Guess a MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("pptx") => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        _ => "application/octet-stream",
    }
}

/// Title derived from a file name, without the extension.
pub fn title_for_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a/report.PDF")), "application/pdf");
        assert_eq!(mime_for_path(Path::new("scan.jpeg")), "image/jpeg");
        assert_eq!(
            mime_for_path(Path::new("unknown.xyz")),
            "application/octet-stream"
        );
        assert_eq!(mime_for_path(Path::new("no_extension")), "application/octet-stream");
    }

    #[test]
    fn test_title_for_path() {
        assert_eq!(title_for_path(Path::new("a/b/quarterly-report.pdf")), "quarterly-report");
    }
}
