//! Uploaded media attachments and their declared kind.
//!
//! The media kind is resolved exactly once, at the chat boundary, from the
//! attachment metadata Discord hands us. Everything downstream of that
//! decision works with the tagged [`MediaKind`] instead of re-inspecting
//! file contents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::ids::UserId;

/// Video container extensions accepted for the transcoder path.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi", "m4v"];

/// Image extensions accepted for the in-process decode path.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Declared kind of an uploaded attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A video container; frames are sampled by the external transcoder.
    Video,
    /// A still or animated image; decoded in-process.
    Image,
    /// Anything else; rejected before touching the filesystem.
    Unsupported,
}

impl MediaKind {
    /// Resolve a kind from an attachment MIME content type
    /// (e.g. `video/mp4`, `image/png; charset=binary`).
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        if essence.starts_with("video/") {
            MediaKind::Video
        } else if essence.starts_with("image/") {
            MediaKind::Image
        } else {
            MediaKind::Unsupported
        }
    }

    /// Resolve a kind from a file extension. Used where no content type is
    /// available (e.g. local CLI invocations).
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => MediaKind::Video,
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => MediaKind::Image,
            _ => MediaKind::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
            MediaKind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An attachment the chat layer has already saved to disk.
///
/// The file at `path` is owned by the caller: the conversion pipeline only
/// reads it and never deletes or mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUpload {
    /// Saved attachment path (caller-owned).
    pub path: PathBuf,
    /// Declared media kind, resolved at the boundary.
    pub kind: MediaKind,
    /// User who requested the conversion.
    pub requester: UserId,
    /// Original attachment filename, kept for artifact naming.
    pub filename: String,
}

impl MediaUpload {
    pub fn new(
        path: impl Into<PathBuf>,
        kind: MediaKind,
        requester: UserId,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            requester,
            filename: filename.into(),
        }
    }

    /// Build an upload from attachment metadata, resolving the kind from the
    /// content type when present and from the filename otherwise.
    pub fn from_attachment(
        path: impl Into<PathBuf>,
        content_type: Option<&str>,
        requester: UserId,
        filename: impl Into<String>,
    ) -> Self {
        let filename = filename.into();
        let kind = match content_type {
            Some(ct) => MediaKind::from_content_type(ct),
            None => MediaKind::from_path(&filename),
        };
        Self {
            path: path.into(),
            kind,
            requester,
            filename,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_content_type() {
        assert_eq!(MediaKind::from_content_type("video/mp4"), MediaKind::Video);
        assert_eq!(
            MediaKind::from_content_type("video/quicktime"),
            MediaKind::Video
        );
        assert_eq!(MediaKind::from_content_type("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_content_type("image/gif"), MediaKind::Image);
        assert_eq!(
            MediaKind::from_content_type("application/pdf"),
            MediaKind::Unsupported
        );
        assert_eq!(
            MediaKind::from_content_type("text/plain"),
            MediaKind::Unsupported
        );
        assert_eq!(MediaKind::from_content_type(""), MediaKind::Unsupported);
    }

    #[test]
    fn test_kind_from_content_type_with_parameters() {
        assert_eq!(
            MediaKind::from_content_type("image/png; charset=binary"),
            MediaKind::Image
        );
        assert_eq!(
            MediaKind::from_content_type("VIDEO/MP4"),
            MediaKind::Video
        );
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(MediaKind::from_path("clip.mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_path("clip.MOV"), MediaKind::Video);
        assert_eq!(MediaKind::from_path("photo.jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::from_path("animation.gif"), MediaKind::Image);
        assert_eq!(MediaKind::from_path("notes.txt"), MediaKind::Unsupported);
        assert_eq!(MediaKind::from_path("no_extension"), MediaKind::Unsupported);
    }

    #[test]
    fn test_upload_from_attachment_prefers_content_type() {
        // Content type wins over a misleading extension.
        let upload = MediaUpload::from_attachment(
            "/tmp/a",
            Some("video/webm"),
            UserId(1),
            "weird.gif",
        );
        assert_eq!(upload.kind, MediaKind::Video);
    }

    #[test]
    fn test_upload_from_attachment_falls_back_to_filename() {
        let upload = MediaUpload::from_attachment("/tmp/a", None, UserId(1), "cat.gif");
        assert_eq!(upload.kind, MediaKind::Image);

        let upload = MediaUpload::from_attachment("/tmp/a", None, UserId(1), "cat.exe");
        assert_eq!(upload.kind, MediaKind::Unsupported);
    }

    #[test]
    fn test_kind_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&MediaKind::Unsupported).unwrap(),
            "\"unsupported\""
        );
    }
}
