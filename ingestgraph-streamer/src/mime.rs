//! Classifies Google Drive's native MIME types (spec §4.4: "Google Drive
//! file whose source MIME is a Google-native type (Doc/Sheet/Slide): route
//! to the corresponding parser, which returns structured JSON, not raw
//! bytes").

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoogleNativeKind {
    Document,
    Spreadsheet,
    Presentation,
}

/// `None` for any MIME type the Drive API would serve as raw bytes
/// (including already-binary formats like PDF, images, or Office formats
/// stored on Drive without being converted to a native type).
pub fn google_native_kind(mime_type: &str) -> Option<GoogleNativeKind> {
    match mime_type {
        "application/vnd.google-apps.document" => Some(GoogleNativeKind::Document),
        "application/vnd.google-apps.spreadsheet" => Some(GoogleNativeKind::Spreadsheet),
        "application/vnd.google-apps.presentation" => Some(GoogleNativeKind::Presentation),
        _ => None,
    }
}
