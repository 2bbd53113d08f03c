//! Multipart form collection and upload validation.
//!
//! Submission endpoints take `multipart/form-data` with a mix of text
//! fields and file fields. [`collect_form`] drains the whole form into a
//! [`SubmissionForm`] so handlers can validate fields in any order.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{AppError, AppResult};

/// One uploaded file field.
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A fully-drained multipart submission.
#[derive(Default)]
pub struct SubmissionForm {
    texts: HashMap<String, String>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl SubmissionForm {
    /// A text field's value, if present.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }

    /// A required text field; 400 when missing.
    pub fn require_text(&self, name: &str) -> AppResult<&str> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("Missing required '{name}' field")))
    }

    /// Parse an optional text field, falling back to the type's default
    /// when the field is absent or blank.
    pub fn parse_or_default<T>(&self, name: &str) -> AppResult<T>
    where
        T: Default + std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.text(name).map(str::trim) {
            None | Some("") => Ok(T::default()),
            Some(raw) => raw
                .parse()
                .map_err(|e: T::Err| AppError::BadRequest(e.to_string())),
        }
    }

    /// The first file uploaded under `name`, if any.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).and_then(|files| files.first())
    }

    /// All files uploaded under `name`.
    pub fn file_list(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Drain a multipart request into a [`SubmissionForm`].
///
/// Files larger than `max_file_bytes` are rejected with 400. Fields
/// without a file name are treated as text.
pub async fn collect_form(
    mut multipart: Multipart,
    max_file_bytes: usize,
) -> AppResult<SubmissionForm> {
    let mut form = SubmissionForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(|f| f.to_string());

        match file_name {
            Some(file_name) => {
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;

                if bytes.len() > max_file_bytes {
                    return Err(AppError::BadRequest(format!(
                        "File '{file_name}' exceeds the {} MB upload limit",
                        max_file_bytes / (1024 * 1024),
                    )));
                }

                form.files.entry(name).or_default().push(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.texts.insert(name, text);
            }
        }
    }

    Ok(form)
}

/// Validate an uploaded image: image content type, non-empty, and a
/// recognizable image header. `label` names the field in error messages.
pub fn ensure_image(file: &UploadedFile, label: &str) -> AppResult<()> {
    let content_type = file.content_type.as_deref().unwrap_or("");
    if !content_type.starts_with("image/") {
        return Err(AppError::BadRequest(format!("{label} must be an image")));
    }
    if file.is_empty() {
        return Err(AppError::BadRequest(format!("Empty {label} file")));
    }
    // Content types lie; check the actual bytes look like an image.
    if image::guess_format(&file.bytes).is_err() {
        return Err(AppError::BadRequest(format!(
            "{label} is not a recognizable image"
        )));
    }
    Ok(())
}

/// Validate an uploaded video: video content type or a known video file
/// extension, and non-empty.
pub fn ensure_video(file: &UploadedFile, label: &str) -> AppResult<()> {
    let content_type = file.content_type.as_deref().unwrap_or("");
    let named_like_video = [".mp4", ".webm", ".mov"]
        .iter()
        .any(|ext| file.file_name.ends_with(ext));
    if !content_type.starts_with("video/") && !named_like_video {
        return Err(AppError::BadRequest(format!("{label} must be a video")));
    }
    if file.is_empty() {
        return Err(AppError::BadRequest(format!("Empty {label} file")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.into(),
            content_type: Some(content_type.into()),
            bytes: bytes.to_vec(),
        }
    }

    // Minimal valid PNG header (eight magic bytes are enough for format
    // detection).
    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn ensure_image_accepts_png_bytes() {
        let f = file("face.png", "image/png", PNG_MAGIC);
        assert!(ensure_image(&f, "Image").is_ok());
    }

    #[test]
    fn ensure_image_rejects_wrong_content_type() {
        let f = file("face.txt", "text/plain", PNG_MAGIC);
        assert!(ensure_image(&f, "Image").is_err());
    }

    #[test]
    fn ensure_image_rejects_empty_file() {
        let f = file("face.png", "image/png", &[]);
        assert!(ensure_image(&f, "Image").is_err());
    }

    #[test]
    fn ensure_image_rejects_non_image_bytes() {
        let f = file("face.png", "image/png", b"definitely not an image");
        assert!(ensure_image(&f, "Image").is_err());
    }

    #[test]
    fn ensure_video_accepts_extension_without_content_type() {
        let f = UploadedFile {
            file_name: "clip.mp4".into(),
            content_type: None,
            bytes: b"fake-video".to_vec(),
        };
        assert!(ensure_video(&f, "Video").is_ok());
    }

    #[test]
    fn ensure_video_rejects_other_files() {
        let f = file("notes.txt", "text/plain", b"hello");
        assert!(ensure_video(&f, "Video").is_err());
    }
}
