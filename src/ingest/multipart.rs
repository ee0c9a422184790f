//! Multipart extraction
//!
//! Decodes a `multipart/form-data` body with `multer` and returns the single
//! file part. Fields without a filename are skipped; a second file part is
//! rejected.

use super::{first_line, validate_filename, ExtractedFile, IngestError};
use crate::config::ContentMode;
use bytes::Bytes;

/// Extract the uploaded file from a multipart body
pub async fn extract(
    content_type: &str,
    body: Bytes,
    mode: ContentMode,
) -> Result<ExtractedFile, IngestError> {
    let boundary = multer::parse_boundary(content_type).map_err(|e| {
        IngestError::UnsupportedMediaType(format!("{} ({})", content_type, e))
    })?;

    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut extracted: Option<ExtractedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        IngestError::MalformedBody(format!("failed to parse multipart field: {}", e))
    })? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            tracing::debug!(field = ?field.name(), "Skipping non-file field");
            continue;
        };

        if extracted.is_some() {
            return Err(IngestError::MalformedBody(
                "multiple file parts are not supported".into(),
            ));
        }

        let filename = filename.trim().to_string();
        validate_filename(&filename)?;

        let part_content_type = field.content_type().map(|m| m.to_string());
        let data = field.bytes().await.map_err(|e| {
            IngestError::MalformedBody(format!("failed reading file part: {}", e))
        })?;
        let text = String::from_utf8(data.to_vec()).map_err(|_| IngestError::NonTextContent)?;

        let content = match mode {
            ContentMode::Full => text,
            ContentMode::FirstLine => first_line(&text),
        };

        extracted = Some(ExtractedFile {
            filename,
            content_type: part_content_type,
            content,
        });
    }

    extracted.ok_or(IngestError::MissingFile)
}
