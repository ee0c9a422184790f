//! Positional extraction
//!
//! Reads the filename and content from fixed line offsets, matching the wire
//! layout the legacy browser client produced:
//!
//! ```text
//! 0: --<boundary>
//! 1: Content-Disposition: form-data; name="<field>"; filename="<name>"
//! 2: Content-Type: <mime>
//! 3:
//! 4: <first content line>
//! ```
//!
//! This is not a multipart parser. Any client that orders headers differently
//! or adds one breaks it; prefer [`super::multipart`].

use super::{validate_filename, ExtractedFile, IngestError};
use crate::config::ContentMode;

const DISPOSITION_LINE: usize = 1;
const CONTENT_TYPE_LINE: usize = 2;
const CONTENT_LINE: usize = 4;

/// Extract the file from a body laid out as above
pub fn extract(body: &str, mode: ContentMode) -> Result<ExtractedFile, IngestError> {
    let lines: Vec<&str> = body.split("\r\n").collect();
    if lines.len() <= CONTENT_LINE {
        return Err(IngestError::MalformedBody(format!(
            "expected at least {} lines, found {}",
            CONTENT_LINE + 1,
            lines.len()
        )));
    }

    let filename = filename_from_disposition(lines[DISPOSITION_LINE])?;
    validate_filename(&filename)?;

    let content = match mode {
        // Only CRLF separates lines here; a bare LF stays part of the content
        ContentMode::FirstLine => lines[CONTENT_LINE].trim().to_string(),
        ContentMode::Full => {
            // The closing delimiter is the opening boundary line plus "--"
            let boundary = lines[0];
            let closing = format!("{}--", boundary);
            lines[CONTENT_LINE..]
                .iter()
                .take_while(|line| **line != boundary && **line != closing)
                .copied()
                .collect::<Vec<_>>()
                .join("\r\n")
        }
    };

    Ok(ExtractedFile {
        filename,
        content_type: content_type_from_header(lines[CONTENT_TYPE_LINE]),
        content,
    })
}

/// Third `;` segment, value after the first `=`, one pair of quotes stripped
fn filename_from_disposition(line: &str) -> Result<String, IngestError> {
    let segment = line.split(';').nth(2).ok_or_else(|| {
        IngestError::MalformedBody(format!(
            "Content-Disposition line has no filename segment: {:?}",
            line
        ))
    })?;

    let value = segment.split('=').nth(1).ok_or_else(|| {
        IngestError::MalformedBody(format!("filename segment has no '=': {:?}", segment))
    })?;

    let value = value.strip_prefix('"').unwrap_or(value);
    let value = value.strip_suffix('"').unwrap_or(value);
    Ok(value.trim().to_string())
}

fn content_type_from_header(line: &str) -> Option<String> {
    let (name, value) = line.split_once(':')?;
    if name.trim().eq_ignore_ascii_case("content-type") {
        Some(value.trim().to_string())
    } else {
        None
    }
}
