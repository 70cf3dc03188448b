//! Selected files and MIME validation.

use bytes::Bytes;
use mime_sniffer::MimeTypeSniffer;

use crate::error::IngestError;

/// A file handed over by the host's file picker.
#[derive(Clone, Debug)]
pub struct SelectedFile {
    pub name: String,
    /// MIME type reported by the picker, if it reported one.
    pub declared_mime: Option<String>,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, declared_mime: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            declared_mime: declared_mime.map(str::to_string),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Resolve the file's MIME type and check that it is an image.
///
/// The declared type wins; content sniffing is only the fallback when the
/// picker did not declare one.
pub fn image_mime(file: &SelectedFile) -> Result<String, IngestError> {
    let mime = match file.declared_mime.as_deref().map(str::trim) {
        Some(declared) if !declared.is_empty() => declared.to_ascii_lowercase(),
        _ => file
            .data
            .sniff_mime_type()
            .unwrap_or("application/octet-stream")
            .to_string(),
    };
    if mime.starts_with("image/") {
        Ok(mime)
    } else {
        Err(IngestError::UnsupportedFileType {
            name: file.name.clone(),
            mime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_declared_type_wins() {
        let file = SelectedFile::new("a.png", Some("Image/PNG"), &b"not really"[..]);
        assert_eq!(image_mime(&file).unwrap(), "image/png");

        let file = SelectedFile::new("a.pdf", Some("application/pdf"), PNG_MAGIC);
        assert!(matches!(
            image_mime(&file),
            Err(IngestError::UnsupportedFileType { mime, .. }) if mime == "application/pdf"
        ));
    }

    #[test]
    fn test_sniffs_when_undeclared() {
        let file = SelectedFile::new("blob", None, PNG_MAGIC);
        assert_eq!(image_mime(&file).unwrap(), "image/png");

        let file = SelectedFile::new("notes.txt", Some(""), &b"plain text"[..]);
        assert!(image_mime(&file).is_err());
    }
}
