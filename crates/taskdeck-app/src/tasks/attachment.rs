/*
[INPUT]:  Local file path selected in the task form
[OUTPUT]: File bytes, guessed content type and a collision-resistant object key
[POS]:    Application layer - attachment preparation before upload
[UPDATE]: When object key format or content type detection changes
*/

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub async fn from_path(path: &Path) -> io::Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("attachment path has no file name: {}", path.display()),
                )
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// `<nanoseconds since epoch>-<file name>`
    pub fn object_key(&self, now: DateTime<Utc>) -> String {
        let stamp = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros());
        format!("{stamp}-{}", self.file_name)
    }
}
