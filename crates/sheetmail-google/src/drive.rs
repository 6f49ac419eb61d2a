use std::sync::Arc;

use async_trait::async_trait;
use sheetmail_types::{Result, SheetMailError};

use crate::http::{endpoint, GoogleHttp};
use crate::{CredentialProvider, FileMetadata, FileStoreGateway};

const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Google Drive v3 adapter.
#[derive(Clone)]
pub struct DriveClient {
    http: GoogleHttp,
    base_url: String,
}

impl DriveClient {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http: GoogleHttp::new("drive", credentials),
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

fn parse_file_list(json: &serde_json::Value) -> Result<Vec<FileMetadata>> {
    match json.get("files") {
        Some(files) => Ok(serde_json::from_value(files.clone())?),
        None => Ok(Vec::new()),
    }
}

#[async_trait]
impl FileStoreGateway for DriveClient {
    async fn get_metadata(&self, file_id: &str) -> Result<FileMetadata> {
        let url = endpoint(&self.base_url, &["files", file_id])?;
        let request = self.http.client().get(url).query(&[
            ("fields", "id,name,mimeType"),
            ("supportsAllDrives", "true"),
        ]);
        let json = self.http.json(request).await?;
        let mut meta: FileMetadata = serde_json::from_value(json).map_err(|e| {
            SheetMailError::ProviderError {
                service: "drive".into(),
                status: 200,
                message: format!("Unexpected metadata for {file_id}: {e}"),
            }
        })?;
        if meta.id.is_empty() {
            meta.id = file_id.to_string();
        }
        Ok(meta)
    }

    async fn get_content(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = endpoint(&self.base_url, &["files", file_id])?;
        let request = self
            .http
            .client()
            .get(url)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")]);
        let bytes = self.http.bytes(request).await?;
        tracing::debug!(file_id = %file_id, size = bytes.len(), "Downloaded file");
        Ok(bytes)
    }

    async fn list_spreadsheets(&self) -> Result<Vec<FileMetadata>> {
        let url = endpoint(&self.base_url, &["files"])?;
        let query = format!("mimeType='{SPREADSHEET_MIME}'");
        let request = self.http.client().get(url).query(&[
            ("q", query.as_str()),
            ("fields", "files(id,name,mimeType)"),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ]);
        let json = self.http.json(request).await?;
        parse_file_list(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_deserializes_drive_fields() {
        let meta: FileMetadata = serde_json::from_value(json!({
            "id": "1AbCdEfGhIjKlMnOpQrStUvWxYz",
            "name": "laudo.pdf",
            "mimeType": "application/pdf"
        }))
        .unwrap();
        assert_eq!(meta.name, "laudo.pdf");
        assert_eq!(meta.mime_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn file_list_tolerates_missing_files_key() {
        assert!(parse_file_list(&json!({})).unwrap().is_empty());
        let files = parse_file_list(&json!({
            "files": [{ "id": "a", "name": "Planilha PAD" }]
        }))
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].mime_type, None);
    }
}
