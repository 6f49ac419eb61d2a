//! Spreadsheet, file store, and mail gateways.
//!
//! The pipeline only sees the narrow async traits defined here. The Google
//! Sheets, Drive, and Gmail REST adapters implement them over `reqwest`, with
//! a bearer token supplied by a [`CredentialProvider`].

mod auth;
mod drive;
mod gmail;
mod http;
mod sheets;

pub use auth::{CredentialProvider, StaticToken};
pub use drive::DriveClient;
pub use gmail::{render_message, GmailClient};
pub use sheets::SheetsClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sheetmail_types::{ComposedMessage, Result};

// ---------------------------------------------------------------------------
// Collaborator data
// ---------------------------------------------------------------------------

/// Display metadata of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
}

/// One tab of a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTab {
    #[serde(rename = "sheetId")]
    pub sheet_id: i64,
    pub title: String,
}

// ---------------------------------------------------------------------------
// Gateways
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SpreadsheetGateway: Send + Sync {
    /// Raw cell values of `range`. The first row is the header.
    async fn get_rows(&self, sheet_id: &str, range: &str) -> Result<Vec<Vec<String>>>;

    async fn list_sheets(&self, sheet_id: &str) -> Result<Vec<SheetTab>>;
}

#[async_trait]
pub trait FileStoreGateway: Send + Sync {
    async fn get_metadata(&self, file_id: &str) -> Result<FileMetadata>;

    async fn get_content(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Spreadsheets visible to the current credentials.
    async fn list_spreadsheets(&self) -> Result<Vec<FileMetadata>>;
}

#[async_trait]
pub trait MailGateway: Send + Sync {
    async fn send(&self, message: &ComposedMessage) -> Result<()>;
}
