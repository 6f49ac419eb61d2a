//! Attachment resolution: required file columns → downloaded attachments.

use std::path::Path;

use futures::future::join_all;
use sheetmail_google::FileStoreGateway;
use sheetmail_types::{Attachment, Header, Result, Row, SheetMailError};

use crate::reference::extract_identifier;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A required column whose file could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFailure {
    pub column: String,
    pub file_id: String,
    pub reason: String,
}

/// Attachments in required-column order, plus the columns that failed.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub attachments: Vec<Attachment>,
    pub failures: Vec<AttachmentFailure>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Extension of a display name including the dot, or `""` when there is none.
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

async fn fetch(
    store: &dyn FileStoreGateway,
    column: &str,
    file_id: &str,
) -> std::result::Result<Attachment, String> {
    let (meta, content) = tokio::join!(store.get_metadata(file_id), store.get_content(file_id));
    let meta = meta.map_err(|e| e.to_string())?;
    let content = content.map_err(|e| e.to_string())?;
    Ok(Attachment {
        filename: format!("{column}{}", extension_of(&meta.name)),
        content_type: meta
            .mime_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        content,
    })
}

/// Fetch the file behind every required column of `row`.
///
/// Columns without an extractable identifier are skipped. Columns are
/// fetched concurrently and a failed fetch never aborts its siblings; it is
/// recorded in [`Resolution::failures`]. Fails only when columns were
/// required but not a single attachment could be produced.
pub async fn resolve(
    store: &dyn FileStoreGateway,
    row: &Row,
    header: &Header,
    required: &[&str],
) -> Result<Resolution> {
    let n = row.display_index();
    let targets: Vec<(&str, &str)> = required
        .iter()
        .filter_map(|column| {
            let id = row.get(header, column).and_then(extract_identifier)?;
            Some((*column, id))
        })
        .collect();

    let fetched = join_all(
        targets
            .iter()
            .map(|(column, file_id)| fetch(store, column, file_id)),
    )
    .await;

    let mut resolution = Resolution::default();
    for ((column, file_id), result) in targets.into_iter().zip(fetched) {
        match result {
            Ok(attachment) => resolution.attachments.push(attachment),
            Err(reason) => {
                tracing::warn!(row = n, column = %column, file_id = %file_id, error = %reason, "Failed to fetch attachment");
                resolution.failures.push(AttachmentFailure {
                    column: column.to_string(),
                    file_id: file_id.to_string(),
                    reason,
                });
            }
        }
    }

    if !required.is_empty() && resolution.attachments.is_empty() {
        return Err(SheetMailError::Resolution {
            row: n,
            message: "no valid attachment".into(),
        });
    }
    Ok(resolution)
}
