//! Shared types, errors, row model, and outcomes for the sheetmail pipeline.
//!
//! This crate provides the foundational types used across all other sheetmail crates:
//! - `SheetMailError`: unified error taxonomy
//! - `Header` / `Row`: the positional sheet model with name-based lookup
//! - `RowOutcome` / `BatchReport`: terminal per-row and per-batch results
//! - `ComposedMessage` / `Attachment`: the outbound mail handed to a transport

use serde::{Deserialize, Serialize};

/// Unified error type for all sheetmail subsystems.
#[derive(Debug, thiserror::Error)]
pub enum SheetMailError {
    // === Batch-fatal Errors ===
    #[error("Invalid header: the sheet must contain the expected columns in exactly the same order")]
    SchemaMismatch,

    #[error("Spreadsheet is empty")]
    EmptyInput,

    #[error("Invalid delivery parameters: {0}")]
    InvalidParams(String),

    // === Per-row Errors ===
    #[error("Row {row} failed validation with {} error(s)", errors.len())]
    RowValidation {
        row: usize,
        errors: Vec<ValidationError>,
    },

    #[error("Row {row}: {message}")]
    Resolution { row: usize, message: String },

    #[error("Send failed: {message}")]
    SendError { message: String },

    #[error("Row index {index} is out of range ({rows} data rows)")]
    RowOutOfRange { index: usize, rows: usize },

    // === Collaborator Errors ===
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Authentication failed for {service}")]
    AuthError { service: String },

    #[error("{service} returned HTTP {status}: {message}")]
    ProviderError {
        service: String,
        status: u16,
        message: String,
    },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SheetMailError {
    /// Returns `true` for errors that reject a whole batch before any row is processed.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            SheetMailError::SchemaMismatch
                | SheetMailError::EmptyInput
                | SheetMailError::InvalidParams(_)
        )
    }

    /// Returns `true` if the error means the credentials were rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, SheetMailError::AuthError { .. })
    }
}

/// A convenience alias for `Result<T, SheetMailError>`.
pub type Result<T> = std::result::Result<T, SheetMailError>;

// ---------------------------------------------------------------------------
// Header / Row: positional sheet model
// ---------------------------------------------------------------------------

/// The literal first row of a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of the first column named `name`, if any.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether the header equals `expected` exactly: same names, same order, same length.
    pub fn matches(&self, expected: &[&str]) -> bool {
        self.columns.len() == expected.len()
            && self.columns.iter().zip(expected).all(|(a, b)| a == b)
    }
}

impl<S: Into<String>> FromIterator<S> for Header {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// A data row, positionally aligned to the [`Header`].
///
/// Spreadsheet APIs drop trailing empty cells, so a row may be shorter than
/// the header; the missing cells read as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    ordinal: usize,
    cells: Vec<String>,
}

impl Row {
    /// `ordinal` is the 0-based position within the data slice (header excluded).
    pub fn new(ordinal: usize, cells: Vec<String>) -> Self {
        Self { ordinal, cells }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Human row number as shown by a spreadsheet, where row 1 is the header.
    pub fn display_index(&self) -> usize {
        self.ordinal + 2
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Look up a cell by column name. Absent columns and short rows yield `None`.
    pub fn get<'a>(&'a self, header: &Header, column: &str) -> Option<&'a str> {
        header
            .index_of(column)
            .and_then(|i| self.cells.get(i))
            .map(String::as_str)
    }
}

/// Split raw sheet values into the header and the ordinal-tagged data rows.
/// Returns `None` when there is not even a header row.
pub fn split_rows(rows: Vec<Vec<String>>) -> Option<(Header, Vec<Row>)> {
    let mut iter = rows.into_iter();
    let header = Header::new(iter.next()?);
    let data = iter
        .enumerate()
        .map(|(ordinal, cells)| Row::new(ordinal, cells))
        .collect();
    Some((header, data))
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// One field-level problem found in a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Display index of the row (see [`Row::display_index`]).
    pub row: usize,
    pub message: String,
}

impl ValidationError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

// ---------------------------------------------------------------------------
// DeliveryParams / ComposedMessage / Attachment
// ---------------------------------------------------------------------------

/// Parameters shared by every mail of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryParams {
    pub to: String,
    /// Four digit year, e.g. `"2025"`.
    pub year: String,
    /// Two digit month, `"01"` to `"12"`.
    pub month: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// A fully composed mail, independent of any transport encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

// ---------------------------------------------------------------------------
// RowOutcome / BatchReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    Sent { attachments: usize },
    ValidationFailed { errors: Vec<ValidationError> },
    SendFailed { reason: String },
}

/// Terminal classification of one processed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOutcome {
    /// Display index of the row.
    pub row: usize,
    #[serde(flatten)]
    pub status: RowStatus,
}

impl RowOutcome {
    pub fn sent(row: usize, attachments: usize) -> Self {
        Self {
            row,
            status: RowStatus::Sent { attachments },
        }
    }

    pub fn validation_failed(row: usize, errors: Vec<ValidationError>) -> Self {
        Self {
            row,
            status: RowStatus::ValidationFailed { errors },
        }
    }

    pub fn send_failed(row: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            status: RowStatus::SendFailed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, RowStatus::Sent { .. })
    }

    /// Human-readable reason for a non-successful row.
    pub fn reason(&self) -> Option<String> {
        match &self.status {
            RowStatus::Sent { .. } => None,
            RowStatus::ValidationFailed { errors } => Some(
                errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            RowStatus::SendFailed { reason } => Some(reason.clone()),
        }
    }
}

/// Result of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BatchReport {
    /// Every row reached a terminal outcome. Outcomes are sorted by row.
    Completed {
        batch_id: uuid::Uuid,
        started_at: chrono::DateTime<chrono::Utc>,
        duration_ms: u64,
        outcomes: Vec<RowOutcome>,
    },
    /// A pre-check rejected the batch; no row was processed.
    Failed {
        batch_id: uuid::Uuid,
        errors: Vec<String>,
    },
}

impl BatchReport {
    pub fn outcomes(&self) -> &[RowOutcome] {
        match self {
            BatchReport::Completed { outcomes, .. } => outcomes,
            BatchReport::Failed { .. } => &[],
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            BatchReport::Completed { .. } => &[],
            BatchReport::Failed { errors, .. } => errors,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, BatchReport::Completed { .. })
    }

    pub fn total(&self) -> usize {
        self.outcomes().len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes().iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }
}
