//! Batch dispatcher: pre-checks a sheet, then runs validate → resolve →
//! compose → send for every data row on a bounded worker pool.
//!
//! Per-row failures become [`RowOutcome`]s and never abort sibling rows.
//! Only the pre-checks (empty sheet, header mismatch, bad delivery
//! parameters) fail a batch as a whole.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sheetmail_google::{FileStoreGateway, MailGateway, SpreadsheetGateway};
use sheetmail_types::{
    split_rows, BatchReport, DeliveryParams, Header, Result, Row, RowOutcome, SheetMailError,
};
use tokio::sync::{Mutex, RwLock};

use crate::attachments::resolve;
use crate::compose::{compose, MessageFields};
use crate::events::{BatchEvent, BatchState, EventEmitter};
use crate::pool::{WorkerPool, DEFAULT_WIDTH};
use crate::schema::{self, COD, NOME};
use crate::validation::{category_of, validate};

const NO_ATTACHMENT: &str = "no valid attachment";

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("static regex"));
static MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])$").expect("static regex"));

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when only some of a row's required files could be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentPolicy {
    /// Any missing required attachment fails the row.
    #[default]
    RequireAll,
    /// Send whatever resolved, as long as there is at least one attachment.
    BestEffort,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub concurrency: usize,
    pub attachment_policy: AttachmentPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_WIDTH,
            attachment_policy: AttachmentPolicy::default(),
        }
    }
}

/// Reject malformed delivery parameters before any row is touched.
pub fn check_params(params: &DeliveryParams) -> Result<()> {
    params
        .to
        .trim()
        .parse::<lettre::Address>()
        .map_err(|e| SheetMailError::InvalidParams(format!("recipient '{}': {e}", params.to)))?;
    if !YEAR.is_match(&params.year) {
        return Err(SheetMailError::InvalidParams(format!(
            "year '{}' must have four digits",
            params.year
        )));
    }
    if !MONTH.is_match(&params.month) {
        return Err(SheetMailError::InvalidParams(format!(
            "month '{}' must be 01 to 12",
            params.month
        )));
    }
    Ok(())
}

/// Header and data rows of a sheet that passed every batch pre-check.
fn precheck(rows: Vec<Vec<String>>, params: &DeliveryParams) -> Result<(Header, Vec<Row>)> {
    let (header, data) = split_rows(rows).ok_or(SheetMailError::EmptyInput)?;
    schema::check_header(&header)?;
    if data.is_empty() {
        return Err(SheetMailError::EmptyInput);
    }
    check_params(params)?;
    Ok((header, data))
}

// ---------------------------------------------------------------------------
// Per-row pipeline
// ---------------------------------------------------------------------------

/// Everything a row pipeline needs, shared by all workers of one batch.
struct RowContext {
    header: Header,
    params: DeliveryParams,
    files: Arc<dyn FileStoreGateway>,
    mail: Arc<dyn MailGateway>,
    policy: AttachmentPolicy,
    events: EventEmitter,
}

impl RowContext {
    fn fail(&self, row: usize, reason: impl Into<String>) -> RowOutcome {
        let reason = reason.into();
        tracing::warn!(row, reason = %reason, "Row not sent");
        self.events.emit(BatchEvent::RowSendFailed {
            row,
            reason: reason.clone(),
        });
        RowOutcome::send_failed(row, reason)
    }
}

async fn process_row(ctx: &RowContext, row: &Row) -> RowOutcome {
    let n = row.display_index();
    ctx.events.emit(BatchEvent::RowStarted { row: n });

    let errors = validate(row, &ctx.header);
    ctx.events.emit(BatchEvent::RowValidated {
        row: n,
        errors: errors.len(),
    });
    if !errors.is_empty() {
        tracing::info!(row = n, errors = errors.len(), "Row failed validation");
        return RowOutcome::validation_failed(n, errors);
    }
    let Some(category) = category_of(row, &ctx.header) else {
        return ctx.fail(n, "invalid category");
    };

    let resolution = match resolve(ctx.files.as_ref(), row, &ctx.header, category.required_columns()).await {
        Ok(resolution) => resolution,
        Err(SheetMailError::Resolution { message, .. }) => return ctx.fail(n, message),
        Err(e) => return ctx.fail(n, e.to_string()),
    };
    for failure in &resolution.failures {
        ctx.events.emit(BatchEvent::AttachmentFailed {
            row: n,
            column: failure.column.clone(),
            error: failure.reason.clone(),
        });
    }
    if resolution.attachments.is_empty() {
        return ctx.fail(n, NO_ATTACHMENT);
    }
    if ctx.policy == AttachmentPolicy::RequireAll && !resolution.is_complete() {
        let missing = resolution
            .failures
            .iter()
            .map(|f| format!("{} ({})", f.column, f.reason))
            .collect::<Vec<_>>()
            .join("; ");
        return ctx.fail(n, format!("missing attachment: {missing}"));
    }

    let fields = MessageFields::new(
        row.get(&ctx.header, COD).unwrap_or_default(),
        row.get(&ctx.header, NOME).unwrap_or_default(),
        category.label(),
        &ctx.params,
    );
    let message = compose(&ctx.params.to, &fields, resolution.attachments);
    let attachments = message.attachments.len();

    match ctx.mail.send(&message).await {
        Ok(()) => {
            tracing::info!(row = n, attachments, "Row sent");
            ctx.events.emit(BatchEvent::RowSent { row: n, attachments });
            RowOutcome::sent(n, attachments)
        }
        Err(e) => ctx.fail(n, e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Runs batches against one file store and one mail gateway.
///
/// A dispatcher tracks a single [`BatchState`], so it runs one batch at a
/// time; build one dispatcher per concurrent batch.
pub struct Dispatcher {
    files: Arc<dyn FileStoreGateway>,
    mail: Arc<dyn MailGateway>,
    config: DispatchConfig,
    events: EventEmitter,
    state: RwLock<BatchState>,
}

impl Dispatcher {
    /// Fails when the schema registry is internally inconsistent.
    pub fn new(
        files: Arc<dyn FileStoreGateway>,
        mail: Arc<dyn MailGateway>,
        config: DispatchConfig,
    ) -> Result<Self> {
        schema::check_consistency()?;
        Ok(Self {
            files,
            mail,
            config,
            events: EventEmitter::default(),
            state: RwLock::new(BatchState::Idle),
        })
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// State of the most recent batch (`Idle` before the first one).
    pub async fn state(&self) -> BatchState {
        *self.state.read().await
    }

    fn row_context(&self, header: Header, params: &DeliveryParams) -> RowContext {
        RowContext {
            header,
            params: params.clone(),
            files: Arc::clone(&self.files),
            mail: Arc::clone(&self.mail),
            policy: self.config.attachment_policy,
            events: self.events.clone(),
        }
    }

    async fn fail_batch(&self, batch_id: uuid::Uuid, error: SheetMailError) -> BatchReport {
        tracing::error!(batch = %batch_id, error = %error, "Batch rejected");
        *self.state.write().await = BatchState::Failed;
        self.events.emit(BatchEvent::BatchFailed {
            batch_id,
            error: error.to_string(),
        });
        BatchReport::Failed {
            batch_id,
            errors: vec![error.to_string()],
        }
    }

    /// Fetch a sheet through `sheets` and run it as one batch.
    pub async fn run_sheet(
        &self,
        sheets: &dyn SpreadsheetGateway,
        sheet_id: &str,
        range: &str,
        params: &DeliveryParams,
    ) -> Result<BatchReport> {
        let rows = sheets.get_rows(sheet_id, range).await?;
        Ok(self.run(rows, params).await)
    }

    /// Run one batch over raw sheet values; the first row is the header.
    pub async fn run(&self, rows: Vec<Vec<String>>, params: &DeliveryParams) -> BatchReport {
        let batch_id = uuid::Uuid::new_v4();
        let started_at = chrono::Utc::now();
        let clock = Instant::now();

        let (header, data) = match precheck(rows, params) {
            Ok(checked) => checked,
            Err(e) => return self.fail_batch(batch_id, e).await,
        };

        *self.state.write().await = BatchState::Running;
        let mut pool = WorkerPool::new(self.config.concurrency);
        tracing::info!(batch = %batch_id, rows = data.len(), concurrency = pool.width(), "Batch started");
        self.events.emit(BatchEvent::BatchStarted {
            batch_id,
            rows: data.len(),
            concurrency: pool.width(),
        });

        let ctx = Arc::new(self.row_context(header, params));
        let collector: Arc<Mutex<Vec<RowOutcome>>> =
            Arc::new(Mutex::new(Vec::with_capacity(data.len())));
        let all_rows: Vec<usize> = data.iter().map(Row::display_index).collect();

        for row in data {
            let ctx = Arc::clone(&ctx);
            let collector = Arc::clone(&collector);
            pool.spawn(async move {
                let outcome = process_row(&ctx, &row).await;
                collector.lock().await.push(outcome);
            });
        }
        for failed in pool.drain().await.into_iter().filter_map(|r| r.err()) {
            tracing::error!(batch = %batch_id, error = %failed, "Row worker aborted");
        }

        let mut outcomes = std::mem::take(&mut *collector.lock().await);
        let finished: HashSet<usize> = outcomes.iter().map(|o| o.row).collect();
        for row in all_rows.into_iter().filter(|r| !finished.contains(r)) {
            outcomes.push(ctx.fail(row, "worker task failed"));
        }
        outcomes.sort_by_key(|o| o.row);

        let report = BatchReport::Completed {
            batch_id,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            outcomes,
        };
        tracing::info!(
            batch = %batch_id,
            succeeded = report.succeeded(),
            total = report.total(),
            "Batch completed"
        );
        *self.state.write().await = BatchState::Completed;
        self.events.emit(BatchEvent::BatchCompleted {
            batch_id,
            succeeded: report.succeeded(),
            failed: report.failed(),
            duration_ms: clock.elapsed().as_millis() as u64,
        });
        report
    }

    /// Run the row pipeline for the single data row at 0-based `index`.
    pub async fn send_row(
        &self,
        rows: Vec<Vec<String>>,
        index: usize,
        params: &DeliveryParams,
    ) -> Result<RowOutcome> {
        let (header, mut data) = precheck(rows, params)?;
        if index >= data.len() {
            return Err(SheetMailError::RowOutOfRange {
                index,
                rows: data.len(),
            });
        }
        let row = data.swap_remove(index);
        let ctx = self.row_context(header, params);
        Ok(process_row(&ctx, &row).await)
    }
}
