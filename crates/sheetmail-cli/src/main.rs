//! CLI binary for previewing and dispatching spreadsheet mail batches.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use sheetmail_google::{
    CredentialProvider, DriveClient, FileStoreGateway, GmailClient, SheetsClient,
    SpreadsheetGateway, StaticToken,
};
use sheetmail_pipeline::{AttachmentPolicy, BatchEvent, BatchState, DispatchConfig, Dispatcher};
use sheetmail_types::{BatchReport, DeliveryParams, RowOutcome};
use tokio::sync::broadcast::{self, error::RecvError};

#[derive(Parser)]
#[command(name = "sheetmail", version, about = "Validate sheet rows and mail their Drive attachments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// OAuth access token for the Google APIs
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct SheetArgs {
    /// Spreadsheet id
    #[arg(long)]
    sheet_id: String,

    /// A1 range or tab name to read (first row is the header)
    #[arg(long)]
    range: String,
}

#[derive(Args)]
struct DeliveryArgs {
    /// Recipient address for every mail of the batch
    #[arg(long)]
    to: String,

    /// Four digit year used in the subject and body
    #[arg(long)]
    year: String,

    /// Two digit month (01-12)
    #[arg(long)]
    month: String,

    /// Sender mailbox for the Gmail API
    #[arg(long, env = "SHEETMAIL_FROM")]
    from: String,

    /// Number of rows processed at once
    #[arg(long, env = "SHEETMAIL_CONCURRENCY", default_value = "2")]
    concurrency: usize,

    /// Send whatever attachments resolved instead of failing the row
    #[arg(long)]
    best_effort: bool,
}

impl DeliveryArgs {
    fn params(&self) -> DeliveryParams {
        DeliveryParams {
            to: self.to.clone(),
            year: self.year.clone(),
            month: self.month.clone(),
        }
    }

    fn config(&self) -> DispatchConfig {
        DispatchConfig {
            concurrency: self.concurrency,
            attachment_policy: if self.best_effort {
                AttachmentPolicy::BestEffort
            } else {
                AttachmentPolicy::RequireAll
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every row of a sheet without sending anything
    Preview {
        #[command(flatten)]
        sheet: SheetArgs,
    },

    /// Validate and mail every row of a sheet
    Send {
        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        delivery: DeliveryArgs,
    },

    /// Validate and mail a single data row (0-based, header excluded)
    SendRow {
        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        delivery: DeliveryArgs,

        /// Data row index
        #[arg(long)]
        index: usize,
    },

    /// List the tabs of a spreadsheet
    Sheets {
        /// Spreadsheet id
        #[arg(long)]
        sheet_id: String,
    },

    /// List spreadsheets visible to the token
    Spreadsheets,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let credentials: Arc<dyn CredentialProvider> = match cli.token.as_deref() {
        Some(token) => Arc::new(StaticToken::new(token)),
        None => Arc::new(StaticToken::from_env()?),
    };

    match cli.command {
        Commands::Preview { sheet } => {
            cmd_preview(credentials, &sheet, cli.json).await?;
        }
        Commands::Send { sheet, delivery } => {
            cmd_send(credentials, &sheet, &delivery, cli.json).await?;
        }
        Commands::SendRow {
            sheet,
            delivery,
            index,
        } => {
            cmd_send_row(credentials, &sheet, &delivery, index, cli.json).await?;
        }
        Commands::Sheets { sheet_id } => {
            cmd_sheets(credentials, &sheet_id, cli.json).await?;
        }
        Commands::Spreadsheets => {
            cmd_spreadsheets(credentials, cli.json).await?;
        }
    }

    Ok(())
}

fn dispatcher(
    credentials: Arc<dyn CredentialProvider>,
    delivery: &DeliveryArgs,
) -> anyhow::Result<Dispatcher> {
    let files = Arc::new(DriveClient::new(Arc::clone(&credentials)));
    let mail = Arc::new(GmailClient::new(credentials, delivery.from.clone()));
    Ok(Dispatcher::new(files, mail, delivery.config())?)
}

fn print_outcome(outcome: &RowOutcome) {
    match outcome.reason() {
        None => println!("  row {}: sent", outcome.row),
        Some(reason) => println!("  row {}: FAILED {}", outcome.row, reason),
    }
}

async fn cmd_preview(
    credentials: Arc<dyn CredentialProvider>,
    sheet: &SheetArgs,
    json: bool,
) -> anyhow::Result<()> {
    let rows = SheetsClient::new(credentials)
        .get_rows(&sheet.sheet_id, &sheet.range)
        .await?;
    let preview = sheetmail_pipeline::preview(rows)?;
    tracing::debug!(sheet = %sheet.sheet_id, rows = preview.rows.len(), errors = preview.errors.len(), "Preview finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        println!("Rows: {}", preview.rows.len());
        if preview.errors.is_empty() {
            println!("All rows are valid");
        }
        for error in &preview.errors {
            println!("[ERROR] {}", error);
        }
    }

    if !preview.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_send(
    credentials: Arc<dyn CredentialProvider>,
    sheet: &SheetArgs,
    delivery: &DeliveryArgs,
    json: bool,
) -> anyhow::Result<()> {
    let sheets = SheetsClient::new(Arc::clone(&credentials));
    let dispatcher = dispatcher(credentials, delivery)?;

    // Live progress on stderr while the batch runs.
    let progress = tokio::spawn(report_progress(dispatcher.events().subscribe()));

    let report = dispatcher
        .run_sheet(&sheets, &sheet.sheet_id, &sheet.range, &delivery.params())
        .await?;
    let _ = progress.await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_completed() || report.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn report_progress(mut events: broadcast::Receiver<BatchEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Progress output fell behind, some rows not shown");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match &event {
            BatchEvent::RowSent { row, attachments } => {
                eprintln!("row {row}: sent with {attachments} attachment(s)");
            }
            BatchEvent::RowSendFailed { row, reason } => {
                eprintln!("row {row}: not sent ({reason})");
            }
            _ => {}
        }
        if event.state() != BatchState::Running {
            break;
        }
    }
}

fn print_report(report: &BatchReport) {
    match report {
        BatchReport::Failed { errors, .. } => {
            println!("Batch rejected");
            for error in errors {
                println!("[ERROR] {}", error);
            }
        }
        BatchReport::Completed {
            batch_id,
            duration_ms,
            outcomes,
            ..
        } => {
            println!("Batch {}", batch_id);
            for outcome in outcomes {
                print_outcome(outcome);
            }
            println!(
                "\n{} of {} succeeded ({} ms)",
                report.succeeded(),
                report.total(),
                duration_ms
            );
        }
    }
}

async fn cmd_send_row(
    credentials: Arc<dyn CredentialProvider>,
    sheet: &SheetArgs,
    delivery: &DeliveryArgs,
    index: usize,
    json: bool,
) -> anyhow::Result<()> {
    let rows = SheetsClient::new(Arc::clone(&credentials))
        .get_rows(&sheet.sheet_id, &sheet.range)
        .await?;
    tracing::info!(sheet = %sheet.sheet_id, index, "Sending single row");
    let outcome = dispatcher(credentials, delivery)?
        .send_row(rows, index, &delivery.params())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_sheets(
    credentials: Arc<dyn CredentialProvider>,
    sheet_id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let tabs = SheetsClient::new(credentials).list_sheets(sheet_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tabs)?);
        return Ok(());
    }
    for tab in tabs {
        println!("{}\t{}", tab.sheet_id, tab.title);
    }
    Ok(())
}

async fn cmd_spreadsheets(credentials: Arc<dyn CredentialProvider>, json: bool) -> anyhow::Result<()> {
    let files = DriveClient::new(credentials).list_spreadsheets().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }
    for file in files {
        println!("{}\t{}", file.id, file.name);
    }
    Ok(())
}
