//! Row validation, attachment resolution, mail composition, and bounded
//! batch dispatch.
//!
//! This crate implements the sheetmail pipeline: the static schema registry,
//! the pure row validator, Drive reference recognition, the attachment
//! resolver, the mail composer, a fixed-width worker pool, and the batch
//! dispatcher that ties them together.

pub mod attachments;
pub mod compose;
pub mod dispatcher;
pub mod events;
pub mod pool;
pub mod reference;
pub mod schema;
pub mod validation;

pub use attachments::{resolve, AttachmentFailure, Resolution};
pub use compose::{compose, MessageFields};
pub use dispatcher::{check_params, AttachmentPolicy, DispatchConfig, Dispatcher};
pub use events::{BatchEvent, BatchState, EventEmitter};
pub use pool::{WorkerPool, DEFAULT_WIDTH};
pub use reference::{extract_identifier, is_recognized_reference};
pub use schema::{check_consistency, check_header, Category, ColumnKind, HEADER_CONTRACT};
pub use validation::{preview, validate, validate_rows, Preview};
