//! # Media Pipeline
//!
//! Optimistic mutation pipeline over the media cache store.
//!
//! ## Data flow
//!
//! ```text
//! caller action
//!     │
//!     ├──> MutationPipeline
//!     │      ├─> optimistic CacheStore apply (immediate snapshot change)
//!     │      ├─> per-site upload lane (serialized creates)
//!     │      └─> MediaService (remote collaborator)
//!     │
//!     └──> reconciliation: persisted item supersedes the transient one,
//!          failures are flagged on the item and reported, never thrown.
//! ```
//!
//! Remote errors are recorded into the cache and handed to the
//! [`ErrorReporter`] collaborator; no operation here retries automatically.

mod lane;
mod mime;
mod overrides;
mod pipeline;
mod service;
mod transient;

pub use mime::mime_type_for_extension;
pub use overrides::{OverrideTable, PayloadHook, QueryHook, ServiceHooks};
pub use pipeline::{
    CreateBatch, CreateContext, MutationPipeline, MutationPipelineBuilder, PipelineConfig,
    UploadOutcome,
};
pub use service::{
    AcceptAllValidator, ChangeSink, ErrorReporter, LimitsRefresher, MediaService, MediaValidator,
    NoopChangeSink, NoopLimits, PageResponse, Payload, ReportKind, ServiceError, SilentReporter,
};
pub use transient::{batch_dates, MediaSource, TransientItemFactory, TRANSIENT_DATE_OFFSET_MS};
