use async_trait::async_trait;
use media_model::{ItemId, MediaItem, MediaQuery, SiteId, ValidationError};
use serde_json::{Map, Value};
use thiserror::Error;

/// Opaque field mapping passed through to the remote collaborator.
pub type Payload = Map<String, Value>;

/// Failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The call failed or timed out in transport.
    #[error("transport error: {0}")]
    Transport(String),
    /// The remote side rejected the operation, e.g. the item was already
    /// deleted. Handled exactly like a transport failure.
    #[error("remote conflict: {0}")]
    Conflict(String),
}

/// Classification handed to the notification collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Transport,
    Conflict,
    Validation,
}

impl ServiceError {
    pub fn report_kind(&self) -> ReportKind {
        match self {
            ServiceError::Transport(_) => ReportKind::Transport,
            ServiceError::Conflict(_) => ReportKind::Conflict,
        }
    }
}

/// A fetched page: the matching items plus the remote total.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub items: Vec<MediaItem>,
    pub found: u64,
}

/// The remote collection service. All calls are asynchronous, single-shot,
/// and may fail; the pipeline never retries them on its own.
#[async_trait]
pub trait MediaService: Send + Sync {
    async fn fetch_item(&self, site_id: SiteId, id: &ItemId) -> Result<MediaItem, ServiceError>;

    async fn fetch_page(
        &self,
        site_id: SiteId,
        query: &MediaQuery,
    ) -> Result<PageResponse, ServiceError>;

    async fn create_item(&self, site_id: SiteId, payload: Payload)
        -> Result<MediaItem, ServiceError>;

    async fn update_item(
        &self,
        site_id: SiteId,
        id: &ItemId,
        payload: Payload,
    ) -> Result<MediaItem, ServiceError>;

    async fn delete_item(&self, site_id: SiteId, id: &ItemId) -> Result<(), ServiceError>;
}

/// Client-side validation, consulted synchronously before a transient item
/// is submitted.
pub trait MediaValidator: Send + Sync {
    fn errors(&self, site_id: SiteId, item: &MediaItem) -> Vec<ValidationError>;
}

/// Notification collaborator for remote failures and validation rejections.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, kind: ReportKind, context: &str);
}

/// State-propagation collaborator, fired after every effective cache
/// mutation so dependent views re-query.
pub trait ChangeSink: Send + Sync {
    fn collection_changed(&self, site_id: SiteId);
}

/// Dependent-refresh collaborator, fired after a successful create or
/// delete so quota/limit figures can be refetched out of band.
pub trait LimitsRefresher: Send + Sync {
    fn refresh_limits(&self, site_id: SiteId);
}

/// Validator that accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllValidator;

impl MediaValidator for AcceptAllValidator {
    fn errors(&self, _site_id: SiteId, _item: &MediaItem) -> Vec<ValidationError> {
        Vec::new()
    }
}

/// Reporter that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ErrorReporter for SilentReporter {
    fn report(&self, kind: ReportKind, context: &str) {
        log::warn!("unreported media error ({kind:?}): {context}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChangeSink;

impl ChangeSink for NoopChangeSink {
    fn collection_changed(&self, _site_id: SiteId) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLimits;

impl LimitsRefresher for NoopLimits {
    fn refresh_limits(&self, _site_id: SiteId) {}
}
