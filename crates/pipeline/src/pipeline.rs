use crate::lane::SiteLanes;
use crate::overrides::OverrideTable;
use crate::service::{
    AcceptAllValidator, ChangeSink, ErrorReporter, LimitsRefresher, MediaService, MediaValidator,
    NoopChangeSink, NoopLimits, PageResponse, Payload, ReportKind, ServiceError, SilentReporter,
};
use crate::transient::{batch_dates, MediaSource, TransientItemFactory};
use media_collection::{canonicalize, PageRequest};
use media_model::{fields, params, ItemId, MediaItem, MediaQuery, SiteId, ValidationError};
use media_store::{CacheOp, CacheStore, FetchKey};
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Page size used when a query does not request one.
    pub page_size: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

/// Context for a batch creation.
#[derive(Debug, Clone, Default)]
pub struct CreateContext {
    /// Post the new media should attach to, when created while editing one.
    pub parent_id: Option<ItemId>,
    /// External service identifier, consulted against the override table.
    pub service: Option<String>,
}

/// How one queued upload settled.
#[derive(Debug)]
pub enum UploadOutcome {
    /// The remote accepted the item; the cache now holds it under this id.
    Persisted(ItemId),
    /// The remote call failed; the transient item stays visible, flagged.
    Failed(ServiceError),
    /// Client-side validation blocked the submission.
    Invalid(Vec<ValidationError>),
}

/// Handle for a batch creation: the transient ids assigned up front, plus
/// per-item settlement.
#[derive(Debug)]
pub struct CreateBatch {
    item_ids: Vec<ItemId>,
    outcomes: Vec<oneshot::Receiver<UploadOutcome>>,
}

impl CreateBatch {
    /// Transient ids in submission order, already visible in the cache.
    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    /// Wait until every item in the batch has settled.
    pub async fn wait(self) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(self.outcomes.len());
        for rx in self.outcomes {
            let outcome = rx.await.unwrap_or_else(|_| {
                UploadOutcome::Failed(ServiceError::Transport("upload lane dropped".to_string()))
            });
            outcomes.push(outcome);
        }
        outcomes
    }
}

struct PipelineInner {
    store: CacheStore,
    service: Arc<dyn MediaService>,
    validator: Arc<dyn MediaValidator>,
    reporter: Arc<dyn ErrorReporter>,
    changes: Arc<dyn ChangeSink>,
    limits: Arc<dyn LimitsRefresher>,
    overrides: OverrideTable,
    factory: TransientItemFactory,
    lanes: SiteLanes,
    config: PipelineConfig,
}

impl PipelineInner {
    /// Apply a cache mutation and propagate the change when it was
    /// effective.
    fn apply(&self, site_id: SiteId, op: CacheOp) -> bool {
        let changed = self.store.apply(site_id, op);
        if changed {
            self.changes.collection_changed(site_id);
        }
        changed
    }

    fn mark_failed(&self, site_id: SiteId, id: &ItemId) {
        if let Some(mut item) = self.store.get(site_id, id) {
            item.failed = true;
            self.apply(site_id, CacheOp::Upsert(vec![item]));
        }
    }

    fn report_service_error(&self, err: &ServiceError, context: &str) {
        log::warn!("{context}: {err}");
        self.reporter.report(err.report_kind(), context);
    }
}

/// Orchestrates create/update/delete/fetch against the remote collaborator,
/// applying optimistic cache updates first and reconciling when the remote
/// call settles.
///
/// Remote creates for one site are strictly serialized in submission order;
/// everything else runs concurrently. No method returns a remote error:
/// failures land in the cache and go to the [`ErrorReporter`].
#[derive(Clone)]
pub struct MutationPipeline {
    inner: Arc<PipelineInner>,
}

impl MutationPipeline {
    pub fn builder(service: Arc<dyn MediaService>) -> MutationPipelineBuilder {
        MutationPipelineBuilder {
            service,
            store: CacheStore::new(),
            validator: Arc::new(AcceptAllValidator),
            reporter: Arc::new(SilentReporter),
            changes: Arc::new(NoopChangeSink),
            limits: Arc::new(NoopLimits),
            overrides: OverrideTable::default(),
            config: PipelineConfig::default(),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    /// Queue a batch of sources for creation.
    ///
    /// Transient placeholders are upserted synchronously, so the cache
    /// reflects the batch before this returns. Remote submissions then run
    /// one at a time on the site's lane, in submission order; an item that
    /// fails validation or upload never blocks its siblings.
    pub fn create(
        &self,
        site_id: SiteId,
        sources: Vec<MediaSource>,
        ctx: CreateContext,
    ) -> CreateBatch {
        let dates = batch_dates(now_ms(), sources.len());
        let mut item_ids = Vec::with_capacity(sources.len());
        let mut outcomes = Vec::with_capacity(sources.len());

        for (source, date_ms) in sources.into_iter().zip(dates) {
            let id = self.inner.factory.next_id();
            let item = self
                .inner
                .factory
                .create(site_id, id.clone(), &source, Some(date_ms));
            log::debug!("optimistic insert of {id} into site {site_id}");
            self.inner.apply(site_id, CacheOp::Upsert(vec![item.clone()]));
            item_ids.push(id.clone());

            let (done_tx, done_rx) = oneshot::channel();
            outcomes.push(done_rx);

            let errors = self.inner.validator.errors(site_id, &item);
            if !errors.is_empty() {
                self.inner.mark_failed(site_id, &id);
                for error in &errors {
                    self.inner
                        .reporter
                        .report(ReportKind::Validation, &error.to_string());
                }
                let _ = done_tx.send(UploadOutcome::Invalid(errors));
                continue;
            }

            let mut payload = build_create_payload(&source, &ctx);
            self.inner
                .overrides
                .apply_create(ctx.service.as_deref(), &mut payload);

            let inner = Arc::clone(&self.inner);
            self.inner.lanes.enqueue(
                site_id,
                Box::pin(async move {
                    match inner.service.create_item(site_id, payload).await {
                        Ok(mut saved) => {
                            saved.transient = false;
                            let saved_id = saved.id.clone();
                            log::debug!("media {id} persisted as {saved_id}");
                            inner.apply(
                                site_id,
                                CacheOp::Replace {
                                    old_id: id,
                                    item: saved,
                                },
                            );
                            inner.limits.refresh_limits(site_id);
                            let _ = done_tx.send(UploadOutcome::Persisted(saved_id));
                        }
                        Err(err) => {
                            inner.mark_failed(site_id, &id);
                            inner.report_service_error(
                                &err,
                                &format!("create media {id} for site {site_id}"),
                            );
                            let _ = done_tx.send(UploadOutcome::Failed(err));
                        }
                    }
                }),
            );
        }

        CreateBatch { item_ids, outcomes }
    }

    /// Merge partial fields onto a cached item and push the edit remotely.
    ///
    /// With `replace_file`, the optimistic item additionally carries a fresh
    /// transient representation of the new binary/url and stays flagged
    /// `dirty` after reconciliation, since server-derived artifacts (e.g. a
    /// thumbnail) may not reflect the edit until the next full refresh.
    pub async fn update(
        &self,
        site_id: SiteId,
        id: &ItemId,
        patch: Payload,
        replace_file: Option<MediaSource>,
    ) {
        let current = self
            .inner
            .store
            .get(site_id, id)
            .unwrap_or_else(|| MediaItem::new(id.clone(), site_id));

        let mut optimistic = current;
        optimistic.merge_fields(patch.clone());
        if let Some(source) = &replace_file {
            let placeholder = self.inner.factory.create(site_id, id.clone(), source, None);
            optimistic.merge_fields(placeholder.fields);
            optimistic.transient = true;
            optimistic.dirty = true;
        }
        self.inner.apply(site_id, CacheOp::Upsert(vec![optimistic]));

        let mut payload = patch;
        if let Some(source) = &replace_file {
            let (key, value) = match source {
                MediaSource::Url(url) => (fields::URL, url.clone()),
                MediaSource::Upload { file_name, .. } => (fields::FILE, file_name.clone()),
            };
            payload.insert(key.to_string(), Value::String(value));
        }

        match self.inner.service.update_item(site_id, id, payload).await {
            Ok(mut saved) => {
                saved.transient = false;
                saved.dirty = replace_file.is_some();
                self.inner.apply(
                    site_id,
                    CacheOp::Replace {
                        old_id: id.clone(),
                        item: saved,
                    },
                );
            }
            Err(err) => {
                self.inner.mark_failed(site_id, id);
                self.inner
                    .report_service_error(&err, &format!("update media {id} for site {site_id}"));
            }
        }
    }

    /// Merge fields into the cache without a remote call.
    pub fn edit_local(&self, site_id: SiteId, id: &ItemId, patch: Payload) {
        let mut item = self
            .inner
            .store
            .get(site_id, id)
            .unwrap_or_else(|| MediaItem::new(id.clone(), site_id));
        item.merge_fields(patch);
        self.inner.apply(site_id, CacheOp::Upsert(vec![item]));
    }

    /// Delete items, optimistically first.
    ///
    /// Every item disappears from the cache before any remote delete is
    /// awaited, so a slow delete never delays a sibling's removal. A failed
    /// remote delete is reported but the item is not restored; recovering
    /// remote truth is a follow-up fetch.
    pub async fn remove(&self, site_id: SiteId, ids: Vec<ItemId>) {
        for id in &ids {
            log::debug!("optimistic delete of {id} from site {site_id}");
            self.inner.apply(site_id, CacheOp::Remove(vec![id.clone()]));
        }
        for id in ids {
            match self.inner.service.delete_item(site_id, &id).await {
                Ok(()) => self.inner.limits.refresh_limits(site_id),
                Err(err) => {
                    self.inner
                        .report_service_error(&err, &format!("delete media {id} from site {site_id}"));
                }
            }
        }
    }

    /// Fetch a single item. A duplicate call while one is in flight for the
    /// same `(site, id)` does nothing.
    pub async fn fetch_one(&self, site_id: SiteId, id: &ItemId) {
        let key = FetchKey::item(site_id, id.clone());
        if !self.inner.store.begin_fetch(key.clone()) {
            log::debug!("fetch of media {id} for site {site_id} already in flight");
            return;
        }

        match self.inner.service.fetch_item(site_id, id).await {
            Ok(item) => {
                self.inner.apply(site_id, CacheOp::Upsert(vec![item]));
            }
            Err(err) => {
                self.inner.mark_failed(site_id, id);
                self.inner
                    .report_service_error(&err, &format!("fetch media {id} for site {site_id}"));
            }
        }

        self.inner.store.finish_fetch(&key);
    }

    /// Fetch the next page of a query's window. A duplicate call while an
    /// identical fetch is in flight does nothing; `requesting` clears even
    /// on failure.
    ///
    /// The guard and the result window are keyed by the caller's query; an
    /// override hook only rewrites the query sent to the remote service, so
    /// the caller reads the results back under the query it asked with.
    pub async fn fetch_page(&self, site_id: SiteId, query: &MediaQuery) {
        let key = canonicalize(query);
        let guard_key = FetchKey::page(site_id, key.clone());
        if !self.inner.store.begin_fetch(guard_key.clone()) {
            log::debug!("page fetch {key} for site {site_id} already in flight");
            return;
        }

        self.inner.apply(
            site_id,
            CacheOp::SetRequesting {
                query: query.clone(),
                requesting: true,
            },
        );

        let page = self
            .inner
            .store
            .site_index(site_id)
            .map(|index| index.next_page(query, self.inner.config.page_size))
            .unwrap_or_else(|| PageRequest::first(query.page_size(self.inner.config.page_size)));

        let mut remote_query = query.clone();
        self.inner
            .overrides
            .apply_page_query(query.source(), &mut remote_query);
        remote_query.set(params::PAGE, page.page);
        remote_query.set(params::NUMBER, page.size);
        log::debug!("fetching page {} of {key} for site {site_id}", page.page);

        match self.inner.service.fetch_page(site_id, &remote_query).await {
            Ok(PageResponse { items, found }) => {
                let mut ids: Vec<ItemId> = self
                    .inner
                    .store
                    .site_index(site_id)
                    .and_then(|index| index.window_by_key(&key).map(|w| w.ids.clone()))
                    .unwrap_or_default();
                for item in &items {
                    if !ids.contains(&item.id) {
                        ids.push(item.id.clone());
                    }
                }
                self.inner.apply(site_id, CacheOp::Upsert(items));
                self.inner.apply(
                    site_id,
                    CacheOp::SetWindow {
                        query: query.clone(),
                        ids,
                        found: Some(found),
                    },
                );
            }
            Err(err) => {
                self.inner.apply(
                    site_id,
                    CacheOp::SetRequesting {
                        query: query.clone(),
                        requesting: false,
                    },
                );
                self.inner
                    .report_service_error(&err, &format!("fetch media page for site {site_id}"));
            }
        }

        self.inner.store.finish_fetch(&guard_key);
    }
}

/// Builder for [`MutationPipeline`]; every collaborator except the remote
/// service has a no-op default.
pub struct MutationPipelineBuilder {
    service: Arc<dyn MediaService>,
    store: CacheStore,
    validator: Arc<dyn MediaValidator>,
    reporter: Arc<dyn ErrorReporter>,
    changes: Arc<dyn ChangeSink>,
    limits: Arc<dyn LimitsRefresher>,
    overrides: OverrideTable,
    config: PipelineConfig,
}

impl MutationPipelineBuilder {
    pub fn store(mut self, store: CacheStore) -> Self {
        self.store = store;
        self
    }

    pub fn validator(mut self, validator: Arc<dyn MediaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn changes(mut self, changes: Arc<dyn ChangeSink>) -> Self {
        self.changes = changes;
        self
    }

    pub fn limits(mut self, limits: Arc<dyn LimitsRefresher>) -> Self {
        self.limits = limits;
        self
    }

    pub fn overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> MutationPipeline {
        MutationPipeline {
            inner: Arc::new(PipelineInner {
                store: self.store,
                service: self.service,
                validator: self.validator,
                reporter: self.reporter,
                changes: self.changes,
                limits: self.limits,
                overrides: self.overrides,
                factory: TransientItemFactory::default(),
                lanes: SiteLanes::default(),
                config: self.config,
            }),
        }
    }
}

fn build_create_payload(source: &MediaSource, ctx: &CreateContext) -> Payload {
    let mut payload = Payload::new();
    match source {
        MediaSource::Url(url) => {
            payload.insert("url".to_string(), Value::String(url.clone()));
        }
        MediaSource::Upload {
            file_name,
            title,
            size: _,
        } => {
            payload.insert(fields::FILE.to_string(), Value::String(file_name.clone()));
            if let Some(title) = title {
                payload.insert(fields::TITLE.to_string(), Value::String(title.clone()));
            }
        }
    }
    if let Some(parent) = &ctx.parent_id {
        if let Ok(value) = serde_json::to_value(parent) {
            payload.insert(fields::PARENT_ID.to_string(), value);
        }
    }
    payload
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
