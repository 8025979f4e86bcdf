use crate::mime::mime_type_for_extension;
use media_model::{fields, ItemId, MediaItem, SiteId};
use std::sync::atomic::{AtomicU64, Ordering};

/// Offset applied to synthetic transient dates, roughly one year in
/// milliseconds. Placing placeholder dates far in the future keeps them
/// clear of real recent timestamps, so a finished upload does not suddenly
/// become the newest item merely because of placeholder ordering. Display
/// convenience only, never authoritative creation time.
pub const TRANSIENT_DATE_OFFSET_MS: u64 = 31_540_000_000;

/// Description of media to be created: a remote URL, or a named local
/// payload whose bytes travel out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Url(String),
    Upload {
        file_name: String,
        title: Option<String>,
        /// Known size in bytes, attached for client-side validation only;
        /// never sent as authoritative metadata.
        size: Option<u64>,
    },
}

impl MediaSource {
    pub fn upload(file_name: impl Into<String>) -> Self {
        MediaSource::Upload {
            file_name: file_name.into(),
            title: None,
            size: None,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            MediaSource::Url(url) => url,
            MediaSource::Upload { file_name, .. } => file_name,
        }
    }
}

/// Synthetic timestamps for a batch of `count` sources submitted together.
///
/// Strictly increasing by submission order and all greater than `now_ms`,
/// with the first-submitted source oldest, which is the order uploads are
/// expected to finish in.
pub fn batch_dates(now_ms: u64, count: usize) -> Vec<u64> {
    let base = now_ms + TRANSIENT_DATE_OFFSET_MS;
    (0..count as u64).map(|i| base - (count as u64 - i)).collect()
}

/// Synthesizes placeholder items for not-yet-persisted uploads and edits.
#[derive(Debug, Default)]
pub struct TransientItemFactory {
    counter: AtomicU64,
}

impl TransientItemFactory {
    /// Next locally unique transient id, `"media-1"`, `"media-2"`, …
    pub fn next_id(&self) -> ItemId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        ItemId::Text(format!("media-{n}"))
    }

    /// Build a transient item from a source description.
    ///
    /// Title falls back to the file basename without its extension; the
    /// extension, when recognized, also determines the mime type. Local
    /// payloads get a `transient://` reference URL that is only resolvable
    /// for the lifetime of the in-memory session.
    pub fn create(
        &self,
        site_id: SiteId,
        id: ItemId,
        source: &MediaSource,
        date_ms: Option<u64>,
    ) -> MediaItem {
        let mut item = MediaItem::new(id.clone(), site_id);
        item.transient = true;
        if let Some(date_ms) = date_ms {
            item.set_field(fields::DATE_MS, date_ms);
        }

        match source {
            MediaSource::Url(url) => {
                item.set_field(fields::URL, url.clone());
                item.set_field(fields::FILE, url.clone());
                item.set_field(fields::TITLE, title_stem(url));
                apply_extension(&mut item, url);
            }
            MediaSource::Upload {
                file_name,
                title,
                size,
            } => {
                let reference = format!("transient://{id}");
                item.set_field(fields::URL, reference.clone());
                item.set_field(fields::GUID, reference);
                item.set_field(fields::FILE, file_name.clone());
                let title = title.clone().unwrap_or_else(|| title_stem(file_name));
                item.set_field(fields::TITLE, title);
                apply_extension(&mut item, file_name);
                if let Some(size) = size {
                    item.set_field(fields::SIZE, *size);
                }
            }
        }

        item
    }
}

fn apply_extension(item: &mut MediaItem, name: &str) {
    if let Some(extension) = file_extension(name) {
        if let Some(mime) = mime_type_for_extension(&extension) {
            item.set_field(fields::MIME_TYPE, mime);
        }
        item.set_field(fields::EXTENSION, extension);
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn file_extension(name: &str) -> Option<String> {
    let base = basename(name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            Some(ext.to_ascii_lowercase())
        }
        _ => None,
    }
}

fn title_stem(name: &str) -> String {
    let base = basename(name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}
