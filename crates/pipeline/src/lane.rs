use media_model::SiteId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

pub(crate) type LaneJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// One single-lane FIFO queue per site.
///
/// Each lane is a worker task fed by an unbounded channel; the worker awaits
/// every job to completion before taking the next, so remote submission
/// `i + 1` starts only after submission `i` settles. A hung job stalls only
/// its own site's lane.
#[derive(Default)]
pub(crate) struct SiteLanes {
    lanes: Mutex<HashMap<SiteId, mpsc::UnboundedSender<LaneJob>>>,
}

impl SiteLanes {
    /// Queue a job at the tail of the site's lane, starting the lane worker
    /// on first use. Must be called from within a tokio runtime.
    pub(crate) fn enqueue(&self, site_id: SiteId, job: LaneJob) {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = lanes
            .entry(site_id)
            .or_insert_with(|| spawn_lane(site_id));
        if let Err(mpsc::error::SendError(job)) = tx.send(job) {
            // The previous worker is gone (runtime wind-down); start fresh.
            let fresh = spawn_lane(site_id);
            let _ = fresh.send(job);
            lanes.insert(site_id, fresh);
        }
    }
}

fn spawn_lane(site_id: SiteId) -> mpsc::UnboundedSender<LaneJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<LaneJob>();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            job.await;
        }
        log::debug!("upload lane for site {site_id} drained");
    });
    tx
}
