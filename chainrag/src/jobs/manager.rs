//! Background preparation of per-account indexes, one build per tag at a time.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Semaphore;

use crate::builder::DocumentStoreBuilder;
use crate::index::IndexCache;
use crate::models::{JobState, JobStatus};
use crate::tag::Tag;

/// Owns the per-tag preparation state machine.
///
/// `queued -> fetching -> embedding -> done`, with any stage able to end in
/// `error`. The registry is the single source of truth for polling; spawned
/// builds publish their transitions into it. At most one build per tag is in
/// flight at any time.
#[derive(Clone)]
pub struct JobManager {
    jobs: Arc<DashMap<String, JobStatus>>,
    builder: Arc<dyn DocumentStoreBuilder>,
    cache: Arc<IndexCache>,
    workers: Arc<Semaphore>,
}

impl JobManager {
    pub fn new(
        builder: Arc<dyn DocumentStoreBuilder>,
        cache: Arc<IndexCache>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            builder,
            cache,
            workers: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Start preparing `tag` unless a build is already queued or running.
    ///
    /// A finished job is returned unchanged unless `refresh` is set; a failed
    /// job is always restarted. Returns immediately; the build runs in the
    /// background.
    pub fn trigger(&self, tag: &Tag, account: &str, refresh: bool) -> JobStatus {
        let queued = JobStatus::queued();

        // The entry guard makes check-and-insert atomic for this tag only.
        match self.jobs.entry(tag.as_str().to_string()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get();
                let keep = current.state.is_in_flight()
                    || (current.state == JobState::Done && !refresh);
                if keep {
                    tracing::debug!(tag = %tag, state = %current.state, "Preparation already exists");
                    return current.clone();
                }
                entry.insert(queued.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(queued.clone());
            }
        }

        tracing::info!(tag = %tag, refresh, "Preparation queued");
        self.spawn_build(tag.clone(), account.to_string());
        queued
    }

    /// Current status, or `unknown` when nothing was ever triggered for `tag`.
    pub fn status(&self, tag: &Tag) -> JobStatus {
        self.jobs
            .get(tag.as_str())
            .map(|status| status.clone())
            .unwrap_or_else(JobStatus::unknown)
    }

    fn spawn_build(&self, tag: Tag, account: String) {
        let manager = self.clone();

        tokio::spawn(async move {
            let worker = manager.clone();
            let build_tag = tag.clone();
            let handle = tokio::spawn(async move { worker.run_build(build_tag, account).await });

            if let Err(e) = handle.await {
                tracing::error!(tag = %tag, error = %e, "Preparation task aborted");
                manager.publish(&tag, JobState::Error, format!("Preparation aborted: {e}"));
            }
        });
    }

    async fn run_build(&self, tag: Tag, account: String) {
        let _permit = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                self.publish(&tag, JobState::Error, format!("Worker pool closed: {e}"));
                return;
            }
        };

        self.publish(
            &tag,
            JobState::Fetching,
            format!("Fetching transactions for {account}"),
        );

        let fetched = match self.builder.fetch(&tag, &account).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(tag = %tag, error = %e, "Fetch stage failed");
                self.publish(&tag, JobState::Error, e.to_string());
                return;
            }
        };

        self.publish(
            &tag,
            JobState::Embedding,
            format!("Embedding {fetched} documents"),
        );

        let indexed = match self.builder.index(&tag).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(tag = %tag, error = %e, "Index stage failed");
                self.publish(&tag, JobState::Error, e.to_string());
                return;
            }
        };

        // Warm the cache before publishing done so a client that polls `done`
        // and immediately queries never hits a cold or stale entry.
        self.cache.invalidate(&tag);
        if let Err(e) = self.cache.get(&tag).await {
            tracing::warn!(tag = %tag, error = %e, "Warm load after build failed");
        }

        self.publish(
            &tag,
            JobState::Done,
            format!("Indexed {indexed} documents"),
        );
    }

    fn publish(&self, tag: &Tag, state: JobState, message: String) {
        tracing::info!(tag = %tag, state = %state, message = %message, "Preparation state changed");
        self.jobs
            .insert(tag.as_str().to_string(), JobStatus::new(state, message));
    }
}
