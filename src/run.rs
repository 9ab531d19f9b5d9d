// src/run.rs
// Ingestion orchestrator: fetch → locate → reconcile → persist, one key at
// a time, in input order.
//
// Per-key state machine:
//   Pending → Skipped | Fetched → Parsed → Reconciled → Persisted | Failed
//
// Every per-key failure is contained here; only store errors propagate and
// abort the run, since persistence integrity can no longer be assumed.

use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{Config, HEADER_TOKEN};
use crate::error::StoreError;
use crate::net::Fetch;
use crate::progress::Progress;
use crate::store::{OnConflict, Store};
use crate::{locate, reconcile};

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub persisted: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum KeyFailure {
    /// Logged and counted; the loop moves on.
    Recoverable(String),
    /// Persistence is broken; abort the whole run.
    Store(StoreError),
}

pub struct Runner<'a, F: Fetch> {
    config: &'a Config,
    fetcher: F,
    store: &'a Store,
}

impl<'a, F: Fetch> Runner<'a, F> {
    pub fn new(config: &'a Config, fetcher: F, store: &'a Store) -> Self {
        Runner { config, fetcher, store }
    }

    /// Drive the full key list. Always completes it, barring a store error.
    pub fn run(
        &self,
        keys: &[String],
        mut progress: Option<&mut dyn Progress>,
    ) -> Result<RunSummary, StoreError> {
        // One snapshot per run; re-running over the same input is idempotent
        // and cheap, with no refetch of known entities.
        let known = self.store.exists_keys()?;
        info!(keys = keys.len(), known = known.len(), "starting ingestion run");

        if let Some(p) = progress.as_deref_mut() {
            p.begin(keys.len());
        }

        let mut summary = RunSummary::default();
        for key in keys {
            let ein = key.trim();

            if ein.is_empty() || ein.eq_ignore_ascii_case(HEADER_TOKEN) {
                summary.skipped += 1;
                continue;
            }
            if known.contains(ein) {
                debug!(ein, "already persisted, skipping");
                summary.skipped += 1;
                continue;
            }

            match self.process(ein) {
                Ok(()) => {
                    summary.persisted += 1;
                    if let Some(p) = progress.as_deref_mut() {
                        p.item_done(ein);
                    }
                }
                Err(KeyFailure::Recoverable(why)) => {
                    summary.failed += 1;
                    warn!(ein, %why, "key failed");
                    if let Some(p) = progress.as_deref_mut() {
                        p.item_failed(ein, &why);
                    }
                }
                Err(KeyFailure::Store(e)) => return Err(e),
            }
        }

        if let Some(p) = progress.as_deref_mut() {
            p.finish();
        }
        info!(
            persisted = summary.persisted,
            skipped = summary.skipped,
            failed = summary.failed,
            "run complete"
        );
        Ok(summary)
    }

    fn process(&self, ein: &str) -> Result<(), KeyFailure> {
        let page = self
            .fetcher
            .fetch(ein)
            .map_err(|e| KeyFailure::Recoverable(format!("fetch: {e}")))?;

        // Polite gap after every successful hit on the source service.
        self.pause();

        let found = locate::locate(&page);
        let record = reconcile::reconcile(ein, &found);
        if !record.is_valid() {
            return Err(KeyFailure::Recoverable(s!("required field missing: name")));
        }

        self.store
            .upsert(&record, OnConflict::Replace)
            .map_err(KeyFailure::Store)?;
        debug!(ein, name = record.name.as_deref().unwrap_or(""), "persisted");
        Ok(())
    }

    fn pause(&self) {
        let (min, max) = self.config.pause_range();
        if max == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(min..=max);
        thread::sleep(Duration::from_millis(ms));
    }
}
