//! Batch processing across items
//!
//! Items share nothing, so a batch can be split across scoped worker threads
//! without locks. A provider failure aborts only the affected item; it is
//! reported alongside the rows that did succeed.

use crate::config::FlowConfig;
use crate::provider::{ChangelogProvider, MetadataProvider, ProviderError};
use crate::row::{MetricRow, RowAssembler};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// An item whose row could not be produced
#[derive(Error, Debug)]
#[error("{item_id}: {reason}")]
pub struct ItemFailure {
    pub item_id: String,
    pub reason: String,
}

impl ItemFailure {
    fn from_provider(item_id: &str, err: &ProviderError) -> Self {
        Self {
            item_id: item_id.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Rows for successful items plus every failed item with its reason
#[derive(Debug, Default)]
pub struct BatchReport {
    pub rows: Vec<MetricRow>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn total_items(&self) -> usize {
        self.rows.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetch one item's data and assemble its row
pub fn process_item<P>(
    provider: &P,
    assembler: &RowAssembler<'_>,
    item_id: &str,
) -> Result<MetricRow, ItemFailure>
where
    P: ChangelogProvider + MetadataProvider + ?Sized,
{
    let fetch = || -> Result<MetricRow, ProviderError> {
        let changelog = provider.fetch_changelog(item_id)?;
        let metadata = provider.fetch_metadata(item_id)?;
        Ok(assembler.assemble_raw(item_id, &changelog, &metadata))
    };

    fetch().map_err(|e| {
        tracing::warn!("Skipping {}: {}", item_id, e);
        ItemFailure::from_provider(item_id, &e)
    })
}

/// Process a batch of items, keeping input order in the report
///
/// Uses `config.jobs` worker threads; 1 runs everything on the caller's thread.
pub fn run_batch<P>(
    provider: &P,
    item_ids: &[String],
    config: &FlowConfig,
    now: DateTime<Utc>,
) -> BatchReport
where
    P: ChangelogProvider + MetadataProvider + Sync + ?Sized,
{
    let assembler = RowAssembler::new(config, now);
    let jobs = config.jobs.max(1).min(item_ids.len().max(1));

    let outcomes: Vec<Result<MetricRow, ItemFailure>> = if jobs == 1 {
        item_ids
            .iter()
            .map(|id| process_item(provider, &assembler, id))
            .collect()
    } else {
        run_parallel(provider, &assembler, item_ids, jobs)
    };

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(row) => report.rows.push(row),
            Err(failure) => report.failures.push(failure),
        }
    }

    tracing::info!(
        "Processed {} items: {} rows, {} failures",
        report.total_items(),
        report.rows.len(),
        report.failures.len()
    );

    report
}

fn run_parallel<P>(
    provider: &P,
    assembler: &RowAssembler<'_>,
    item_ids: &[String],
    jobs: usize,
) -> Vec<Result<MetricRow, ItemFailure>>
where
    P: ChangelogProvider + MetadataProvider + Sync + ?Sized,
{
    let chunk_size = item_ids.len().div_ceil(jobs);

    let scoped = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = item_ids
            .chunks(chunk_size)
            .map(|chunk| {
                let handle = scope.spawn(move |_| {
                    chunk
                        .iter()
                        .map(|id| process_item(provider, assembler, id))
                        .collect::<Vec<_>>()
                });
                (chunk, handle)
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|(chunk, handle)| {
                handle.join().unwrap_or_else(|_| {
                    tracing::warn!("Worker panicked while processing {} items", chunk.len());
                    chunk
                        .iter()
                        .map(|id| {
                            Err(ItemFailure {
                                item_id: id.clone(),
                                reason: "worker thread panicked".to_string(),
                            })
                        })
                        .collect()
                })
            })
            .collect::<Vec<_>>()
    });

    // Every handle was joined above, so the scope itself cannot fail
    scoped.unwrap_or_default()
}
