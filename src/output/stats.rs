//! Statistics generation from the note store
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{RunRecord, Storage, StorageResult};

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of stored notes
    pub total_items: u64,

    /// Stored notes per owner, sorted by owner id
    pub items_by_owner: Vec<(String, u64)>,

    /// Number of recorded runs
    pub total_runs: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<HarvestStatistics> {
    let mut items_by_owner = Vec::new();
    for owner in storage.list_owners()? {
        let count = storage.count_items(Some(&owner))?;
        items_by_owner.push((owner, count));
    }

    Ok(HarvestStatistics {
        total_items: storage.count_items(None)?,
        items_by_owner,
        total_runs: storage.count_runs()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total notes stored: {}", stats.total_items);
    println!("  Owners: {}", stats.items_by_owner.len());
    println!("  Runs: {}", stats.total_runs);
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  ID: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Owners crawled: {}", run.owners);
        println!("  New notes: {}", run.new_items);
        println!();
    }

    if !stats.items_by_owner.is_empty() {
        println!("Notes by Owner:");
        let mut owners: Vec<_> = stats.items_by_owner.iter().collect();
        owners.sort_by(|a, b| b.1.cmp(&a.1));

        for (owner, count) in owners {
            let percentage = if stats.total_items > 0 {
                (*count as f64 / stats.total_items as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", owner, count, percentage);
        }
    }
}
