//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! run statistics from the storage layer.

use crate::state::RequestState;
use crate::storage::{Dataset, RunRecord, Storage};
use crate::Result;
use std::collections::HashMap;

/// Run statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// The run these statistics describe
    pub run: RunRecord,

    /// Total number of requests recorded
    pub total_requests: u64,

    /// Count of requests by final state
    pub requests_by_state: HashMap<RequestState, u64>,

    /// Item count per dataset
    pub items_by_dataset: HashMap<Dataset, u64>,

    /// URL and error of every failed request
    pub failures: Vec<(String, String)>,
}

/// Loads statistics for one run
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `run_id` - The run to summarize
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage, run_id: i64) -> Result<CrawlStatistics> {
    let run = storage.get_run(run_id)?;
    let requests_by_state = storage.count_requests_by_state(run_id)?;
    let total_requests = requests_by_state.values().sum();

    let mut items_by_dataset = HashMap::new();
    for dataset in Dataset::all() {
        items_by_dataset.insert(dataset, storage.count_items(run_id, dataset)?);
    }

    let failures = storage
        .get_requests_by_state(run_id, RequestState::Failed)?
        .into_iter()
        .map(|r| (r.url, r.error_message.unwrap_or_default()))
        .collect();

    Ok(CrawlStatistics {
        run,
        total_requests,
        requests_by_state,
        items_by_dataset,
        failures,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Run {}:", stats.run.id);
    println!("  Status: {}", stats.run.status.to_db_string());
    println!("  Started: {}", stats.run.started_at);
    if let Some(finished) = &stats.run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Config hash: {}", stats.run.config_hash);
    println!();

    println!("Requests by State:");
    for state in RequestState::all_states() {
        let count = stats.requests_by_state.get(&state).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        let percentage = (count as f64 / stats.total_requests as f64) * 100.0;
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    println!("Datasets:");
    for dataset in Dataset::all() {
        let count = stats.items_by_dataset.get(&dataset).copied().unwrap_or(0);
        println!("  {}: {}", dataset, count);
    }
    println!();

    if !stats.failures.is_empty() {
        println!("Failed Requests ({}):", stats.failures.len());
        for (url, error) in &stats.failures {
            println!("  - {} ({})", url, error);
        }
        println!();
    }

    let handled = stats
        .requests_by_state
        .get(&RequestState::Handled)
        .copied()
        .unwrap_or(0);
    let success_rate = if stats.total_requests > 0 {
        (handled as f64 / stats.total_requests as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} requests handled)",
        success_rate, handled, stats.total_requests
    );
}
