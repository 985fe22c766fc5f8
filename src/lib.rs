//! Rankflow computes PageRank over a directed graph by repeatedly running a map, shuffle and reduce
//! cycle. Dangling nodes, including those only known through a link, have their rank handed back
//! to every node each iteration so that the total rank stays at the node count. Ranks can also be
//! computed per topic, in which case the mass of a topic never leaks into another one.

// Enable warnings for all clippy lints. This automatically enables new lints shipped with new rust
// versions.
#![warn(
    clippy::correctness,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::pedantic,
    clippy::cargo,
    clippy::restriction
)]
// Now selectively disable unneeded lints.
#![allow(
    clippy::indexing_slicing,               // Allow `vec[i]` indexing.
    clippy::module_name_repetitions,        // Allow.
    clippy::use_debug,                      // Allow.
    clippy::float_arithmetic,               // Allow.
    clippy::integer_arithmetic,             // Allow.
    clippy::implicit_return,                // Allow.
    clippy::use_self,                       // Allow.
    clippy::shadow_same,                    // Allow.
    clippy::shadow_unrelated,               // Allow.
    clippy::multiple_crate_versions,        // Disabled.
    clippy::missing_docs_in_private_items,  // Disabled.
    clippy::missing_errors_doc,             // Disabled.
    clippy::missing_inline_in_public_items, // Disabled.
    clippy::unknown_clippy_lints,           // To enable naming new lints added to nightly.
    clippy::result_expect_used,             // Should use `expect` rather than `unwrap`.
    clippy::option_expect_used,             // Should use `expect` rather than `unwrap`.
    clippy::must_use_candidate,             // Allow.
    clippy::as_conversions,                 // Allow but only when absolutely necessary.
    clippy::implicit_hasher                 // Default hasher is fine for now.
)]
// Do not allow print statements. Use `log::info!()` or equivalent instead.
#![deny(clippy::print_stdout)]

pub mod computations;
pub mod config;
pub mod error;
pub mod ingest;
pub mod output;
pub mod partition;
pub mod shuffle;
pub mod util;

use crate::computations::pagerank::{GlobalRank, IterationDriver, TopicRank};
use crate::config::RankConfig;
use crate::error::RankFlowError;
use crate::ingest::load_adjacency;
use crate::ingest::topics::TopicLookup;
use derive_new::new;
use log::info;
use rankflow_api::{NodeRecord, RankVariant};
use std::sync::atomic::AtomicBool;

/// Where a ranking run reads from and writes to.
#[derive(Debug, Clone, Default, PartialEq, new)]
pub struct RankJob {
    /// Graph records, one `id<TAB>adjacency` per line.
    pub input: String,
    /// Optional `id,topic` csv. Switches to topic-sensitive ranks.
    pub topics: Option<String>,
    pub output: Option<String>,
    /// Continue from the checkpoint instead of reading `input`.
    pub resume: bool,
}

/// Runs PageRank as described by `job` and `config`, writes the reported ranks and returns them.
pub fn run_pagerank(config: RankConfig, job: &RankJob) -> Result<Vec<NodeRecord>, RankFlowError> {
    run_pagerank_with_cancel(config, job, &AtomicBool::new(false))
}

/// Like `run_pagerank`, but stops at the next iteration boundary once `cancel` is set. The ranks
/// of the last completed iteration are still reported.
pub fn run_pagerank_with_cancel(
    config: RankConfig,
    job: &RankJob,
    cancel: &AtomicBool,
) -> Result<Vec<NodeRecord>, RankFlowError> {
    match &job.topics {
        Some(topics_path) => {
            let lookup = TopicLookup::load_from_csv(topics_path)?;
            run_variant(config, TopicRank::new(lookup), job, cancel)
        }
        None => run_variant(config, GlobalRank, job, cancel),
    }
}

fn run_variant<V: RankVariant>(
    config: RankConfig,
    variant: V,
    job: &RankJob,
    cancel: &AtomicBool,
) -> Result<Vec<NodeRecord>, RankFlowError> {
    let driver = IterationDriver::new(config, variant)?;
    let run = if job.resume {
        driver.resume(cancel)?
    } else {
        let adjacency = load_adjacency(&job.input)?;
        driver.run_with_cancel(driver.bootstrap(adjacency), cancel)?
    };
    if run.cancelled {
        info!("Reporting ranks after {} iterations", run.completed_iterations);
    }

    let ranked = output::top_ranked(run.records, driver.config());
    output::write_ranks(&ranked, job.output.as_deref())?;
    Ok(ranked)
}
