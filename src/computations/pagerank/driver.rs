use crate::computations::pagerank::aggregation::{AggregationOutput, RankAggregationStage};
use crate::computations::pagerank::checkpoint::{load_checkpoint, save_checkpoint};
use crate::computations::pagerank::distribution::{merge_partials, MassDistributionStage};
use crate::config::RankConfig;
use crate::error::{config_error, RankFlowError};
use crate::ingest::AdjacencyRecord;
use crate::partition::PartitionRouter;
use crate::shuffle::ShuffleRuntime;
use crate::util::memory_usage::print_memory_usage;
use crate::util::timer::{RfDuration, RfTimer};
use log::info;
use rankflow_api::{Accumulator, MassAccumulator, NodeRecord, Rank, RankVariant};
use std::sync::atomic::{AtomicBool, Ordering};

/// What a single iteration did, as seen by the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    /// 1-based.
    pub iteration: usize,
    /// Run-wide statistics of the records the iteration started from.
    pub observed: MassAccumulator,
    pub discovered_nodes: usize,
    pub discovered_mass: Rank,
    pub max_delta: Rank,
    pub elapsed: RfDuration,
}

impl IterationReport {
    fn log(&self) {
        info!(
            "Iteration {}: nodes = {}, undistributed mass = {:.6}, total rank = {:.6}, \
             discovered = {} ({:.6}), max delta = {:.6e}, took {}",
            self.iteration,
            self.observed.node_count,
            self.observed.undistributed_mass,
            self.observed.total_rank,
            self.discovered_nodes,
            self.discovered_mass,
            self.max_delta,
            self.elapsed.to_millis_string()
        );
    }
}

/// The outcome of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RankRun {
    /// Sorted by node id.
    pub records: Vec<NodeRecord>,
    pub reports: Vec<IterationReport>,
    /// Counts iterations restored from a checkpoint as well.
    pub completed_iterations: usize,
    /// Whether the run stopped early because it was asked to.
    pub cancelled: bool,
}

/// Runs the distribute, shuffle and aggregate cycle a fixed number of times.
pub struct IterationDriver<V: RankVariant> {
    config: RankConfig,
    variant: V,
    router: PartitionRouter,
    runtime: ShuffleRuntime,
}

impl<V: RankVariant> IterationDriver<V> {
    pub fn new(config: RankConfig, variant: V) -> Result<Self, RankFlowError> {
        config.validate()?;
        let router = PartitionRouter::new(config.num_partitions)?;
        let runtime = ShuffleRuntime::new(config.threads)?;
        runtime.check_router(&router)?;
        info!(
            "Using {} ranks with {} partitions, damping factor {} and smart updating {}",
            variant.name(),
            router.num_buckets(),
            config.damping_factor,
            if config.smart_updating { "on" } else { "off" }
        );
        Ok(Self { config, variant, router, runtime })
    }

    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }

    /// Turns ingested records into node records of uniform rank `1 / estimated_node_count`.
    pub fn bootstrap(&self, adjacency: Vec<AdjacencyRecord>) -> Vec<NodeRecord> {
        let initial_rank = 1.0 / self.config.estimated_node_count;
        let mut records: Vec<NodeRecord> = adjacency
            .into_iter()
            .map(|record| {
                let topic = self.variant.topic_of(&record.id);
                NodeRecord::new(record.id, initial_rank, record.outlinks, topic)
            })
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn run(&self, records: Vec<NodeRecord>) -> Result<RankRun, RankFlowError> {
        self.run_with_cancel(records, &AtomicBool::new(false))
    }

    /// Like `run`, but stops before the next iteration once `cancel` is set. An iteration that has
    /// already started always runs to completion.
    pub fn run_with_cancel(
        &self,
        records: Vec<NodeRecord>,
        cancel: &AtomicBool,
    ) -> Result<RankRun, RankFlowError> {
        self.run_from(0, records, cancel)
    }

    /// Continues from the checkpoint in the configured checkpoint directory.
    pub fn resume(&self, cancel: &AtomicBool) -> Result<RankRun, RankFlowError> {
        let checkpoint_dir = self.config.checkpoint_dir.as_deref().ok_or_else(|| {
            config_error("Resuming needs a checkpoint directory".to_owned())
        })?;
        let checkpoint = load_checkpoint(checkpoint_dir)?;
        if checkpoint.variant != self.variant.name() {
            return Err(config_error(format!(
                "Checkpoint holds {} ranks but {} ranks were requested",
                checkpoint.variant,
                self.variant.name()
            )));
        }
        info!(
            "Resuming after iteration {} of {}",
            checkpoint.completed_iterations, self.config.iterations
        );
        self.run_from(checkpoint.completed_iterations, checkpoint.records, cancel)
    }

    fn run_from(
        &self,
        completed: usize,
        mut records: Vec<NodeRecord>,
        cancel: &AtomicBool,
    ) -> Result<RankRun, RankFlowError> {
        let timer = RfTimer::now();
        let mut run = RankRun {
            records: Vec::new(),
            reports: Vec::new(),
            completed_iterations: completed,
            cancelled: false,
        };
        for iteration in (completed + 1)..=self.config.iterations {
            if cancel.load(Ordering::SeqCst) {
                info!("Cancelled before iteration {}", iteration);
                run.cancelled = true;
                break;
            }
            self.runtime.check_router(&self.router)?;

            let (next, report) = self.iterate(iteration, records)?;
            report.log();
            print_memory_usage(format_args!("after iteration {}", iteration));
            if let Some(checkpoint_dir) = &self.config.checkpoint_dir {
                save_checkpoint(checkpoint_dir, self.variant.name(), iteration, &next)?;
            }
            records = next;
            run.reports.push(report);
            run.completed_iterations = iteration;
        }
        info!(
            "Finished {} iterations in {}",
            run.completed_iterations,
            timer.elapsed().to_seconds_string()
        );
        run.records = records;
        Ok(run)
    }

    /// Runs a single iteration over `records` and returns the updated records sorted by id.
    pub fn iterate(
        &self,
        iteration: usize,
        records: Vec<NodeRecord>,
    ) -> Result<(Vec<NodeRecord>, IterationReport), RankFlowError> {
        let timer = RfTimer::now();

        let distribution = MassDistributionStage::new(&self.variant, self.router);
        let (mut streams, partials) = self
            .runtime
            .map_phase(records, |split, sink| distribution.distribute(split, sink))?;
        let totals: V::Accumulator = merge_partials(partials);
        distribution.broadcast(&totals, &mut streams)?;

        let aggregation = RankAggregationStage::new(
            &self.variant,
            self.config.damping_factor,
            self.config.smart_updating,
        );
        let output = self
            .runtime
            .reduce_phase(streams, |bucket, groups| aggregation.aggregate(bucket, groups))?
            .into_iter()
            .fold(AggregationOutput::default(), AggregationOutput::merge);

        let mut next = output.records;
        next.sort_by(|a, b| a.id.cmp(&b.id));
        let report = IterationReport {
            iteration,
            observed: totals.summary(),
            discovered_nodes: output.discovered_nodes,
            discovered_mass: output.discovered_mass,
            max_delta: output.max_delta,
            elapsed: timer.elapsed(),
        };
        Ok((next, report))
    }
}
