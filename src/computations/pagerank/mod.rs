//! Iterative PageRank on top of the shuffle runtime.
//!
//! Every iteration runs a `MassDistributionStage` on each map split, broadcasts the merged
//! statistics as sentinels, and runs a `RankAggregationStage` on each bucket. The flavour of the
//! ranking (one global correction term, or one per topic) is picked with a `RankVariant`.

pub mod aggregation;
pub mod checkpoint;
pub mod distribution;
pub mod driver;
pub mod global;
pub mod topic;

pub use driver::{IterationDriver, IterationReport, RankRun};
pub use global::GlobalRank;
pub use topic::TopicRank;
