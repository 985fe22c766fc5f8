mod accumulator;
mod message;

// Public exports from root of the crate.
pub use accumulator::*;
pub use message::*;

use derive_new::new;
use serde_derive::{Deserialize, Serialize};
use std::fmt::Debug;

// Universally used types.
pub type NodeId = String;
pub type TopicId = String;
pub type BucketId = usize;
pub type Rank = f64;

/// Ranks are normalised so that the mean rank over all observed nodes is 1, i.e., the total rank
/// mass equals the observed node count. The teleport share of every node is this mean.
pub const MEAN_RANK: Rank = 1.0;

/// Topic key used for nodes that the topic lookup does not know about.
pub const UNASSIGNED_TOPIC: &str = "<unassigned>";

/// A node of the graph together with its current rank.
///
/// Records are created at ingestion, rewritten by every aggregation pass and never deleted during a
/// run. An empty `outlinks` list marks a dangling node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct NodeRecord {
    pub id: NodeId,
    pub rank: Rank,
    pub outlinks: Vec<NodeId>,
    pub topic: Option<TopicId>,
}

impl NodeRecord {
    pub fn is_dangling(&self) -> bool {
        self.outlinks.is_empty()
    }

    /// The key under which this record's mass is accounted for in per-topic accumulators.
    pub fn topic_key(&self) -> &str {
        self.topic.as_deref().unwrap_or(UNASSIGNED_TOPIC)
    }
}

/// The primary trait of the ranking API, used to define how a PageRank flavour accounts for mass.
///
/// The distribute/shuffle/aggregate cycle is the same for every flavour. What changes is the shape
/// of the run-wide statistics (a single scalar accumulator, or one accumulator per topic) and how
/// those statistics turn into a correction term and a teleport share for a given node.
///
/// # Examples
/// ```notest
/// impl RankVariant for GlobalRank {
///     type Accumulator = MassAccumulator;
///     type Correction = GlobalCorrection;
///     ...
/// }
/// ```
pub trait RankVariant: Send + Sync {
    /// Run-wide statistics gathered by the distribution stage and broadcast as sentinels.
    type Accumulator: Accumulator;
    /// The per-pass state derived from the folded sentinels.
    type Correction: Debug;

    fn name(&self) -> &'static str;

    /// Accounts for one record seen by the distribution stage.
    fn observe(&self, acc: Self::Accumulator, record: &NodeRecord) -> Self::Accumulator;

    /// Splits an accumulator into the sentinel messages that are broadcast to every bucket.
    fn to_sentinels(&self, acc: &Self::Accumulator) -> Vec<(SentinelKind, SentinelValue)>;

    /// Folds one broadcast sentinel value into the aggregation-side totals.
    fn absorb_sentinel(
        &self,
        acc: Self::Accumulator,
        kind: SentinelKind,
        value: &SentinelValue,
    ) -> Self::Accumulator;

    /// Derives the correction state once all sentinels of a pass have been folded.
    fn correction(&self, totals: &Self::Accumulator) -> Self::Correction;

    /// Returns `(correction_term, teleport_share)` for `record`.
    fn shares(&self, correction: &Self::Correction, record: &NodeRecord) -> (Rank, Rank);

    /// The topic a node is assigned to at ingestion. Flavours without topics return `None`.
    fn topic_of(&self, _id: &str) -> Option<TopicId> {
        None
    }

    /// Synthesizes the record of a node that received mass but has no record of its own.
    fn discover(&self, id: NodeId, mass: Rank) -> NodeRecord {
        let topic = self.topic_of(&id);
        NodeRecord::new(id, mass, Vec::new(), topic)
    }
}
