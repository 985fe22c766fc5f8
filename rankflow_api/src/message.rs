use crate::{BucketId, NodeId, NodeRecord, Rank, TopicId};
use hashbrown::HashMap;
use serde_derive::{Deserialize, Serialize};

/// The run-wide statistics carried by sentinel messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentinelKind {
    NodeCount,
    UndistributedMass,
    TotalRank,
}

/// The key a message logically belongs to within its bucket.
///
/// Buckets only co-locate messages; inside a bucket, messages are grouped again by this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Sentinel(SentinelKind),
    Node(NodeId),
}

impl GroupKey {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, GroupKey::Sentinel(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SentinelValue {
    Scalar(f64),
    PerTopic(HashMap<TopicId, f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// A share of a source node's rank pushed along one of its outlinks.
    Fragment(Rank),
    /// The node itself, passed through so that its link structure survives the pass.
    NodeUpdate(NodeRecord),
    Sentinel(SentinelValue),
}

pub type Message = (GroupKey, Payload);
pub type Routed = (BucketId, Message);
/// All payloads of one original key, as delivered by the grouping primitive.
pub type Group = (GroupKey, Vec<Payload>);
