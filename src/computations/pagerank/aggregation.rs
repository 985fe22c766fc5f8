use derive_new::new;
use log::{debug, warn};
use rankflow_api::{BucketId, Group, GroupKey, NodeId, NodeRecord, Payload, Rank, RankVariant};

/// Relative change below which smart updating blends the old rank into the new one.
pub const SMART_UPDATE_THRESHOLD: f64 = 0.3;
/// Weight of the new rank when blending.
pub const SMART_UPDATE_WEIGHT: f64 = 0.8;

/// Everything one aggregation worker produced for its bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationOutput {
    pub records: Vec<NodeRecord>,
    /// Nodes that received mass but had no record of their own.
    pub discovered_nodes: usize,
    pub discovered_mass: Rank,
    /// Largest absolute rank change among the updated records.
    pub max_delta: Rank,
}

impl AggregationOutput {
    pub fn merge(mut self, other: Self) -> Self {
        self.records.extend(other.records);
        self.discovered_nodes += other.discovered_nodes;
        self.discovered_mass += other.discovered_mass;
        self.max_delta = self.max_delta.max(other.max_delta);
        self
    }
}

/// The reduce side of one iteration.
#[derive(new)]
pub struct RankAggregationStage<'a, V: RankVariant> {
    variant: &'a V,
    damping_factor: f64,
    smart_updating: bool,
}

impl<'a, V: RankVariant> RankAggregationStage<'a, V> {
    /// Recomputes the ranks of every node owned by `bucket`.
    ///
    /// The groups arrive in no particular order, so every sentinel group is folded into the
    /// correction state before any node group is looked at.
    pub fn aggregate(&self, bucket: BucketId, groups: Vec<Group>) -> AggregationOutput {
        let (sentinels, nodes): (Vec<Group>, Vec<Group>) =
            groups.into_iter().partition(|(key, _)| key.is_sentinel());

        let mut totals = V::Accumulator::default();
        for (key, payloads) in sentinels {
            if let GroupKey::Sentinel(kind) = key {
                for payload in &payloads {
                    match payload {
                        Payload::Sentinel(value) => {
                            totals = self.variant.absorb_sentinel(totals, kind, value);
                        }
                        other => warn!("Ignoring {:?} sent to sentinel {:?}", other, kind),
                    }
                }
            }
        }
        let correction = self.variant.correction(&totals);
        debug!("Bucket {} correction: {:?}", bucket, correction);

        let mut output = AggregationOutput::default();
        for (key, payloads) in nodes {
            if let GroupKey::Node(id) = key {
                self.update_node(id, payloads, &correction, &mut output);
            }
        }
        debug!(
            "Bucket {} updated {} records and discovered {} nodes",
            bucket,
            output.records.len() - output.discovered_nodes,
            output.discovered_nodes
        );
        output
    }

    fn update_node(
        &self,
        id: NodeId,
        payloads: Vec<Payload>,
        correction: &V::Correction,
        output: &mut AggregationOutput,
    ) {
        let mut total = 0.0;
        let mut fragments = 0;
        let mut record = None;
        for payload in payloads {
            match payload {
                Payload::Fragment(mass) => {
                    total += mass;
                    fragments += 1;
                }
                Payload::NodeUpdate(update) => {
                    if record.is_some() {
                        warn!("Node '{}' was passed through more than once", id);
                    }
                    record = Some(update);
                }
                Payload::Sentinel(_) => warn!("Ignoring sentinel value sent to node '{}'", id),
            }
        }

        match record {
            Some(mut record) => {
                let (term, share) = self.variant.shares(correction, &record);
                let old_rank = record.rank;
                let mut new_rank = self.damping_factor * (total + term)
                    + (1.0 - self.damping_factor) * share;
                // The correction term may be negative while the node estimate catches up.
                new_rank = new_rank.max(0.0);
                if self.smart_updating {
                    new_rank = smart_update(new_rank, old_rank);
                }
                output.max_delta = output.max_delta.max((new_rank - old_rank).abs());
                record.rank = new_rank;
                output.records.push(record);
            }
            None if fragments > 0 => {
                output.discovered_nodes += 1;
                output.discovered_mass += total;
                output.records.push(self.variant.discover(id, total));
            }
            None => {}
        }
    }
}

/// Blends `old_rank` into `new_rank` when the relative change is small. A zero `old_rank` always
/// takes the new value.
pub fn smart_update(new_rank: Rank, old_rank: Rank) -> Rank {
    if old_rank > 0.0 && ((new_rank - old_rank) / old_rank).abs() < SMART_UPDATE_THRESHOLD {
        SMART_UPDATE_WEIGHT * new_rank + (1.0 - SMART_UPDATE_WEIGHT) * old_rank
    } else {
        new_rank
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computations::pagerank::global::GlobalRank;
    use crate::shuffle::group_by_key;
    use rankflow_api::{Message, SentinelKind, SentinelValue};

    const EPSILON: f64 = 1e-9;

    fn record(id: &str, rank: f64, outlinks: &[&str]) -> NodeRecord {
        NodeRecord::new(
            id.to_owned(),
            rank,
            outlinks.iter().map(|s| (*s).to_owned()).collect(),
            None,
        )
    }

    fn sentinel(kind: SentinelKind, value: f64) -> Message {
        (GroupKey::Sentinel(kind), Payload::Sentinel(SentinelValue::Scalar(value)))
    }

    fn node(id: &str, payload: Payload) -> Message {
        (GroupKey::Node(id.to_owned()), payload)
    }

    fn find<'r>(records: &'r [NodeRecord], id: &str) -> &'r NodeRecord {
        records.iter().find(|record| record.id == id).expect("record exists")
    }

    #[test]
    fn smart_update_blends_small_changes_only() {
        assert!((smart_update(1.1, 1.0) - (0.8 * 1.1 + 0.2 * 1.0)).abs() < EPSILON);
        assert!((smart_update(2.0, 1.0) - 2.0).abs() < EPSILON);
        assert!((smart_update(0.5, 1.0) - 0.5).abs() < EPSILON);
        assert!((smart_update(0.7, 0.0) - 0.7).abs() < EPSILON);
    }

    #[test]
    fn sentinels_are_applied_regardless_of_arrival_order() {
        // Node messages come before the sentinels in the stream.
        let stream = vec![
            node("A", Payload::Fragment(0.5)),
            node("A", Payload::NodeUpdate(record("A", 0.5, &["B"]))),
            node("B", Payload::NodeUpdate(record("B", 0.5, &["A"]))),
            node("B", Payload::Fragment(0.5)),
            sentinel(SentinelKind::TotalRank, 1.0),
            sentinel(SentinelKind::UndistributedMass, 0.0),
            sentinel(SentinelKind::NodeCount, 2.0),
        ];
        let stage = RankAggregationStage::new(&GlobalRank, 0.85, false);
        let output = stage.aggregate(0, group_by_key(stream));

        assert_eq!(output.records.len(), 2);
        // Correction term is (0 - (1 - 2)) / 2 = 0.5.
        for record in &output.records {
            assert!((record.rank - 1.0).abs() < EPSILON, "{:?}", record);
        }
        assert!((output.max_delta - 0.5).abs() < EPSILON);
        assert_eq!(output.discovered_nodes, 0);
    }

    #[test]
    fn unknown_targets_are_discovered_as_dangling() {
        let stream = vec![
            sentinel(SentinelKind::NodeCount, 1.0),
            sentinel(SentinelKind::UndistributedMass, 0.0),
            sentinel(SentinelKind::TotalRank, 1.0),
            node("A", Payload::NodeUpdate(record("A", 1.0, &["B", "C"]))),
            node("B", Payload::Fragment(0.5)),
            node("C", Payload::Fragment(0.5)),
        ];
        let stage = RankAggregationStage::new(&GlobalRank, 0.85, false);
        let output = stage.aggregate(0, group_by_key(stream));

        assert_eq!(output.discovered_nodes, 2);
        assert!((output.discovered_mass - 1.0).abs() < EPSILON);
        assert!((find(&output.records, "A").rank - 0.15).abs() < EPSILON);
        let discovered = find(&output.records, "B");
        assert!(discovered.is_dangling());
        assert!((discovered.rank - 0.5).abs() < EPSILON);
    }

    #[test]
    fn smart_updating_blends_node_ranks() {
        // A mutual pair off its fixed point, with no dangling mass and no drift.
        let stream = vec![
            sentinel(SentinelKind::NodeCount, 2.0),
            sentinel(SentinelKind::UndistributedMass, 0.0),
            sentinel(SentinelKind::TotalRank, 2.0),
            node("A", Payload::NodeUpdate(record("A", 1.1, &["B"]))),
            node("A", Payload::Fragment(0.9)),
            node("B", Payload::NodeUpdate(record("B", 0.9, &["A"]))),
            node("B", Payload::Fragment(1.1)),
        ];
        let ranks = |smart_updating| {
            let stage = RankAggregationStage::new(&GlobalRank, 0.85, smart_updating);
            let output = stage.aggregate(0, group_by_key(stream.clone()));
            (find(&output.records, "A").rank, find(&output.records, "B").rank)
        };

        let (a, b) = ranks(false);
        assert!((a - 0.915).abs() < EPSILON, "{}", a);
        assert!((b - 1.085).abs() < EPSILON, "{}", b);
        // 0.8 * new + 0.2 * old.
        let (a, b) = ranks(true);
        assert!((a - 0.952).abs() < EPSILON, "{}", a);
        assert!((b - 1.048).abs() < EPSILON, "{}", b);
    }

    #[test]
    fn ranks_are_clamped_at_zero() {
        // A large drift makes the correction term strongly negative.
        let stream = vec![
            sentinel(SentinelKind::NodeCount, 1.0),
            sentinel(SentinelKind::UndistributedMass, 0.0),
            sentinel(SentinelKind::TotalRank, 10.0),
            node("A", Payload::NodeUpdate(record("A", 10.0, &["A"]))),
        ];
        let stage = RankAggregationStage::new(&GlobalRank, 0.85, false);
        let output = stage.aggregate(0, group_by_key(stream));
        assert!(find(&output.records, "A").rank.abs() < EPSILON);
    }

    #[test]
    fn outputs_merge() {
        let left = AggregationOutput {
            records: vec![record("A", 1.0, &[])],
            discovered_nodes: 1,
            discovered_mass: 1.0,
            max_delta: 0.5,
        };
        let right = AggregationOutput {
            records: vec![record("B", 1.0, &[])],
            discovered_nodes: 0,
            discovered_mass: 0.0,
            max_delta: 0.7,
        };
        let merged = left.merge(right);
        assert_eq!(merged.records.len(), 2);
        assert_eq!(merged.discovered_nodes, 1);
        assert!((merged.max_delta - 0.7).abs() < EPSILON);
    }
}
