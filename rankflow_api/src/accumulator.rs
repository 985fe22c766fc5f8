use crate::{NodeRecord, Rank, SentinelKind, TopicId};
use derive_new::new;
use hashbrown::HashMap;
use serde_derive::{Deserialize, Serialize};
use std::fmt::Debug;

/// Statistics that a distribution worker gathers locally and hands back as a value.
///
/// Worker results are combined with `merge`, which must be associative and commutative so that the
/// totals do not depend on how records were split across workers.
pub trait Accumulator: Default + Clone + Debug + Send + Sync {
    fn merge(self, other: Self) -> Self;

    /// Collapses the accumulator into run-wide scalar totals, e.g., for reporting.
    fn summary(&self) -> MassAccumulator;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, new)]
pub struct MassAccumulator {
    pub node_count: f64,
    /// Rank held by dangling nodes, which has to be spread over every node.
    pub undistributed_mass: Rank,
    pub total_rank: Rank,
}

impl MassAccumulator {
    pub fn observe(mut self, record: &NodeRecord) -> Self {
        self.node_count += 1.0;
        self.total_rank += record.rank;
        if record.is_dangling() {
            self.undistributed_mass += record.rank;
        }
        self
    }

    pub fn absorb(mut self, kind: SentinelKind, value: f64) -> Self {
        match kind {
            SentinelKind::NodeCount => self.node_count += value,
            SentinelKind::UndistributedMass => self.undistributed_mass += value,
            SentinelKind::TotalRank => self.total_rank += value,
        }
        self
    }

    pub fn get(&self, kind: SentinelKind) -> f64 {
        match kind {
            SentinelKind::NodeCount => self.node_count,
            SentinelKind::UndistributedMass => self.undistributed_mass,
            SentinelKind::TotalRank => self.total_rank,
        }
    }

    /// The amount added to the incoming mass of every node.
    ///
    /// Spreads the undistributed mass uniformly and pulls the total rank back to the node count.
    /// The node count and the observed mass are only eventually consistent (the initial ranks come
    /// from an estimated node count, and dangling nodes are discovered lazily), so the result may
    /// be momentarily negative.
    pub fn correction_term(&self) -> Rank {
        if self.node_count <= 0.0 {
            return 0.0;
        }
        let excess = self.total_rank - self.node_count;
        (self.undistributed_mass - excess) / self.node_count
    }
}

impl Accumulator for MassAccumulator {
    fn merge(self, other: Self) -> Self {
        MassAccumulator {
            node_count: self.node_count + other.node_count,
            undistributed_mass: self.undistributed_mass + other.undistributed_mass,
            total_rank: self.total_rank + other.total_rank,
        }
    }

    fn summary(&self) -> MassAccumulator {
        *self
    }
}

/// One `MassAccumulator` per topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicMassAccumulator {
    pub per_topic: HashMap<TopicId, MassAccumulator>,
}

impl TopicMassAccumulator {
    pub fn observe(mut self, record: &NodeRecord) -> Self {
        let entry = self.per_topic.entry(record.topic_key().to_owned()).or_default();
        *entry = entry.observe(record);
        self
    }

    pub fn absorb(mut self, topic: &str, kind: SentinelKind, value: f64) -> Self {
        let entry = self.per_topic.entry(topic.to_owned()).or_default();
        *entry = entry.absorb(kind, value);
        self
    }

    pub fn topic(&self, topic: &str) -> Option<&MassAccumulator> {
        self.per_topic.get(topic)
    }

    /// Projects one statistic out of every topic.
    pub fn project(&self, kind: SentinelKind) -> HashMap<TopicId, f64> {
        self.per_topic.iter().map(|(topic, acc)| (topic.clone(), acc.get(kind))).collect()
    }
}

impl Accumulator for TopicMassAccumulator {
    fn merge(mut self, other: Self) -> Self {
        for (topic, acc) in other.per_topic {
            let entry = self.per_topic.entry(topic).or_default();
            *entry = entry.merge(acc);
        }
        self
    }

    fn summary(&self) -> MassAccumulator {
        self.per_topic.values().fold(MassAccumulator::default(), |total, acc| total.merge(*acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, rank: Rank, outlinks: &[&str], topic: Option<&str>) -> NodeRecord {
        NodeRecord::new(
            id.to_owned(),
            rank,
            outlinks.iter().map(|s| (*s).to_owned()).collect(),
            topic.map(str::to_owned),
        )
    }

    #[test]
    fn merge_is_order_independent() {
        let a = MassAccumulator::new(2.0, 0.5, 1.5);
        let b = MassAccumulator::new(1.0, 0.25, 0.75);
        let c = MassAccumulator::new(4.0, 0.0, 3.0);
        assert_eq!(a.merge(b).merge(c), c.merge(a).merge(b));
    }

    #[test]
    fn observe_tracks_dangling_mass() {
        let acc = MassAccumulator::default()
            .observe(&record("a", 0.25, &["b"], None))
            .observe(&record("b", 0.5, &[], None));
        assert_eq!(acc, MassAccumulator::new(2.0, 0.5, 0.75));
    }

    #[test]
    fn correction_term_redistributes_and_corrects_drift() {
        // Four nodes holding a total of 1.0, a quarter of it dangling.
        let acc = MassAccumulator::new(4.0, 0.25, 1.0);
        assert!((acc.correction_term() - (0.25 + 3.0) / 4.0).abs() < 1e-12);
        assert_eq!(MassAccumulator::default().correction_term(), 0.0);
    }

    #[test]
    fn topics_are_accounted_separately() {
        let acc = TopicMassAccumulator::default()
            .observe(&record("a", 1.0, &[], Some("t1")))
            .observe(&record("b", 2.0, &["a"], Some("t2")))
            .observe(&record("c", 3.0, &[], None));
        assert_eq!(acc.topic("t1"), Some(&MassAccumulator::new(1.0, 1.0, 1.0)));
        assert_eq!(acc.topic("t2"), Some(&MassAccumulator::new(1.0, 0.0, 2.0)));
        assert_eq!(acc.topic(crate::UNASSIGNED_TOPIC), Some(&MassAccumulator::new(1.0, 3.0, 3.0)));
        assert_eq!(acc.summary(), MassAccumulator::new(3.0, 4.0, 6.0));
    }
}
