use crate::computations::pagerank::global::SENTINEL_KINDS;
use crate::ingest::topics::TopicLookup;
use derive_new::new;
use hashbrown::HashMap;
use rankflow_api::{
    NodeRecord, Rank, RankVariant, SentinelKind, SentinelValue, TopicId, TopicMassAccumulator,
    MEAN_RANK, UNASSIGNED_TOPIC,
};

/// Topic-sensitive PageRank.
///
/// Dangling mass and drift are tracked per topic and only handed back to nodes of the same topic,
/// so the rank mass of every topic stays at that topic's node count.
#[derive(Debug, Clone, new)]
pub struct TopicRank {
    lookup: TopicLookup,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicCorrection {
    pub terms: HashMap<TopicId, Rank>,
}

impl TopicCorrection {
    pub fn term(&self, topic: &str) -> Rank {
        self.terms.get(topic).copied().unwrap_or(0.0)
    }
}

impl RankVariant for TopicRank {
    type Accumulator = TopicMassAccumulator;
    type Correction = TopicCorrection;

    fn name(&self) -> &'static str {
        "topic"
    }

    fn observe(&self, acc: TopicMassAccumulator, record: &NodeRecord) -> TopicMassAccumulator {
        acc.observe(record)
    }

    fn to_sentinels(&self, acc: &TopicMassAccumulator) -> Vec<(SentinelKind, SentinelValue)> {
        SENTINEL_KINDS
            .iter()
            .map(|kind| (*kind, SentinelValue::PerTopic(acc.project(*kind))))
            .collect()
    }

    fn absorb_sentinel(
        &self,
        acc: TopicMassAccumulator,
        kind: SentinelKind,
        value: &SentinelValue,
    ) -> TopicMassAccumulator {
        match value {
            SentinelValue::PerTopic(values) => values
                .iter()
                .fold(acc, |acc, (topic, value)| acc.absorb(topic, kind, *value)),
            SentinelValue::Scalar(value) => acc.absorb(UNASSIGNED_TOPIC, kind, *value),
        }
    }

    fn correction(&self, totals: &TopicMassAccumulator) -> TopicCorrection {
        TopicCorrection {
            terms: totals
                .per_topic
                .iter()
                .map(|(topic, acc)| (topic.clone(), acc.correction_term()))
                .collect(),
        }
    }

    fn shares(&self, correction: &TopicCorrection, record: &NodeRecord) -> (Rank, Rank) {
        (correction.term(record.topic_key()), MEAN_RANK)
    }

    fn topic_of(&self, id: &str) -> Option<TopicId> {
        self.lookup.topic_of(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankflow_api::MassAccumulator;

    fn variant() -> TopicRank {
        TopicRank::new(
            vec![("a".to_owned(), "t1".to_owned()), ("b".to_owned(), "t2".to_owned())]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn corrections_are_per_topic() {
        let variant = variant();
        let a = NodeRecord::new("a".to_owned(), 0.5, vec![], Some("t1".to_owned()));
        let b = NodeRecord::new("b".to_owned(), 1.0, vec!["a".to_owned()], Some("t2".to_owned()));
        let acc = TopicMassAccumulator::default().observe(&a).observe(&b);
        let folded = variant.to_sentinels(&acc).iter().fold(
            TopicMassAccumulator::default(),
            |folded, (kind, value)| variant.absorb_sentinel(folded, *kind, value),
        );
        assert_eq!(folded, acc);

        let correction = variant.correction(&folded);
        // t1: one dangling node holding 0.5 out of a target of 1.0.
        assert!((correction.term("t1") - 1.0).abs() < 1e-12);
        // t2: no dangling mass and no drift.
        assert!(correction.term("t2").abs() < 1e-12);
        assert!(correction.term("t3").abs() < 1e-12);
    }

    #[test]
    fn discovered_nodes_get_their_topic() {
        let variant = variant();
        assert_eq!(variant.discover("b".to_owned(), 0.5).topic.as_deref(), Some("t2"));
        let unknown = variant.discover("z".to_owned(), 0.5);
        assert_eq!(unknown.topic, None);
        assert_eq!(unknown.topic_key(), UNASSIGNED_TOPIC);
        assert_eq!(
            TopicMassAccumulator::default().observe(&unknown).topic(UNASSIGNED_TOPIC),
            Some(&MassAccumulator::new(1.0, 0.5, 0.5))
        );
    }
}
