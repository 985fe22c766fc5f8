use crate::error::RankFlowError;
use crate::partition::PartitionRouter;
use crate::shuffle::MessageSink;
use derive_new::new;
use rankflow_api::{Accumulator, GroupKey, NodeRecord, Payload, RankVariant};

/// The map side of one iteration.
///
/// Splits every record's rank across its outlinks and passes the record itself through to the
/// bucket that owns it. Dangling records only contribute to the returned accumulator.
#[derive(new)]
pub struct MassDistributionStage<'a, V: RankVariant> {
    variant: &'a V,
    router: PartitionRouter,
}

impl<'a, V: RankVariant> MassDistributionStage<'a, V> {
    /// Distributes `records` into `sink` and returns the statistics of this worker's split.
    #[allow(clippy::cast_precision_loss)]
    pub fn distribute<S: MessageSink>(
        &self,
        records: Vec<NodeRecord>,
        sink: &mut S,
    ) -> Result<V::Accumulator, RankFlowError> {
        let mut acc = V::Accumulator::default();
        for record in records {
            acc = self.variant.observe(acc, &record);
            if !record.is_dangling() {
                let share = record.rank / record.outlinks.len() as f64;
                for link in &record.outlinks {
                    sink.send((
                        self.router.bucket(link),
                        (GroupKey::Node(link.clone()), Payload::Fragment(share)),
                    ))?;
                }
            }
            let bucket = self.router.bucket(&record.id);
            sink.send((bucket, (GroupKey::Node(record.id.clone()), Payload::NodeUpdate(record))))?;
        }
        Ok(acc)
    }

    /// Sends every sentinel of `totals` to every bucket, so that each aggregation worker sees the
    /// run-wide statistics no matter which nodes it owns.
    pub fn broadcast<S: MessageSink>(
        &self,
        totals: &V::Accumulator,
        sink: &mut S,
    ) -> Result<(), RankFlowError> {
        for (kind, value) in self.variant.to_sentinels(totals) {
            for bucket in 0..self.router.num_buckets() {
                sink.send((bucket, (GroupKey::Sentinel(kind), Payload::Sentinel(value.clone()))))?;
            }
        }
        Ok(())
    }
}

/// Merges the accumulators returned by the map workers.
pub fn merge_partials<A: Accumulator>(partials: Vec<A>) -> A {
    partials.into_iter().fold(A::default(), Accumulator::merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computations::pagerank::global::GlobalRank;
    use rankflow_api::{MassAccumulator, Routed, SentinelKind, SentinelValue};

    fn record(id: &str, rank: f64, outlinks: &[&str]) -> NodeRecord {
        NodeRecord::new(
            id.to_owned(),
            rank,
            outlinks.iter().map(|s| (*s).to_owned()).collect(),
            None,
        )
    }

    #[test]
    fn splits_rank_across_outlinks() {
        let router = PartitionRouter::new(3).expect("router");
        let stage = MassDistributionStage::new(&GlobalRank, router);
        let mut sink: Vec<Routed> = Vec::new();
        let acc = stage
            .distribute(vec![record("H", 0.3, &["A", "B", "C"]), record("A", 0.2, &[])], &mut sink)
            .expect("distribute");

        assert_eq!(acc, MassAccumulator::new(2.0, 0.2, 0.5));
        // Three fragments and two pass-through records.
        assert_eq!(sink.len(), 5);
        for (bucket, (key, payload)) in &sink {
            match (key, payload) {
                (GroupKey::Node(id), Payload::Fragment(mass)) => {
                    assert_eq!(*bucket, router.bucket(id));
                    assert!((mass - 0.1).abs() < 1e-12);
                }
                (GroupKey::Node(id), Payload::NodeUpdate(update)) => {
                    assert_eq!(*bucket, router.bucket(id));
                    assert_eq!(id, &update.id);
                }
                other => panic!("Unexpected message {:?}", other),
            }
        }
    }

    #[test]
    fn broadcast_reaches_every_bucket() {
        let router = PartitionRouter::new(4).expect("router");
        let stage = MassDistributionStage::new(&GlobalRank, router);
        let mut sink: Vec<Routed> = Vec::new();
        stage.broadcast(&MassAccumulator::new(3.0, 0.5, 1.0), &mut sink).expect("broadcast");

        assert_eq!(sink.len(), 3 * 4);
        for bucket in 0..4 {
            let kinds = sink
                .iter()
                .filter(|(b, _)| *b == bucket)
                .map(|(_, (key, _))| key.clone())
                .collect::<Vec<_>>();
            assert_eq!(kinds.len(), 3);
            assert!(kinds.contains(&GroupKey::Sentinel(SentinelKind::UndistributedMass)));
        }
        assert!(sink.contains(&(
            2,
            (
                GroupKey::Sentinel(SentinelKind::NodeCount),
                Payload::Sentinel(SentinelValue::Scalar(3.0))
            )
        )));
    }

    #[test]
    fn partials_merge_to_the_same_totals() {
        let partials = vec![
            MassAccumulator::new(1.0, 0.0, 0.25),
            MassAccumulator::new(2.0, 0.5, 0.75),
            MassAccumulator::default(),
        ];
        assert_eq!(merge_partials(partials), MassAccumulator::new(3.0, 0.5, 1.0));
    }
}
