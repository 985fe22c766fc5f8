use rankflow_api::{
    MassAccumulator, NodeRecord, Rank, RankVariant, SentinelKind, SentinelValue, MEAN_RANK,
};

pub const SENTINEL_KINDS: [SentinelKind; 3] =
    [SentinelKind::NodeCount, SentinelKind::UndistributedMass, SentinelKind::TotalRank];

/// Classic PageRank with a single, graph-wide correction term.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalRank;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalCorrection {
    pub term: Rank,
}

impl RankVariant for GlobalRank {
    type Accumulator = MassAccumulator;
    type Correction = GlobalCorrection;

    fn name(&self) -> &'static str {
        "global"
    }

    fn observe(&self, acc: MassAccumulator, record: &NodeRecord) -> MassAccumulator {
        acc.observe(record)
    }

    fn to_sentinels(&self, acc: &MassAccumulator) -> Vec<(SentinelKind, SentinelValue)> {
        SENTINEL_KINDS.iter().map(|kind| (*kind, SentinelValue::Scalar(acc.get(*kind)))).collect()
    }

    fn absorb_sentinel(
        &self,
        acc: MassAccumulator,
        kind: SentinelKind,
        value: &SentinelValue,
    ) -> MassAccumulator {
        match value {
            SentinelValue::Scalar(value) => acc.absorb(kind, *value),
            // Topic-keyed values collapse into the single global total.
            SentinelValue::PerTopic(values) => acc.absorb(kind, values.values().sum()),
        }
    }

    fn correction(&self, totals: &MassAccumulator) -> GlobalCorrection {
        GlobalCorrection { term: totals.correction_term() }
    }

    fn shares(&self, correction: &GlobalCorrection, _record: &NodeRecord) -> (Rank, Rank) {
        (correction.term, MEAN_RANK)
    }
}
