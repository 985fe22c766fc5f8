use crate::error::{config_error, RankFlowError};
use fnv::FnvHasher;
use rankflow_api::BucketId;
use std::hash::Hasher;
use std::num::NonZeroUsize;

/// Stable 64-bit FNV-1a hash of a node id.
///
/// Unlike the std `DefaultHasher`, its value does not change across processes or compiler versions,
/// so routing decisions are reproducible.
pub fn fnv1a(id: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(id.as_bytes());
    hasher.finish()
}

#[allow(clippy::cast_possible_truncation)]
pub fn bucket(id: &str, num_buckets: NonZeroUsize) -> BucketId {
    // The remainder is below `num_buckets`, so it always fits back into a usize.
    (fnv1a(id) % num_buckets.get() as u64) as BucketId
}

/// Maps node ids to one of `num_buckets` buckets. Distribution and aggregation must use the same
/// router within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRouter {
    num_buckets: NonZeroUsize,
}

impl PartitionRouter {
    pub fn new(num_buckets: usize) -> Result<Self, RankFlowError> {
        let num_buckets = NonZeroUsize::new(num_buckets)
            .ok_or_else(|| config_error("Number of partitions should be non-zero".to_owned()))?;
        Ok(Self { num_buckets })
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets.get()
    }

    #[inline]
    pub fn bucket(&self, id: &str) -> BucketId {
        bucket(id, self.num_buckets)
    }
}
