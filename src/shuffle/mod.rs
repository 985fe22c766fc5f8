//! A minimal map/shuffle/reduce runtime.
//!
//! Map workers run on scoped threads and push `(bucket, (key, payload))` messages into one channel
//! per bucket. Once every map worker has finished, each bucket's messages are grouped by key and
//! handed to one reduce worker. The grouping only guarantees that all payloads of a key are
//! delivered together; there is no ordering between different keys of a bucket.

use crate::error::{worker_error, RankFlowError};
use crate::partition::PartitionRouter;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossbeam_utils::thread;
use hashbrown::HashMap;
use itertools::Itertools;
use log::debug;
use rankflow_api::{BucketId, Group, GroupKey, Message, Payload, Routed};

/// Destination of the messages emitted by a map worker.
pub trait MessageSink {
    fn send(&mut self, message: Routed) -> Result<(), RankFlowError>;
}

/// Collects messages in memory. Mostly useful in tests.
impl MessageSink for Vec<Routed> {
    fn send(&mut self, message: Routed) -> Result<(), RankFlowError> {
        self.push(message);
        Ok(())
    }
}

/// The sending half of the per-bucket channels, owned by one map worker.
pub struct BucketSender {
    senders: Vec<Sender<Message>>,
    sent: usize,
}

impl BucketSender {
    fn new(senders: Vec<Sender<Message>>) -> Self {
        Self { senders, sent: 0 }
    }
}

impl MessageSink for BucketSender {
    fn send(&mut self, (bucket, message): Routed) -> Result<(), RankFlowError> {
        let sender = self.senders.get(bucket).ok_or(RankFlowError::BucketOutOfRange {
            bucket,
            fan_out: self.senders.len(),
        })?;
        sender
            .send(message)
            .map_err(|e| worker_error(format!("Bucket {} is no longer receiving: {}", bucket, e)))?;
        self.sent += 1;
        Ok(())
    }
}

/// Messages of every bucket after the map phase, indexed by bucket id.
pub type BucketStreams = Vec<Vec<Message>>;

/// Appends straight to the collected streams, e.g., for broadcasts made after the map barrier.
impl MessageSink for BucketStreams {
    fn send(&mut self, (bucket, message): Routed) -> Result<(), RankFlowError> {
        let fan_out = self.len();
        self.get_mut(bucket)
            .ok_or(RankFlowError::BucketOutOfRange { bucket, fan_out })?
            .push(message);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuffleRuntime {
    fan_out: usize,
}

impl ShuffleRuntime {
    pub fn new(fan_out: usize) -> Result<Self, RankFlowError> {
        if fan_out == 0 {
            return Err(RankFlowError::Config("Shuffle fan-out should be non-zero".to_owned()));
        }
        Ok(Self { fan_out })
    }

    /// Fails when `router` hashes into a different number of buckets than there are workers.
    pub fn check_router(&self, router: &PartitionRouter) -> Result<(), RankFlowError> {
        if router.num_buckets() != self.fan_out {
            return Err(RankFlowError::PartitionMismatch {
                router: router.num_buckets(),
                runtime: self.fan_out,
            });
        }
        Ok(())
    }

    /// Runs `map_fn` on `fan_out` splits of `inputs`, one worker per split.
    ///
    /// Returns every bucket's messages together with the value each worker returned, in split
    /// order. Nothing is returned until all workers are done.
    pub fn map_phase<T, A, F>(
        &self,
        inputs: Vec<T>,
        map_fn: F,
    ) -> Result<(BucketStreams, Vec<A>), RankFlowError>
    where
        T: Send,
        A: Send,
        F: Fn(Vec<T>, &mut BucketSender) -> Result<A, RankFlowError> + Sync,
    {
        let (senders, receivers): (Vec<Sender<Message>>, Vec<Receiver<Message>>) =
            (0..self.fan_out).map(|_| unbounded()).unzip();
        let splits = split_evenly(inputs, self.fan_out);

        let map_fn = &map_fn;
        let worker_results = thread::scope(|s| {
            let handles = splits
                .into_iter()
                .enumerate()
                .map(|(worker_id, split)| {
                    let mut sink = BucketSender::new(senders.clone());
                    s.builder()
                        .name(format!("map-{}", worker_id))
                        .spawn(move |_| {
                            let result = map_fn(split, &mut sink);
                            debug!("Map worker {} sent {} messages", worker_id, sink.sent);
                            result
                        })
                        .map_err(|e| worker_error(format!("Could not spawn map worker: {}", e)))
                })
                .collect::<Result<Vec<_>, RankFlowError>>()?;
            handles
                .into_iter()
                .enumerate()
                .map(|(worker_id, handle)| {
                    handle
                        .join()
                        .map_err(|_| worker_error(format!("Map worker {} panicked", worker_id)))?
                })
                .collect::<Result<Vec<A>, RankFlowError>>()
        })
        .map_err(|_| worker_error("Error ending map scope".to_owned()))??;

        // All worker-owned senders are gone now; dropping ours closes the channels.
        drop(senders);
        let streams = receivers.into_iter().map(|receiver| receiver.try_iter().collect()).collect();
        Ok((streams, worker_results))
    }

    /// Groups every bucket's messages by key and runs `reduce_fn` on each bucket in parallel.
    pub fn reduce_phase<R, F>(
        &self,
        streams: BucketStreams,
        reduce_fn: F,
    ) -> Result<Vec<R>, RankFlowError>
    where
        R: Send,
        F: Fn(BucketId, Vec<Group>) -> R + Sync,
    {
        if streams.len() != self.fan_out {
            return Err(RankFlowError::PartitionMismatch {
                router: streams.len(),
                runtime: self.fan_out,
            });
        }
        let reduce_fn = &reduce_fn;
        thread::scope(|s| {
            let handles = streams
                .into_iter()
                .enumerate()
                .map(|(bucket, stream)| {
                    s.builder()
                        .name(format!("reduce-{}", bucket))
                        .spawn(move |_| reduce_fn(bucket, group_by_key(stream)))
                        .map_err(|e| worker_error(format!("Could not spawn reduce worker: {}", e)))
                })
                .collect::<Result<Vec<_>, RankFlowError>>()?;
            handles
                .into_iter()
                .enumerate()
                .map(|(bucket, handle)| {
                    handle
                        .join()
                        .map_err(|_| worker_error(format!("Reduce worker {} panicked", bucket)))
                })
                .collect::<Result<Vec<R>, RankFlowError>>()
        })
        .map_err(|_| worker_error("Error ending reduce scope".to_owned()))?
    }
}

/// Groups the payloads of a bucket by their original key.
///
/// Payloads of one key keep their arrival order. The order of the groups themselves is arbitrary.
pub fn group_by_key(stream: Vec<Message>) -> Vec<Group> {
    let mut groups: HashMap<GroupKey, Vec<Payload>> = HashMap::new();
    for (key, payload) in stream {
        groups.entry(key).or_insert_with(Vec::new).push(payload);
    }
    groups.into_iter().collect()
}

/// Splits `items` into exactly `parts` contiguous chunks of near-equal size. Trailing chunks may
/// be empty when there are fewer items than parts.
pub fn split_evenly<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    let parts = std::cmp::max(parts, 1);
    let chunk_size = std::cmp::max((items.len() + parts - 1) / parts, 1);
    let mut splits: Vec<Vec<T>> = Vec::with_capacity(parts);
    for chunk in &items.into_iter().chunks(chunk_size) {
        splits.push(chunk.collect());
    }
    splits.resize_with(parts, Vec::new);
    splits
}
