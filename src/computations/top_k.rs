use derive_new::new;
use rankflow_api::{NodeId, NodeRecord, Rank};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A scored entry together with the value it stands for.
#[derive(Debug, Clone, PartialEq, new)]
pub struct TopKEntry<P = NodeRecord> {
    pub score: Rank,
    pub id: NodeId,
    pub payload: P,
}

impl<P> TopKEntry<P> {
    /// Ranking order: higher scores first, then ascending ids.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl TopKEntry<NodeRecord> {
    pub fn from_record(record: NodeRecord) -> Self {
        TopKEntry { score: record.rank, id: record.id.clone(), payload: record }
    }
}

/// Heap element ordered so that the worst retained entry sits at the top of the max-heap.
struct Retained<P>(TopKEntry<P>);

impl<P> PartialEq for Retained<P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<P> Eq for Retained<P> {}

impl<P> PartialOrd for Retained<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for Retained<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_cmp(&other.0)
    }
}

/// Keeps the `capacity` best entries of a stream.
///
/// Entries compare by score and then by id, so the retained set and the drained order do not
/// depend on the order in which entries were offered.
pub struct TopKCollector<P = NodeRecord> {
    capacity: usize,
    heap: BinaryHeap<Retained<P>>,
}

impl<P> TopKCollector<P> {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, heap: BinaryHeap::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offers an entry. Once full, the worst retained entry is only replaced by a strictly better
    /// one. Entries with a NaN score are ignored.
    pub fn offer(&mut self, entry: TopKEntry<P>) {
        if self.capacity == 0 || entry.score.is_nan() {
            return;
        }
        let entry = Retained(entry);
        if self.heap.len() < self.capacity {
            self.heap.push(entry);
        } else if let Some(worst) = self.heap.peek() {
            if entry < *worst {
                self.heap.pop();
                self.heap.push(entry);
            }
        }
    }

    /// Offers every entry retained by `other`.
    pub fn merge(&mut self, other: TopKCollector<P>) {
        for Retained(entry) in other.heap.into_vec() {
            self.offer(entry);
        }
    }

    /// Returns the retained entries, best first.
    pub fn drain(self) -> Vec<TopKEntry<P>> {
        self.heap.into_sorted_vec().into_iter().map(|Retained(entry)| entry).collect()
    }
}

impl<P> Extend<TopKEntry<P>> for TopKCollector<P> {
    fn extend<I: IntoIterator<Item = TopKEntry<P>>>(&mut self, iter: I) {
        for entry in iter {
            self.offer(entry);
        }
    }
}
