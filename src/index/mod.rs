//! Nearest-neighbour search over the descriptors of every registered target.

pub mod lsh;

use rayon::prelude::*;

use crate::types::Descriptor;
pub use lsh::LshIndex;

/// One neighbour returned by [`DescriptorIndex::knn_query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMatch {
    /// Tag of the batch the descriptor was added with (the target id).
    pub tag: usize,
    /// Position of the descriptor inside its batch.
    pub descriptor_idx: usize,
    pub distance: u32,
}

/// Incremental descriptor index.
///
/// Results for a query are ordered by ascending distance, ties by insertion
/// order, and hold at most `k` entries.
pub trait DescriptorIndex {
    /// Appends `batch`, every descriptor attributed to `tag`.
    fn add(&mut self, batch: &[Descriptor], tag: usize);
    fn knn_query(&self, queries: &[Descriptor], k: usize) -> Vec<Vec<IndexMatch>>;
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Flat storage shared by the index implementations.
#[derive(Debug, Clone, Default)]
pub(crate) struct Entries {
    pub descriptors: Vec<Descriptor>,
    /// `(tag, descriptor_idx)` per stored descriptor.
    pub owners: Vec<(usize, usize)>,
}

impl Entries {
    pub fn push_batch(&mut self, batch: &[Descriptor], tag: usize) {
        self.descriptors.extend_from_slice(batch);
        self.owners.extend((0..batch.len()).map(|i| (tag, i)));
    }

    pub fn clear(&mut self) {
        self.descriptors.clear();
        self.owners.clear();
    }

    /// Best `k` among `candidates` (global entry ids).
    pub fn rank(
        &self,
        query: &Descriptor,
        candidates: impl Iterator<Item = usize>,
        k: usize,
    ) -> Vec<IndexMatch> {
        let mut best: Vec<(u32, usize)> = Vec::with_capacity(k + 1);
        if k == 0 {
            return Vec::new();
        }
        for id in candidates {
            let d = query.hamming_distance(&self.descriptors[id]);
            if best.len() == k && (d, id) >= best[k - 1] {
                continue;
            }
            let pos = best.partition_point(|&e| e < (d, id));
            best.insert(pos, (d, id));
            best.truncate(k);
        }
        best.into_iter()
            .map(|(distance, id)| {
                let (tag, descriptor_idx) = self.owners[id];
                IndexMatch {
                    tag,
                    descriptor_idx,
                    distance,
                }
            })
            .collect()
    }
}

/// Exact linear search.
#[derive(Debug, Clone, Default)]
pub struct BruteForceIndex {
    entries: Entries,
}

impl BruteForceIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DescriptorIndex for BruteForceIndex {
    fn add(&mut self, batch: &[Descriptor], tag: usize) {
        self.entries.push_batch(batch, tag);
    }

    fn knn_query(&self, queries: &[Descriptor], k: usize) -> Vec<Vec<IndexMatch>> {
        let n = self.entries.descriptors.len();
        queries
            .par_iter()
            .map(|q| self.entries.rank(q, 0..n, k))
            .collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.descriptors.len()
    }
}
