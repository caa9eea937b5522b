//! Multi-probe locality sensitive hashing for binary descriptors.

use std::collections::HashMap;

use log::debug;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::{DescriptorIndex, Entries, IndexMatch};
use crate::config::LshConfig;
use crate::types::Descriptor;

/// Keys are packed into a `u32`.
const MAX_KEY_SIZE: usize = 32;

struct HashTable {
    /// Descriptor bits forming the key, most significant first.
    bits: Vec<usize>,
    buckets: HashMap<u32, Vec<usize>>,
}

impl HashTable {
    fn key(&self, d: &Descriptor) -> u32 {
        self.bits
            .iter()
            .fold(0u32, |key, &b| (key << 1) | d.bit(b) as u32)
    }
}

/// Approximate index: candidates come from the buckets hit in any table and
/// are then ranked by exact Hamming distance. For a fixed index state the
/// same query always returns the same neighbours.
pub struct LshIndex {
    tables: Vec<HashTable>,
    multi_probe_level: usize,
    entries: Entries,
}

impl LshIndex {
    pub fn new(config: &LshConfig) -> Self {
        let key_size = config.key_size.clamp(1, MAX_KEY_SIZE);
        if key_size != config.key_size {
            debug!("lsh key size {} clamped to {}", config.key_size, key_size);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let tables = (0..config.table_number.max(1))
            .map(|_| {
                let mut bits: Vec<usize> = (0..Descriptor::BITS).collect();
                bits.shuffle(&mut rng);
                bits.truncate(key_size);
                HashTable {
                    bits,
                    buckets: HashMap::new(),
                }
            })
            .collect();
        Self {
            tables,
            multi_probe_level: config.multi_probe_level,
            entries: Entries::default(),
        }
    }

    fn candidates(&self, query: &Descriptor) -> Vec<usize> {
        let mut ids = Vec::new();
        for table in &self.tables {
            let key = table.key(query);
            for probe in probe_keys(key, table.bits.len(), self.multi_probe_level) {
                if let Some(bucket) = table.buckets.get(&probe) {
                    ids.extend_from_slice(bucket);
                }
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl Default for LshIndex {
    fn default() -> Self {
        Self::new(&LshConfig::default())
    }
}

impl DescriptorIndex for LshIndex {
    fn add(&mut self, batch: &[Descriptor], tag: usize) {
        let first = self.entries.descriptors.len();
        for (i, d) in batch.iter().enumerate() {
            for table in &mut self.tables {
                let key = table.key(d);
                table.buckets.entry(key).or_default().push(first + i);
            }
        }
        self.entries.push_batch(batch, tag);
    }

    fn knn_query(&self, queries: &[Descriptor], k: usize) -> Vec<Vec<IndexMatch>> {
        queries
            .par_iter()
            .map(|q| self.entries.rank(q, self.candidates(q).into_iter(), k))
            .collect()
    }

    fn clear(&mut self) {
        for table in &mut self.tables {
            table.buckets.clear();
        }
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.descriptors.len()
    }
}

/// Every key within Hamming distance `level` of `key`, `key` itself first.
fn probe_keys(key: u32, key_size: usize, level: usize) -> Vec<u32> {
    fn flip(key: u32, from: usize, key_size: usize, left: usize, out: &mut Vec<u32>) {
        if left == 0 {
            return;
        }
        for b in from..key_size {
            let k = key ^ (1 << b);
            out.push(k);
            flip(k, b + 1, key_size, left - 1, out);
        }
    }
    let mut out = vec![key];
    flip(key, 0, key_size, level, &mut out);
    out
}
