use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::object_from_json;

/// Tuning for the whole tracking engine.
///
/// Every field has a default, so a JSON file only needs the values it wants
/// to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum evidence: keypoints per frame, ratio-test survivors, matches
    /// per target and inliers per target all have to reach this count.
    pub min_match_count: usize,
    /// Nearest-neighbour ratio test threshold (strict).
    pub ratio_test: f32,
    pub features: OrbConfig,
    pub ransac: RansacConfig,
    pub index: LshConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_match_count: 10,
            ratio_test: 0.75,
            features: OrbConfig::default(),
            ransac: RansacConfig::default(),
            index: LshConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_json_file(path: &str) -> Result<TrackerConfig> {
        object_from_json(path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbConfig {
    /// Upper bound on keypoints returned per image.
    pub max_features: usize,
    pub fast_threshold: u8,
    pub n_levels: usize,
    pub scale_factor: f32,
    pub harris_k: f32,
    /// Keypoints closer than this to the level border are dropped.
    pub edge_threshold: u32,
    /// Gaussian sigma applied before descriptor sampling.
    pub blur_sigma: f32,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            max_features: 3000,
            fast_threshold: 20,
            n_levels: 4,
            scale_factor: 1.2,
            harris_k: 0.04,
            edge_threshold: 19,
            blur_sigma: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    /// Maximum reprojection error in pixels for a pair to count as inlier.
    pub reproj_threshold: f64,
    pub max_iterations: usize,
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            reproj_threshold: 3.0,
            max_iterations: 2000,
            confidence: 0.995,
            seed: 0,
        }
    }
}

/// Multi-probe LSH parameters for binary descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LshConfig {
    pub table_number: usize,
    /// Number of descriptor bits hashed per table.
    pub key_size: usize,
    /// 0 probes only the exact bucket, 1 also every bucket one bit away.
    pub multi_probe_level: usize,
    pub seed: u64,
}

impl Default for LshConfig {
    fn default() -> Self {
        Self {
            table_number: 6,
            key_size: 12,
            multi_probe_level: 1,
            seed: 0,
        }
    }
}
