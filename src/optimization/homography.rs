use glam::Vec2;
use log::debug;
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::linear::{homography_dlt, orientation};
use crate::config::RansacConfig;
use crate::error::{Result, TrackerError};

const SAMPLE_SIZE: usize = 4;

/// Output of [`find_homography`].
#[derive(Debug, Clone, PartialEq)]
pub struct HomographyEstimate {
    /// Maps points of the first set onto the second.
    pub h: na::Matrix3<f64>,
    /// `inliers[i]` tells whether pair `i` agrees with `h`.
    pub inliers: Vec<bool>,
}

impl HomographyEstimate {
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&b| b).count()
    }
}

/// Robust homography from `p0` to `p1` with an RNG seeded from `config.seed`.
pub fn find_homography(p0: &[Vec2], p1: &[Vec2], config: &RansacConfig) -> Result<HomographyEstimate> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    find_homography_with_rng(p0, p1, config, &mut rng)
}

/// RANSAC over minimal 4-pair samples followed by a least-squares refit on
/// the inliers of the best sample.
///
/// Fewer than 4 pairs or sets of different length are rejected. Degenerate
/// geometry is not an error: when no sample yields a model the identity is
/// returned with no inliers.
pub fn find_homography_with_rng<R: Rng>(
    p0: &[Vec2],
    p1: &[Vec2],
    config: &RansacConfig,
    rng: &mut R,
) -> Result<HomographyEstimate> {
    if p0.len() != p1.len() {
        return Err(TrackerError::MismatchedCorrespondences {
            p0: p0.len(),
            p1: p1.len(),
        });
    }
    let n = p0.len();
    if n < SAMPLE_SIZE {
        return Err(TrackerError::NotEnoughCorrespondences(n));
    }

    let threshold_sq = config.reproj_threshold * config.reproj_threshold;
    let mut best: Option<(na::Matrix3<f64>, Vec<bool>, usize)> = None;
    let mut nums: Vec<usize> = (0..n).collect();
    let mut max_iters = config.max_iterations;
    let mut iter = 0;
    while iter < max_iters {
        iter += 1;
        let (sample, _) = nums.partial_shuffle(rng, SAMPLE_SIZE);
        let s0: [Vec2; SAMPLE_SIZE] = std::array::from_fn(|i| p0[sample[i]]);
        let s1: [Vec2; SAMPLE_SIZE] = std::array::from_fn(|i| p1[sample[i]]);
        if !is_valid_sample(&s0, &s1) {
            continue;
        }
        let Some(h) = homography_dlt(&s0, &s1) else {
            continue;
        };

        let mask = inlier_mask(&h, p0, p1, threshold_sq);
        let count = mask.iter().filter(|&&b| b).count();
        if best.as_ref().is_none_or(|(_, _, c)| count > *c) {
            max_iters = update_num_iterations(config.confidence, count as f64 / n as f64, max_iters);
            best = Some((h, mask, count));
            if count == n {
                break;
            }
        }
    }

    let Some((h, inliers, count)) = best else {
        debug!("no valid homography sample among {} pairs", n);
        return Ok(HomographyEstimate {
            h: na::Matrix3::identity(),
            inliers: vec![false; n],
        });
    };
    debug!("ransac: {} / {} inliers after {} iterations", count, n, iter);

    let (in0, in1): (Vec<Vec2>, Vec<Vec2>) = p0
        .iter()
        .zip(p1)
        .zip(&inliers)
        .filter_map(|(pair, &keep)| keep.then_some((*pair.0, *pair.1)))
        .unzip();
    let h = homography_dlt(&in0, &in1).unwrap_or(h);
    Ok(HomographyEstimate { h, inliers })
}

/// Iterations needed to draw one all-inlier sample with probability
/// `confidence`, never more than `max_iters`.
fn update_num_iterations(confidence: f64, inlier_ratio: f64, max_iters: usize) -> usize {
    let num = (1.0 - confidence).max(f64::MIN_POSITIVE);
    let denom = 1.0 - inlier_ratio.powi(SAMPLE_SIZE as i32);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }
    let num = num.ln();
    let denom = denom.ln();
    if denom >= 0.0 || -num >= max_iters as f64 * -denom {
        max_iters
    } else {
        (num / denom).round() as usize
    }
}

/// Rejects collinear samples and samples whose point order flips between
/// the two sets; neither can come from a homography of a visible plane.
fn is_valid_sample(s0: &[Vec2; SAMPLE_SIZE], s1: &[Vec2; SAMPLE_SIZE]) -> bool {
    const TRIANGLES: [(usize, usize, usize); 4] = [(0, 1, 2), (1, 2, 3), (0, 2, 3), (0, 1, 3)];
    TRIANGLES.iter().all(|&(a, b, c)| {
        let o0 = orientation(s0[a], s0[b], s0[c]);
        let o1 = orientation(s1[a], s1[b], s1[c]);
        o0.abs() > 1e-6 && o1.abs() > 1e-6 && o0.signum() == o1.signum()
    })
}

fn inlier_mask(h: &na::Matrix3<f64>, p0: &[Vec2], p1: &[Vec2], threshold_sq: f64) -> Vec<bool> {
    p0.iter()
        .zip(p1)
        .map(|(a, b)| reprojection_error_sq(h, *a, *b) <= threshold_sq)
        .collect()
}

/// Squared distance between `h * a` and `b`; infinite when `a` maps to
/// infinity.
pub fn reprojection_error_sq(h: &na::Matrix3<f64>, a: Vec2, b: Vec2) -> f64 {
    let v = h * na::Vector3::new(a.x as f64, a.y as f64, 1.0);
    if v.z.abs() < f64::EPSILON {
        return f64::INFINITY;
    }
    let dx = v.x / v.z - b.x as f64;
    let dy = v.y / v.z - b.y as f64;
    dx * dx + dy * dy
}

/// Maps points through `h` with homogeneous division. A point sent to
/// infinity comes back as the origin.
pub fn perspective_transform(h: &na::Matrix3<f64>, points: &[Vec2]) -> Vec<Vec2> {
    points
        .iter()
        .map(|p| {
            let v = h * na::Vector3::new(p.x as f64, p.y as f64, 1.0);
            if v.z.abs() > f32::EPSILON as f64 {
                Vec2::new((v.x / v.z) as f32, (v.y / v.z) as f32)
            } else {
                Vec2::ZERO
            }
        })
        .collect()
}
