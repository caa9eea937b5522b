use std::cmp::Ordering;
use std::sync::Arc;

use glam::Vec2;
use image::DynamicImage;
use log::{debug, trace};
use nalgebra as na;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::TrackerConfig;
use crate::features::OrbExtractor;
use crate::index::{DescriptorIndex, IndexMatch, LshIndex};
use crate::optimization::{find_homography_with_rng, perspective_transform};
use crate::types::{Descriptor, KeyPoint, Rect};

/// A registered reference plane. Never modified after registration.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarTarget<T = ()> {
    /// Image the target was registered from.
    pub image: DynamicImage,
    pub rect: Rect,
    /// Keypoints of `image` inside `rect`.
    pub keypoints: Vec<KeyPoint>,
    /// `descriptors[i]` describes `keypoints[i]`.
    pub descriptors: Vec<Descriptor>,
    /// Caller payload, carried along untouched.
    pub data: Option<T>,
}

/// A target found in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTarget<T = ()> {
    /// Registration index of `target`.
    pub target_id: usize,
    pub target: Arc<PlanarTarget<T>>,
    /// Inlier points in the reference image.
    pub p0: Vec<Vec2>,
    /// The matching inlier points in the frame.
    pub p1: Vec<Vec2>,
    /// Homography from reference image to frame.
    pub h: na::Matrix3<f64>,
    /// Target rect corners mapped into the frame, in `Rect::corners` order.
    pub quad: [Vec2; 4],
}

impl<T> TrackedTarget<T> {
    pub fn inlier_count(&self) -> usize {
        self.p0.len()
    }
}

/// Tracks registered planar targets through a stream of frames.
///
/// `add_target` and `clear` take `&mut self`, so a registry can not change
/// while a `track` call is running on it.
pub struct PlaneTracker<T = (), I = LshIndex> {
    config: TrackerConfig,
    extractor: OrbExtractor,
    index: I,
    targets: Vec<Arc<PlanarTarget<T>>>,
    frame_points: Vec<KeyPoint>,
}

impl<T: Send + Sync> PlaneTracker<T, LshIndex> {
    pub fn new(config: TrackerConfig) -> Self {
        let index = LshIndex::new(&config.index);
        Self::with_index(config, index)
    }
}

impl Default for PlaneTracker<(), LshIndex> {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl<T: Send + Sync, I: DescriptorIndex> PlaneTracker<T, I> {
    /// Uses `index` for matching. Whatever it holds is dropped, the registry
    /// starts empty.
    pub fn with_index(config: TrackerConfig, mut index: I) -> Self {
        index.clear();
        Self {
            extractor: OrbExtractor::new(&config.features),
            config,
            index,
            targets: Vec::new(),
            frame_points: Vec::new(),
        }
    }

    /// Registers the part of `image` inside `rect` and returns its id.
    ///
    /// Keypoints outside the rect (or outside the image) are dropped. A
    /// target without keypoints is still stored, it just never matches.
    pub fn add_target(&mut self, image: &DynamicImage, rect: Rect, data: Option<T>) -> usize {
        let features = self.extractor.extract(image).filter_in_rect(&rect);
        let target_id = self.targets.len();
        debug!(
            "target {}: {} keypoints inside {:?}",
            target_id,
            features.len(),
            rect
        );
        self.index.add(&features.descriptors, target_id);
        self.targets.push(Arc::new(PlanarTarget {
            image: image.clone(),
            rect,
            keypoints: features.keypoints,
            descriptors: features.descriptors,
            data,
        }));
        target_id
    }

    /// Drops every target; the next `add_target` returns id 0 again.
    pub fn clear(&mut self) {
        self.targets.clear();
        self.index.clear();
    }

    /// Finds the registered targets in `frame`, most inliers first.
    pub fn track(&mut self, frame: &DynamicImage) -> Vec<TrackedTarget<T>> {
        let min_count = self.config.min_match_count;
        let features = self.extractor.extract(frame);
        self.frame_points = features.keypoints;
        if self.frame_points.len() < min_count {
            trace!("only {} frame keypoints", self.frame_points.len());
            return Vec::new();
        }

        let matches: Vec<(usize, IndexMatch)> = self
            .index
            .knn_query(&features.descriptors, 2)
            .into_iter()
            .enumerate()
            .filter_map(|(query_idx, m)| match m.as_slice() {
                [best, second]
                    if (best.distance as f32) < self.config.ratio_test * second.distance as f32 =>
                {
                    Some((query_idx, *best))
                }
                _ => None,
            })
            .collect();
        if matches.len() < min_count {
            trace!("only {} matches pass the ratio test", matches.len());
            return Vec::new();
        }

        let mut by_target: Vec<Vec<(usize, IndexMatch)>> = vec![Vec::new(); self.targets.len()];
        for m in matches {
            match by_target.get_mut(m.1.tag) {
                Some(group) => group.push(m),
                None => trace!("match for unknown target {}", m.1.tag),
            }
        }

        let frame_points = &self.frame_points;
        let targets = &self.targets;
        let config = &self.config;
        let mut tracked: Vec<TrackedTarget<T>> = by_target
            .into_par_iter()
            .enumerate()
            .filter(|(_, group)| group.len() >= min_count)
            .filter_map(|(target_id, group)| {
                let target = &targets[target_id];
                let p0: Vec<Vec2> = group
                    .iter()
                    .map(|(_, m)| target.keypoints[m.descriptor_idx].pt)
                    .collect();
                let p1: Vec<Vec2> = group.iter().map(|(q, _)| frame_points[*q].pt).collect();

                // one stream per target keeps results independent of scheduling
                let mut rng = ChaCha8Rng::seed_from_u64(config.ransac.seed);
                rng.set_stream(target_id as u64);
                let estimate = match find_homography_with_rng(&p0, &p1, &config.ransac, &mut rng) {
                    Ok(e) => e,
                    Err(e) => {
                        debug!("target {}: {}", target_id, e);
                        return None;
                    }
                };
                let inliers = estimate.inlier_count();
                trace!(
                    "target {}: {} matches, {} inliers",
                    target_id,
                    group.len(),
                    inliers
                );
                if inliers < min_count {
                    return None;
                }

                let (p0, p1): (Vec<Vec2>, Vec<Vec2>) = p0
                    .into_iter()
                    .zip(p1)
                    .zip(&estimate.inliers)
                    .filter_map(|(pair, &keep)| keep.then_some(pair))
                    .unzip();
                let corners = perspective_transform(&estimate.h, &target.rect.corners());
                Some(TrackedTarget {
                    target_id,
                    target: Arc::clone(target),
                    p0,
                    p1,
                    h: estimate.h,
                    quad: [corners[0], corners[1], corners[2], corners[3]],
                })
            })
            .collect();

        tracked.sort_by(by_evidence);
        debug!("tracked {} of {} targets", tracked.len(), self.targets.len());
        tracked
    }

    pub fn targets(&self) -> &[Arc<PlanarTarget<T>>] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Keypoints of the last frame passed to `track`, for display.
    pub fn frame_points(&self) -> &[KeyPoint] {
        &self.frame_points
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

/// Most inliers first, smaller target id first among equals.
fn by_evidence<T>(a: &TrackedTarget<T>, b: &TrackedTarget<T>) -> Ordering {
    b.inlier_count()
        .cmp(&a.inlier_count())
        .then(a.target_id.cmp(&b.target_id))
}
