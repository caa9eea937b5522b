pub mod brief;
pub mod fast;

use glam::Vec2;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use imageproc::filter::gaussian_blur_f32;
use log::trace;
use rayon::prelude::*;

use crate::config::OrbConfig;
use crate::types::{Descriptor, Features, KeyPoint};
pub use brief::BriefExtractor;
pub use fast::{Corner, FastDetector};

/// ORB-style extractor: FAST corners on an image pyramid, Harris ranking,
/// intensity-centroid orientation and oriented BRIEF descriptors.
///
/// Stateless between calls; the same pixels always give the same features.
pub struct OrbExtractor {
    config: OrbConfig,
    detector: FastDetector,
    brief: BriefExtractor,
}

impl OrbExtractor {
    pub fn new(config: &OrbConfig) -> Self {
        Self {
            config: config.clone(),
            detector: FastDetector::new(
                config.fast_threshold,
                config.harris_k,
                config.edge_threshold,
            ),
            brief: BriefExtractor::new(),
        }
    }

    pub fn extract(&self, image: &DynamicImage) -> Features {
        self.extract_gray(&image.to_luma8())
    }

    pub fn extract_gray(&self, image: &GrayImage) -> Features {
        let pyramid = self.build_pyramid(image);
        let total_area: f32 = pyramid.iter().map(|(img, _)| area(img)).sum();

        let per_level: Vec<Vec<(KeyPoint, Descriptor)>> = pyramid
            .par_iter()
            .enumerate()
            .map(|(octave, (level, scale))| {
                let quota =
                    (self.config.max_features as f32 * area(level) / total_area).ceil() as usize;
                self.extract_level(level, octave as u8, *scale, quota)
            })
            .collect();

        let (keypoints, descriptors): (Vec<_>, Vec<_>) = per_level
            .into_iter()
            .flatten()
            .take(self.config.max_features)
            .unzip();
        trace!("extracted {} features", keypoints.len());
        Features {
            keypoints,
            descriptors,
        }
    }

    /// Level images paired with their per-axis scale relative to level 0.
    fn build_pyramid(&self, image: &GrayImage) -> Vec<(GrayImage, Vec2)> {
        let min_side = 2 * self.config.edge_threshold.max(3) + 1;
        let mut levels = vec![(image.clone(), Vec2::ONE)];
        for l in 1..self.config.n_levels.max(1) {
            let scale = self.config.scale_factor.powi(l as i32);
            let w = (image.width() as f32 / scale).round() as u32;
            let h = (image.height() as f32 / scale).round() as u32;
            if w < min_side || h < min_side {
                break;
            }
            // sizes are rounded, so the real scale differs slightly from `scale`
            let real_scale = Vec2::new(
                image.width() as f32 / w as f32,
                image.height() as f32 / h as f32,
            );
            levels.push((
                image::imageops::resize(image, w, h, FilterType::Triangle),
                real_scale,
            ));
        }
        levels
    }

    fn extract_level(
        &self,
        level: &GrayImage,
        octave: u8,
        scale: Vec2,
        quota: usize,
    ) -> Vec<(KeyPoint, Descriptor)> {
        let mut corners = self.detector.detect(level);
        // strongest first, row-major among equals
        corners.sort_by(|a, b| {
            b.response
                .total_cmp(&a.response)
                .then(a.y.cmp(&b.y))
                .then(a.x.cmp(&b.x))
        });

        let smoothed = if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(level, self.config.blur_sigma)
        } else {
            level.clone()
        };

        corners
            .iter()
            .filter_map(|c| {
                let angle = brief::intensity_centroid_angle(level, c.x, c.y);
                let descriptor = self.brief.compute(&smoothed, c.x as f32, c.y as f32, angle)?;
                let kp = KeyPoint {
                    pt: level_to_image(Vec2::new(c.x as f32, c.y as f32), scale),
                    response: c.response,
                    angle,
                    octave,
                };
                Some((kp, descriptor))
            })
            .take(quota)
            .collect()
    }
}

/// Maps a level pixel to full resolution; pixel centres line up between
/// levels the way `imageops::resize` samples them.
fn level_to_image(p: Vec2, scale: Vec2) -> Vec2 {
    (p + 0.5) * scale - 0.5
}

fn area(img: &GrayImage) -> f32 {
    img.width() as f32 * img.height() as f32
}
