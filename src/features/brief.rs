//! Oriented BRIEF descriptors.

use image::GrayImage;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::types::Descriptor;

/// Sampling points stay inside this disc before rotation.
const PATTERN_RADIUS: i32 = 13;
/// Keypoints closer than this to the level border get no descriptor.
pub const DESCRIPTOR_BORDER: f32 = 19.0;
const ORIENTATION_RADIUS: i32 = 15;
const PATTERN_SEED: u64 = 0x0b71ef;

pub struct BriefExtractor {
    pattern: Vec<[f32; 4]>,
}

impl Default for BriefExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl BriefExtractor {
    pub fn new() -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(PATTERN_SEED);
        let sample = |rng: &mut ChaCha8Rng| loop {
            let x = rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
            let y = rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
            if x * x + y * y <= PATTERN_RADIUS * PATTERN_RADIUS {
                return (x as f32, y as f32);
            }
        };
        let mut pattern = Vec::with_capacity(Descriptor::BITS);
        while pattern.len() < Descriptor::BITS {
            let a = sample(&mut rng);
            let b = sample(&mut rng);
            if a != b {
                pattern.push([a.0, a.1, b.0, b.1]);
            }
        }
        Self { pattern }
    }

    /// `smoothed` is the blurred level image, `(x, y)` the keypoint in that
    /// level's coordinates. Returns `None` too close to the border.
    pub fn compute(&self, smoothed: &GrayImage, x: f32, y: f32, angle: f32) -> Option<Descriptor> {
        let (width, height) = smoothed.dimensions();
        if x < DESCRIPTOR_BORDER
            || y < DESCRIPTOR_BORDER
            || x >= width as f32 - DESCRIPTOR_BORDER
            || y >= height as f32 - DESCRIPTOR_BORDER
        {
            return None;
        }

        let (sin_a, cos_a) = angle.sin_cos();
        let sample = |px: f32, py: f32| -> u8 {
            let rx = px * cos_a - py * sin_a;
            let ry = px * sin_a + py * cos_a;
            smoothed
                .get_pixel((x + rx).round() as u32, (y + ry).round() as u32)
                .0[0]
        };

        let mut descriptor = Descriptor::zeros();
        for (i, p) in self.pattern.iter().enumerate() {
            if sample(p[0], p[1]) < sample(p[2], p[3]) {
                descriptor.set_bit(i);
            }
        }
        Some(descriptor)
    }
}

/// Orientation of the intensity centroid in a disc around `(x, y)`.
pub fn intensity_centroid_angle(image: &GrayImage, x: u32, y: u32) -> f32 {
    let (width, height) = image.dimensions();
    let mut m10 = 0.0f32;
    let mut m01 = 0.0f32;
    for dy in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
        for dx in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
            if dx * dx + dy * dy > ORIENTATION_RADIUS * ORIENTATION_RADIUS {
                continue;
            }
            let px = x as i32 + dx;
            let py = y as i32 + dy;
            if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                continue;
            }
            let v = image.get_pixel(px as u32, py as u32).0[0] as f32;
            m10 += dx as f32 * v;
            m01 += dy as f32 * v;
        }
    }
    m01.atan2(m10)
}
