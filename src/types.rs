use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Axis-aligned rectangle `(x0, y0, x1, y1)` in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rect {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Result<Rect> {
        // written so that NaN coordinates are rejected too
        if !(x0 < x1 && y0 < y1) {
            return Err(TrackerError::InvalidRect { x0, y0, x1, y1 });
        }
        Ok(Rect { x0, y0, x1, y1 })
    }

    pub fn x0(&self) -> f32 {
        self.x0
    }
    pub fn y0(&self) -> f32 {
        self.y0
    }
    pub fn x1(&self) -> f32 {
        self.x1
    }
    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, p: Vec2) -> bool {
        self.x0 <= p.x && p.x <= self.x1 && self.y0 <= p.y && p.y <= self.y1
    }

    /// Corners in the order top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x0, self.y0),
            Vec2::new(self.x1, self.y0),
            Vec2::new(self.x1, self.y1),
            Vec2::new(self.x0, self.y1),
        ]
    }
}

impl TryFrom<[f32; 4]> for Rect {
    type Error = TrackerError;

    fn try_from(v: [f32; 4]) -> Result<Rect> {
        Rect::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Rect> for [f32; 4] {
    fn from(r: Rect) -> Self {
        [r.x0, r.y0, r.x1, r.y1]
    }
}

/// A detected point of interest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyPoint {
    /// Position in full resolution pixel coordinates.
    pub pt: Vec2,
    /// Harris corner response at the detection level.
    pub response: f32,
    /// Orientation in radians from the intensity centroid.
    pub angle: f32,
    /// Pyramid level the point was detected on.
    pub octave: u8,
}

/// 256-bit binary descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor(pub [u64; 4]);

impl Descriptor {
    pub const BITS: usize = 256;

    pub fn zeros() -> Self {
        Self([0; 4])
    }

    pub fn hamming_distance(&self, other: &Self) -> u32 {
        (self.0[0] ^ other.0[0]).count_ones()
            + (self.0[1] ^ other.0[1]).count_ones()
            + (self.0[2] ^ other.0[2]).count_ones()
            + (self.0[3] ^ other.0[3]).count_ones()
    }

    pub fn bit(&self, i: usize) -> bool {
        (self.0[i / 64] >> (i % 64)) & 1 == 1
    }

    pub fn set_bit(&mut self, i: usize) {
        self.0[i / 64] |= 1 << (i % 64);
    }
}

/// Keypoints and their descriptors; `keypoints[i]` pairs with `descriptors[i]`.
#[derive(Debug, Clone, Default)]
pub struct Features {
    pub keypoints: Vec<KeyPoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Keeps the pairs whose keypoint lies inside `rect`, preserving order.
    pub fn filter_in_rect(self, rect: &Rect) -> Features {
        let (keypoints, descriptors) = self
            .keypoints
            .into_iter()
            .zip(self.descriptors)
            .filter(|(kp, _)| rect.contains(kp.pt))
            .unzip();
        Features {
            keypoints,
            descriptors,
        }
    }
}
