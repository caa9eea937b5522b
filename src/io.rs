use std::path::Path;

use glam::Vec2;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;
use crate::tracker::TrackedTarget;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &str, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// One tracked target in one frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TargetReport {
    pub target_id: usize,
    pub inliers: usize,
    pub quad: [[f32; 2]; 4],
    /// Row-major homography from reference image to frame.
    pub homography: [[f64; 3]; 3],
}

impl<T> From<&TrackedTarget<T>> for TargetReport {
    fn from(t: &TrackedTarget<T>) -> Self {
        TargetReport {
            target_id: t.target_id,
            inliers: t.inlier_count(),
            quad: t.quad.map(|p| [p.x, p.y]),
            homography: std::array::from_fn(|r| std::array::from_fn(|c| t.h[(r, c)])),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameReport {
    pub frame_idx: usize,
    pub path: String,
    pub keypoints: usize,
    pub targets: Vec<TargetReport>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackingReport {
    pub reference: String,
    pub rect: [f32; 4],
    pub frame_width: u32,
    pub frame_height: u32,
    pub frames: Vec<FrameReport>,
}

impl TrackingReport {
    /// Frames in which at least one target was found.
    pub fn tracked_frames(&self) -> usize {
        self.frames.iter().filter(|f| !f.targets.is_empty()).count()
    }
}

/// Writes `track_01.txt` .. `track_04.txt` in `output_dir`.
///
/// Each file holds one corner, one `x y` line per tracked frame, with `y`
/// measured upwards from the bottom of the frame. Corners go out in the order
/// quad[0], quad[3], quad[2], quad[1].
pub fn write_corner_tracks(output_dir: &Path, frame_height: u32, quads: &[[Vec2; 4]]) -> Result<()> {
    const CORNER_ORDER: [usize; 4] = [0, 3, 2, 1];
    for (file_idx, &corner) in CORNER_ORDER.iter().enumerate() {
        let mut s = String::new();
        for quad in quads {
            let p = quad[corner];
            s += format!("{} {}\n", p.x, frame_height as f32 - p.y).as_str();
        }
        let path = output_dir.join(format!("track_{:02}.txt", file_idx + 1));
        std::fs::write(path, s)?;
    }
    Ok(())
}
