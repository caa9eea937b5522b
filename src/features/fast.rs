//! FAST-9 corner detection scored by the Harris response.

use image::GrayImage;
use imageproc::corners::corners_fast9;

const HARRIS_RADIUS: i32 = 3;

/// A corner on one pyramid level, in that level's pixel grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub x: u32,
    pub y: u32,
    pub response: f32,
}

pub struct FastDetector {
    threshold: u8,
    harris_k: f32,
    border: u32,
}

impl FastDetector {
    pub fn new(threshold: u8, harris_k: f32, edge_threshold: u32) -> Self {
        Self {
            threshold,
            harris_k,
            border: edge_threshold.max(3),
        }
    }

    /// Detects corners and keeps the local maxima of the Harris response in
    /// a 3x3 neighbourhood. Output is in row-major order.
    pub fn detect(&self, image: &GrayImage) -> Vec<Corner> {
        let (width, height) = image.dimensions();
        if width <= 2 * self.border || height <= 2 * self.border {
            return Vec::new();
        }

        let w = width as usize;
        let mut scores = vec![f32::NEG_INFINITY; w * height as usize];
        let mut candidates = Vec::new();
        let inside = |x: u32, y: u32| {
            x >= self.border && y >= self.border && x < width - self.border && y < height - self.border
        };
        for c in corners_fast9(image, self.threshold) {
            if !inside(c.x, c.y) {
                continue;
            }
            let response = self.harris_response(image, c.x, c.y);
            // edges pass the segment test now and then, their response is negative
            if response > 0.0 {
                scores[c.y as usize * w + c.x as usize] = response;
                candidates.push(Corner {
                    x: c.x,
                    y: c.y,
                    response,
                });
            }
        }
        // keep the row-major order the local-max tie break relies on
        candidates.sort_by_key(|c| (c.y, c.x));

        candidates
            .into_iter()
            .filter(|c| is_local_max(&scores, w, c))
            .collect()
    }

    /// det(M) - k * trace(M)^2 over a 7x7 window.
    fn harris_response(&self, image: &GrayImage, x: u32, y: u32) -> f32 {
        let (width, height) = image.dimensions();
        let at = |px: i32, py: i32| -> f32 {
            let px = px.clamp(0, width as i32 - 1) as u32;
            let py = py.clamp(0, height as i32 - 1) as u32;
            image.get_pixel(px, py).0[0] as f32
        };

        let mut sxx = 0.0f32;
        let mut syy = 0.0f32;
        let mut sxy = 0.0f32;
        for dy in -HARRIS_RADIUS..=HARRIS_RADIUS {
            for dx in -HARRIS_RADIUS..=HARRIS_RADIUS {
                let px = x as i32 + dx;
                let py = y as i32 + dy;
                let ix = (at(px + 1, py) - at(px - 1, py)) / 2.0;
                let iy = (at(px, py + 1) - at(px, py - 1)) / 2.0;
                sxx += ix * ix;
                syy += iy * iy;
                sxy += ix * iy;
            }
        }
        let det = sxx * syy - sxy * sxy;
        let trace = sxx + syy;
        det - self.harris_k * trace * trace
    }
}

/// Equal scores are resolved in favour of the earlier pixel in row-major order.
fn is_local_max(scores: &[f32], w: usize, c: &Corner) -> bool {
    let idx = c.y as usize * w + c.x as usize;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let n = (idx as i64 + dy * w as i64 + dx) as usize;
            let other = scores[n];
            if other > c.response || (other == c.response && n < idx) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_uniform_image_has_no_corners() {
        let detector = FastDetector::new(20, 0.04, 3);
        let image = GrayImage::from_pixel(64, 64, Luma([128]));
        assert!(detector.detect(&image).is_empty());
    }

    #[test]
    fn test_tiny_image_is_skipped() {
        let detector = FastDetector::new(20, 0.04, 3);
        let image = GrayImage::new(6, 6);
        assert!(detector.detect(&image).is_empty());
    }

    #[test]
    fn test_square_corners_found() {
        let detector = FastDetector::new(20, 0.04, 3);
        let image = GrayImage::from_fn(64, 64, |x, y| {
            if (20..44).contains(&x) && (20..44).contains(&y) {
                Luma([220])
            } else {
                Luma([30])
            }
        });
        let corners = detector.detect(&image);
        for (cx, cy) in [(20, 20), (43, 20), (43, 43), (20, 43)] {
            assert!(
                corners
                    .iter()
                    .any(|c| (c.x as i32 - cx).abs() <= 2 && (c.y as i32 - cy).abs() <= 2),
                "no corner near ({}, {})",
                cx,
                cy
            );
        }
    }
}
