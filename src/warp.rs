use glam::Vec2;
use image::{GrayImage, ImageBuffer, Luma, Pixel, RgbImage};
use nalgebra as na;

use crate::optimization::homography_dlt;

/// Warps `src` into a `width` x `height` canvas so that `src` pixel `p` lands
/// on `h * p`. Bilinear sampling; pixels mapping outside `src` are zero.
pub fn warp_perspective<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    h: &na::Matrix3<f64>,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    let channels = P::CHANNEL_COUNT as usize;
    let zero = *P::from_slice(&[0u8; 4][..channels]);
    let Some(h_inv) = h.try_inverse() else {
        return ImageBuffer::from_pixel(width, height, zero);
    };
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return ImageBuffer::from_pixel(width, height, zero);
    }

    ImageBuffer::from_par_fn(width, height, |x, y| {
        let v = h_inv * na::Vector3::new(x as f64, y as f64, 1.0);
        if v.z.abs() < f64::EPSILON {
            return zero;
        }
        let sx = v.x / v.z;
        let sy = v.y / v.z;
        if sx < 0.0 || sy < 0.0 || sx > (sw - 1) as f64 || sy > (sh - 1) as f64 {
            return zero;
        }
        let x0 = sx.floor() as u32;
        let y0 = sy.floor() as u32;
        let x1 = (x0 + 1).min(sw - 1);
        let y1 = (y0 + 1).min(sh - 1);
        let fx = sx - x0 as f64;
        let fy = sy - y0 as f64;

        let (p00, p10) = (src.get_pixel(x0, y0), src.get_pixel(x1, y0));
        let (p01, p11) = (src.get_pixel(x0, y1), src.get_pixel(x1, y1));
        let mut out = [0u8; 4];
        for (c, o) in out.iter_mut().enumerate().take(channels) {
            let top = p00.channels()[c] as f64 * (1.0 - fx) + p10.channels()[c] as f64 * fx;
            let bottom = p01.channels()[c] as f64 * (1.0 - fx) + p11.channels()[c] as f64 * fx;
            *o = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
        }
        *P::from_slice(&out[..channels])
    })
}

/// Pastes `overlay` onto `frame` so that its four corners land on `quad`
/// (in `Rect::corners` order).
///
/// Pixels are opaque where `mask` has luma above `mask_threshold`; `mask` is
/// stretched over the same quad, so it may differ in size from `overlay`.
/// Without a mask the overlay's own luma is thresholded instead.
pub fn composite_overlay(
    frame: &RgbImage,
    overlay: &RgbImage,
    mask: Option<&GrayImage>,
    quad: &[Vec2; 4],
    mask_threshold: u8,
) -> RgbImage {
    let (fw, fh) = frame.dimensions();
    let Some(h) = quad_homography(overlay.dimensions(), quad) else {
        log::debug!("degenerate overlay quad {:?}", quad);
        return frame.clone();
    };

    let binarize = |luma: u8| if luma > mask_threshold { Luma([255]) } else { Luma([0]) };
    let (mask, h_mask) = match mask {
        Some(m) => {
            let Some(h_mask) = quad_homography(m.dimensions(), quad) else {
                return frame.clone();
            };
            let binary = GrayImage::from_fn(m.width(), m.height(), |x, y| {
                binarize(m.get_pixel(x, y).0[0])
            });
            (binary, h_mask)
        }
        None => {
            let binary = GrayImage::from_fn(overlay.width(), overlay.height(), |x, y| {
                binarize(overlay.get_pixel(x, y).to_luma().0[0])
            });
            (binary, h)
        }
    };
    let warped = warp_perspective(overlay, &h, fw, fh);
    let warped_mask = warp_perspective(&mask, &h_mask, fw, fh);

    RgbImage::from_fn(fw, fh, |x, y| {
        if warped_mask.get_pixel(x, y).0[0] > 127 {
            *warped.get_pixel(x, y)
        } else {
            *frame.get_pixel(x, y)
        }
    })
}

/// Homography taking the corners of a `width` x `height` image onto `quad`.
fn quad_homography((width, height): (u32, u32), quad: &[Vec2; 4]) -> Option<na::Matrix3<f64>> {
    if width == 0 || height == 0 {
        return None;
    }
    let corners = [
        Vec2::new(0.0, 0.0),
        Vec2::new(width as f32, 0.0),
        Vec2::new(width as f32, height as f32),
        Vec2::new(0.0, height as f32),
    ];
    homography_dlt(&corners, quad)
}
