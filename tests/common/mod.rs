#![allow(dead_code)]

use glam::Vec2;
use image::{DynamicImage, GrayImage, Luma};
use nalgebra as na;
use planar_tracker::optimization::perspective_transform;
use planar_tracker::warp::warp_perspective;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Random gray checker cells, every cell junction is a candidate corner.
pub fn textured_image(width: u32, height: u32, cell: u32, seed: u64) -> GrayImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let cols = width.div_ceil(cell);
    let rows = height.div_ceil(cell);
    let values: Vec<u8> = (0..cols * rows).map(|_| rng.random_range(0..=255u8)).collect();
    GrayImage::from_fn(width, height, |x, y| {
        Luma([values[((y / cell) * cols + x / cell) as usize]])
    })
}

pub fn uniform_image(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value])))
}

pub fn warp(image: &GrayImage, h: &na::Matrix3<f64>) -> DynamicImage {
    let (w, hgt) = image.dimensions();
    DynamicImage::ImageLuma8(warp_perspective(image, h, w, hgt))
}

/// Mild rotation, scale and perspective.
pub fn mild_homography() -> na::Matrix3<f64> {
    na::Matrix3::new(0.98, -0.06, 12.0, 0.05, 0.97, -6.0, 1e-5, 2e-5, 1.0)
}

pub fn translation(tx: f64, ty: f64) -> na::Matrix3<f64> {
    na::Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0)
}

pub fn expected_quad(h: &na::Matrix3<f64>, corners: &[Vec2; 4]) -> Vec<Vec2> {
    perspective_transform(h, corners)
}

pub fn max_corner_error(quad: &[Vec2; 4], expected: &[Vec2]) -> f32 {
    quad.iter()
        .zip(expected)
        .map(|(a, b)| a.distance(*b))
        .fold(0.0, f32::max)
}
