mod common;

use common::*;
use glam::Vec2;
use image::{DynamicImage, GrayImage};
use planar_tracker::features::OrbExtractor;
use planar_tracker::{
    BruteForceIndex, DescriptorIndex, LshIndex, OrbConfig, PlaneTracker, Rect, TrackerConfig,
};

fn reference() -> GrayImage {
    textured_image(320, 240, 8, 7)
}

fn reference_rect() -> Rect {
    Rect::new(60.0, 50.0, 260.0, 190.0).unwrap()
}

#[test]
fn test_track_before_registration() {
    let mut tracker: PlaneTracker = PlaneTracker::default();
    let frame = DynamicImage::ImageLuma8(reference());
    assert!(tracker.track(&frame).is_empty());
    assert!(!tracker.frame_points().is_empty());
}

#[test]
fn test_with_index_starts_empty() {
    let reference = reference();
    let descriptors = OrbExtractor::new(&OrbConfig::default())
        .extract_gray(&reference)
        .descriptors;
    let mut index = BruteForceIndex::new();
    index.add(&descriptors, 3);
    let reference = DynamicImage::ImageLuma8(reference);

    let mut tracker: PlaneTracker<(), BruteForceIndex> =
        PlaneTracker::with_index(TrackerConfig::default(), index);
    assert!(tracker.is_empty());
    assert!(tracker.track(&reference).is_empty());

    assert_eq!(tracker.add_target(&reference, reference_rect(), None), 0);
    let tracked = tracker.track(&reference);
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].target_id, 0);
}

#[test]
fn test_track_translation() {
    let reference = reference();
    let rect = reference_rect();
    let h_true = translation(10.0, 6.0);
    let frame = warp(&reference, &h_true);

    let mut tracker: PlaneTracker<(), BruteForceIndex> =
        PlaneTracker::with_index(TrackerConfig::default(), BruteForceIndex::new());
    let id = tracker.add_target(&DynamicImage::ImageLuma8(reference), rect, None);
    assert_eq!(id, 0);

    let tracked = tracker.track(&frame);
    assert_eq!(tracked.len(), 1);
    let t = &tracked[0];
    assert_eq!(t.target_id, 0);
    assert!(t.inlier_count() >= tracker.config().min_match_count);
    assert_eq!(t.p0.len(), t.p1.len());

    let expected = expected_quad(&h_true, &rect.corners());
    let err = max_corner_error(&t.quad, &expected);
    assert!(err < 1.5, "corner error {}", err);
}

fn track_mild_homography<I: planar_tracker::DescriptorIndex>(
    mut tracker: PlaneTracker<(), I>,
    tolerance: f32,
) {
    let reference = reference();
    let rect = reference_rect();
    let h_true = mild_homography();
    let frame = warp(&reference, &h_true);

    tracker.add_target(&DynamicImage::ImageLuma8(reference), rect, None);
    let tracked = tracker.track(&frame);
    assert_eq!(tracked.len(), 1);

    let t = &tracked[0];
    let expected = expected_quad(&h_true, &rect.corners());
    let err = max_corner_error(&t.quad, &expected);
    assert!(err < tolerance, "corner error {}", err);

    // inliers agree with the estimated homography
    let mapped = planar_tracker::optimization::perspective_transform(&t.h, &t.p0);
    for (m, p) in mapped.iter().zip(&t.p1) {
        assert!(m.distance(*p) <= tracker.config().ransac.reproj_threshold as f32 + 1e-3);
    }
}

#[test]
fn test_track_homography_brute_force() {
    let tracker = PlaneTracker::with_index(TrackerConfig::default(), BruteForceIndex::new());
    track_mild_homography(tracker, 2.0);
}

#[test]
fn test_track_homography_lsh() {
    track_mild_homography(PlaneTracker::<(), LshIndex>::default(), 2.0);
}

#[test]
fn test_track_is_idempotent() {
    let reference = reference();
    let frame = warp(&reference, &mild_homography());
    let mut tracker: PlaneTracker = PlaneTracker::default();
    tracker.add_target(&DynamicImage::ImageLuma8(reference), reference_rect(), None);

    let first = tracker.track(&frame);
    let second = tracker.track(&frame);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_track_orders_by_inliers() {
    let image_a = textured_image(320, 240, 8, 1);
    let image_b = textured_image(320, 240, 8, 2);
    let frame = GrayImage::from_fn(640, 240, |x, y| {
        if x < 320 {
            *image_a.get_pixel(x, y)
        } else {
            *image_b.get_pixel(x - 320, y)
        }
    });

    let mut tracker: PlaneTracker<String, BruteForceIndex> =
        PlaneTracker::with_index(TrackerConfig::default(), BruteForceIndex::new());
    let small = Rect::new(110.0, 70.0, 210.0, 170.0).unwrap();
    let large = Rect::new(50.0, 30.0, 270.0, 210.0).unwrap();
    let id_a = tracker.add_target(&DynamicImage::ImageLuma8(image_a), small, Some("a".to_string()));
    let id_b = tracker.add_target(&DynamicImage::ImageLuma8(image_b), large, Some("b".to_string()));
    assert_eq!((id_a, id_b), (0, 1));

    let tracked = tracker.track(&DynamicImage::ImageLuma8(frame));
    assert_eq!(tracked.len(), 2);
    assert_eq!(tracked[0].target_id, 1);
    assert_eq!(tracked[1].target_id, 0);
    assert!(tracked[0].inlier_count() >= tracked[1].inlier_count());
    assert_eq!(tracked[0].target.data.as_deref(), Some("b"));
    assert_eq!(tracked[1].target.data.as_deref(), Some("a"));

    let offset = Vec2::new(320.0, 0.0);
    let expected: Vec<Vec2> = large.corners().iter().map(|c| *c + offset).collect();
    assert!(max_corner_error(&tracked[0].quad, &expected) < 1.5);
    let expected: Vec<Vec2> = small.corners().to_vec();
    assert!(max_corner_error(&tracked[1].quad, &expected) < 1.5);
}

#[test]
fn test_track_only_visible_targets() {
    let image_a = textured_image(320, 240, 8, 1);
    let image_b = textured_image(320, 240, 8, 2);
    let mut tracker: PlaneTracker = PlaneTracker::default();
    tracker.add_target(&DynamicImage::ImageLuma8(image_a.clone()), reference_rect(), None);
    tracker.add_target(&DynamicImage::ImageLuma8(image_b), reference_rect(), None);

    let tracked = tracker.track(&warp(&image_a, &translation(-4.0, 3.0)));
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].target_id, 0);
}

#[test]
fn test_clear_resets_ids() {
    let reference = DynamicImage::ImageLuma8(reference());
    let mut tracker: PlaneTracker = PlaneTracker::default();
    assert_eq!(tracker.add_target(&reference, reference_rect(), None), 0);
    assert_eq!(tracker.add_target(&reference, reference_rect(), None), 1);
    assert_eq!(tracker.len(), 2);

    tracker.clear();
    assert!(tracker.is_empty());
    assert!(tracker.track(&reference).is_empty());

    assert_eq!(tracker.add_target(&reference, reference_rect(), None), 0);
    let tracked = tracker.track(&reference);
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].target_id, 0);
}

#[test]
fn test_featureless_frame() {
    let mut tracker: PlaneTracker = PlaneTracker::default();
    tracker.add_target(&DynamicImage::ImageLuma8(reference()), reference_rect(), None);

    let tracked = tracker.track(&uniform_image(320, 240, 128));
    assert!(tracked.is_empty());
    assert!(tracker.frame_points().is_empty());
}

#[test]
fn test_min_match_count_not_reached() {
    let config = TrackerConfig {
        min_match_count: 100_000,
        ..Default::default()
    };
    let reference = DynamicImage::ImageLuma8(reference());
    let mut tracker: PlaneTracker = PlaneTracker::new(config);
    tracker.add_target(&reference, reference_rect(), None);
    assert!(tracker.track(&reference).is_empty());
}

#[test]
fn test_no_duplicate_target_ids() {
    let reference = reference();
    let frame = warp(&reference, &translation(3.0, -2.0));
    let reference = DynamicImage::ImageLuma8(reference);
    let mut tracker: PlaneTracker = PlaneTracker::default();
    // overlapping rects of the same image compete for the same matches
    tracker.add_target(&reference, reference_rect(), None);
    tracker.add_target(&reference, Rect::new(20.0, 20.0, 300.0, 220.0).unwrap(), None);
    tracker.add_target(&reference, Rect::new(100.0, 60.0, 220.0, 180.0).unwrap(), None);

    let tracked = tracker.track(&frame);
    let mut ids: Vec<usize> = tracked.iter().map(|t| t.target_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), tracked.len());
    for pair in tracked.windows(2) {
        assert!(pair[0].inlier_count() >= pair[1].inlier_count());
    }
}
