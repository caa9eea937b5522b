use std::sync::Arc;

use glam::Vec2;
use image::{DynamicImage, GrayImage};
use nalgebra as na;
use planar_tracker::data_loader::{list_frames, load_image};
use planar_tracker::io::{
    FrameReport, TargetReport, TrackingReport, object_from_json, object_to_json, write_corner_tracks,
};
use planar_tracker::{PlanarTarget, Rect, TrackedTarget};

fn tracked_target() -> TrackedTarget {
    let rect = Rect::new(0.0, 0.0, 10.0, 20.0).unwrap();
    let target = PlanarTarget {
        image: DynamicImage::ImageLuma8(GrayImage::new(10, 20)),
        rect,
        keypoints: Vec::new(),
        descriptors: Vec::new(),
        data: None,
    };
    TrackedTarget {
        target_id: 2,
        target: Arc::new(target),
        p0: vec![Vec2::ZERO; 12],
        p1: vec![Vec2::ONE; 12],
        h: na::Matrix3::new(1.0, 0.0, 5.0, 0.0, 1.0, 6.0, 0.0, 0.0, 1.0),
        quad: [
            Vec2::new(5.0, 6.0),
            Vec2::new(15.0, 6.0),
            Vec2::new(15.0, 26.0),
            Vec2::new(5.0, 26.0),
        ],
    }
}

#[test]
fn test_target_report() {
    let report = TargetReport::from(&tracked_target());
    assert_eq!(report.target_id, 2);
    assert_eq!(report.inliers, 12);
    assert_eq!(report.quad[2], [15.0, 26.0]);
    assert_eq!(report.homography[0], [1.0, 0.0, 5.0]);
    assert_eq!(report.homography[1], [0.0, 1.0, 6.0]);
}

#[test]
fn test_tracking_report_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracking.json");
    let target = TargetReport::from(&tracked_target());
    let report = TrackingReport {
        reference: "reference.png".to_string(),
        rect: [0.0, 0.0, 10.0, 20.0],
        frame_width: 64,
        frame_height: 48,
        frames: vec![
            FrameReport {
                frame_idx: 0,
                path: "0.png".to_string(),
                keypoints: 100,
                targets: vec![target],
            },
            FrameReport {
                frame_idx: 1,
                path: "1.png".to_string(),
                keypoints: 3,
                targets: Vec::new(),
            },
        ],
    };
    assert_eq!(report.tracked_frames(), 1);

    object_to_json(path.to_str().unwrap(), &report).unwrap();
    let loaded: TrackingReport = object_from_json(path.to_str().unwrap()).unwrap();
    assert_eq!(loaded, report);
}

#[test]
fn test_corner_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let quads = vec![
        [
            Vec2::new(1.0, 2.0),
            Vec2::new(3.0, 4.0),
            Vec2::new(5.0, 6.0),
            Vec2::new(7.0, 8.0),
        ],
        [
            Vec2::new(1.5, 10.0),
            Vec2::new(2.5, 20.0),
            Vec2::new(3.5, 30.0),
            Vec2::new(4.5, 40.0),
        ],
    ];
    write_corner_tracks(dir.path(), 100, &quads).unwrap();

    let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
    assert_eq!(read("track_01.txt"), "1 98\n1.5 90\n");
    assert_eq!(read("track_02.txt"), "7 92\n4.5 60\n");
    assert_eq!(read("track_03.txt"), "5 94\n3.5 70\n");
    assert_eq!(read("track_04.txt"), "3 96\n2.5 80\n");
}

#[test]
fn test_list_frames() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["c.png", "a.JPG", "b.jpeg", "notes.txt", "d.png"] {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }
    let root = dir.path().to_str().unwrap();

    let names = |paths: Vec<std::path::PathBuf>| -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    };
    assert_eq!(
        names(list_frames(root, 0, 1).unwrap()),
        vec!["a.JPG", "b.jpeg", "c.png", "d.png"]
    );
    assert_eq!(names(list_frames(root, 1, 2).unwrap()), vec!["b.jpeg", "d.png"]);
    assert!(list_frames(root, 10, 1).unwrap().is_empty());
}

#[test]
fn test_load_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    GrayImage::from_fn(8, 6, |x, y| image::Luma([(x * 10 + y) as u8]))
        .save(&path)
        .unwrap();
    let loaded = load_image(&path).unwrap().to_luma8();
    assert_eq!(loaded.dimensions(), (8, 6));
    assert_eq!(loaded.get_pixel(3, 2).0[0], 32);

    assert!(load_image(&dir.path().join("missing.png")).is_err());
}
