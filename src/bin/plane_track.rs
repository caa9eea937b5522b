use std::path::Path;
use std::time::Instant;

use clap::Parser;
use indicatif::ProgressIterator;
use log::{info, warn};
use planar_tracker::data_loader::{list_frames, load_image};
use planar_tracker::io::{FrameReport, TargetReport, TrackingReport, object_to_json, write_corner_tracks};
use planar_tracker::warp::composite_overlay;
use planar_tracker::{PlaneTracker, Rect, TrackerConfig};

#[derive(Parser)]
#[command(version, about, author)]
struct PlaneTrackCli {
    /// reference image holding the target
    reference: String,

    /// target rect in reference pixels
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,

    /// folder with the frames (*.png, *.jpg), tracked in path order
    frames_dir: String,

    /// tracker config json, defaults are used for missing fields
    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long, default_value = "output")]
    output: String,

    /// image pasted onto the tracked quad of every frame
    #[arg(long)]
    overlay: Option<String>,

    /// mask image stretched over the same quad, white where the overlay shows;
    /// without it the overlay's own luma is used
    #[arg(long, requires = "overlay")]
    mask: Option<String>,

    /// mask pixels with luma at or below this are transparent
    #[arg(long, default_value = "10")]
    mask_threshold: u8,

    /// write track_01.txt .. track_04.txt corner files
    #[arg(long)]
    export_corners: bool,

    #[arg(long, default_value = "0")]
    start_idx: usize,

    #[arg(long, default_value = "1")]
    step: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = PlaneTrackCli::parse();

    let config = match &cli.config {
        Some(path) => TrackerConfig::from_json_file(path)?,
        None => TrackerConfig::default(),
    };
    let rect = Rect::new(cli.x0, cli.y0, cli.x1, cli.y1)?;
    let output_dir = Path::new(&cli.output);
    std::fs::create_dir_all(output_dir)?;

    let reference = load_image(Path::new(&cli.reference))?;
    let mut tracker: PlaneTracker = PlaneTracker::new(config);
    let target_id = tracker.add_target(&reference, rect, None);
    let target_keypoints = tracker.targets()[target_id].keypoints.len();
    info!("registered target {} with {} keypoints", target_id, target_keypoints);
    if target_keypoints < tracker.config().min_match_count {
        warn!("target has too few keypoints to ever be tracked");
    }

    let overlay = match &cli.overlay {
        Some(path) => {
            std::fs::create_dir_all(output_dir.join("overlay"))?;
            Some(load_image(Path::new(path))?.to_rgb8())
        }
        None => None,
    };
    let mask = match &cli.mask {
        Some(path) => Some(load_image(Path::new(path))?.to_luma8()),
        None => None,
    };

    let frame_paths = list_frames(&cli.frames_dir, cli.start_idx, cli.step)?;
    let mut report = TrackingReport {
        reference: cli.reference.clone(),
        rect: rect.into(),
        ..Default::default()
    };
    let mut quads = Vec::new();
    let now = Instant::now();
    for (frame_idx, path) in frame_paths.iter().enumerate().progress_count(frame_paths.len() as u64) {
        let frame = load_image(path)?;
        report.frame_width = frame.width();
        report.frame_height = frame.height();
        let tracked = tracker.track(&frame);

        if let Some(best) = tracked.first() {
            quads.push(best.quad);
            if let Some(overlay) = &overlay {
                let composed = composite_overlay(
                    &frame.to_rgb8(),
                    overlay,
                    mask.as_ref(),
                    &best.quad,
                    cli.mask_threshold,
                );
                let stem = path.file_stem().map(|s| s.to_string_lossy().to_string());
                let name = stem.unwrap_or_else(|| format!("{:06}", frame_idx));
                composed.save(output_dir.join("overlay").join(format!("{}.png", name)))?;
            }
        }

        report.frames.push(FrameReport {
            frame_idx,
            path: path.to_string_lossy().to_string(),
            keypoints: tracker.frame_points().len(),
            targets: tracked.iter().map(TargetReport::from).collect(),
        });
    }
    let duration_sec = now.elapsed().as_secs_f64();
    info!(
        "tracked {} / {} frames in {:.3} sec",
        report.tracked_frames(),
        report.frames.len(),
        duration_sec
    );

    let report_path = output_dir.join("tracking.json");
    object_to_json(&report_path.to_string_lossy(), &report)?;
    if cli.export_corners {
        write_corner_tracks(output_dir, report.frame_height, &quads)?;
    }
    Ok(())
}
