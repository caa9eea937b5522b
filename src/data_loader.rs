use std::path::{Path, PathBuf};

use glob::glob;
use image::{DynamicImage, ImageReader};

use crate::error::Result;

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        for ext in &[".png", ".jpg", ".jpeg"] {
            if p.as_os_str().to_string_lossy().to_lowercase().ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

/// Image files directly under `root_folder`, sorted by path, starting at
/// `start_idx` and keeping every `step`-th one.
pub fn list_frames(root_folder: &str, start_idx: usize, step: usize) -> Result<Vec<PathBuf>> {
    let img_paths = glob(format!("{}/*", root_folder.trim_end_matches('/')).as_str())?;
    let mut sorted_path: Vec<PathBuf> = img_paths.into_iter().filter_map(img_filter).collect();
    sorted_path.sort();
    log::trace!("found {} frames in {}", sorted_path.len(), root_folder);
    Ok(sorted_path
        .into_iter()
        .skip(start_idx)
        .step_by(step.max(1))
        .collect())
}

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    Ok(ImageReader::open(path)?.decode()?)
}
