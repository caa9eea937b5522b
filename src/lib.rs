//! Planar target tracking.
//!
//! Register rectangles of reference images with [`PlaneTracker::add_target`],
//! then call [`PlaneTracker::track`] on every frame to get the homography
//! and outline of each target that is visible.

pub mod config;
pub mod data_loader;
pub mod error;
pub mod features;
pub mod index;
pub mod io;
pub mod optimization;
pub mod tracker;
pub mod types;
pub mod warp;

pub use config::{LshConfig, OrbConfig, RansacConfig, TrackerConfig};
pub use error::{Result, TrackerError};
pub use index::{BruteForceIndex, DescriptorIndex, IndexMatch, LshIndex};
pub use tracker::{PlanarTarget, PlaneTracker, TrackedTarget};
pub use types::{Descriptor, Features, KeyPoint, Rect};
