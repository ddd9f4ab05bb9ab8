//! Progress reporting for the per-area loop.
//!
//! Decouples [`crate::analyze_areas`] from any rendering backend.
//! `nestwatch_cli_utils` provides an `indicatif` implementation.

/// Receives progress while areas are analyzed.
pub trait AreaProgress: Send + Sync {
    /// Called once with the number of areas.
    fn start(&self, total: u64);

    /// Called after each area with its name and nest count.
    fn area_done(&self, area: &str, nests: usize);

    /// Called once after the last area.
    fn finish(&self, message: String);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl AreaProgress for NullProgress {
    fn start(&self, _total: u64) {}
    fn area_done(&self, _area: &str, _nests: usize) {}
    fn finish(&self, _message: String) {}
}
