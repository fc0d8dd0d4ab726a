//! Logging setup and small filesystem/formatting helpers.

pub mod logging;

pub use logging::init_logging;

use std::path::Path;

use crate::error::Result;

/// Create a directory (and its parents) if it does not already exist.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Render an elapsed time compactly for log lines.
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{seconds:.1}s");
    }
    let whole = seconds as u64;
    match whole / 3600 {
        0 => format!("{}m {}s", whole / 60, whole % 60),
        hours => format!("{}h {}m", hours, (whole % 3600) / 60),
    }
}
