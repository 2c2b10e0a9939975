#![crate_name = "reclaim"]

pub mod cli;
pub mod config;
pub mod engine;
pub mod probe;
pub mod progress;
pub mod sweep;

pub use engine::{Engine, EngineError, SweepResult, TargetSet};
pub use progress::{ProgressEvent, ProgressSink};

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    /// Collapses the two CLI flags into one level; asking for both at once
    /// cancels out to the default.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, false) => Self::Verbose,
            (false, true) => Self::Quiet,
            _ => Self::Normal,
        }
    }

    /// Per-target size lines, warnings, and the terminal summary.
    pub fn shows_progress(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Per-file and per-directory deletion lines.
    pub fn shows_items(self) -> bool {
        matches!(self, Self::Verbose)
    }
}

/// Formats a byte count the way it should read in a log line: B through TB,
/// two decimals above 1 KB.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_flag_combinations() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Normal);
    }

    #[test]
    fn byte_formatting_scales_through_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
