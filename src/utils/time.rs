//! Time parsing and formatting utilities

use crate::error::{VideoHelperError, VideoHelperResult};

/// Time parser for the formats accepted on the command line
pub struct TimeParser;

impl TimeParser {
    /// Create a new time parser
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TimeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeParser {
    /// Parse seconds, MM:SS(.ms) or HH:MM:SS(.ms) to seconds
    pub fn parse_time(&self, time_str: &str) -> VideoHelperResult<f64> {
        let time_str = time_str.trim();
        let invalid = || VideoHelperError::InvalidTimeFormat {
            time: time_str.to_string(),
        };

        let parts: Vec<&str> = time_str.split(':').collect();
        let seconds = match parts.as_slice() {
            [seconds] => seconds.parse::<f64>().map_err(|_| invalid())?,
            [minutes, seconds] => {
                let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
                let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
                if seconds >= 60.0 {
                    return Err(invalid());
                }
                Self::clock_seconds(0, minutes, seconds)
            }
            [hours, minutes, seconds] => {
                let hours: u32 = hours.parse().map_err(|_| invalid())?;
                let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
                let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
                if minutes >= 60 || seconds >= 60.0 {
                    return Err(invalid());
                }
                Self::clock_seconds(hours, minutes, seconds)
            }
            _ => return Err(invalid()),
        };

        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid());
        }
        Ok(seconds)
    }

    /// `H*3600 + M*60 + S`
    pub fn clock_seconds(hours: u32, minutes: u32, seconds: f64) -> f64 {
        hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds
    }

    /// Format seconds to HH:MM:SS.ms string
    pub fn format_time(&self, seconds: f64) -> String {
        let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let secs = (total_millis % 60_000) / 1000;
        let milliseconds = total_millis % 1000;

        format!(
            "{:02}:{:02}:{:02}.{:03}",
            hours, minutes, secs, milliseconds
        )
    }
}

/// Seconds as a command-line argument: whole values without a fraction
pub fn seconds_arg(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{}", seconds as u64)
    } else {
        format!("{:.3}", seconds)
    }
}
