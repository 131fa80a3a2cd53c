//! Formatting utilities for display

use std::time::Duration;

/// Formats a duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();

    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;
        format!("{}h {}m {}s", hours, mins, secs)
    }
}
