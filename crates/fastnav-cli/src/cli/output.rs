//! Output helpers shared by subcommands.

use serde::Serialize;

/// Print `value` as one JSON line.
pub fn json_line<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!("failed to serialize output: {e}"),
    }
}

/// Shorten markup for terminal display.
pub fn preview(html: &str, max: usize) -> String {
    let flat: String = html.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{cut}…")
}
