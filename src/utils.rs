use std::fs;
use std::io::{self, IsTerminal};

/// Create an OSC8 hyperlink for terminal output.
///
/// Plain `text` when stdout is not a terminal, so piped quotes stay clean.
pub fn osc8_link(url: &str, text: &str) -> String {
    if io::stdout().is_terminal() {
        format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", url, text)
    } else {
        text.to_string()
    }
}

/// Create an OSC8 file:// hyperlink for a data file
pub fn osc8_file_link(path: &str, text: &str) -> String {
    let abs_path = fs::canonicalize(path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string());
    osc8_link(&format!("file://{}", abs_path), text)
}
