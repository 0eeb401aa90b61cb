use std::path::Path;

/// Number of trailing log lines attached to crash reports.
pub const DEFAULT_TAIL_LINES: usize = 1000;

pub const LOG_NOT_FOUND: &str = "Log file not found.";

/// Reads the last `max_lines` lines of the log file, newline-terminated.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn read_tail(path: &Path, max_lines: usize) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(max_lines);

    let mut tail = String::new();
    for line in &lines[start..] {
        tail.push_str(line);
        tail.push('\n');
    }
    Ok(tail)
}

/// Like [`read_tail`], but a missing or unreadable file yields a placeholder.
pub fn read_tail_or_placeholder(path: &Path, max_lines: usize) -> String {
    match read_tail(path, max_lines) {
        Ok(tail) => tail,
        Err(e) => {
            tracing::debug!("Could not read log tail from {}: {}", path.display(), e);
            LOG_NOT_FOUND.to_string()
        }
    }
}
