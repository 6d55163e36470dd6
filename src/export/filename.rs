use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use regex::Regex;

/// Timestamp suffix of snapshot files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

// Invalid characters for Windows: < > : " / \ | ? * plus control characters
static INVALID_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("invalid character pattern is valid")
});

static RESERVED_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])$").expect("reserved name pattern is valid")
});

/// Sanitize a filename for cross-platform compatibility
/// Removes/replaces characters that are invalid on Windows, macOS, or Linux
pub fn sanitize_filename(name: &str) -> String {
    let sanitized = INVALID_CHARS.replace_all(name, "_");

    // Trim leading/trailing spaces and dots (problematic on Windows)
    let sanitized = sanitized.trim_matches(|c| c == ' ' || c == '.');

    if RESERVED_NAMES.is_match(sanitized) {
        return format!("_{sanitized}");
    }

    // Leave room for the timestamp, collision counter and extension
    let sanitized: String = sanitized.chars().take(200).collect();

    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized
    }
}

/// Base name of a document without directory and extension, sanitized.
pub fn document_base_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    sanitize_filename(&stem)
}

/// `<base>_<YYYY-MM-DD-HHMMSS>.png`
pub fn snapshot_name<Tz: TimeZone>(base: &str, time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{base}_{}.png", time.format(TIMESTAMP_FORMAT))
}

/// First free snapshot path in `dir`.
///
/// Two snapshots taken within the same second get `-1`, `-2`, ... appended
/// before the extension.
pub fn unique_snapshot_path<Tz: TimeZone>(dir: &Path, base: &str, time: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    let first = dir.join(snapshot_name(base, time));
    if !first.exists() {
        return first;
    }

    let stamp = time.format(TIMESTAMP_FORMAT);
    (1u32..)
        .map(|n| dir.join(format!("{base}_{stamp}-{n}.png")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}
