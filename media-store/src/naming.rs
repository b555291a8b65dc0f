//! Blob naming: date-based target directories, path joining and the
//! collision-avoiding candidate sequence used by uploads.

use chrono::{DateTime, Datelike, Utc};

/// Default target directory for uploads: `YYYY/MM` of the given instant
pub fn default_target_dir(now: DateTime<Utc>) -> String {
    format!("{:04}/{:02}", now.year(), now.month())
}

/// Target directory for "now"
pub fn current_target_dir() -> String {
    default_target_dir(Utc::now())
}

/// Join a directory and a name into a blob path using `/` separators.
///
/// Empty segments and `.` are dropped, `..` removes the previous segment, and
/// backslashes are treated as separators.
pub fn join_blob_path(dir: &str, name: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split(['/', '\\']).chain(name.split(['/', '\\'])) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Split an original filename into a sanitized stem and its extension
/// (including the leading dot, empty when there is none).
pub fn split_file_name(original: &str) -> (String, String) {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);

    let (stem, ext) = match base.rfind('.') {
        Some(idx) if idx > 0 => (&base[..idx], &base[idx..]),
        _ => (base, ""),
    };

    (sanitize_stem(stem), ext.to_string())
}

/// The `attempt`-th candidate name: `dir/stem.ext`, then `dir/stem-1.ext`, ...
pub fn candidate_name(dir: &str, stem: &str, ext: &str, attempt: u32) -> String {
    let file = if attempt == 0 {
        format!("{stem}{ext}")
    } else {
        format!("{stem}-{attempt}{ext}")
    };
    join_blob_path(dir, &file)
}

fn sanitize_stem(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut last_dash = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
