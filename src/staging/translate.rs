//! Source path to staged path translation
//!
//! Every staged file lives directly in its category directory under a flat,
//! filesystem-safe name derived from the full source path:
//!
//! | Source | Staged name |
//! |--------|-------------|
//! | `/data/projA/NC001.h` | `_SLASH_data_SLASH_projA_SLASH_NC001.h` |
//! | `C:\jobs\a.h` | `C_COLON__BACKSLASH_jobs_BACKSLASH_a.h` |
//! | over 180 chars, or too many bytes for one file name | `{md5[..12]}_{parent}_{file}` |
//!
//! The overflow form cannot be reversed from the name alone, and neither can a
//! baseline name whose source already contained a token such as `_SLASH_`.
//! Sessions keep their own staged-to-source mapping
//! ([`StagingSession::source_for`](crate::staging::StagingSession::source_for)).

use crate::error::{StageError, StageResult};
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};

/// Longest baseline name accepted before switching to the hashed form
pub const MAX_BASELINE_LEN: usize = 180;

/// File-name component limit of common filesystems, in bytes
pub const MAX_NAME_BYTES: usize = 255;

/// Bytes appended to a staged name while its copy is in flight (`.partial-xxxxxxxx`)
pub const PARTIAL_SUFFIX_LEN: usize = 17;

const MAX_PARENT_BYTES: usize = 64;
const MAX_FILE_BYTES: usize = 96;

const COLON: &str = "_COLON_";
const BACKSLASH: &str = "_BACKSLASH_";
const SLASH: &str = "_SLASH_";

/// Compute the flat staged file name for a source path
pub fn staged_name(source: &Path) -> String {
    let raw = source.to_string_lossy();
    let candidate = baseline(&raw);

    if candidate.chars().count() > MAX_BASELINE_LEN
        || candidate.len() + PARTIAL_SUFFIX_LEN > MAX_NAME_BYTES
    {
        overflow(source, &raw)
    } else {
        candidate
    }
}

/// Translate a source path into its staged location inside `category_dir`
pub fn translate(source: &Path, category_dir: &Path) -> PathBuf {
    category_dir.join(staged_name(source))
}

/// Absolute form of a source path, resolved against the working directory
pub fn absolutize(source: &Path) -> StageResult<PathBuf> {
    std::path::absolute(source).map_err(|e| StageError::PathInvalid {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Recover the source path from a baseline-form staged name.
///
/// Returns `None` for hashed overflow names. A source whose own name contained
/// `_SLASH_`, `_BACKSLASH_` or `_COLON_` comes back with that token replaced,
/// so callers holding a session should prefer its recorded mapping.
pub fn reverse(name: &str) -> Option<PathBuf> {
    if !name.contains(SLASH) && !name.contains(BACKSLASH) && !name.contains(COLON) {
        return None;
    }

    let restored = name
        .replace(SLASH, "/")
        .replace(BACKSLASH, "\\")
        .replace(COLON, ":");
    Some(PathBuf::from(restored))
}

fn baseline(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() * 2);
    for c in raw.chars() {
        match c {
            ':' => out.push_str(COLON),
            '\\' => out.push_str(BACKSLASH),
            '/' => out.push_str(SLASH),
            other => out.push(other),
        }
    }
    out
}

fn overflow(source: &Path, raw: &str) -> String {
    let digest = Md5::digest(raw.as_bytes());
    let prefix = &hex::encode(digest)[..12];

    let parent = source
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string());
    let file = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());

    format!(
        "{}_{}_{}",
        prefix,
        head(&parent, MAX_PARENT_BYTES),
        tail(&file, MAX_FILE_BYTES)
    )
}

/// Leading part of `s`, at most `max` bytes, cut on a char boundary
fn head(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Trailing part of `s`, at most `max` bytes; keeps the extension
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_source(target_len: usize) -> PathBuf {
        // "/deep" segments until the baseline form reaches the target length
        let mut path = String::from("/data");
        while baseline(&path).len() + baseline("/projA/NC001.h").len() < target_len {
            path.push_str("/deep");
        }
        path.push_str("/projA/NC001.h");
        PathBuf::from(path)
    }

    #[test]
    fn baseline_substitutes_separators() {
        let name = staged_name(Path::new("/data/projA/NC001.h"));
        assert_eq!(name, "_SLASH_data_SLASH_projA_SLASH_NC001.h");
    }

    #[test]
    fn baseline_substitutes_windows_markers() {
        let name = staged_name(Path::new(r"C:\jobs\a.h"));
        assert_eq!(name, "C_COLON__BACKSLASH_jobs_BACKSLASH_a.h");
    }

    #[test]
    fn translate_is_deterministic() {
        let dir = Path::new("/tmp/session/input_files");
        let source = Path::new("/data/projA/NC001.h");
        assert_eq!(translate(source, dir), translate(source, dir));

        let long = long_source(400);
        assert_eq!(translate(&long, dir), translate(&long, dir));
    }

    #[test]
    fn overflow_form_for_long_paths() {
        let source = long_source(250);
        assert!(baseline(&source.to_string_lossy()).len() >= 250);

        let name = staged_name(&source);
        assert!(name.ends_with("_projA_NC001.h"));
        assert_eq!(name.split('_').next().unwrap().len(), 12);
        assert!(name.len() <= 120);
    }

    #[test]
    fn overflow_length_independent_of_source_length() {
        let a = staged_name(&long_source(250));
        let b = staged_name(&long_source(2000));
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
    }

    #[test]
    fn threshold_is_exclusive() {
        // 180 chars stays baseline, 181 overflows
        let exact = format!("/{}", "a".repeat(MAX_BASELINE_LEN - SLASH.len()));
        assert_eq!(staged_name(Path::new(&exact)).len(), MAX_BASELINE_LEN);

        let over = format!("/{}", "a".repeat(MAX_BASELINE_LEN - SLASH.len() + 1));
        assert!(!staged_name(Path::new(&over)).contains(SLASH));
    }

    #[test]
    fn reverse_baseline() {
        let source = Path::new("/data/projA/NC001.h");
        let name = staged_name(source);
        assert_eq!(reverse(&name), Some(source.to_path_buf()));
    }

    #[test]
    fn multibyte_names_respect_byte_limit() {
        // 97 chars but 257 bytes in baseline form
        let source = PathBuf::from(format!("/{}/a.h", "数据目录".repeat(20)));
        assert!(baseline(&source.to_string_lossy()).chars().count() <= MAX_BASELINE_LEN);

        let name = staged_name(&source);
        assert!(name.len() + PARTIAL_SUFFIX_LEN <= MAX_NAME_BYTES);
        assert!(name.ends_with("_a.h"));
        assert!(!name.contains(SLASH));
    }

    #[test]
    fn overflow_parts_are_capped() {
        let parent = "目".repeat(100);
        let file = format!("{}.json", "f".repeat(300));
        let source = PathBuf::from(format!("/{}/{}", parent, file));

        let name = staged_name(&source);
        assert!(name.len() + PARTIAL_SUFFIX_LEN <= MAX_NAME_BYTES);
        assert!(name.ends_with(".json"));
        assert!(name.contains("目"));
    }

    #[test]
    fn reverse_is_lossy_for_token_names() {
        let source = Path::new("/data/odd_SLASH_name.h");
        let name = staged_name(source);
        assert_eq!(reverse(&name), Some(PathBuf::from("/data/odd/name.h")));
    }

    #[test]
    fn absolutize_relative_path() {
        let path = absolutize(Path::new("rel.h")).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("rel.h"));
        assert!(absolutize(Path::new("")).is_err());
    }

    #[test]
    fn reverse_overflow_is_none() {
        let name = staged_name(&long_source(300));
        assert_eq!(reverse(&name), None);
    }
}
