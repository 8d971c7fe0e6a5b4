//! Shared helpers for paths, slugs, and list arguments.
//!
//! These functions are reused by the CLI, the agent, and the HTTP server.

use std::path::PathBuf;

use anyhow::Result;

/// Gets the cross-platform default garden directory.
///
/// Returns the path as `{data_dir}/garden` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn get_garden_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("garden"))
}

/// Converts a title or topic to a file name stem.
///
/// Lowercases and replaces spaces and path separators with underscores. The
/// mapping is lossy: distinct titles may share a slug.
///
/// # Examples
///
/// ```
/// use garden::utils::slugify;
///
/// assert_eq!(slugify("Rust Ownership"), "rust_ownership");
/// assert_eq!(slugify("I/O basics"), "i_o_basics");
/// ```
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

/// Parses comma-separated values.
///
/// Splits on commas, trims whitespace from each value, and filters out empty strings.
///
/// # Examples
///
/// ```
/// use garden::utils::parse_list;
///
/// assert_eq!(parse_list("rust, learning, "), vec!["rust", "learning"]);
/// ```
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Trims entries, drops empty ones, and removes exact duplicates keeping the
/// first occurrence.
pub fn clean_list(values: &[&str]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(v.to_string()))
        .map(String::from)
        .collect()
}
