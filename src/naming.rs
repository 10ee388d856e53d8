//! Output file naming.
//!
//! An output name carries the target ratio's label: an existing label in the
//! source name is swapped for the target's, otherwise `_<label>` is appended
//! to the stem. Collisions in the destination are resolved with `_1`, `_2`, …
//! suffixes.

use std::path::{Path, PathBuf};

use rf_core::RatioTag;

/// Split a file name into stem and extension (with its dot).
///
/// Leading dots belong to the stem, so `.hidden` has no extension.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if !name[..idx].trim_start_matches('.').is_empty() => name.split_at(idx),
        _ => (name, ""),
    }
}

/// The final path component of `name`, accepting either separator.
fn file_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Derive the output file name for converting `original_name` to `target`.
///
/// The earliest ratio label found in the stem is replaced by the target's
/// label; when the stem carries none, `_<label>` is appended. The extension
/// is kept as-is.
pub fn derive_output_name(original_name: &str, target: RatioTag) -> String {
    let (stem, ext) = split_name(file_name(original_name));

    let earliest = RatioTag::ALL
        .iter()
        .filter_map(|tag| stem.find(tag.label()).map(|idx| (idx, tag.label())))
        .min_by_key(|(idx, _)| *idx);

    let new_stem = match earliest {
        Some((idx, label)) => format!(
            "{}{}{}",
            &stem[..idx],
            target.label(),
            &stem[idx + label.len()..]
        ),
        None => format!("{stem}_{}", target.label()),
    };

    format!("{new_stem}{ext}")
}

fn occupied(path: &Path) -> bool {
    // symlink_metadata so that dangling links still count as taken.
    path.symlink_metadata().is_ok()
}

/// Return a path in `directory` for `candidate` that does not exist yet.
///
/// `candidate` itself is used when free; otherwise the first free
/// `<stem>_<n><ext>` for `n = 1, 2, …`.
pub fn resolve_collision(directory: &Path, candidate: &str) -> PathBuf {
    let first = directory.join(candidate);
    if !occupied(&first) {
        return first;
    }

    let (stem, ext) = split_name(candidate);
    let mut n: u64 = 1;
    loop {
        let path = directory.join(format!("{stem}_{n}{ext}"));
        if !occupied(&path) {
            return path;
        }
        n += 1;
    }
}

/// Collision-free output path in `directory` for converting `original_name`
/// to `target`.
pub fn output_path(directory: &Path, original_name: &str, target: RatioTag) -> PathBuf {
    resolve_collision(directory, &derive_output_name(original_name, target))
}
