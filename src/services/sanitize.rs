//! File-name sanitizing and path containment for everything that turns
//! user-controlled strings into filesystem paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::models::archive_name;

static RE_UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").unwrap());

/// Reduces a name to `[A-Za-z0-9_.-]`, suitable as a single path component.
///
/// Non-ASCII characters are decomposed first so accented Latin letters keep
/// their base letter; anything else is dropped. The result may be empty.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let separated = ascii.replace(['/', '\\'], " ");
    let joined = separated.split_whitespace().collect::<Vec<_>>().join("_");
    RE_UNSAFE_CHARS
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Safe base name for a document's output, `"file"` when nothing survives.
pub fn document_base(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let base = secure_filename(stem);
    if base.is_empty() {
        "file".to_string()
    } else {
        base
    }
}

/// Suffixes `_2`, `_3`, ... until `base` is unused within the batch.
///
/// A base also reserves its archive name, since both live side by side in
/// the session output directory.
pub fn unique_base(base: String, used: &mut HashSet<String>) -> String {
    let is_free =
        |name: &str, used: &HashSet<String>| !used.contains(name) && !used.contains(&archive_name(name));

    let mut candidate = base.clone();
    let mut n = 2;
    while !is_free(&candidate, used) {
        candidate = format!("{}_{}", base, n);
        n += 1;
    }
    used.insert(archive_name(&candidate));
    used.insert(candidate.clone());
    candidate
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// A segment could escape its directory; nothing was touched on disk.
    Unsafe,
    Missing,
}

/// A segment is safe when sanitizing it is a no-op.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
        && secure_filename(segment) == segment
}

/// Resolves `root/segments...` to an existing file that stays under `root`.
pub fn resolve_within(root: &Path, segments: &[&str]) -> Result<PathBuf, PathError> {
    if !segments.iter().all(|s| is_safe_segment(s)) {
        return Err(PathError::Unsafe);
    }

    let candidate = segments
        .iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment));

    let root = root.canonicalize().map_err(|_| PathError::Missing)?;
    let resolved = candidate.canonicalize().map_err(|_| PathError::Missing)?;

    if !resolved.starts_with(&root) {
        return Err(PathError::Unsafe);
    }
    if !resolved.is_file() {
        return Err(PathError::Missing);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_filename_matches_common_cases() {
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("i contain cool \u{fc}ml\u{e4}uts.txt"), "i_contain_cool_umlauts.txt");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn non_latin_names_fall_back_to_file() {
        assert_eq!(document_base("시험지.pdf"), "file");
        assert_eq!(document_base("report 2024.pdf"), "report_2024");
    }

    #[test]
    fn duplicate_bases_get_suffixes() {
        let mut used = HashSet::new();
        assert_eq!(unique_base("a".into(), &mut used), "a");
        assert_eq!(unique_base("a".into(), &mut used), "a_2");
        assert_eq!(unique_base("a".into(), &mut used), "a_3");
        assert_eq!(unique_base("b".into(), &mut used), "b");
    }

    #[test]
    fn bases_never_collide_with_archive_names() {
        let mut used = HashSet::new();
        assert_eq!(unique_base("x_output.zip".into(), &mut used), "x_output.zip");
        assert_eq!(unique_base("x".into(), &mut used), "x_2");

        let mut used = HashSet::new();
        assert_eq!(unique_base("x".into(), &mut used), "x");
        assert_eq!(unique_base("x_output.zip".into(), &mut used), "x_output.zip_2");
    }

    #[test]
    fn traversal_segments_are_rejected_before_disk_access() {
        let root = Path::new("/definitely/not/a/real/root");
        assert_eq!(resolve_within(root, &["../../etc/passwd"]), Err(PathError::Unsafe));
        assert_eq!(resolve_within(root, &[".."]), Err(PathError::Unsafe));
        assert_eq!(resolve_within(root, &["ok", ""]), Err(PathError::Unsafe));
        assert_eq!(resolve_within(root, &["ok.zip"]), Err(PathError::Missing));
    }

    #[test]
    fn resolves_existing_file_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("s1")).unwrap();
        std::fs::write(dir.path().join("s1").join("a_output.zip"), b"zip").unwrap();

        let resolved = resolve_within(dir.path(), &["s1", "a_output.zip"]).unwrap();
        assert!(resolved.ends_with("s1/a_output.zip"));
        assert_eq!(resolve_within(dir.path(), &["s1"]), Err(PathError::Missing));
    }
}
