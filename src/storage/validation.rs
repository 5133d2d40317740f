//! Path validation
//!
//! Confines user-supplied template paths to the configured theme roots.
//!
//! Every read and write goes through [`resolve_confined_path`]. Stripping
//! `..` is only a first filter; the decision is made on the canonical path,
//! compared against each canonical root with a trailing separator so that a
//! root such as `/theme` never matches `/theme-evil`.

use log::debug;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crate::error::PathError;

/// A path that passed confinement, plus the root it resolved under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfinedPath {
    /// Sanitized, root-relative, forward-slash path
    pub relative: String,
    /// Canonical absolute path on disk
    pub absolute: PathBuf,
    /// Index into the roots slice that accepted the path
    pub root_index: usize,
}

/// Strips traversal sequences, duplicate separators and leading separators.
pub fn sanitize_relative_path(raw: &str) -> String {
    let mut path = raw.trim().replace('\\', "/");
    while path.contains("..") {
        path = path.replace("..", "");
    }
    while path.contains("//") {
        path = path.replace("//", "/");
    }
    path.trim_start_matches('/').to_string()
}

/// Case-insensitive suffix check
pub fn has_required_suffix(path: &str, required_suffix: &str) -> bool {
    path.to_ascii_lowercase()
        .ends_with(&required_suffix.to_ascii_lowercase())
}

/// Returns true when `candidate` is `root` itself or lies beneath it.
///
/// Both paths must already be canonical.
pub fn is_within_root(candidate: &Path, canonical_root: &Path) -> bool {
    let candidate = candidate.to_string_lossy();
    let root = canonical_root.to_string_lossy();
    if candidate == root {
        return true;
    }

    let mut prefix = root.into_owned();
    if !prefix.ends_with(MAIN_SEPARATOR) {
        prefix.push(MAIN_SEPARATOR);
    }
    candidate.starts_with(&prefix)
}

/// Resolves `raw` against `roots` in order and returns the first canonical
/// path that stays inside its root.
///
/// Only existing files can be canonicalized, so a path to a missing file is
/// rejected like any other escape attempt.
pub fn resolve_confined_path(
    raw: &str,
    roots: &[PathBuf],
    required_suffix: &str,
) -> Result<ConfinedPath, PathError> {
    if raw.trim().is_empty() {
        return Err(PathError::Empty);
    }

    let relative = sanitize_relative_path(raw);
    if relative.is_empty() {
        return Err(PathError::Empty);
    }

    if !has_required_suffix(&relative, required_suffix) {
        return Err(PathError::WrongSuffix(relative));
    }

    for (root_index, root) in roots.iter().enumerate() {
        let canonical_root = match root.canonicalize() {
            Ok(path) => path,
            Err(e) => {
                debug!("Skipping root {}: {}", root.display(), e);
                continue;
            }
        };

        let candidate = match root.join(&relative).canonicalize() {
            Ok(path) => path,
            Err(_) => continue,
        };

        if !is_within_root(&candidate, &canonical_root) {
            debug!(
                "Rejected {} under root {}: resolved to {}",
                relative,
                canonical_root.display(),
                candidate.display()
            );
            continue;
        }

        // A symlink named *.php must not expose a file of another type
        if !has_required_suffix(&candidate.to_string_lossy(), required_suffix) {
            return Err(PathError::WrongSuffix(relative));
        }

        return Ok(ConfinedPath {
            relative,
            absolute: candidate,
            root_index,
        });
    }

    Err(PathError::OutsideRoots(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn theme_with(files: &[&str]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("theme");
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "<?php // template").unwrap();
        }
        fs::create_dir_all(&root).unwrap();
        (dir, root)
    }

    #[test]
    fn sanitize_strips_traversal_and_leading_separators() {
        assert_eq!(sanitize_relative_path("../../../etc/passwd.php"), "etc/passwd.php");
        assert_eq!(sanitize_relative_path("//parts//header.php"), "parts/header.php");
        assert_eq!(sanitize_relative_path("parts\\..\\footer.php"), "parts/footer.php");
        assert_eq!(sanitize_relative_path("...."), "");
    }

    #[test]
    fn rejects_empty_path() {
        let (_dir, root) = theme_with(&["index.php"]);
        assert_eq!(
            resolve_confined_path("   ", &[root.clone()], ".php"),
            Err(PathError::Empty)
        );
        assert_eq!(resolve_confined_path("..", &[root], ".php"), Err(PathError::Empty));
    }

    #[test]
    fn rejects_wrong_suffix() {
        let (_dir, root) = theme_with(&["style.css"]);
        assert!(matches!(
            resolve_confined_path("style.css", &[root], ".php"),
            Err(PathError::WrongSuffix(_))
        ));
    }

    #[test]
    fn suffix_check_is_case_insensitive() {
        let (_dir, root) = theme_with(&["HEADER.PHP"]);
        let resolved = resolve_confined_path("HEADER.PHP", &[root], ".php").unwrap();
        assert_eq!(resolved.relative, "HEADER.PHP");
    }

    #[test]
    fn traversal_to_etc_passwd_is_rejected() {
        let (_dir, root) = theme_with(&["index.php"]);
        assert_eq!(
            resolve_confined_path("../../../etc/passwd.php", &[root], ".php"),
            Err(PathError::OutsideRoots("etc/passwd.php".into()))
        );
    }

    #[test]
    fn absolute_path_is_forced_relative() {
        let (_dir, root) = theme_with(&["index.php"]);
        let resolved = resolve_confined_path("/index.php", &[root.clone()], ".php").unwrap();
        assert_eq!(resolved.absolute, root.join("index.php").canonicalize().unwrap());
    }

    #[test]
    fn sibling_directory_sharing_a_prefix_is_not_inside_root() {
        assert!(!is_within_root(
            Path::new("/srv/theme-evil-sibling/x.php"),
            Path::new("/srv/theme")
        ));
        assert!(is_within_root(Path::new("/srv/theme/x.php"), Path::new("/srv/theme")));
        assert!(is_within_root(Path::new("/srv/theme"), Path::new("/srv/theme")));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_into_sibling_root_is_rejected() {
        let (dir, root) = theme_with(&["index.php"]);
        let sibling = dir.path().join("theme-evil-sibling");
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("evil.php"), "<?php system('id');").unwrap();
        std::os::unix::fs::symlink(&sibling, root.join("link")).unwrap();

        assert!(matches!(
            resolve_confined_path("link/evil.php", &[root], ".php"),
            Err(PathError::OutsideRoots(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_other_file_type_is_rejected() {
        let (_dir, root) = theme_with(&["index.php"]);
        fs::write(root.join("secrets.txt"), "token").unwrap();
        std::os::unix::fs::symlink(root.join("secrets.txt"), root.join("leak.php")).unwrap();

        assert!(matches!(
            resolve_confined_path("leak.php", &[root], ".php"),
            Err(PathError::WrongSuffix(_))
        ));
    }

    #[test]
    fn first_matching_root_wins() {
        let (_child_dir, child) = theme_with(&["header.php"]);
        let (_parent_dir, parent) = theme_with(&["header.php", "footer.php"]);
        let roots = vec![child.clone(), parent.clone()];

        let header = resolve_confined_path("header.php", &roots, ".php").unwrap();
        assert_eq!(header.root_index, 0);
        assert!(header.absolute.starts_with(child.canonicalize().unwrap()));

        let footer = resolve_confined_path("footer.php", &roots, ".php").unwrap();
        assert_eq!(footer.root_index, 1);
    }

    #[test]
    fn missing_root_is_skipped() {
        let (dir, root) = theme_with(&["index.php"]);
        let roots = vec![dir.path().join("does-not-exist"), root];
        let resolved = resolve_confined_path("index.php", &roots, ".php").unwrap();
        assert_eq!(resolved.root_index, 1);
    }
}
