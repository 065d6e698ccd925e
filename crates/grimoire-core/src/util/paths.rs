//! Generic path utilities.

use std::path::{Path, PathBuf};

/// Expand a leading `~` (and `$VAR` references) in a path string.
///
/// Falls back to the input unchanged if expansion fails.
pub fn expand_tilde(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(path),
    }
}

/// Walk up from `start` looking for a directory that contains `marker`.
///
/// Returns the first ancestor (including `start` itself) where
/// `ancestor.join(marker)` exists.
pub fn find_dir_with_marker(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).exists())
        .map(Path::to_path_buf)
}

/// Join `path` onto `base` unless it is already absolute.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_plain_path() {
        assert_eq!(expand_tilde("/data/packs"), PathBuf::from("/data/packs"));
    }

    #[test]
    fn test_expand_tilde_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/packs"), home.join("packs"));
        }
    }

    #[test]
    fn test_find_dir_with_marker() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("grimoire.toml"), "").unwrap();

        let found = find_dir_with_marker(&nested, "grimoire.toml");
        assert_eq!(found.as_deref(), Some(temp.path()));
    }

    #[test]
    fn test_find_dir_with_marker_missing() {
        let temp = tempfile::tempdir().unwrap();
        assert!(find_dir_with_marker(temp.path(), "definitely-not-here.toml").is_none());
    }

    #[test]
    fn test_resolve_against() {
        let base = Path::new("/work");
        assert_eq!(resolve_against(base, Path::new("packs")), PathBuf::from("/work/packs"));
        assert_eq!(resolve_against(base, Path::new("/abs")), PathBuf::from("/abs"));
    }
}
