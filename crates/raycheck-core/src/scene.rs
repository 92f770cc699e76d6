//! Scene file discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// File extension of renderer scene descriptions.
pub const SCENE_EXTENSION: &str = "ray";

/// A scene file discovered under the scene root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneFile {
    /// Path of the scene file as found on disk.
    pub path: PathBuf,

    /// Path relative to the scene root, extension included.
    pub relative: PathBuf,
}

impl SceneFile {
    /// Relative path without the scene extension, used to derive output paths.
    pub fn relbase(&self) -> PathBuf {
        self.relative.with_extension("")
    }
}

/// Recursively discover `.ray` scene files under `scene_root`.
///
/// Lazy and restartable; traversal order is filesystem-dependent and not
/// guaranteed stable across runs. Unreadable directory entries are skipped.
pub fn discover(scene_root: &Path) -> impl Iterator<Item = SceneFile> + '_ {
    WalkDir::new(scene_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == SCENE_EXTENSION)
        })
        .filter_map(move |entry| {
            let relative = entry.path().strip_prefix(scene_root).ok()?.to_path_buf();
            Some(SceneFile {
                path: entry.path().to_path_buf(),
                relative,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn discovers_only_scene_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("one.ray"));
        touch(&root.join("a/two.ray"));
        touch(&root.join("a/b/three.ray"));
        touch(&root.join("notes.txt"));
        touch(&root.join("a/render.png"));

        let relatives: HashSet<PathBuf> =
            discover(root).map(|scene| scene.relative).collect();

        let expected: HashSet<PathBuf> = [
            PathBuf::from("one.ray"),
            PathBuf::from("a/two.ray"),
            PathBuf::from("a/b/three.ray"),
        ]
        .into_iter()
        .collect();
        assert_eq!(relatives, expected);
    }

    #[test]
    fn empty_root_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(discover(dir.path()).count(), 0);
    }

    #[test]
    fn relbase_strips_extension_only() {
        let scene = SceneFile {
            path: PathBuf::from("/scenes/a/one.ray"),
            relative: PathBuf::from("a/one.ray"),
        };
        assert_eq!(scene.relbase(), PathBuf::from("a/one"));
    }

    #[test]
    fn restartable_iteration() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("one.ray"));
        touch(&dir.path().join("two.ray"));

        assert_eq!(discover(dir.path()).count(), 2);
        assert_eq!(discover(dir.path()).count(), 2);
    }
}
