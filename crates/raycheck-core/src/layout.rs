//! Derived output paths for one scene.
//!
//! The output tree mirrors the scene tree's relative structure under three
//! categories:
//! - `image/<relbase>.png` - candidate render
//! - `refcache/<relbase>.std.png` - cached reference render
//! - `stdio/<relbase>.{out,err}` - captured candidate output streams
//!
//! Directories are created lazily per scene, so a scene-less subdirectory
//! under the scene root has no counterpart in the output tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Subdirectory holding candidate renders.
pub const IMAGE_DIR: &str = "image";

/// Subdirectory holding cached reference renders and the signature record.
pub const REFCACHE_DIR: &str = "refcache";

/// Subdirectory holding captured stdout/stderr.
pub const STDIO_DIR: &str = "stdio";

/// Output paths for one scene, derived from its relative base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub candidate_image: PathBuf,
    pub reference_image: PathBuf,
    pub stdout_capture: PathBuf,
    pub stderr_capture: PathBuf,
}

impl OutputLayout {
    /// Derive the paths for the scene with relative base name `relbase`.
    pub fn for_scene(out_root: &Path, relbase: &Path) -> Self {
        Self {
            candidate_image: suffixed(out_root.join(IMAGE_DIR), relbase, ".png"),
            reference_image: suffixed(out_root.join(REFCACHE_DIR), relbase, ".std.png"),
            stdout_capture: suffixed(out_root.join(STDIO_DIR), relbase, ".out"),
            stderr_capture: suffixed(out_root.join(STDIO_DIR), relbase, ".err"),
        }
    }

    /// Create the parent directories of every derived path.
    ///
    /// Must be called before any of the paths is written to.
    pub fn ensure_parent_dirs(&self) -> io::Result<()> {
        for path in [
            &self.candidate_image,
            &self.reference_image,
            &self.stdout_capture,
            &self.stderr_capture,
        ] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// The reference cache directory under `out_root`.
pub fn refcache_dir(out_root: &Path) -> PathBuf {
    out_root.join(REFCACHE_DIR)
}

/// Append `suffix` to the file name of `dir/relbase` without touching any
/// dots already present in the base name.
fn suffixed(dir: PathBuf, relbase: &Path, suffix: &str) -> PathBuf {
    let name = relbase
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut path = match relbase.parent() {
        Some(parent) if parent != Path::new("") => dir.join(parent),
        _ => dir,
    };
    path.push(format!("{name}{suffix}"));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_all_four_paths() {
        let layout = OutputLayout::for_scene(Path::new("out"), Path::new("a/one"));
        assert_eq!(layout.candidate_image, PathBuf::from("out/image/a/one.png"));
        assert_eq!(
            layout.reference_image,
            PathBuf::from("out/refcache/a/one.std.png")
        );
        assert_eq!(layout.stdout_capture, PathBuf::from("out/stdio/a/one.out"));
        assert_eq!(layout.stderr_capture, PathBuf::from("out/stdio/a/one.err"));
    }

    #[test]
    fn top_level_scene_has_no_subdirectory() {
        let layout = OutputLayout::for_scene(Path::new("out"), Path::new("one"));
        assert_eq!(layout.candidate_image, PathBuf::from("out/image/one.png"));
    }

    #[test]
    fn dotted_base_names_are_preserved() {
        let layout = OutputLayout::for_scene(Path::new("out"), Path::new("a/scene.v2"));
        assert_eq!(
            layout.candidate_image,
            PathBuf::from("out/image/a/scene.v2.png")
        );
        assert_eq!(
            layout.reference_image,
            PathBuf::from("out/refcache/a/scene.v2.std.png")
        );
    }

    #[test]
    fn ensure_parent_dirs_creates_mirrored_tree() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::for_scene(dir.path(), Path::new("a/b/one"));
        layout.ensure_parent_dirs().unwrap();

        assert!(dir.path().join("image/a/b").is_dir());
        assert!(dir.path().join("refcache/a/b").is_dir());
        assert!(dir.path().join("stdio/a/b").is_dir());
    }
}
