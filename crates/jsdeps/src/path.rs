//! Path helpers
//!
//! Lexical normalization and relativization used for module keys, cache keys
//! and manifest entries. Nothing here touches the filesystem except
//! [`absolutize`], which reads the current directory.

use std::path::{Component, Path, PathBuf};

/// Normalize a path lexically, dropping `.` and folding `..` into its parent
pub fn normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Make a path absolute against the current directory, then normalize it
pub fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Express `path` relative to `base`, climbing with `..` where needed
///
/// Both paths are normalized first; they are expected to be absolute or
/// relative to the same directory.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);

    let path_parts: Vec<_> = path.components().collect();
    let base_parts: Vec<_> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

/// Render a path with forward slashes
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
