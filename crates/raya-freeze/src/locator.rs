//! Module source location
//!
//! Maps dotted module ids to the source files they are frozen from, and to
//! the generated artifact each one is frozen into.

use crate::resolver::ResolveError;
use std::path::{Component, Path, PathBuf};
use unicode_xid::UnicodeXID;

/// Extension of module source files
pub const SOURCE_EXTENSION: &str = "py";

/// File marking a directory as a package
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Extension of generated frozen artifacts
pub const FROZEN_EXTENSION: &str = "h";

/// Check that `name` is a single identifier segment
///
/// Follows the Unicode identifier rules: `_` or XID_Start first, XID_Continue
/// after. Names are checked as given, without normalization.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_xid_start() => {}
        _ => return false,
    }
    chars.all(|c| c.is_xid_continue())
}

/// Check that every dot-separated segment of `id` is an identifier
pub fn is_valid_id(id: &str) -> bool {
    id.split('.').all(is_identifier)
}

/// Lexically normalize a path, dropping `.` and folding `..`
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

/// Compute the source file of module `id` below `base`
///
/// Packages resolve to `base/a/b/__init__.py`, plain modules to `base/a/b.py`.
/// The file is not required to exist.
pub fn locate(id: &str, base: &Path, is_package: bool) -> Result<PathBuf, ResolveError> {
    let base = normalize(base);
    if !base.is_absolute() {
        return Err(ResolveError::InvalidBasePath(base));
    }

    let mut path = base;
    let mut segments = id.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_some() || is_package {
            path.push(segment);
        } else {
            path.push(format!("{}.{}", segment, SOURCE_EXTENSION));
        }
    }
    if is_package {
        path.push(PACKAGE_MARKER);
    }

    Ok(path)
}

/// Compute the generated artifact path for frozen id `id`
///
/// Every frozen module uses the same naming scheme: `<id>.h` inside
/// `dest_dir`.
pub fn frozen_file(id: &str, dest_dir: &Path) -> PathBuf {
    dest_dir.join(format!("{}.{}", id, FROZEN_EXTENSION))
}

/// Whether `path` names a package marker file
pub fn is_package_marker(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(PACKAGE_MARKER)
}

/// Express `path` relative to `base`, lexically
///
/// Paths that share no root with `base` are returned unchanged.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);

    let mut path_components = path.components().peekable();
    let mut base_components = base.components().peekable();
    let mut shared = 0;
    while let (Some(a), Some(b)) = (path_components.peek(), base_components.peek()) {
        if a != b {
            break;
        }
        path_components.next();
        base_components.next();
        shared += 1;
    }
    if shared == 0 && path.has_root() {
        return path;
    }

    let mut relative = PathBuf::new();
    for _ in base_components {
        relative.push("..");
    }
    relative.extend(path_components);
    relative
}

fn join_components(path: &Path, separator: &str) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Render a relative path with `/` separators
pub fn posix_display(path: &Path) -> String {
    join_components(path, "/")
}

/// Render a relative path with `\` separators
pub fn windows_display(path: &Path) -> String {
    join_components(path, "\\")
}
