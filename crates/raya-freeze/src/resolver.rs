//! Spec resolution
//!
//! Turns a parsed [`ModuleSpec`] into the modules it freezes: one primary
//! entry, plus a lazily walked sequence of submodules when the spec expands
//! a package.

use crate::catalog::SourceTable;
use crate::locator::{self, is_identifier, normalize, PACKAGE_MARKER, SOURCE_EXTENSION};
use crate::matcher::Matcher;
use crate::spec::{ModuleSpec, PackagePattern, SpecError};
use crate::FreezeResult;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while locating and expanding modules
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Submodule pattern other than `*` or `**.*`
    #[error("Unsupported submodule pattern: {0:?}")]
    UnsupportedPattern(String),

    /// Module search path is not absolute
    #[error("Module search path must be absolute: {0}")]
    InvalidBasePath(PathBuf),

    /// Package directory could not be listed
    #[error("Failed to read package directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A module produced by resolving a spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Frozen id of the underlying source
    pub frozen_id: String,
    /// Source file, or `None` when the frozen id is already known
    pub file: Option<PathBuf>,
    /// Name the module is exposed under
    pub name: String,
    /// Whether the exposed module is a package
    pub is_package: bool,
    /// Section the spec was declared in
    pub section: String,
}

/// A module found on disk: `(id, file, is_package)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    pub id: String,
    pub file: PathBuf,
    pub is_package: bool,
}

/// Resolves specs against a stdlib directory
#[derive(Debug, Clone)]
pub struct SpecResolver {
    /// Repository root, for relative source files
    root: PathBuf,
    /// Directory module ids are located in
    stdlib_dir: PathBuf,
    /// Emit `pkg.__init__` entries while expanding packages
    init_modules: bool,
}

impl SpecResolver {
    /// Create a resolver locating modules in `stdlib_dir`
    pub fn new(root: PathBuf, stdlib_dir: PathBuf) -> Self {
        Self {
            root,
            stdlib_dir,
            init_modules: false,
        }
    }

    /// Also emit each package's `__init__` module while expanding packages
    pub fn with_init_modules(mut self, init_modules: bool) -> Self {
        self.init_modules = init_modules;
        self
    }

    /// The directory module ids are located in
    pub fn stdlib_dir(&self) -> &Path {
        &self.stdlib_dir
    }

    /// Resolve one spec
    ///
    /// `known` holds every frozen id seen so far in this run. The returned
    /// submodule sequence is lazy and does not borrow `known`, so the caller
    /// may keep registering sources while draining it.
    pub fn resolve(
        &self,
        spec: &ModuleSpec,
        known: &SourceTable,
        section: &str,
    ) -> FreezeResult<(ResolvedModule, Option<Submodules>)> {
        let primary = match spec {
            ModuleSpec::PackageAlias { id, name, file } => {
                let file = match file {
                    Some(file) => Some(self.source_file(spec, file)?),
                    None if known.contains(id) => None,
                    None => Some(locator::locate(id, &self.stdlib_dir, false)?),
                };
                ResolvedModule {
                    frozen_id: id.clone(),
                    file,
                    name: name.clone(),
                    is_package: true,
                    section: section.to_string(),
                }
            }
            ModuleSpec::File { id, name, file } => {
                if known.contains(id) {
                    return Err(SpecError::DuplicateId {
                        spec: spec.to_string(),
                        id: id.clone(),
                    }
                    .into());
                }
                ResolvedModule {
                    frozen_id: id.clone(),
                    file: Some(self.source_file(spec, file)?),
                    name: name.clone(),
                    is_package: false,
                    section: section.to_string(),
                }
            }
            ModuleSpec::Module { id, name } if known.contains(id) => ResolvedModule {
                frozen_id: id.clone(),
                file: None,
                name: name.clone().unwrap_or_else(|| id.clone()),
                is_package: false,
                section: section.to_string(),
            },
            ModuleSpec::Module { id, name } => {
                let (entry, _) = self.expand(id, false, None)?;
                ResolvedModule {
                    frozen_id: entry.id,
                    file: Some(entry.file),
                    name: name.clone().unwrap_or_else(|| id.clone()),
                    is_package: false,
                    section: section.to_string(),
                }
            }
            ModuleSpec::Package { pattern, name } => {
                return self.resolve_package(pattern, name.as_deref(), section);
            }
        };

        Ok((primary, None))
    }

    fn resolve_package(
        &self,
        pattern: &PackagePattern,
        name: Option<&str>,
        section: &str,
    ) -> FreezeResult<(ResolvedModule, Option<Submodules>)> {
        let (entry, walk) = self.expand(&pattern.id, true, pattern.matcher)?;
        let name = name.unwrap_or(&entry.id).to_string();

        let submodules = walk.map(|walk| Submodules {
            walk,
            root_id: entry.id.clone(),
            root_name: name.clone(),
            files: HashMap::from([(entry.file.clone(), entry.id.clone())]),
            section: section.to_string(),
        });

        let primary = ResolvedModule {
            frozen_id: entry.id,
            file: Some(entry.file),
            name,
            is_package: entry.is_package,
            section: section.to_string(),
        };
        Ok((primary, submodules))
    }

    /// Expand a module id into its own entry and, for patterns, a walk over
    /// its submodules
    pub fn expand(
        &self,
        id: &str,
        is_package: bool,
        matcher: Option<Matcher>,
    ) -> Result<(ModuleEntry, Option<SubmoduleWalk>), ResolveError> {
        let file = locator::locate(id, &self.stdlib_dir, is_package)?;
        let walk = matcher.map(|matcher| {
            let package_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
            SubmoduleWalk::new(id.to_string(), package_dir, matcher)
                .with_init_modules(self.init_modules)
        });

        let entry = ModuleEntry {
            id: id.to_string(),
            file,
            is_package,
        };
        Ok((entry, walk))
    }

    /// Resolve an explicit source file against the repository root
    fn source_file(&self, spec: &ModuleSpec, file: &Path) -> Result<PathBuf, SpecError> {
        let path = normalize(&self.root.join(file));
        if path.is_dir() {
            return Err(SpecError::DirectoryAsFile {
                spec: spec.to_string(),
                path,
            });
        }
        Ok(path)
    }
}

/// Submodules of an expanded package, renamed and de-duplicated
///
/// Yields sub-records in declaration order. When the package was exposed
/// under another name, every descendant is renamed with the same prefix.
/// A descendant whose file was already emitted as a package within this
/// expansion (its `__init__` module) is collapsed onto that package's id.
#[derive(Debug)]
pub struct Submodules {
    walk: SubmoduleWalk,
    root_id: String,
    root_name: String,
    files: HashMap<PathBuf, String>,
    section: String,
}

impl Submodules {
    fn rename(&self, id: &str) -> String {
        if self.root_name.is_empty() {
            return id.to_string();
        }
        match id.strip_prefix(self.root_id.as_str()) {
            Some(rest) => format!("{}{}", self.root_name, rest),
            None => id.to_string(),
        }
    }
}

impl Iterator for Submodules {
    type Item = Result<ResolvedModule, ResolveError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.walk.next()? {
            Ok(entry) => entry,
            Err(err) => return Some(Err(err)),
        };

        let name = self.rename(&entry.id);
        let (frozen_id, file) = match self.files.get(&entry.file) {
            Some(owner) => (owner.clone(), None),
            None => {
                if entry.is_package {
                    self.files.insert(entry.file.clone(), entry.id.clone());
                }
                (entry.id, Some(entry.file))
            }
        };

        Some(Ok(ResolvedModule {
            frozen_id,
            file,
            name,
            is_package: entry.is_package,
            section: self.section.clone(),
        }))
    }
}

#[derive(Debug)]
struct DirEntry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

#[derive(Debug)]
struct Frame {
    package: String,
    entries: std::vec::IntoIter<DirEntry>,
}

/// Depth-first walk over a package directory
///
/// Entries are visited in sorted name order. `*.py` files become modules,
/// directories become packages only when they hold an `__init__.py`; bare
/// directories are skipped. Directories are read on demand.
#[derive(Debug)]
pub struct SubmoduleWalk {
    matcher: Matcher,
    init_modules: bool,
    stack: Vec<Frame>,
    pending: Option<(String, PathBuf)>,
}

impl SubmoduleWalk {
    /// Walk the submodules of `package` stored in `package_dir`
    pub fn new(package: String, package_dir: PathBuf, matcher: Matcher) -> Self {
        Self {
            matcher,
            init_modules: false,
            stack: Vec::new(),
            pending: Some((package, package_dir)),
        }
    }

    /// Also yield `__init__.py` files as `pkg.__init__` modules
    pub fn with_init_modules(mut self, init_modules: bool) -> Self {
        self.init_modules = init_modules;
        self
    }

    fn descend(&mut self, package: String, dir: PathBuf) -> Result<(), ResolveError> {
        let read_err = |source| ResolveError::ReadDir {
            path: dir.clone(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let path = entry.path();
            entries.push(DirEntry {
                is_dir: path.is_dir(),
                name,
                path,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        self.stack.push(Frame {
            package,
            entries: entries.into_iter(),
        });
        Ok(())
    }
}

impl Iterator for SubmoduleWalk {
    type Item = Result<ModuleEntry, ResolveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((package, dir)) = self.pending.take() {
            if let Err(err) = self.descend(package, dir) {
                return Some(Err(err));
            }
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some(entry) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };

            let (matched, recursive) = self.matcher.matches(&entry.name);
            if !matched {
                continue;
            }

            let module = entry
                .name
                .strip_suffix(SOURCE_EXTENSION)
                .and_then(|stem| stem.strip_suffix('.'));
            if let Some(stem) = module {
                if !is_identifier(stem) || (stem == "__init__" && !self.init_modules) {
                    continue;
                }
                return Some(Ok(ModuleEntry {
                    id: format!("{}.{}", frame.package, stem),
                    file: entry.path,
                    is_package: false,
                }));
            }

            if entry.is_dir && is_identifier(&entry.name) {
                let marker = entry.path.join(PACKAGE_MARKER);
                // Namespace packages are not frozen.
                if !marker.exists() {
                    continue;
                }
                let id = format!("{}.{}", frame.package, entry.name);
                if recursive {
                    self.pending = Some((id.clone(), entry.path));
                }
                return Some(Ok(ModuleEntry {
                    id,
                    file: marker,
                    is_package: true,
                }));
            }
        }
    }
}
