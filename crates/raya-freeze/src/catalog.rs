//! The frozen module catalog
//!
//! A [`Catalog`] is the fully expanded freeze table: every exposed module in
//! declaration order, each pointing at one [`SourceRecord`]. Several modules
//! may share a source (aliases), and each source is frozen exactly once.

use crate::checksum::artifact_checksum;
use crate::config::{FreezeConfig, Section};
use crate::locator::{self, is_package_marker, normalize, posix_display, relative_path};
use crate::resolver::{ResolvedModule, SpecResolver};
use crate::spec::{ModuleSpec, SpecError};
use crate::writer::WriteError;
use crate::FreezeResult;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle to a source in a [`SourceTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(usize);

/// A module source that gets frozen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// Canonical frozen id
    pub id: String,
    /// Source file the module is frozen from
    pub file: PathBuf,
    /// Generated artifact the module is frozen into
    pub frozen_file: PathBuf,
    /// Module name the source is importable as, if it lives in the stdlib
    pub modname: Option<String>,
    /// Whether the source is a package `__init__`
    pub is_package: bool,
    /// Whether the source is needed before filesystem imports work
    pub is_bootstrap: bool,
}

impl SourceRecord {
    /// Symbol holding the frozen bytes in the generated table
    pub fn symbol(&self) -> String {
        format!("_Py_M__{}", self.id.replace('.', "_"))
    }
}

/// Frozen sources keyed by id, in order of first reference
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    records: Vec<SourceRecord>,
    index: HashMap<String, SourceId>,
}

impl SourceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` has been registered
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Look up the handle of `id`
    pub fn get(&self, id: &str) -> Option<SourceId> {
        self.index.get(id).copied()
    }

    /// The record behind a handle
    ///
    /// # Panics
    ///
    /// Handles are only meaningful for the table that issued them. A handle
    /// from another table may panic or name an unrelated record.
    pub fn record(&self, id: SourceId) -> &SourceRecord {
        &self.records[id.0]
    }

    /// Register a new source, returning its handle
    ///
    /// Re-inserting a known id returns the existing handle unchanged.
    pub fn insert(&mut self, record: SourceRecord) -> SourceId {
        if let Some(existing) = self.get(&record.id) {
            return existing;
        }
        let id = SourceId(self.records.len());
        self.index.insert(record.id.clone(), id);
        self.records.push(record);
        id
    }

    /// Iterate sources in order of first reference
    pub fn iter(&self) -> impl Iterator<Item = &SourceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One exposed entry of the freeze table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Name the module is importable as
    pub name: String,
    /// Whether the exposed module is a package
    pub is_package: bool,
    /// Section the module was declared in
    pub section: String,
    /// The frozen source backing this module
    pub source: SourceId,
}

/// What an alias entry points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// Source has no importable name (frozen from a file outside the stdlib)
    Nothing,
    /// Source is a package
    Package(String),
    /// Source is a plain module
    Module(String),
}

/// Per-module report line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    pub module: String,
    pub ispkg: bool,
    pub source: String,
    pub frozen: String,
    pub checksum: Option<String>,
}

/// The expanded freeze table
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    modules: Vec<ModuleRecord>,
    sources: SourceTable,
}

impl Catalog {
    /// Modules in declaration order
    pub fn modules(&self) -> &[ModuleRecord] {
        &self.modules
    }

    /// Unique sources in order of first reference
    pub fn sources(&self) -> impl Iterator<Item = &SourceRecord> {
        self.sources.iter()
    }

    /// The source table backing this catalog
    pub fn source_table(&self) -> &SourceTable {
        &self.sources
    }

    /// The source behind a module
    ///
    /// `module` must come from this catalog, see [`SourceTable::record`].
    pub fn source(&self, module: &ModuleRecord) -> &SourceRecord {
        self.sources.record(module.source)
    }

    /// Find a module by exposed name
    pub fn get(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Name the module's source is importable as
    pub fn orig(&self, module: &ModuleRecord) -> Option<&str> {
        self.source(module).modname.as_deref()
    }

    /// Whether the module is exposed under a name other than its source's
    pub fn is_alias(&self, module: &ModuleRecord) -> bool {
        match self.orig(module) {
            Some(orig) => module.name != orig,
            None => true,
        }
    }

    /// Whether the module must be frozen for bootstrapping imports
    pub fn is_bootstrap(&self, module: &ModuleRecord) -> bool {
        self.source(module).is_bootstrap
    }

    /// The alias entry for `module`, or `None` if it is not an alias
    pub fn alias_target(&self, module: &ModuleRecord) -> Option<AliasTarget> {
        if !self.is_alias(module) {
            return None;
        }
        let source = self.source(module);
        Some(match &source.modname {
            None => AliasTarget::Nothing,
            Some(orig) if source.is_package => AliasTarget::Package(orig.clone()),
            Some(orig) => AliasTarget::Module(orig.clone()),
        })
    }

    /// Summarize every module for review, with paths relative to `root`
    ///
    /// Artifacts that have not been generated yet have no checksum; any other
    /// failure to read one is an error.
    pub fn summaries(&self, root: &Path) -> FreezeResult<Vec<ModuleSummary>> {
        self.modules
            .iter()
            .map(|module| -> FreezeResult<ModuleSummary> {
                let source = self.source(module);
                let display = match &source.modname {
                    Some(modname) => format!("<{}>", modname),
                    None => posix_display(&relative_path(&source.file, root)),
                };
                let frozen = source
                    .frozen_file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let checksum =
                    artifact_checksum(&source.frozen_file).map_err(|source_err| WriteError::Read {
                        path: source.frozen_file.clone(),
                        source: source_err,
                    })?;
                Ok(ModuleSummary {
                    module: module.name.clone(),
                    ispkg: module.is_package,
                    source: display,
                    frozen,
                    checksum,
                })
            })
            .collect()
    }
}

/// Builds a [`Catalog`] from sections of specs
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    resolver: SpecResolver,
    frozen_dir: PathBuf,
    bootstrap: BTreeSet<String>,
}

impl CatalogBuilder {
    /// Create a builder resolving ids in `stdlib_dir` and freezing into
    /// `frozen_dir`
    pub fn new(root: PathBuf, stdlib_dir: PathBuf, frozen_dir: PathBuf) -> Self {
        Self {
            resolver: SpecResolver::new(root, stdlib_dir),
            frozen_dir,
            bootstrap: BTreeSet::new(),
        }
    }

    /// Create a builder from a loaded configuration
    pub fn from_config(config: &FreezeConfig) -> Self {
        let layout = config.layout();
        Self::new(layout.root, layout.stdlib_dir, layout.frozen_modules_dir)
            .with_bootstrap(config.manifest.bootstrap.iter().cloned())
            .with_init_modules(config.manifest.init_modules)
    }

    /// Set the frozen ids needed for bootstrapping
    pub fn with_bootstrap<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bootstrap = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Emit `pkg.__init__` modules while expanding packages
    pub fn with_init_modules(mut self, init_modules: bool) -> Self {
        self.resolver = self.resolver.with_init_modules(init_modules);
        self
    }

    /// Resolve every spec of every section, in order
    pub fn build(&self, sections: &[Section]) -> FreezeResult<Catalog> {
        let mut catalog = Catalog::default();
        let mut names: HashMap<String, SourceId> = HashMap::new();

        for section in sections {
            for text in &section.specs {
                let spec = ModuleSpec::parse(text)?;
                let (primary, submodules) =
                    self.resolver.resolve(&spec, &catalog.sources, &section.name)?;
                self.add(&mut catalog, &mut names, primary)?;

                for resolved in submodules.into_iter().flatten() {
                    self.add(&mut catalog, &mut names, resolved?)?;
                }
            }
        }

        debug!(
            modules = catalog.modules.len(),
            sources = catalog.sources.len(),
            "built frozen module catalog"
        );
        Ok(catalog)
    }

    fn add(
        &self,
        catalog: &mut Catalog,
        names: &mut HashMap<String, SourceId>,
        resolved: ResolvedModule,
    ) -> FreezeResult<()> {
        let source = match catalog.sources.get(&resolved.frozen_id) {
            Some(source) => {
                let existing = catalog.sources.record(source);
                if let Some(file) = &resolved.file {
                    if file != &existing.file {
                        return Err(SpecError::ConflictingSource {
                            id: resolved.frozen_id,
                            existing: existing.file.clone(),
                            requested: file.clone(),
                        }
                        .into());
                    }
                }
                source
            }
            None => {
                let record = self.source_record(&resolved.frozen_id, resolved.file)?;
                debug!(id = %record.id, file = %record.file.display(), "new frozen source");
                catalog.sources.insert(record)
            }
        };

        if let Some(&existing) = names.get(&resolved.name) {
            if existing == source {
                debug!(name = %resolved.name, "skipping duplicate module");
                return Ok(());
            }
            return Err(SpecError::DuplicateName {
                name: resolved.name,
                existing: catalog.sources.record(existing).id.clone(),
                requested: resolved.frozen_id,
            }
            .into());
        }

        names.insert(resolved.name.clone(), source);
        catalog.modules.push(ModuleRecord {
            name: resolved.name,
            is_package: resolved.is_package,
            section: resolved.section,
            source,
        });
        Ok(())
    }

    fn source_record(&self, id: &str, file: Option<PathBuf>) -> FreezeResult<SourceRecord> {
        let stdlib_dir = self.resolver.stdlib_dir();
        let file = match file {
            Some(file) => file,
            None => locator::locate(id, stdlib_dir, false)?,
        };

        let modname = file
            .starts_with(normalize(stdlib_dir))
            .then(|| id.to_string());
        let is_package = !id.ends_with(".__init__") && is_package_marker(&file);

        Ok(SourceRecord {
            id: id.to_string(),
            frozen_file: locator::frozen_file(id, &self.frozen_dir),
            modname,
            is_package,
            is_bootstrap: self.bootstrap.contains(id),
            file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str, modname: Option<&str>, is_package: bool) -> SourceRecord {
        SourceRecord {
            id: id.to_string(),
            file: PathBuf::from(format!("/src/Lib/{}.py", id)),
            frozen_file: PathBuf::from(format!("/src/Python/frozen_modules/{}.h", id)),
            modname: modname.map(str::to_string),
            is_package,
            is_bootstrap: false,
        }
    }

    fn catalog(entries: &[(&str, SourceRecord)]) -> Catalog {
        let mut catalog = Catalog::default();
        for (name, record) in entries {
            let source = catalog.sources.insert(record.clone());
            catalog.modules.push(ModuleRecord {
                name: name.to_string(),
                is_package: false,
                section: "s".to_string(),
                source,
            });
        }
        catalog
    }

    #[test]
    fn test_symbol_replaces_dots() {
        let record = source("importlib._bootstrap", Some("importlib._bootstrap"), false);
        assert_eq!(record.symbol(), "_Py_M__importlib__bootstrap");
    }

    #[test]
    fn test_source_table_keeps_first_reference_order() {
        let mut table = SourceTable::new();
        let a = table.insert(source("a", Some("a"), false));
        let b = table.insert(source("b", Some("b"), false));
        let again = table.insert(source("a", Some("a"), false));

        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        let ids: Vec<_> = table.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_alias_forms() {
        let catalog = catalog(&[
            ("plain", source("plain", Some("plain"), false)),
            ("foo", source("frozen_only", None, false)),
            ("bar", source("baz", Some("baz"), true)),
            ("qux", source("quux", Some("quux"), false)),
        ]);
        let modules = catalog.modules();

        assert!(!catalog.is_alias(&modules[0]));
        assert_eq!(catalog.alias_target(&modules[0]), None);
        assert_eq!(catalog.alias_target(&modules[1]), Some(AliasTarget::Nothing));
        assert_eq!(
            catalog.alias_target(&modules[2]),
            Some(AliasTarget::Package("baz".to_string()))
        );
        assert_eq!(
            catalog.alias_target(&modules[3]),
            Some(AliasTarget::Module("quux".to_string()))
        );
    }

    #[test]
    fn test_shared_source_is_listed_once() {
        let shared = source("posixpath", Some("posixpath"), false);
        let catalog = catalog(&[("posixpath", shared.clone()), ("os.path", shared)]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.sources().count(), 1);
        assert!(catalog.is_alias(catalog.get("os.path").unwrap()));
    }

    #[test]
    fn test_summaries_without_artifacts() {
        let catalog = catalog(&[
            ("os", source("os", Some("os"), false)),
            ("__hello_only__", source("frozen_only", None, false)),
        ]);
        let summaries = catalog.summaries(Path::new("/src")).unwrap();

        assert_eq!(summaries[0].source, "<os>");
        assert_eq!(summaries[0].frozen, "os.h");
        assert_eq!(summaries[0].checksum, None);
        assert_eq!(summaries[1].source, "Lib/frozen_only.py");
    }

    #[test]
    fn test_summaries_report_unreadable_artifacts() {
        let temp = tempfile::TempDir::new().unwrap();
        let built = temp.path().join("os.h");
        std::fs::write(&built, "").unwrap();

        let mut os = source("os", Some("os"), false);
        os.frozen_file = built;
        let summaries = catalog(&[("os", os.clone())]).summaries(temp.path()).unwrap();
        assert!(summaries[0].checksum.is_some());

        os.frozen_file = temp.path().to_path_buf();
        let err = catalog(&[("os", os)]).summaries(temp.path()).unwrap_err();
        assert!(matches!(err, crate::FreezeError::Write(WriteError::Read { .. })));
    }

    #[test]
    #[should_panic]
    fn test_foreign_handle_out_of_range() {
        let mut small = SourceTable::new();
        small.insert(source("a", Some("a"), false));
        let mut large = SourceTable::new();
        large.insert(source("a", Some("a"), false));
        let second = large.insert(source("b", Some("b"), false));

        small.record(second);
    }
}
