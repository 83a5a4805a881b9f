//! Freeze manifest (freeze.toml)
//!
//! Declares which modules get frozen and where the generated files live.
//! Without a manifest the built-in freeze table is used.

use crate::locator::{is_identifier, is_valid_id, normalize, PACKAGE_MARKER, SOURCE_EXTENSION};
use crate::spec::ModuleSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file looked up in the repository root
pub const MANIFEST_FILE: &str = "freeze.toml";

/// Section appended by the full stdlib walk
pub const STDLIB_WALK_SECTION: &str = "new stdlib - full walk";

/// Default name of the section holding test-only modules
pub const TESTS_SECTION: &str = "Test module";

/// Errors that can occur while loading the freeze manifest
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file or directory
    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse manifest {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Validation error
    #[error("Invalid manifest: {0}")]
    ValidationError(String),
}

/// A named group of specs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    /// Section name, used as a comment in generated output
    pub name: String,

    /// Spec lines, see [`ModuleSpec`]
    #[serde(default)]
    pub specs: Vec<String>,
}

impl Section {
    pub fn new<I, S>(name: impl Into<String>, specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            specs: specs.into_iter().map(Into::into).collect(),
        }
    }
}

/// File locations, relative to the repository root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PathsConfig {
    /// Directory module ids are located in
    #[serde(default = "default_stdlib")]
    pub stdlib: PathBuf,

    /// Directory generated artifacts are written to
    #[serde(default = "default_frozen_modules")]
    pub frozen_modules: PathBuf,

    /// Frozen table source
    #[serde(default = "default_frozen_file")]
    pub frozen_file: PathBuf,

    /// Makefile holding the freeze rules
    #[serde(default = "default_makefile")]
    pub makefile: PathBuf,

    /// IDE project listing the frozen sources
    #[serde(default = "default_pcbuild_project")]
    pub pcbuild_project: PathBuf,

    /// Filters file grouping the project's sources
    #[serde(default = "default_pcbuild_filters")]
    pub pcbuild_filters: PathBuf,
}

fn default_stdlib() -> PathBuf {
    PathBuf::from("Lib")
}

fn default_frozen_modules() -> PathBuf {
    ["Python", "frozen_modules"].iter().collect()
}

fn default_frozen_file() -> PathBuf {
    ["Python", "frozen.c"].iter().collect()
}

fn default_makefile() -> PathBuf {
    PathBuf::from("Makefile.pre.in")
}

fn default_pcbuild_project() -> PathBuf {
    ["PCbuild", "_freeze_module.vcxproj"].iter().collect()
}

fn default_pcbuild_filters() -> PathBuf {
    ["PCbuild", "_freeze_module.vcxproj.filters"].iter().collect()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            stdlib: default_stdlib(),
            frozen_modules: default_frozen_modules(),
            frozen_file: default_frozen_file(),
            makefile: default_makefile(),
            pcbuild_project: default_pcbuild_project(),
            pcbuild_filters: default_pcbuild_filters(),
        }
    }
}

/// Freeze manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct FreezeManifest {
    /// File locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Frozen ids needed before filesystem imports work
    #[serde(default = "default_bootstrap")]
    pub bootstrap: Vec<String>,

    /// Section whose modules go into the test table
    #[serde(default = "default_tests_section")]
    pub tests_section: String,

    /// Append every top-level stdlib module as an extra section
    #[serde(default)]
    pub stdlib_walk: bool,

    /// Emit `pkg.__init__` modules while expanding packages
    #[serde(default)]
    pub init_modules: bool,

    /// Ordered freeze table
    #[serde(default = "builtin_sections", rename = "section")]
    pub sections: Vec<Section>,
}

fn default_bootstrap() -> Vec<String> {
    vec![
        "importlib._bootstrap".to_string(),
        "importlib._bootstrap_external".to_string(),
        "zipimport".to_string(),
    ]
}

fn default_tests_section() -> String {
    TESTS_SECTION.to_string()
}

impl Default for FreezeManifest {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            bootstrap: default_bootstrap(),
            tests_section: default_tests_section(),
            stdlib_walk: false,
            init_modules: true,
            sections: builtin_sections(),
        }
    }
}

/// The built-in freeze table
///
/// Only the "import system" section is required to boot; everything below it
/// speeds up startup and exercises the frozen importer in tests.
pub fn builtin_sections() -> Vec<Section> {
    let os_path = if cfg!(windows) { "ntpath" } else { "posixpath" };
    let frozen_only: PathBuf = ["Tools", "freeze", "flag.py"].iter().collect();

    vec![
        Section::new(
            "import system",
            [
                "importlib._bootstrap : _frozen_importlib",
                "importlib._bootstrap_external : _frozen_importlib_external",
                "zipimport",
            ],
        ),
        Section::new(
            "stdlib - startup, without site (python -S)",
            ["abc", "codecs", "io"],
        ),
        Section::new(
            "stdlib - startup, with site",
            vec![
                "_collections_abc".to_string(),
                "_sitebuiltins".to_string(),
                "genericpath".to_string(),
                "ntpath".to_string(),
                "posixpath".to_string(),
                format!("{} : os.path", os_path),
                "os".to_string(),
                "site".to_string(),
                "stat".to_string(),
            ],
        ),
        Section::new(
            "runpy - run, module with -m",
            ["importlib.util", "importlib.machinery", "runpy"],
        ),
        Section::new(
            TESTS_SECTION,
            vec![
                "__hello__".to_string(),
                "__hello__ : __hello_alias__".to_string(),
                "__hello__ : <__phello_alias__>".to_string(),
                "__hello__ : __phello_alias__.spam".to_string(),
                "<__phello__.**.*>".to_string(),
                format!("frozen_only : __hello_only__ = {}", frozen_only.display()),
            ],
        ),
    ]
}

/// Absolute locations of everything the freezer reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub stdlib_dir: PathBuf,
    pub frozen_modules_dir: PathBuf,
    pub frozen_file: PathBuf,
    pub makefile: PathBuf,
    pub pcbuild_project: PathBuf,
    pub pcbuild_filters: PathBuf,
}

/// A manifest bound to a repository root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeConfig {
    /// Repository root (absolute)
    pub root: PathBuf,
    /// Parsed manifest
    pub manifest: FreezeManifest,
}

impl FreezeConfig {
    /// Bind a manifest to `root`
    pub fn new(root: &Path, manifest: FreezeManifest) -> Result<Self, ConfigError> {
        let root = std::path::absolute(root).map_err(|source| ConfigError::IoError {
            path: root.to_path_buf(),
            source,
        })?;
        let config = Self {
            root: normalize(&root),
            manifest,
        };
        config.validate()?;
        Ok(config)
    }

    /// The built-in freeze table for the repository at `root`
    pub fn builtin(root: &Path) -> Result<Self, ConfigError> {
        Self::new(root, FreezeManifest::default())
    }

    /// Parse a manifest from TOML text
    pub fn parse(root: &Path, text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let manifest = toml::from_str(text).map_err(|source| ConfigError::ParseError {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::new(root, manifest)
    }

    /// Load a manifest file
    pub fn from_file(root: &Path, path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(root, &text, path)
    }

    /// Load `manifest` if given, else `root/freeze.toml` if present, else the
    /// built-in table
    pub fn load(root: &Path, manifest: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = manifest {
            return Self::from_file(root, path);
        }
        let default_path = root.join(MANIFEST_FILE);
        if default_path.is_file() {
            return Self::from_file(root, &default_path);
        }
        Self::builtin(root)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.manifest.tests_section.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tests-section must not be empty".to_string(),
            ));
        }
        if let Some(id) = self
            .manifest
            .bootstrap
            .iter()
            .find(|id| !is_valid_id(id))
        {
            return Err(ConfigError::ValidationError(format!(
                "bootstrap entry {:?} is not a valid module name",
                id
            )));
        }
        if let Some(section) = self
            .manifest
            .sections
            .iter()
            .find(|s| s.name.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(format!(
                "section with specs {:?} has no name",
                section.specs
            )));
        }
        Ok(())
    }

    /// Resolve every configured path against the root
    pub fn layout(&self) -> Layout {
        let paths = &self.manifest.paths;
        let resolve = |path: &Path| normalize(&self.root.join(path));
        Layout {
            root: self.root.clone(),
            stdlib_dir: resolve(&paths.stdlib),
            frozen_modules_dir: resolve(&paths.frozen_modules),
            frozen_file: resolve(&paths.frozen_file),
            makefile: resolve(&paths.makefile),
            pcbuild_project: resolve(&paths.pcbuild_project),
            pcbuild_filters: resolve(&paths.pcbuild_filters),
        }
    }

    /// The freeze table, including the stdlib walk when enabled
    pub fn sections(&self) -> Result<Vec<Section>, ConfigError> {
        let mut sections = self.manifest.sections.clone();
        if self.manifest.stdlib_walk {
            let declared: BTreeSet<String> = sections
                .iter()
                .flat_map(|s| s.specs.iter())
                .filter_map(|spec| ModuleSpec::parse(spec).ok())
                .map(|spec| spec.id().to_string())
                .collect();
            let specs = stdlib_walk(&self.layout().stdlib_dir, &declared)?;
            sections.push(Section::new(STDLIB_WALK_SECTION, specs));
        }
        Ok(sections)
    }
}

/// Specs for every top-level stdlib module not already `declared`
///
/// Modules become plain specs and packages `<name.**.*>`. The `test` package
/// and directories without `__init__.py` are skipped.
pub fn stdlib_walk(stdlib_dir: &Path, declared: &BTreeSet<String>) -> Result<Vec<String>, ConfigError> {
    let io_err = |source| ConfigError::IoError {
        path: stdlib_dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(stdlib_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if let Ok(name) = entry.file_name().into_string() {
            names.push((name, entry.path()));
        }
    }
    names.sort();

    let suffix = format!(".{}", SOURCE_EXTENSION);
    let mut specs = Vec::new();
    for (name, path) in names {
        if let Some(module) = name.strip_suffix(suffix.as_str()) {
            if is_identifier(module) && !declared.contains(module) {
                specs.push(module.to_string());
            }
        } else if path.is_dir()
            && name != "test"
            && is_identifier(&name)
            && path.join(PACKAGE_MARKER).exists()
            && !declared.contains(&name)
        {
            specs.push(format!("<{}.**.*>", name));
        }
    }
    Ok(specs)
}
