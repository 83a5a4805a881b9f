//! Raya Freeze Library
//!
//! This crate maintains the table of modules frozen into the runtime image,
//! including:
//! - Module spec parsing (`id`, `id : name`, `id : name = file`, `<pkg.**.*>`)
//! - Locating module sources and expanding packages into submodules
//! - Building the frozen module catalog (aliases, shared sources, bootstrap set)
//! - Manifest loading (freeze.toml) with a built-in default table
//! - Rendering the generated regions of frozen.c, the makefile and PCbuild files
//! - Patching marker-delimited regions with atomic writes

pub mod catalog;
pub mod checksum;
pub mod config;
pub mod generate;
pub mod locator;
pub mod matcher;
pub mod regen;
pub mod region;
pub mod resolver;
pub mod spec;
pub mod writer;

pub use catalog::{
    AliasTarget, Catalog, CatalogBuilder, ModuleRecord, ModuleSummary, SourceId, SourceRecord,
    SourceTable,
};
pub use config::{ConfigError, FreezeConfig, FreezeManifest, Layout, PathsConfig, Section};
pub use generate::TargetFile;
pub use matcher::Matcher;
pub use regen::{build_catalog, regen_all, regen_catalog, FileUpdate};
pub use region::{patch_region, patch_regions, Region, RegionError};
pub use resolver::{ModuleEntry, ResolveError, ResolvedModule, SpecResolver, SubmoduleWalk, Submodules};
pub use spec::{ModuleSpec, PackagePattern, SpecError};
pub use writer::{update_file_with_tmpfile, FileStatus, WriteError};

use thiserror::Error;

/// Errors raised while building or applying the freeze table
#[derive(Debug, Error)]
pub enum FreezeError {
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Region error: {0}")]
    Region(#[from] RegionError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type FreezeResult<T> = Result<T, FreezeError>;
