//! Regeneration of every generated build file
//!
//! Builds the catalog from a [`FreezeConfig`] and patches each target file in
//! turn. A failure stops the run; files already rewritten keep their new
//! content and the failing file is left untouched.

use crate::catalog::{Catalog, CatalogBuilder};
use crate::config::{FreezeConfig, Layout};
use crate::generate;
use crate::region::patch_regions;
use crate::writer::{update_file_with_tmpfile, FileStatus};
use crate::FreezeResult;
use std::path::PathBuf;
use tracing::{debug, info};

/// Result of patching one target file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// Resolve the configured sections into a catalog
pub fn build_catalog(config: &FreezeConfig) -> FreezeResult<Catalog> {
    let sections = config.sections()?;
    CatalogBuilder::from_config(config).build(&sections)
}

/// Patch every target file in `layout` from `catalog`
pub fn regen_catalog(
    catalog: &Catalog,
    layout: &Layout,
    tests_section: &str,
) -> FreezeResult<Vec<FileUpdate>> {
    let mut updates = Vec::new();
    for target in generate::targets(catalog, layout, tests_section) {
        debug!(file = %target.path.display(), regions = target.regions.len(), "patching");
        let status = update_file_with_tmpfile(&target.path, |lines| {
            Ok(patch_regions(lines, &target.regions, &target.path)?)
        })?;

        match status {
            FileStatus::Updated => info!(file = %target.path.display(), "updated"),
            FileStatus::Unchanged => debug!(file = %target.path.display(), "unchanged"),
        }
        updates.push(FileUpdate {
            path: target.path,
            status,
        });
    }
    Ok(updates)
}

/// Build the catalog and patch every target file
pub fn regen_all(config: &FreezeConfig) -> FreezeResult<Vec<FileUpdate>> {
    let catalog = build_catalog(config)?;
    info!(
        modules = catalog.len(),
        sources = catalog.sources().count(),
        "resolved frozen modules"
    );
    regen_catalog(&catalog, &config.layout(), &config.manifest.tests_section)
}
