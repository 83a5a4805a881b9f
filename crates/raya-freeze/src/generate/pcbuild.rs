//! MSBuild project and filter items (PCbuild)

use crate::catalog::Catalog;
use crate::locator::{relative_path, windows_display};
use crate::region::Region;
use std::path::Path;

pub const PROJECT_START: &str = "<!-- BEGIN frozen modules -->";
pub const PROJECT_END: &str = "<!-- END frozen modules -->";

/// Items for the freeze project file
///
/// Source paths are relative to the repository root and prefixed with `..\`
/// since the project lives one directory down.
pub fn project_regions(catalog: &Catalog, root: &Path) -> Vec<Region> {
    let mut lines = Vec::new();
    for source in catalog.sources() {
        let pyfile = windows_display(&relative_path(&source.file, root));
        let header = windows_display(&relative_path(&source.frozen_file, root));
        let stem = source
            .frozen_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        lines.push(format!("    <None Include=\"..\\{}\">", pyfile));
        lines.push(format!("      <ModName>{}</ModName>", source.id));
        lines.push(format!("      <IntFile>$(IntDir){}.g.h</IntFile>", stem));
        lines.push(format!(
            "      <OutFile>$(GeneratedFrozenModulesDir){}</OutFile>",
            header
        ));
        lines.push("    </None>".to_string());
    }
    vec![Region::new(PROJECT_START, PROJECT_END, lines)]
}

/// Items for the project's filters file
pub fn filter_regions(catalog: &Catalog, root: &Path) -> Vec<Region> {
    let mut lines = Vec::new();
    for source in catalog.sources() {
        let pyfile = windows_display(&relative_path(&source.file, root));
        lines.push(format!("    <None Include=\"..\\{}\">", pyfile));
        lines.push("      <Filter>Python Files</Filter>".to_string());
        lines.push("    </None>".to_string());
    }
    vec![Region::new(PROJECT_START, PROJECT_END, lines)]
}
