//! Frozen module table source (Python/frozen.c)

use crate::catalog::{AliasTarget, Catalog};
use crate::locator::{posix_display, relative_path};
use crate::region::Region;
use std::path::Path;

pub const INCLUDES_START: &str = "/* Includes for frozen modules: */";
pub const INCLUDES_END: &str = "/* End includes */";
pub const BOOTSTRAP_START: &str = "static const struct _frozen bootstrap_modules[] =";
pub const BOOTSTRAP_END: &str = "/* bootstrap sentinel */";
pub const STDLIB_START: &str = "static const struct _frozen stdlib_modules[] =";
pub const STDLIB_END: &str = "/* stdlib sentinel */";
pub const TEST_START: &str = "static const struct _frozen test_modules[] =";
pub const TEST_END: &str = "/* test sentinel */";
pub const ALIASES_START: &str = "const struct _module_alias aliases[] =";
pub const ALIASES_END: &str = "/* aliases sentinel */";

const INDENT: &str = "    ";

/// Regions of the frozen table source
pub fn regions(catalog: &Catalog, frozen_file: &Path, tests_section: &str) -> Vec<Region> {
    let parent = frozen_file.parent().unwrap_or(Path::new(""));
    let includes = catalog
        .sources()
        .map(|source| {
            let header = posix_display(&relative_path(&source.frozen_file, parent));
            format!("#include \"{}\"", header)
        })
        .collect();

    let mut bootstrap = Vec::new();
    let mut stdlib = Vec::new();
    let mut tests = Vec::new();
    let mut aliases = Vec::new();
    let mut last_section: Option<&str> = None;

    for module in catalog.modules() {
        let source = catalog.source(module);
        let lines = if source.is_bootstrap {
            &mut bootstrap
        } else if module.section == tests_section {
            &mut tests
        } else {
            if last_section != Some(module.section.as_str()) {
                if last_section.is_some() {
                    stdlib.push(String::new());
                }
                stdlib.push(format!("/* {} */", module.section));
            }
            last_section = Some(module.section.as_str());
            &mut stdlib
        };

        let symbol = source.symbol();
        lines.push(format!(
            "{{\"{}\", {}, (int)sizeof({}), {}}},",
            module.name, symbol, symbol, module.is_package
        ));

        if let Some(target) = catalog.alias_target(module) {
            let entry = match target {
                AliasTarget::Nothing => format!("{{\"{}\", NULL}},", module.name),
                AliasTarget::Package(orig) => format!("{{\"{}\", \"<{}\"}},", module.name, orig),
                AliasTarget::Module(orig) => format!("{{\"{}\", \"{}\"}},", module.name, orig),
            };
            aliases.push(format!("{}{}", INDENT, entry));
        }
    }

    vec![
        Region::new(INCLUDES_START, INCLUDES_END, includes),
        Region::new(BOOTSTRAP_START, BOOTSTRAP_END, indent(bootstrap)),
        Region::new(STDLIB_START, STDLIB_END, indent(stdlib)),
        Region::new(TEST_START, TEST_END, indent(tests)),
        Region::new(ALIASES_START, ALIASES_END, aliases),
    ]
}

fn indent(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .skip_while(String::is_empty)
        .map(|line| {
            if line.is_empty() {
                line
            } else {
                format!("{}{}", INDENT, line)
            }
        })
        .collect()
}
