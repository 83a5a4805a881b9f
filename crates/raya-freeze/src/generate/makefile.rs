//! Build rules for the Unix makefile (Makefile.pre.in)

use crate::catalog::{Catalog, SourceRecord};
use crate::locator::{posix_display, relative_path};
use crate::region::Region;
use std::path::Path;

pub const FILES_IN_START: &str = "FROZEN_FILES_IN =";
pub const FILES_IN_END: &str = "# End FROZEN_FILES_IN";
pub const FILES_OUT_START: &str = "FROZEN_FILES_OUT =";
pub const FILES_OUT_END: &str = "# End FROZEN_FILES_OUT";
pub const RULES_START: &str = "# BEGIN: freezing modules";
pub const RULES_END: &str = "# END: freezing modules";

/// Regions of the makefile, with paths relative to `root`
pub fn regions(catalog: &Catalog, root: &Path) -> Vec<Region> {
    let mut files_in = Vec::new();
    let mut files_out = Vec::new();
    let mut rules = vec![String::new()];

    for source in catalog.sources() {
        let pyfile = posix_display(&relative_path(&source.file, root));
        let header = posix_display(&relative_path(&source.frozen_file, root));
        let (cmd, deps) = freeze_command(source);

        files_in.push(format!("\t\t{} \\", pyfile));
        files_out.push(format!("\t\t{} \\", header));

        rules.push(format!("{}: {} {}", header, pyfile, deps));
        rules.push(format!(
            "\t{} {} $(srcdir)/{} {}",
            cmd, source.id, pyfile, header
        ));
        rules.push(String::new());
    }

    vec![
        Region::new(FILES_IN_START, FILES_IN_END, end_continuation(files_in)),
        Region::new(FILES_OUT_START, FILES_OUT_END, end_continuation(files_out)),
        Region::new(RULES_START, RULES_END, rules),
    ]
}

fn freeze_command(source: &SourceRecord) -> (&'static str, &'static str) {
    if source.is_bootstrap {
        ("$(FREEZE_MODULE_BOOTSTRAP)", "$(FREEZE_MODULE_BOOTSTRAP_DEPS)")
    } else {
        ("$(FREEZE_MODULE)", "$(FREEZE_MODULE_DEPS)")
    }
}

/// Drop the line continuation from the final entry of a list
fn end_continuation(mut lines: Vec<String>) -> Vec<String> {
    if let Some(last) = lines.last_mut() {
        if let Some(stripped) = last.strip_suffix(" \\") {
            *last = stripped.to_string();
        }
    }
    lines
}
