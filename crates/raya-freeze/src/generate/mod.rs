//! Generated regions for every build file that lists frozen modules
//!
//! Each generator renders the lines of one or more regions from a
//! [`Catalog`]. Nothing here touches the filesystem; see [`crate::regen`].

pub mod frozen;
pub mod makefile;
pub mod pcbuild;

use crate::catalog::Catalog;
use crate::config::Layout;
use crate::region::Region;
use std::path::PathBuf;

/// A file and the regions to patch into it
#[derive(Debug, Clone)]
pub struct TargetFile {
    pub path: PathBuf,
    pub regions: Vec<Region>,
}

/// Every target file with its rendered regions, in update order
pub fn targets(catalog: &Catalog, layout: &Layout, tests_section: &str) -> Vec<TargetFile> {
    vec![
        TargetFile {
            path: layout.makefile.clone(),
            regions: makefile::regions(catalog, &layout.root),
        },
        TargetFile {
            path: layout.pcbuild_project.clone(),
            regions: pcbuild::project_regions(catalog, &layout.root),
        },
        TargetFile {
            path: layout.pcbuild_filters.clone(),
            regions: pcbuild::filter_regions(catalog, &layout.root),
        },
        TargetFile {
            path: layout.frozen_file.clone(),
            regions: frozen::regions(catalog, &layout.frozen_file, tests_section),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::config::Section;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn layout(root: &Path) -> Layout {
        Layout {
            root: root.to_path_buf(),
            stdlib_dir: root.join("Lib"),
            frozen_modules_dir: root.join("Python/frozen_modules"),
            frozen_file: root.join("Python/frozen.c"),
            makefile: root.join("Makefile.pre.in"),
            pcbuild_project: root.join("PCbuild/_freeze_module.vcxproj"),
            pcbuild_filters: root.join("PCbuild/_freeze_module.vcxproj.filters"),
        }
    }

    fn sample_catalog(root: &Path) -> Catalog {
        write(root, "Lib/zipimport.py");
        write(root, "Lib/os.py");
        write(root, "Lib/posixpath.py");
        write(root, "Lib/__phello__/__init__.py");
        write(root, "Lib/__phello__/spam.py");
        write(root, "Tools/freeze/flag.py");

        let l = layout(root);
        CatalogBuilder::new(l.root, l.stdlib_dir, l.frozen_modules_dir)
            .with_bootstrap(["zipimport"])
            .build(&[
                Section::new("import system", ["zipimport"]),
                Section::new("stdlib - startup", ["os", "posixpath", "posixpath : os.path"]),
                Section::new(
                    "Test module",
                    ["<__phello__.**.*>", "frozen_only : __hello_only__ = Tools/freeze/flag.py"],
                ),
            ])
            .unwrap()
    }

    fn region<'a>(regions: &'a [Region], start: &str) -> &'a [String] {
        &regions.iter().find(|r| r.start == start).unwrap().lines
    }

    #[test]
    fn test_targets_order() {
        let temp = TempDir::new().unwrap();
        let catalog = sample_catalog(temp.path());
        let l = layout(temp.path());
        let paths: Vec<_> = targets(&catalog, &l, "Test module")
            .into_iter()
            .map(|t| t.path)
            .collect();
        assert_eq!(
            paths,
            vec![l.makefile, l.pcbuild_project, l.pcbuild_filters, l.frozen_file]
        );
    }

    #[test]
    fn test_frozen_table_regions() {
        let temp = TempDir::new().unwrap();
        let catalog = sample_catalog(temp.path());
        let regions = frozen::regions(&catalog, &layout(temp.path()).frozen_file, "Test module");

        assert_eq!(
            region(&regions, frozen::INCLUDES_START)[0],
            "#include \"frozen_modules/zipimport.h\""
        );
        assert_eq!(
            region(&regions, frozen::BOOTSTRAP_START),
            &["    {\"zipimport\", _Py_M__zipimport, (int)sizeof(_Py_M__zipimport), false},"]
        );
        assert_eq!(
            region(&regions, frozen::STDLIB_START),
            &[
                "    /* stdlib - startup */",
                "    {\"os\", _Py_M__os, (int)sizeof(_Py_M__os), false},",
                "    {\"posixpath\", _Py_M__posixpath, (int)sizeof(_Py_M__posixpath), false},",
                "    {\"os.path\", _Py_M__posixpath, (int)sizeof(_Py_M__posixpath), false},",
            ]
        );

        let tests = region(&regions, frozen::TEST_START);
        assert_eq!(
            tests[0],
            "    {\"__phello__\", _Py_M____phello__, (int)sizeof(_Py_M____phello__), true},"
        );
        assert_eq!(tests.len(), 3);

        assert_eq!(
            region(&regions, frozen::ALIASES_START),
            &[
                "    {\"os.path\", \"posixpath\"},",
                "    {\"__hello_only__\", NULL},",
            ]
        );
    }

    #[test]
    fn test_stdlib_sections_are_separated() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "Lib/abc.py");
        write(temp.path(), "Lib/codecs.py");
        let l = layout(temp.path());
        let catalog = CatalogBuilder::new(l.root, l.stdlib_dir, l.frozen_modules_dir.clone())
            .build(&[Section::new("one", ["abc"]), Section::new("two", ["codecs"])])
            .unwrap();

        let regions = frozen::regions(&catalog, &l.frozen_file, "Test module");
        let stdlib = region(&regions, frozen::STDLIB_START);
        assert_eq!(stdlib[0], "    /* one */");
        assert_eq!(stdlib[2], "");
        assert_eq!(stdlib[3], "    /* two */");
    }

    #[test]
    fn test_makefile_regions() {
        let temp = TempDir::new().unwrap();
        let catalog = sample_catalog(temp.path());
        let regions = makefile::regions(&catalog, temp.path());

        let files_in = region(&regions, makefile::FILES_IN_START);
        assert_eq!(files_in[0], "\t\tLib/zipimport.py \\");
        assert_eq!(files_in.last().unwrap(), "\t\tTools/freeze/flag.py");

        let files_out = region(&regions, makefile::FILES_OUT_START);
        assert_eq!(files_out.last().unwrap(), "\t\tPython/frozen_modules/frozen_only.h");

        let rules = region(&regions, makefile::RULES_START);
        assert_eq!(rules[0], "");
        assert_eq!(
            rules[1],
            "Python/frozen_modules/zipimport.h: Lib/zipimport.py $(FREEZE_MODULE_BOOTSTRAP_DEPS)"
        );
        assert_eq!(
            rules[2],
            "\t$(FREEZE_MODULE_BOOTSTRAP) zipimport $(srcdir)/Lib/zipimport.py Python/frozen_modules/zipimport.h"
        );
        assert_eq!(
            rules[4],
            "Python/frozen_modules/os.h: Lib/os.py $(FREEZE_MODULE_DEPS)"
        );
        assert_eq!(rules.len(), 1 + 3 * catalog.sources().count());
    }

    #[test]
    fn test_pcbuild_regions() {
        let temp = TempDir::new().unwrap();
        let catalog = sample_catalog(temp.path());

        let project = pcbuild::project_regions(&catalog, temp.path());
        assert_eq!(
            &project[0].lines[..5],
            &[
                "    <None Include=\"..\\Lib\\zipimport.py\">",
                "      <ModName>zipimport</ModName>",
                "      <IntFile>$(IntDir)zipimport.g.h</IntFile>",
                "      <OutFile>$(GeneratedFrozenModulesDir)Python\\frozen_modules\\zipimport.h</OutFile>",
                "    </None>",
            ]
        );

        let filters = pcbuild::filter_regions(&catalog, temp.path());
        assert_eq!(filters[0].lines.len(), 3 * catalog.sources().count());
        assert_eq!(filters[0].lines[1], "      <Filter>Python Files</Filter>");
    }
}
