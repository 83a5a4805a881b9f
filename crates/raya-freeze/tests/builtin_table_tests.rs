//! Integration tests for the built-in freeze table over a stdlib tree

use raya_freeze::generate::frozen;
use raya_freeze::{build_catalog, FreezeConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const STDLIB_FILES: &[&str] = &[
    "importlib/__init__.py",
    "importlib/_bootstrap.py",
    "importlib/_bootstrap_external.py",
    "importlib/util.py",
    "importlib/machinery.py",
    "zipimport.py",
    "abc.py",
    "codecs.py",
    "io.py",
    "_collections_abc.py",
    "_sitebuiltins.py",
    "genericpath.py",
    "ntpath.py",
    "posixpath.py",
    "os.py",
    "site.py",
    "stat.py",
    "runpy.py",
    "__hello__.py",
    "__phello__/__init__.py",
    "__phello__/spam.py",
    "__phello__/ham/__init__.py",
    "__phello__/ham/eggs.py",
];

fn create_stdlib() -> TempDir {
    let temp = TempDir::new().unwrap();
    let lib = temp.path().join("Lib");
    for file in STDLIB_FILES {
        let path = lib.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
    let flag = temp.path().join("Tools/freeze/flag.py");
    fs::create_dir_all(flag.parent().unwrap()).unwrap();
    fs::write(flag, "").unwrap();
    temp
}

fn aliases(root: &Path) -> Vec<String> {
    let config = FreezeConfig::builtin(root).unwrap();
    let catalog = build_catalog(&config).unwrap();
    let layout = config.layout();
    frozen::regions(&catalog, &layout.frozen_file, &config.manifest.tests_section)
        .into_iter()
        .find(|r| r.start == frozen::ALIASES_START)
        .unwrap()
        .lines
}

#[test]
fn test_builtin_aliases() {
    let temp = create_stdlib();
    let os_path = if cfg!(windows) { "ntpath" } else { "posixpath" };

    assert_eq!(
        aliases(temp.path()),
        vec![
            "    {\"_frozen_importlib\", \"importlib._bootstrap\"},".to_string(),
            "    {\"_frozen_importlib_external\", \"importlib._bootstrap_external\"},".to_string(),
            format!("    {{\"os.path\", \"{}\"}},", os_path),
            "    {\"__hello_alias__\", \"__hello__\"},".to_string(),
            "    {\"__phello_alias__\", \"__hello__\"},".to_string(),
            "    {\"__phello_alias__.spam\", \"__hello__\"},".to_string(),
            "    {\"__phello__.__init__\", \"<__phello__\"},".to_string(),
            "    {\"__phello__.ham.__init__\", \"<__phello__.ham\"},".to_string(),
            "    {\"__hello_only__\", NULL},".to_string(),
        ]
    );
}

#[test]
fn test_builtin_bootstrap_and_sources() {
    let temp = create_stdlib();
    let config = FreezeConfig::builtin(temp.path()).unwrap();
    let catalog = build_catalog(&config).unwrap();

    let bootstrap: Vec<_> = catalog
        .modules()
        .iter()
        .filter(|m| catalog.is_bootstrap(m))
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(
        bootstrap,
        vec!["_frozen_importlib", "_frozen_importlib_external", "zipimport"]
    );

    let mut ids: Vec<_> = catalog.sources().map(|s| s.id.as_str()).collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert!(!ids.contains(&"__phello__.__init__"));
    assert_eq!(catalog.sources().last().unwrap().id, "frozen_only");
}
