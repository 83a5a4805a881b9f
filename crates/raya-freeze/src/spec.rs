//! Frozen module spec parsing
//!
//! A spec is one line of the freeze table. Supported forms:
//!
//! ```text
//! frozenid                   freeze a module under its own name
//! frozenid : modname         freeze a module under another name
//! frozenid : modname = file  freeze an explicit source file
//! <pkg>                      freeze a package
//! <pkg.*>                    ... and its direct submodules
//! <pkg.**.*>                 ... and its full submodule tree
//! frozenid : <modname>       expose a module as a package
//! ```
//!
//! Angle brackets mark a package. A bracketed id may be renamed
//! (`<pkg.**.*> : alias`), which renames every expanded submodule too.

use crate::locator::{is_identifier, is_valid_id};
use crate::matcher::Matcher;
use crate::resolver::ResolveError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised for malformed or contradictory specs
#[derive(Debug, Error)]
pub enum SpecError {
    /// A dotted name has a segment that is not an identifier
    #[error("Not a valid module name ({name}) in spec {spec:?}")]
    InvalidModuleName { spec: String, name: String },

    /// The spec matches none of the supported forms
    #[error("Malformed spec {spec:?}: {reason}")]
    Malformed { spec: String, reason: String },

    /// An explicit source file was given for an id that is already frozen
    #[error("Spec {spec:?} gives a source file for {id}, which is already frozen")]
    DuplicateId { spec: String, id: String },

    /// An explicit source file is a directory
    #[error("Spec {spec:?} names a directory as its source file: {path}")]
    DirectoryAsFile { spec: String, path: PathBuf },

    /// One frozen id was declared with two different source files
    #[error("Frozen id {id} is declared with {requested} but already uses {existing}")]
    ConflictingSource {
        id: String,
        existing: PathBuf,
        requested: PathBuf,
    },

    /// One exposed name refers to two different frozen ids
    #[error("Module name {name} is declared for both {existing} and {requested}")]
    DuplicateName {
        name: String,
        existing: String,
        requested: String,
    },

    /// The package pattern could not be parsed
    #[error("Invalid pattern in spec {spec:?}: {source}")]
    Pattern {
        spec: String,
        #[source]
        source: ResolveError,
    },
}

/// A bracketed package id with an optional submodule pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePattern {
    /// Package id, without brackets or pattern
    pub id: String,
    /// Which submodules to expand, if any
    pub matcher: Option<Matcher>,
}

impl PackagePattern {
    /// Parse the text between the angle brackets
    ///
    /// Patterns are only recognized at the end of the name: `pkg.*` and
    /// `pkg.**.*`. A trailing identifier is part of the package id.
    pub fn parse(inner: &str) -> Result<Self, ResolveError> {
        let (id, matcher) = match inner.rsplit_once('.') {
            Some((head, tail)) => {
                if let Some(id) = head.strip_suffix(".**") {
                    (id, Some(Matcher::parse(&format!("**.{}", tail))?))
                } else if !tail.is_empty() && !is_identifier(tail) {
                    (head, Some(Matcher::parse(tail)?))
                } else {
                    (inner, None)
                }
            }
            None => (inner, None),
        };

        Ok(Self {
            id: id.to_string(),
            matcher,
        })
    }
}

impl fmt::Display for PackagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matcher {
            Some(matcher) => write!(f, "<{}.{}>", self.id, matcher),
            None => write!(f, "<{}>", self.id),
        }
    }
}

/// One parsed spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSpec {
    /// `frozenid` or `frozenid : modname`
    Module { id: String, name: Option<String> },

    /// `frozenid : modname = file`
    File {
        id: String,
        name: String,
        file: PathBuf,
    },

    /// `<pkg>`, `<pkg.*>`, `<pkg.**.*>`, optionally `: modname`
    Package {
        pattern: PackagePattern,
        name: Option<String>,
    },

    /// `frozenid : <modname>`, optionally `= file`
    PackageAlias {
        id: String,
        name: String,
        file: Option<PathBuf>,
    },
}

fn is_bracketed(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('<') && text.ends_with('>')
}

fn check_name(spec: &str, name: &str) -> Result<(), SpecError> {
    if is_valid_id(name) {
        Ok(())
    } else {
        Err(SpecError::InvalidModuleName {
            spec: spec.to_string(),
            name: name.to_string(),
        })
    }
}

impl ModuleSpec {
    /// Parse a single spec line
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        let (id, remainder) = spec.split_once(':').unwrap_or((spec, ""));
        let (name, file) = remainder.split_once('=').unwrap_or((remainder, ""));
        let id = id.trim();
        let name = name.trim();
        let file = file.trim();

        if id.is_empty() {
            return Err(SpecError::Malformed {
                spec: spec.to_string(),
                reason: "missing frozen id".to_string(),
            });
        }

        if is_bracketed(name) {
            check_name(spec, id)?;
            let name = &name[1..name.len() - 1];
            check_name(spec, name)?;
            return Ok(ModuleSpec::PackageAlias {
                id: id.to_string(),
                name: name.to_string(),
                file: (!file.is_empty()).then(|| PathBuf::from(file)),
            });
        }

        if !name.is_empty() {
            check_name(spec, name)?;
        }
        let name = (!name.is_empty()).then(|| name.to_string());

        if !file.is_empty() {
            check_name(spec, id)?;
            let name = name.ok_or_else(|| SpecError::Malformed {
                spec: spec.to_string(),
                reason: "a source file requires a module name".to_string(),
            })?;
            return Ok(ModuleSpec::File {
                id: id.to_string(),
                name,
                file: PathBuf::from(file),
            });
        }

        if is_bracketed(id) {
            let pattern =
                PackagePattern::parse(&id[1..id.len() - 1]).map_err(|source| SpecError::Pattern {
                    spec: spec.to_string(),
                    source,
                })?;
            check_name(spec, &pattern.id)?;
            return Ok(ModuleSpec::Package { pattern, name });
        }

        check_name(spec, id)?;
        Ok(ModuleSpec::Module {
            id: id.to_string(),
            name,
        })
    }

    /// The frozen id this spec starts from
    pub fn id(&self) -> &str {
        match self {
            ModuleSpec::Module { id, .. }
            | ModuleSpec::File { id, .. }
            | ModuleSpec::PackageAlias { id, .. } => id,
            ModuleSpec::Package { pattern, .. } => &pattern.id,
        }
    }
}

impl fmt::Display for ModuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSpec::Module { id, name: None } => write!(f, "{}", id),
            ModuleSpec::Module { id, name: Some(name) } => write!(f, "{} : {}", id, name),
            ModuleSpec::File { id, name, file } => {
                write!(f, "{} : {} = {}", id, name, file.display())
            }
            ModuleSpec::Package {
                pattern,
                name: None,
            } => write!(f, "{}", pattern),
            ModuleSpec::Package {
                pattern,
                name: Some(name),
            } => write!(f, "{} : {}", pattern, name),
            ModuleSpec::PackageAlias { id, name, file } => {
                write!(f, "{} : <{}>", id, name)?;
                if let Some(file) = file {
                    write!(f, " = {}", file.display())?;
                }
                Ok(())
            }
        }
    }
}

impl std::str::FromStr for ModuleSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleSpec::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_id() {
        let spec = ModuleSpec::parse("zipimport").unwrap();
        assert_eq!(
            spec,
            ModuleSpec::Module {
                id: "zipimport".to_string(),
                name: None
            }
        );
    }

    #[test]
    fn test_parse_rename() {
        let spec = ModuleSpec::parse("importlib._bootstrap : _frozen_importlib").unwrap();
        assert_eq!(
            spec,
            ModuleSpec::Module {
                id: "importlib._bootstrap".to_string(),
                name: Some("_frozen_importlib".to_string())
            }
        );
    }

    #[test]
    fn test_parse_explicit_file() {
        let spec = ModuleSpec::parse("frozen_only : __hello_only__ = Tools/freeze/flag.py").unwrap();
        assert_eq!(
            spec,
            ModuleSpec::File {
                id: "frozen_only".to_string(),
                name: "__hello_only__".to_string(),
                file: PathBuf::from("Tools/freeze/flag.py"),
            }
        );
    }

    #[test]
    fn test_parse_explicit_file_requires_name() {
        let result = ModuleSpec::parse("frozen_only : = flag.py");
        assert!(matches!(result, Err(SpecError::Malformed { .. })));
    }

    #[test]
    fn test_parse_package_forms() {
        let spec = ModuleSpec::parse("<encodings>").unwrap();
        assert_eq!(
            spec,
            ModuleSpec::Package {
                pattern: PackagePattern {
                    id: "encodings".to_string(),
                    matcher: None
                },
                name: None
            }
        );

        let spec = ModuleSpec::parse("<encodings.*>").unwrap();
        assert!(matches!(
            spec,
            ModuleSpec::Package { pattern: PackagePattern { ref id, matcher: Some(Matcher::Children) }, .. }
                if id == "encodings"
        ));

        let spec = ModuleSpec::parse("<__phello__.**.*>").unwrap();
        assert!(matches!(
            spec,
            ModuleSpec::Package { pattern: PackagePattern { ref id, matcher: Some(Matcher::Tree) }, .. }
                if id == "__phello__"
        ));
    }

    #[test]
    fn test_parse_dotted_package_without_pattern() {
        let spec = ModuleSpec::parse("<__phello__.ham>").unwrap();
        assert_eq!(spec.id(), "__phello__.ham");
        assert!(matches!(spec, ModuleSpec::Package { pattern: PackagePattern { matcher: None, .. }, .. }));
    }

    #[test]
    fn test_parse_renamed_package() {
        let spec = ModuleSpec::parse("<pkg.**.*> : alias").unwrap();
        assert!(matches!(spec, ModuleSpec::Package { name: Some(ref n), .. } if n == "alias"));
    }

    #[test]
    fn test_parse_package_alias() {
        let spec = ModuleSpec::parse("__hello__ : <__phello_alias__>").unwrap();
        assert_eq!(
            spec,
            ModuleSpec::PackageAlias {
                id: "__hello__".to_string(),
                name: "__phello_alias__".to_string(),
                file: None,
            }
        );
    }

    #[test]
    fn test_unsupported_pattern_is_rejected() {
        let result = ModuleSpec::parse("<encodings.utf*>");
        assert!(matches!(
            result,
            Err(SpecError::Pattern { source: ResolveError::UnsupportedPattern(_), .. })
        ));
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        for spec in ["foo-bar", "a..b", "os : os-path", "<pkg> : <alias>", "<a.b> : x = f.py", "<>"] {
            let result = ModuleSpec::parse(spec);
            assert!(
                matches!(result, Err(SpecError::InvalidModuleName { .. })),
                "spec {:?} should be rejected, got {:?}",
                spec,
                result
            );
        }
    }

    #[test]
    fn test_empty_spec_is_malformed() {
        assert!(matches!(ModuleSpec::parse("  "), Err(SpecError::Malformed { .. })));
        assert!(matches!(ModuleSpec::parse(": name"), Err(SpecError::Malformed { .. })));
    }

    #[test]
    fn test_display_matches_source_form() {
        for text in [
            "zipimport",
            "posixpath : os.path",
            "frozen_only : __hello_only__ = flag.py",
            "<__phello__.**.*>",
            "<encodings.*>",
            "__hello__ : <__phello_alias__>",
        ] {
            assert_eq!(ModuleSpec::parse(text).unwrap().to_string(), text);
        }
    }
}
