//! The `@import` resolver capability and its default filesystem-backed
//! implementation, plus the circular-import bookkeeping the crate's error
//! model requires (spec §6/§7).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Diagnostic;

use super::ast::RuleItem;
use super::grammar::parse_ruleset;

/// Resolves an `@import` location to its source text.
///
/// The core only consumes this capability; a deployable crate ships the
/// default [FilesystemResolver] below, but embedders may supply their own
/// (e.g. backed by an in-memory map, a network fetch, or a package registry).
pub trait ImportResolver {
    fn resolve(&self, location: &str) -> Result<String, String>;
}

/// An [ImportResolver] that rejects every `@import`. Useful for a standalone
/// ruleset (or a test fixture) that is known not to use imports: any
/// `@import` directive is then dropped with a diagnostic instead of panicking
/// or requiring a filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImportResolver;

impl ImportResolver for NoImportResolver {
    fn resolve(&self, location: &str) -> Result<String, String> {
        Err(format!("imports are not supported in this context ('{location}')"))
    }
}

/// Resolves `@import` locations relative to the importing file's directory.
#[derive(Debug, Clone, Default)]
pub struct FilesystemResolver {
    base_dir: Option<PathBuf>,
}

impl FilesystemResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Resolves relative to the current working directory.
    pub fn cwd() -> Self {
        Self { base_dir: None }
    }

    fn path_for(&self, location: &str) -> PathBuf {
        match &self.base_dir {
            Some(dir) => dir.join(location),
            None => Path::new(location).to_path_buf(),
        }
    }
}

impl ImportResolver for FilesystemResolver {
    fn resolve(&self, location: &str) -> Result<String, String> {
        let path = self.path_for(location);
        std::fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()))
    }
}

/// Recursively resolves every `@import` directive in `items`, splicing each
/// one's top-level rules in at the point of the directive.
///
/// A cyclic import or a resolver/parse failure downgrades that one `@import`
/// to a no-op: it contributes no rules, a [Diagnostic] is recorded, and the
/// rest of the (importing and imported) rulesets still parse and match
/// normally, per spec §7's `CircularImport` policy.
pub(crate) fn resolve_imports(
    items: Vec<RuleItem>,
    in_progress: &mut HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
    resolver: &dyn ImportResolver,
) -> Vec<RuleItem> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            RuleItem::Import { location, origin } => {
                if in_progress.contains(&location) {
                    diagnostics.push(Diagnostic::circular_import(origin.to_string(), &location));
                    continue;
                }
                match resolver.resolve(&location) {
                    Ok(text) => match parse_ruleset(&text, &location) {
                        Ok(parsed) => {
                            in_progress.insert(location.clone());
                            let resolved =
                                resolve_imports(parsed.items, in_progress, diagnostics, resolver);
                            in_progress.remove(&location);
                            out.extend(resolved);
                        }
                        Err(err) => {
                            diagnostics.push(Diagnostic::parse(location, err.to_string()));
                        }
                    },
                    Err(message) => {
                        diagnostics.push(Diagnostic::parse(
                            origin.to_string(),
                            format!("failed to resolve @import '{location}': {message}"),
                        ));
                    }
                }
            }
            RuleItem::Block { selector, body } => {
                let body = resolve_imports(body, in_progress, diagnostics, resolver);
                out.push(RuleItem::Block { selector, body });
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::property::Origin;
    use std::collections::HashMap;

    struct MapResolver(HashMap<String, String>);

    impl ImportResolver for MapResolver {
        fn resolve(&self, location: &str) -> Result<String, String> {
            self.0
                .get(location)
                .cloned()
                .ok_or_else(|| "not found".to_string())
        }
    }

    #[test]
    fn splices_imported_rules_in_place() {
        let mut map = HashMap::new();
        map.insert("child.ccs".to_string(), "x = from_child".to_string());
        let resolver = MapResolver(map);

        let items = vec![
            RuleItem::Import {
                location: "child.ccs".to_string(),
                origin: Origin::new("<test>", 1),
            },
            RuleItem::BareProp {
                name: "y".to_string(),
                value: crate::core::property::PropertyValue::literal("z"),
                origin: Origin::new("<test>", 2),
            },
        ];

        let mut diagnostics = Vec::new();
        let mut in_progress = HashSet::new();
        let resolved = resolve_imports(items, &mut in_progress, &mut diagnostics, &resolver);
        assert_eq!(resolved.len(), 2);
        assert!(diagnostics.is_empty());
        assert!(matches!(&resolved[0], RuleItem::BareProp { name, .. } if name == "x"));
    }

    #[test]
    fn circular_import_is_dropped_with_a_diagnostic() {
        let mut map = HashMap::new();
        map.insert("a.ccs".to_string(), "@import 'b.ccs'\nx = a".to_string());
        map.insert("b.ccs".to_string(), "@import 'a.ccs'\ny = b".to_string());
        let resolver = MapResolver(map);

        let items = vec![RuleItem::Import {
            location: "a.ccs".to_string(),
            origin: Origin::new("<root>", 1),
        }];

        let mut diagnostics = Vec::new();
        let mut in_progress = HashSet::new();
        let resolved = resolve_imports(items, &mut in_progress, &mut diagnostics, &resolver);
        // both x and y still end up defined; only the cyclic third hop is dropped.
        assert_eq!(resolved.len(), 2);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn missing_import_is_dropped_with_a_diagnostic() {
        let resolver = MapResolver(HashMap::new());
        let items = vec![RuleItem::Import {
            location: "missing.ccs".to_string(),
            origin: Origin::new("<test>", 1),
        }];
        let mut diagnostics = Vec::new();
        let mut in_progress = HashSet::new();
        let resolved = resolve_imports(items, &mut in_progress, &mut diagnostics, &resolver);
        assert!(resolved.is_empty());
        assert_eq!(diagnostics.len(), 1);
    }
}
