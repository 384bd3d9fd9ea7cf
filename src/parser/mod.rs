//! Surface-syntax front-end: grammar, AST and import resolution that turn
//! `.ccs` source text into the [ast::RuleItem] tree the rule-tree builder
//! consumes (spec §4.7).

pub(crate) mod ast;
mod grammar;
mod import;

use std::collections::HashSet;

use crate::error::{CcsError, Diagnostic};

pub use import::{FilesystemResolver, ImportResolver, NoImportResolver};

use ast::RuleItem;

/// Parses one source stream, without resolving `@import` directives.
pub(crate) fn parse_ruleset(text: &str, origin: &str) -> Result<Vec<RuleItem>, CcsError> {
    Ok(grammar::parse_ruleset(text, origin)?.items)
}

/// Parses selector grammar only. `Selector` is an internal DNF-conversion
/// type, so this stays crate-private; embedders reach the same grammar
/// through [load_ruleset] / [crate::Context::from_source] instead.
#[allow(dead_code)]
pub(crate) fn parse_selector(text: &str) -> Result<crate::core::selector::Selector, CcsError> {
    grammar::parse_selector_text(text, "<selector>")
}

/// Parses one source stream and resolves its `@import` directives via
/// `resolver`, recursively, tracking a visited-origin set to detect cycles.
///
/// A cycle or a resolver failure downgrades that one `@import` to a no-op; a
/// parse error in an imported file drops only that file's rules. Both are
/// recorded as non-fatal [Diagnostic]s rather than aborting (spec §7).
pub(crate) fn load_ruleset(
    text: &str,
    origin: &str,
    resolver: &dyn ImportResolver,
) -> Result<(Vec<RuleItem>, Vec<Diagnostic>), CcsError> {
    let items = parse_ruleset(text, origin)?;
    let mut diagnostics = Vec::new();
    let mut in_progress = HashSet::new();
    in_progress.insert(origin.to_string());
    let resolved = import::resolve_imports(items, &mut in_progress, &mut diagnostics, resolver);
    Ok((resolved, diagnostics))
}
