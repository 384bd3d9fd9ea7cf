//! The rule-tree builder's input: one parsed top-level item, already carrying
//! core types (`Selector`, `PropertyValue`, `Origin`, `Key`) rather than a
//! separate untyped syntax tree, since the grammar (§4.7) maps directly onto
//! them.

use crate::core::key::Key;
use crate::core::property::{Origin, PropertyValue};
use crate::core::selector::Selector;

/// One item of a parsed ruleset, at any nesting depth.
///
/// `Import` items are only ever produced by the grammar layer; rule-tree
/// construction never sees one, because [super::import::resolve_imports]
/// splices every import's resolved items in at the point of the directive
/// before the rule tree is built.
#[derive(Debug, Clone)]
pub(crate) enum RuleItem {
    Block {
        selector: Selector,
        body: Vec<RuleItem>,
    },
    InlineProp {
        selector: Selector,
        name: String,
        value: PropertyValue,
        origin: Origin,
    },
    BareProp {
        name: String,
        value: PropertyValue,
        origin: Origin,
    },
    Override {
        name: String,
        value: PropertyValue,
        origin: Origin,
    },
    Constrain {
        step: Key,
    },
    Import {
        location: String,
        origin: Origin,
    },
}
