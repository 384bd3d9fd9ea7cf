//! Selector AST and its flattening into alternating normal form.

use std::collections::BTreeMap;

use super::key::Key;

/// A selector expression: `Step(key)` / `And(children)` / `Or(children)`.
///
/// Closed sum, matching the teacher's preference for tagged unions over open
/// inheritance for the syntax-tree types it walks repeatedly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selector {
    Step(Key),
    And(Vec<Selector>),
    Or(Vec<Selector>),
}

impl Selector {
    /// Flattens this selector into alternating normal form: every `And`/`Or`
    /// node's children are either leaves or the opposite operator.
    ///
    /// See spec §4.1. Single-key `Or` groups are folded into one multi-valued
    /// step, which is what keeps `a.{b,c,d}` (and its desugared form
    /// `a.b, a.c, a.d`) from blowing up DNF conversion.
    pub(crate) fn flatten(&self) -> Selector {
        match self {
            Selector::Step(key) => Selector::Step(key.clone()),
            Selector::And(children) => {
                let mut flat = Vec::new();
                for child in children {
                    match child.flatten() {
                        Selector::And(grandchildren) => flat.extend(grandchildren),
                        other => flat.push(other),
                    }
                }
                splice(Selector::And(flat))
            }
            Selector::Or(children) => {
                let mut flat: Vec<Selector> = Vec::new();
                let mut by_name: BTreeMap<String, usize> = BTreeMap::new();
                for child in children {
                    match child.flatten() {
                        Selector::Or(grandchildren) => {
                            for gc in grandchildren {
                                absorb_or_child(gc, &mut flat, &mut by_name);
                            }
                        }
                        other => absorb_or_child(other, &mut flat, &mut by_name),
                    }
                }
                splice(Selector::Or(flat))
            }
        }
    }
}

/// Folds a child being absorbed into an `Or`'s child list: single-key `Step`s
/// sharing a name are merged into one multi-valued `Step`.
fn absorb_or_child(child: Selector, flat: &mut Vec<Selector>, by_name: &mut BTreeMap<String, usize>) {
    if let Selector::Step(key) = &child {
        if let Some(&idx) = by_name.get(&key.name) {
            if let Selector::Step(existing) = &mut flat[idx] {
                existing.values.extend(key.values.iter().cloned());
                return;
            }
        }
        by_name.insert(key.name.clone(), flat.len());
    }
    flat.push(child);
}

/// Splices out a single-child `And`/`Or` node, returning the child directly.
fn splice(node: Selector) -> Selector {
    match node {
        Selector::And(mut children) | Selector::Or(mut children) if children.len() == 1 => {
            children.pop().unwrap()
        }
        other => other,
    }
}
