//! Rule tree: accumulates each nested scope's cumulative formula, properties
//! and constraints, ready for the DAG builder to consume.

use super::formula::{expand, to_dnf, Formula};
use super::key::Key;
use super::property::Property;
use crate::error::CcsError;
use crate::parser::ast::RuleItem;

/// One scope of the rule tree: the selector's cumulative formula from the
/// root, the properties and constraints set directly in this scope, and its
/// nested child scopes. Mutated only during construction.
pub(crate) struct RuleTreeNode {
    pub(crate) formula: Formula,
    pub(crate) children: Vec<RuleTreeNode>,
    pub(crate) props: Vec<(String, Property)>,
    pub(crate) constraints: Vec<Key>,
}

impl RuleTreeNode {
    fn leaf(formula: Formula) -> Self {
        Self {
            formula,
            children: Vec::new(),
            props: Vec::new(),
            constraints: Vec::new(),
        }
    }
}

/// Builds the whole rule tree from the top-level items of one fully-resolved
/// (imports already spliced in) ruleset.
pub(crate) fn build_root(items: &[RuleItem], expand_limit: usize) -> Result<RuleTreeNode, CcsError> {
    let mut root = RuleTreeNode::leaf(Formula::root());
    populate(&mut root, items, expand_limit)?;
    Ok(root)
}

fn populate(node: &mut RuleTreeNode, items: &[RuleItem], expand_limit: usize) -> Result<(), CcsError> {
    for item in items {
        match item {
            RuleItem::Block { selector, body, .. } => {
                let cumulative = cumulative_formula(node, selector, expand_limit)?;
                let mut child = RuleTreeNode::leaf(cumulative);
                populate(&mut child, body, expand_limit)?;
                node.children.push(child);
            }
            RuleItem::InlineProp {
                selector,
                name,
                value,
                origin,
            } => {
                let cumulative = cumulative_formula(node, selector, expand_limit)?;
                let mut child = RuleTreeNode::leaf(cumulative);
                child
                    .props
                    .push((name.clone(), Property::new(name.clone(), value.clone(), origin.clone(), 0)));
                node.children.push(child);
            }
            RuleItem::BareProp { name, value, origin } => {
                node.props
                    .push((name.clone(), Property::new(name.clone(), value.clone(), origin.clone(), 0)));
            }
            RuleItem::Override { name, value, origin } => {
                node.props
                    .push((name.clone(), Property::new(name.clone(), value.clone(), origin.clone(), 1)));
            }
            RuleItem::Constrain { step } => {
                node.constraints.push(step.clone());
            }
            RuleItem::Import { .. } => {
                unreachable!("@import directives must be resolved before rule-tree construction")
            }
        }
    }
    Ok(())
}

fn cumulative_formula(
    node: &RuleTreeNode,
    selector: &crate::core::selector::Selector,
    expand_limit: usize,
) -> Result<Formula, CcsError> {
    let selector_formula = to_dnf(&selector.flatten(), expand_limit)?;
    expand(&[node.formula.clone(), selector_formula], expand_limit)
}

/// Flattens every nested scope below (not including) `root` into a flat list,
/// the shape the DAG builder consumes.
pub(crate) fn flatten_rules(root: &RuleTreeNode) -> Vec<&RuleTreeNode> {
    let mut out = Vec::new();
    collect(root, &mut out);
    out
}

fn collect<'a>(node: &'a RuleTreeNode, out: &mut Vec<&'a RuleTreeNode>) {
    for child in &node.children {
        out.push(child);
        collect(child, out);
    }
}
