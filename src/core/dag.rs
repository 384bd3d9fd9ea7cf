//! The shared match DAG: literal dispatch tables feeding clause `AndNode`s
//! feeding formula `OrNode`s, built once from the whole rule tree and then
//! immutable.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use super::clause::Clause;
use super::key::{Key, Specificity};
use super::property::Property;
use super::ruletree::{flatten_rules, RuleTreeNode};

pub(crate) type NodeId = usize;

/// A node of the match DAG. `AndNode` fires when its tally reaches zero, with
/// its own stored specificity. `OrNode` fires on every input, at whichever
/// propagated specificity was strictly higher than any seen before; its own
/// tally is only consulted while poisoning.
#[derive(Debug)]
pub(crate) enum Node {
    And {
        specificity: Specificity,
        tally_count: u32,
        children: Vec<NodeId>,
        props: Vec<(String, Property)>,
        constraints: Vec<Key>,
    },
    Or {
        tally_count: u32,
        children: Vec<NodeId>,
        props: Vec<(String, Property)>,
        constraints: Vec<Key>,
    },
}

impl Node {
    pub(crate) fn children(&self) -> &[NodeId] {
        match self {
            Node::And { children, .. } => children,
            Node::Or { children, .. } => children,
        }
    }

    pub(crate) fn props(&self) -> &[(String, Property)] {
        match self {
            Node::And { props, .. } => props,
            Node::Or { props, .. } => props,
        }
    }

    pub(crate) fn constraints(&self) -> &[Key] {
        match self {
            Node::And { constraints, .. } => constraints,
            Node::Or { constraints, .. } => constraints,
        }
    }

    pub(crate) fn tally_count(&self) -> u32 {
        match self {
            Node::And { tally_count, .. } => *tally_count,
            Node::Or { tally_count, .. } => *tally_count,
        }
    }
}

/// Per key-name dispatch table: a wildcard prerequisite and, per value, the
/// list of literal `AndNode`s that fire when that value is asserted.
#[derive(Debug, Default)]
pub(crate) struct LiteralMatcher {
    pub(crate) wildcard: Option<NodeId>,
    pub(crate) positive_values: FxHashMap<String, Vec<NodeId>>,
}

/// The whole shared DAG. Owns every node; clause/formula subgraphs are shared
/// where structurally justified. Immutable and freely shareable by reference
/// once built.
#[derive(Debug)]
pub(crate) struct Dag {
    pub(crate) nodes: Vec<Node>,
    pub(crate) dispatch: FxHashMap<String, LiteralMatcher>,
    pub(crate) root_props: Vec<(String, Property)>,
    pub(crate) root_constraints: Vec<Key>,
}

impl Dag {
    pub(crate) fn build(root: &RuleTreeNode) -> Dag {
        Builder::new().build(root)
    }
}

#[derive(Default)]
struct Builder {
    nodes: Vec<Node>,
    dispatch: FxHashMap<String, LiteralMatcher>,
    literal_node_of: FxHashMap<Key, NodeId>,
    clause_node_of: FxHashMap<Clause, NodeId>,
    /// Clause nodes built so far, in ascending-size processing order, kept
    /// around as set-cover candidates for larger clauses.
    built_clauses: Vec<(Clause, NodeId)>,
}

impl Builder {
    fn new() -> Self {
        Self::default()
    }

    fn build(mut self, root: &RuleTreeNode) -> Dag {
        let rules = flatten_rules(root);

        let mut all_clauses: BTreeSet<Clause> = BTreeSet::new();
        for rule in &rules {
            all_clauses.extend(rule.formula.clauses.iter().cloned());
            all_clauses.extend(rule.formula.shared.iter().cloned());
        }

        let mut all_literals: BTreeSet<Key> = BTreeSet::new();
        for clause in &all_clauses {
            all_literals.extend(clause.iter().cloned());
        }

        self.build_literals(all_literals);

        let mut sorted_clauses: Vec<Clause> = all_clauses.into_iter().collect();
        sorted_clauses.sort_by_key(Clause::len);
        for clause in sorted_clauses {
            self.build_clause(clause);
        }

        let mut sorted_rules = rules;
        sorted_rules.sort_by_key(|rule| rule.formula.clauses.len());
        for rule in sorted_rules {
            self.build_formula(rule);
        }

        Dag {
            nodes: self.nodes,
            dispatch: self.dispatch,
            root_props: root.props.clone(),
            root_constraints: root.constraints.clone(),
        }
    }

    fn build_literals(&mut self, literals: BTreeSet<Key>) {
        for key in literals {
            let node_id = self.nodes.len();
            self.nodes.push(Node::And {
                specificity: key.specificity(),
                tally_count: 1,
                children: Vec::new(),
                props: Vec::new(),
                constraints: Vec::new(),
            });
            let matcher = self.dispatch.entry(key.name.clone()).or_default();
            if key.is_wildcard() {
                matcher.wildcard = Some(node_id);
            } else {
                for value in &key.values {
                    matcher.positive_values.entry(value.clone()).or_default().push(node_id);
                }
            }
            self.literal_node_of.insert(key.clone(), node_id);
            self.built_clauses.push((Clause::single(key), node_id));
        }
    }

    fn build_clause(&mut self, clause: Clause) {
        if self.clause_node_of.contains_key(&clause) {
            return;
        }
        if clause.is_empty() {
            return;
        }
        if clause.len() == 1 {
            let key = clause.iter().next().unwrap();
            let node_id = self.literal_node_of[key];
            self.clause_node_of.insert(clause, node_id);
            return;
        }

        let prerequisites = if clause.len() == 2 {
            clause
                .iter()
                .map(|key| self.literal_node_of[key])
                .collect::<Vec<_>>()
        } else {
            self.set_cover(&clause)
        };

        let node_id = self.nodes.len();
        self.nodes.push(Node::And {
            specificity: clause.specificity(),
            tally_count: prerequisites.len() as u32,
            children: Vec::new(),
            props: Vec::new(),
            constraints: Vec::new(),
        });
        for prereq in &prerequisites {
            self.push_child(*prereq, node_id);
        }
        self.built_clauses.push((clause.clone(), node_id));
        self.clause_node_of.insert(clause, node_id);
    }

    /// Greedy weighted set cover: repeatedly picks the already-built
    /// sub-clause that covers the most still-uncovered literals of `clause`,
    /// breaking ties by clause size (longer first) then lexicographically.
    fn set_cover(&self, clause: &Clause) -> Vec<NodeId> {
        let mut candidates: Vec<&(Clause, NodeId)> = self
            .built_clauses
            .iter()
            .filter(|(candidate, _)| candidate.len() < clause.len() && candidate.is_subset_of(clause))
            .collect();

        let mut covered: BTreeSet<&Key> = BTreeSet::new();
        let mut chosen = Vec::new();

        loop {
            let best = candidates
                .iter()
                .enumerate()
                .map(|(idx, (candidate, node_id))| {
                    let weight = candidate.iter().filter(|k| !covered.contains(k)).count();
                    (idx, weight, candidate, *node_id)
                })
                .max_by(|a, b| {
                    a.1.cmp(&b.1).then_with(|| tiebreak(a.2, b.2))
                });

            match best {
                Some((idx, weight, candidate, node_id)) if weight > 0 => {
                    chosen.push(node_id);
                    covered.extend(candidate.iter());
                    candidates.remove(idx);
                }
                _ => break,
            }
        }

        for key in clause.iter() {
            if !covered.contains(key) {
                chosen.push(self.literal_node_of[key]);
            }
        }
        chosen
    }

    fn build_formula(&mut self, rule: &RuleTreeNode) {
        let children: Vec<NodeId> = rule
            .formula
            .clauses
            .iter()
            .map(|c| self.clause_node_of[c])
            .collect();
        let node_id = self.nodes.len();
        self.nodes.push(Node::Or {
            tally_count: children.len() as u32,
            children: children.clone(),
            props: rule.props.clone(),
            constraints: rule.constraints.clone(),
        });
        for child in &children {
            self.push_child(*child, node_id);
        }
    }

    fn push_child(&mut self, prerequisite: NodeId, consumer: NodeId) {
        match &mut self.nodes[prerequisite] {
            Node::And { children, .. } => children.push(consumer),
            Node::Or { children, .. } => children.push(consumer),
        }
    }
}

/// Tiebreak for set-cover candidates of equal weight: longer clauses first,
/// then lexicographic (by the clause's own, deterministic, `Ord`).
fn tiebreak(a: &Clause, b: &Clause) -> Ordering {
    b.len().cmp(&a.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formula::Formula;
    use crate::core::property::{Origin, Property, PropertyValue};
    use crate::core::ruletree::RuleTreeNode;

    fn leaf(formula: Formula, props: Vec<(&str, &str)>) -> RuleTreeNode {
        RuleTreeNode {
            formula,
            children: Vec::new(),
            props: props
                .into_iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        Property::new(
                            name,
                            PropertyValue::literal(value),
                            Origin::new("<test>", 1),
                            0,
                        ),
                    )
                })
                .collect(),
            constraints: Vec::new(),
        }
    }

    #[test]
    fn literal_aliases_size_one_clause() {
        let mut root = leaf(Formula::root(), vec![]);
        let clause = Clause::single(Key::value("a", "1"));
        root.children.push(leaf(Formula::single_clause(clause), vec![("x", "y")]));
        let dag = Dag::build(&root);
        let matcher = &dag.dispatch["a"];
        assert!(matcher.positive_values.contains_key("1"));
        // the clause node should be the very literal node (aliasing, no
        // intermediate AndNode created for a singleton clause).
        assert_eq!(dag.nodes.len(), 2); // literal + formula OrNode
    }

    #[test]
    fn two_literal_clause_builds_and_node() {
        let mut root = leaf(Formula::root(), vec![]);
        let clause = Clause::new([Key::value("a", "1"), Key::value("b", "1")]);
        root.children.push(leaf(Formula::single_clause(clause), vec![("x", "y")]));
        let dag = Dag::build(&root);
        // 2 literals + 1 clause AndNode + 1 formula OrNode
        assert_eq!(dag.nodes.len(), 4);
    }
}
