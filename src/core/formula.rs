//! Formula algebra: clause-sets in normal form, DNF conversion and expansion.

use std::collections::BTreeSet;

use crate::error::CcsError;

use super::clause::Clause;
use super::selector::Selector;

/// A disjunction of [Clause]s, plus a set of *shared* subclauses tracked for
/// DAG sharing (non-semantic — only consulted by the DAG builder).
///
/// `clauses` is kept in normal form: no clause is a proper subset of another.
/// The empty formula (one empty clause) is the universally-true formula, used
/// as the root scope's cumulative selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Formula {
    pub(crate) clauses: BTreeSet<Clause>,
    pub(crate) shared: BTreeSet<Clause>,
}

impl Formula {
    pub(crate) fn new(clauses: impl IntoIterator<Item = Clause>, shared: impl IntoIterator<Item = Clause>) -> Self {
        Formula {
            clauses: clauses.into_iter().collect(),
            shared: shared.into_iter().collect(),
        }
        .normalize()
    }

    /// The universally-true formula (root scope): one empty clause, no
    /// shared subclauses.
    pub(crate) fn root() -> Self {
        let mut clauses = BTreeSet::new();
        clauses.insert(Clause::empty());
        Formula {
            clauses,
            shared: BTreeSet::new(),
        }
    }

    pub(crate) fn single_clause(clause: Clause) -> Self {
        let mut clauses = BTreeSet::new();
        clauses.insert(clause);
        Formula {
            clauses,
            shared: BTreeSet::new(),
        }
    }

    /// Removes any clause that has a proper subset already present, and any
    /// shared subclause that is no longer a strict subset of a surviving
    /// clause.
    pub(crate) fn normalize(mut self) -> Self {
        let originals: Vec<Clause> = self.clauses.iter().cloned().collect();
        self.clauses.retain(|c| {
            !originals
                .iter()
                .any(|other| other != c && other.is_subset_of(c))
        });
        self.shared.retain(|s| {
            self.clauses
                .iter()
                .any(|c| s.len() < c.len() && s.is_subset_of(c))
        });
        self
    }

    /// Unions the clause-sets and shared-sets of several formulae (DNF of an
    /// `Or`), then renormalizes.
    pub(crate) fn merge(formulae: impl IntoIterator<Item = Formula>) -> Self {
        let mut clauses = BTreeSet::new();
        let mut shared = BTreeSet::new();
        for f in formulae {
            clauses.extend(f.clauses);
            shared.extend(f.shared);
        }
        Formula { clauses, shared }.normalize()
    }
}

/// Computes the Cartesian product of the clauses of `forms`, unioning each
/// combination pairwise, subject to an expansion limit checked *before*
/// allocation (spec §4.2).
///
/// Also detects shared subclauses induced by the expansion, for later DAG
/// sharing.
pub(crate) fn expand(forms: &[Formula], limit: usize) -> Result<Formula, CcsError> {
    let mut product: usize = 1;
    for f in forms {
        product = product.saturating_mul(f.clauses.len().max(1));
        if product > limit {
            return Err(CcsError::ExpansionLimitExceeded {
                actual: product,
                limit,
            });
        }
    }

    let mut result_clauses: Vec<Clause> = vec![Clause::empty()];
    for f in forms {
        let mut next = Vec::with_capacity(result_clauses.len() * f.clauses.len().max(1));
        for rc in &result_clauses {
            for c in &f.clauses {
                next.push(rc.union(c));
            }
        }
        result_clauses = next;
    }

    let nontrivial_forms: Vec<&Formula> = forms.iter().filter(|f| f.clauses.len() > 1).collect();
    let singleton_sole = forms
        .iter()
        .filter(|f| f.clauses.len() == 1)
        .map(|f| f.clauses.iter().next().unwrap());

    let mut shared: BTreeSet<Clause> = BTreeSet::new();
    for f in forms {
        shared.extend(f.shared.iter().cloned());
    }

    if !nontrivial_forms.is_empty() {
        let common = singleton_sole.fold(Clause::empty(), |acc, c| acc.union(c));
        if common.len() >= 2 {
            shared.insert(common);
        }
    }
    if nontrivial_forms.len() >= 2 {
        for f in &nontrivial_forms {
            for c in &f.clauses {
                if c.len() >= 2 {
                    shared.insert(c.clone());
                }
            }
        }
    }

    Ok(Formula::new(result_clauses, shared))
}

/// Converts a flattened selector into a normalized [Formula], subject to an
/// expansion limit that bounds all downstream DAG sizes.
pub(crate) fn to_dnf(selector: &Selector, limit: usize) -> Result<Formula, CcsError> {
    match selector {
        Selector::Step(key) => Ok(Formula::single_clause(Clause::single(key.clone()))),
        Selector::Or(children) => {
            let parts = children
                .iter()
                .map(|c| to_dnf(c, limit))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Formula::merge(parts))
        }
        Selector::And(children) => {
            let parts = children
                .iter()
                .map(|c| to_dnf(c, limit))
                .collect::<Result<Vec<_>, _>>()?;
            expand(&parts, limit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::key::Key;

    fn step(name: &str, value: &str) -> Selector {
        Selector::Step(Key::value(name, value))
    }

    #[test]
    fn subsumed_clauses_are_dropped() {
        let small = Clause::single(Key::value("a", "1"));
        let big = Clause::new([Key::value("a", "1"), Key::value("b", "1")]);
        let formula = Formula::new([small.clone(), big], []);
        assert_eq!(formula.clauses.len(), 1);
        assert!(formula.clauses.contains(&small));
    }

    #[test]
    fn dnf_of_single_step() {
        let f = to_dnf(&step("a", "1"), 1000).unwrap();
        assert_eq!(f.clauses.len(), 1);
    }

    #[test]
    fn dnf_of_or() {
        let e = Selector::Or(vec![step("a", "1"), step("b", "1")]);
        let f = to_dnf(&e, 1000).unwrap();
        assert_eq!(f.clauses.len(), 2);
    }

    #[test]
    fn dnf_of_and_over_or_expands() {
        let e = Selector::And(vec![
            Selector::Or(vec![step("a", "1"), step("a", "2")]),
            step("b", "1"),
        ]);
        let f = to_dnf(&e, 1000).unwrap();
        assert_eq!(f.clauses.len(), 2);
        for clause in &f.clauses {
            assert_eq!(clause.len(), 2);
        }
    }

    #[test]
    fn expansion_limit_is_enforced() {
        let parts: Vec<Formula> = (0..5)
            .map(|i| Formula::merge([to_dnf(&step("k", &i.to_string()), 1000).unwrap()]))
            .collect();
        let err = expand(&parts, 3).unwrap_err();
        assert!(matches!(err, CcsError::ExpansionLimitExceeded { .. }));
    }

    #[test]
    fn shared_subclause_detected() {
        // (a b) and (a c): the common literal "a" is shared when combined
        // with a nontrivial clause set.
        let nontrivial = Formula::new(
            [
                Clause::new([Key::value("a", "1"), Key::value("b", "1")]),
                Clause::new([Key::value("a", "1"), Key::value("c", "1")]),
            ],
            [],
        );
        let singleton = Formula::single_clause(Clause::new([
            Key::value("d", "1"),
            Key::value("e", "1"),
        ]));
        let result = expand(&[nontrivial, singleton], 1000).unwrap();
        assert!(result
            .shared
            .iter()
            .any(|c| c.len() >= 2 && c.iter().all(|k| k.name == "d" || k.name == "e")));
    }

    #[test]
    fn normalize_is_idempotent() {
        let f = Formula::new(
            [
                Clause::single(Key::value("a", "1")),
                Clause::new([Key::value("a", "1"), Key::value("b", "1")]),
            ],
            [],
        );
        let once = f.clone().normalize();
        let twice = once.clone().normalize();
        assert_eq!(once, twice);
    }
}
