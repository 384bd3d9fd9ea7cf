//! The persistent context: incremental DAG activation and property query.

use std::collections::VecDeque;
use std::sync::Arc;

use super::accumulator::{AccumulatorKind, AccumulatorState};
use super::dag::{Dag, Node, NodeId};
use super::key::{Key, Specificity};
use super::property::{cast_with, Property};
use super::ruletree::build_root;
use crate::env::{EnvLookup, StdEnvLookup};
use crate::error::{CcsError, Diagnostic};
use crate::parser::{load_ruleset, ImportResolver};

/// Default bound on DNF clause-count blow-up (spec §4.2's `expand` limit),
/// used unless a caller sets [ContextOptions::expand_limit] explicitly.
pub const DEFAULT_EXPAND_LIMIT: usize = 100_000;

/// Construction-time knobs for a [Context]: which accumulator strategy to
/// use, the environment lookup for `${VAR}` interpolation, an optional trace
/// hook invoked on every successful single-property lookup, whether
/// constraint-exclusivity ("poisoning") tracking is enabled, and the DNF
/// expansion limit that bounds all downstream DAG sizes.
#[derive(Clone)]
pub struct ContextOptions {
    pub accumulator: AccumulatorKind,
    pub env: Arc<dyn EnvLookup + Send + Sync>,
    pub trace: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub enable_poisoning: bool,
    pub expand_limit: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            accumulator: AccumulatorKind::Max,
            env: Arc::new(StdEnvLookup),
            trace: None,
            enable_poisoning: true,
            expand_limit: DEFAULT_EXPAND_LIMIT,
        }
    }
}

/// A persistent snapshot of all steps asserted so far plus the derived match
/// state. `augment` never mutates `self`; it returns a refined copy.
#[derive(Clone)]
pub struct Context {
    dag: Arc<Dag>,
    tallies: im::HashMap<NodeId, u32>,
    /// Separate countdown used only while poisoning tracks how many of an
    /// `OrNode`'s inputs have been poisoned; kept apart from `tallies` (which
    /// is the `AndNode` activation countdown) to avoid conflating the two.
    poison_tallies: im::HashMap<NodeId, u32>,
    or_specificities: im::HashMap<NodeId, Specificity>,
    props: im::HashMap<String, AccumulatorState>,
    poisoned: Option<im::HashSet<NodeId>>,
    debug_location: im::Vector<Key>,
    accumulator_kind: AccumulatorKind,
    env: Arc<dyn EnvLookup + Send + Sync>,
    trace: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl Context {
    /// Builds the initial context: activates the root's properties directly
    /// at specificity `(0,0,0,0)` and drains the root's constraints through
    /// the ordinary augmentation loop, without a phantom always-firing node.
    pub fn new(dag: Arc<Dag>, options: ContextOptions) -> Context {
        let mut ctx = Context {
            dag,
            tallies: im::HashMap::new(),
            poison_tallies: im::HashMap::new(),
            or_specificities: im::HashMap::new(),
            props: im::HashMap::new(),
            poisoned: if options.enable_poisoning {
                Some(im::HashSet::new())
            } else {
                None
            },
            debug_location: im::Vector::new(),
            accumulator_kind: options.accumulator,
            env: options.env,
            trace: options.trace,
        };
        for (name, prop) in ctx.dag.root_props.clone() {
            let spec = Specificity::override_only(prop.override_level as u32);
            ctx.accum(&name, prop, spec);
        }
        let mut queue: VecDeque<Key> = ctx.dag.root_constraints.clone().into_iter().collect();
        ctx.drain(&mut queue);
        ctx
    }

    /// Parses `text`, resolves its `@import`s via `resolver`, builds the
    /// match DAG, and constructs the initial [Context] — the whole
    /// `SourceText → Ast → RuleTree → Formulae (DNF) → MatchDag → Context`
    /// pipeline of spec §2. Non-fatal parse diagnostics (circular imports,
    /// parse errors in one of several imported files) are discarded; use
    /// [Context::from_source_with_diagnostics] to observe them.
    pub fn from_source(
        text: &str,
        origin: &str,
        resolver: &dyn ImportResolver,
        options: ContextOptions,
    ) -> Result<Context, CcsError> {
        Self::from_source_with_diagnostics(text, origin, resolver, options).map(|(ctx, _)| ctx)
    }

    /// Like [Context::from_source], but also returns the non-fatal
    /// diagnostics collected while resolving imports, so an embedder can
    /// decide how to surface them (spec §7).
    pub fn from_source_with_diagnostics(
        text: &str,
        origin: &str,
        resolver: &dyn ImportResolver,
        options: ContextOptions,
    ) -> Result<(Context, Vec<Diagnostic>), CcsError> {
        let (items, diagnostics) = load_ruleset(text, origin, resolver)?;
        let root = build_root(&items, options.expand_limit)?;
        let dag = Arc::new(Dag::build(&root));
        Ok((Context::new(dag, options), diagnostics))
    }

    /// Returns a refined context in which `name[.value]` has additionally
    /// been asserted. Does not modify `self`.
    pub fn augment(&self, name: &str, value: Option<&str>) -> Context {
        let mut ctx = self.clone();
        let values = value.into_iter().map(String::from).collect();
        let key = Key::new(name, values);
        ctx.debug_location.push_back(key.clone());
        let mut queue = VecDeque::new();
        queue.push_back(key);
        ctx.drain(&mut queue);
        ctx
    }

    fn drain(&mut self, queue: &mut VecDeque<Key>) {
        while let Some(key) = queue.pop_front() {
            self.process_step(queue, &key);
        }
    }

    fn process_step(&mut self, queue: &mut VecDeque<Key>, key: &Key) {
        let matcher = match self.dag.dispatch.get(&key.name) {
            Some(matcher) => matcher,
            None => return,
        };
        let wildcard = matcher.wildcard;
        let positive_values = matcher.positive_values.clone();

        if let Some(wildcard_id) = wildcard {
            self.decrement_and_maybe_fire(queue, wildcard_id);
        }
        if let Some(asserted) = key.values.iter().next() {
            if let Some(node_ids) = positive_values.get(asserted) {
                for node_id in node_ids.clone() {
                    self.decrement_and_maybe_fire(queue, node_id);
                }
            }
        }

        if self.poisoned.is_some() {
            let asserted = key.values.iter().next();
            for (other_value, node_ids) in &positive_values {
                // Resolves the open question of §9: asserting a key with no
                // value poisons every recorded value, since nothing then
                // equals the (absent) asserted value.
                if asserted != Some(other_value) {
                    for node_id in node_ids.clone() {
                        self.poison(node_id);
                    }
                }
            }
        }
    }

    fn decrement_and_maybe_fire(&mut self, queue: &mut VecDeque<Key>, node_id: NodeId) {
        if self.is_poisoned(node_id) {
            return;
        }
        let (specificity, tally_count) = match &self.dag.nodes[node_id] {
            Node::And {
                specificity,
                tally_count,
                ..
            } => (*specificity, *tally_count),
            Node::Or { .. } => unreachable!("AndNode activation path used on an OrNode"),
        };
        let current = *self.tallies.get(&node_id).unwrap_or(&tally_count);
        if current == 0 {
            // Already fully activated; the monotone invariant means we never
            // re-decrement (and re-firing would double-count props).
            return;
        }
        let next = current - 1;
        self.tallies.insert(node_id, next);
        if next == 0 {
            self.fire(queue, node_id, specificity);
        }
    }

    fn activate_or(&mut self, queue: &mut VecDeque<Key>, node_id: NodeId, propagated: Specificity) {
        if self.is_poisoned(node_id) {
            return;
        }
        let current = *self
            .or_specificities
            .get(&node_id)
            .unwrap_or(&Specificity::zero());
        if propagated > current {
            self.or_specificities.insert(node_id, propagated);
            self.fire(queue, node_id, propagated);
        }
        // equal or lesser: per spec, does not propagate further.
    }

    fn fire(&mut self, queue: &mut VecDeque<Key>, node_id: NodeId, specificity: Specificity) {
        let node = &self.dag.nodes[node_id];
        let constraints = node.constraints().to_vec();
        let props = node.props().to_vec();
        let children = node.children().to_vec();

        for key in constraints {
            queue.push_back(key);
        }
        for (name, prop) in props {
            let override_level = prop.override_level as u32;
            let final_specificity = Specificity::override_only(override_level) + specificity;
            self.accum(&name, prop, final_specificity);
        }
        for child in children {
            match &self.dag.nodes[child] {
                Node::And { .. } => self.decrement_and_maybe_fire(queue, child),
                Node::Or { .. } => self.activate_or(queue, child, specificity),
            }
        }
    }

    fn accum(&mut self, name: &str, prop: Property, specificity: Specificity) {
        let mut acc = self
            .props
            .get(name)
            .cloned()
            .unwrap_or_else(|| AccumulatorState::new(self.accumulator_kind));
        acc.accum(prop, specificity);
        self.props.insert(name.to_string(), acc);
    }

    fn is_poisoned(&self, node_id: NodeId) -> bool {
        self.poisoned
            .as_ref()
            .map(|p| p.contains(&node_id))
            .unwrap_or(false)
    }

    /// Poisons a node because an incompatible step was asserted. An `AndNode`
    /// poisons immediately unless it already fully activated; an `OrNode`
    /// poisons only once every one of its inputs has been poisoned.
    fn poison(&mut self, node_id: NodeId) {
        if self.is_poisoned(node_id) {
            return;
        }
        match &self.dag.nodes[node_id] {
            Node::And {
                tally_count,
                children,
                ..
            } => {
                let current = *self.tallies.get(&node_id).unwrap_or(tally_count);
                if current == 0 {
                    return;
                }
                let children = children.clone();
                self.mark_poisoned(node_id);
                for child in children {
                    self.poison(child);
                }
            }
            Node::Or {
                tally_count,
                children,
                ..
            } => {
                let current = *self.poison_tallies.get(&node_id).unwrap_or(tally_count);
                if current == 0 {
                    return;
                }
                let next = current - 1;
                self.poison_tallies.insert(node_id, next);
                if next == 0 {
                    let children = children.clone();
                    self.mark_poisoned(node_id);
                    for child in children {
                        self.poison(child);
                    }
                }
            }
        }
    }

    fn mark_poisoned(&mut self, node_id: NodeId) {
        let mut poisoned = self.poisoned.clone().unwrap_or_default();
        poisoned.insert(node_id);
        self.poisoned = Some(poisoned);
    }

    fn location_trace(&self) -> String {
        if self.debug_location.is_empty() {
            "<root>".to_string()
        } else {
            self.debug_location
                .iter()
                .map(Key::to_string)
                .collect::<Vec<_>>()
                .join(" > ")
        }
    }

    /// Every property name with at least one candidate in this context, in
    /// sorted order. Candidates may still resolve to [CcsError::EmptyProperty]
    /// or [CcsError::AmbiguousProperty]; this only reports that the name was
    /// mentioned somewhere reachable from the root.
    pub fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.props.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the single matching [Property] for `name`, tracing it if a
    /// trace hook is configured.
    pub fn get_single_property(&self, name: &str) -> Result<Property, CcsError> {
        let acc = self
            .props
            .get(name)
            .ok_or_else(|| CcsError::MissingProperty {
                name: name.to_string(),
            })?;
        let candidates = acc.candidates();
        match candidates.len() {
            0 => Err(CcsError::EmptyProperty {
                name: name.to_string(),
            }),
            1 => {
                let prop = candidates[0].clone();
                if let Some(trace) = &self.trace {
                    trace(&format!(
                        "Found property: {} = {}\n\tin context: [{}]",
                        name,
                        prop.resolve(self.env.as_ref()),
                        self.location_trace()
                    ));
                }
                Ok(prop)
            }
            _ => Err(CcsError::AmbiguousProperty {
                name: name.to_string(),
                candidates: candidates
                    .iter()
                    .map(|p| p.resolve(self.env.as_ref()))
                    .collect(),
            }),
        }
    }

    /// The resolved string value of `name` (interpolation already applied).
    pub fn get_single_value(&self, name: &str) -> Result<String, CcsError> {
        let prop = self.get_single_property(name)?;
        Ok(prop.resolve(self.env.as_ref()))
    }

    /// Like [Context::get_single_value], but casts the resolved string with
    /// `cast`, surfacing failures as [CcsError::Cast].
    pub fn get_single_value_cast<T>(
        &self,
        name: &str,
        cast: impl Fn(&str) -> Result<T, String>,
    ) -> Result<T, CcsError> {
        let resolved = self.get_single_value(name)?;
        cast_with(name, &resolved, &cast)
    }

    /// Like [Context::get_single_value], but returns `default` when the
    /// property is simply missing (any other error still propagates).
    pub fn try_get_single_value(&self, name: &str, default: &str) -> Result<String, CcsError> {
        match self.get_single_value(name) {
            Ok(value) => Ok(value),
            Err(CcsError::MissingProperty { .. }) => Ok(default.to_string()),
            Err(err) => Err(err),
        }
    }

    /// Cast variant of [Context::try_get_single_value].
    pub fn try_get_single_value_cast<T>(
        &self,
        name: &str,
        default: T,
        cast: impl Fn(&str) -> Result<T, String>,
    ) -> Result<T, CcsError> {
        match self.get_single_value_cast(name, cast) {
            Ok(value) => Ok(value),
            Err(CcsError::MissingProperty { .. }) => Ok(default),
            Err(err) => Err(err),
        }
    }
}
