//! Pest-driven grammar for CCS source text (spec §4.7), and the walk that
//! turns its parse tree directly into core types (`Selector`, `PropertyValue`,
//! `Origin`, `Key`) and [super::ast::RuleItem]s.

use std::collections::BTreeSet;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::core::key::Key;
use crate::core::property::{Origin, PropertyValue, ValueSegment};
use crate::core::selector::Selector;
use crate::error::CcsError;

use super::ast::RuleItem;

#[derive(Parser)]
#[grammar = "parser/ccs.pest"]
pub(crate) struct CcsParser;

/// The result of parsing one `.ccs` source stream, before `@import`
/// resolution.
pub(crate) struct ParsedRuleset {
    pub(crate) items: Vec<RuleItem>,
}

fn parse_error(origin: &str, pair_str: impl std::fmt::Display) -> CcsError {
    CcsError::Parse {
        origin: origin.to_string(),
        message: pair_str.to_string(),
    }
}

fn pest_error(origin: &str, err: pest::error::Error<Rule>) -> CcsError {
    CcsError::Parse {
        origin: origin.to_string(),
        message: err.to_string(),
    }
}

/// Parses a whole ruleset document, including an optional `@context (...)`
/// header, whose steps are resolved into root-level constraints (spec §9).
pub(crate) fn parse_ruleset(text: &str, origin: &str) -> Result<ParsedRuleset, CcsError> {
    let mut pairs =
        CcsParser::parse(Rule::ruleset, text).map_err(|e| pest_error(origin, e))?;
    let ruleset_pair = pairs.next().expect("ruleset rule always produces a pair");

    let mut items = Vec::new();
    for pair in ruleset_pair.into_inner() {
        match pair.as_rule() {
            Rule::context_header => {
                let selector_pair = pair.into_inner().next().expect("context_header has a selector");
                let selector = build_selector(selector_pair, origin)?;
                for step in collect_steps(&selector) {
                    items.push(RuleItem::Constrain { step });
                }
            }
            Rule::rule => items.push(build_rule(pair, origin)?),
            Rule::EOI => {}
            other => unreachable!("unexpected top-level pair: {other:?}"),
        }
    }
    Ok(ParsedRuleset { items })
}

/// Parses selector grammar only, used by `@constrain`'s argument, by tests,
/// and by any embedder that wants to build a selector without a full
/// ruleset around it.
pub(crate) fn parse_selector_text(text: &str, origin: &str) -> Result<Selector, CcsError> {
    let mut pairs =
        CcsParser::parse(Rule::selector, text).map_err(|e| pest_error(origin, e))?;
    let pair = pairs.next().expect("selector rule always produces a pair");
    build_selector(pair, origin)
}

/// Collects every `Step`'s [Key] occurring anywhere in a selector tree,
/// regardless of `And`/`Or` nesting. Used to resolve a `@context (...)`
/// header into a flat list of root constraints (spec §9 — this header's
/// semantics are not otherwise exercised by tests, so this flattening is a
/// deliberate, documented choice rather than a guess).
fn collect_steps(selector: &Selector) -> Vec<Key> {
    let mut out = Vec::new();
    fn walk(selector: &Selector, out: &mut Vec<Key>) {
        match selector {
            Selector::Step(key) => out.push(key.clone()),
            Selector::And(children) | Selector::Or(children) => {
                for child in children {
                    walk(child, out);
                }
            }
        }
    }
    walk(selector, &mut out);
    out
}

fn build_rule(pair: Pair<Rule>, origin: &str) -> Result<RuleItem, CcsError> {
    let inner = pair.into_inner().next().expect("rule always wraps one alternative");
    match inner.as_rule() {
        Rule::import_rule => build_import(inner, origin),
        Rule::constrain_rule => build_constrain(inner, origin),
        Rule::override_rule => build_override(inner, origin),
        Rule::bare_prop => build_bare_prop(inner, origin),
        Rule::nested_rule => build_nested(inner, origin),
        other => unreachable!("unexpected rule alternative: {other:?}"),
    }
}

fn line_of(pair: &Pair<Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

fn build_import(pair: Pair<Rule>, origin: &str) -> Result<RuleItem, CcsError> {
    let line = line_of(&pair);
    let path_pair = pair.into_inner().next().expect("import_rule has an import_path");
    let quoted = path_pair
        .into_inner()
        .next()
        .expect("import_path wraps a single- or double-quoted path");
    Ok(RuleItem::Import {
        location: quoted.as_str().to_string(),
        origin: Origin::new(origin, line),
    })
}

fn build_constrain(pair: Pair<Rule>, origin: &str) -> Result<RuleItem, CcsError> {
    let step_pair = pair.into_inner().next().expect("constrain_rule has a single_step");
    let step = build_single_step(step_pair, origin)?;
    Ok(RuleItem::Constrain { step })
}

fn build_override(pair: Pair<Rule>, origin: &str) -> Result<RuleItem, CcsError> {
    let body = pair.into_inner().next().expect("override_rule has a prop_body");
    let (name, value, line) = build_prop_body(body, origin)?;
    Ok(RuleItem::Override {
        name,
        value,
        origin: Origin::new(origin, line),
    })
}

fn build_bare_prop(pair: Pair<Rule>, origin: &str) -> Result<RuleItem, CcsError> {
    let body = pair.into_inner().next().expect("bare_prop has a prop_body");
    let (name, value, line) = build_prop_body(body, origin)?;
    Ok(RuleItem::BareProp {
        name,
        value,
        origin: Origin::new(origin, line),
    })
}

fn build_prop_body(pair: Pair<Rule>, origin: &str) -> Result<(String, PropertyValue, usize), CcsError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().expect("prop_body has an ident").as_str().to_string();
    let value_pair = inner.next().expect("prop_body has a value");
    let value = build_value(value_pair, origin)?;
    Ok((name, value, line))
}

fn build_nested(pair: Pair<Rule>, origin: &str) -> Result<RuleItem, CcsError> {
    let mut inner = pair.into_inner();
    let selector_pair = inner.next().expect("nested_rule has a selector");
    let selector = build_selector(selector_pair, origin)?;
    let tail = inner.next().expect("nested_rule has an inline_prop or block");
    match tail.as_rule() {
        Rule::inline_prop => build_inline(selector, tail, origin),
        Rule::block => {
            let body = tail
                .into_inner()
                .map(|r| build_rule(r, origin))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RuleItem::Block { selector, body })
        }
        other => unreachable!("unexpected nested_rule tail: {other:?}"),
    }
}

fn build_inline(selector: Selector, pair: Pair<Rule>, origin: &str) -> Result<RuleItem, CcsError> {
    let inner = pair.into_inner().next().expect("inline_prop wraps one alternative");
    match inner.as_rule() {
        Rule::bare_prop => {
            let body = inner.into_inner().next().expect("bare_prop has a prop_body");
            let (name, value, line) = build_prop_body(body, origin)?;
            Ok(RuleItem::InlineProp {
                selector,
                name,
                value,
                origin: Origin::new(origin, line),
            })
        }
        Rule::override_rule | Rule::constrain_rule | Rule::import_rule => {
            let item = build_rule_alt(inner, origin)?;
            Ok(RuleItem::Block {
                selector,
                body: vec![item],
            })
        }
        other => unreachable!("unexpected inline_prop alternative: {other:?}"),
    }
}

/// Like [build_rule], but the pair is already one of `rule`'s alternatives
/// rather than the `rule` wrapper itself (used from [build_inline], which
/// unwraps `inline_prop` one level further than `rule` does).
fn build_rule_alt(pair: Pair<Rule>, origin: &str) -> Result<RuleItem, CcsError> {
    match pair.as_rule() {
        Rule::import_rule => build_import(pair, origin),
        Rule::constrain_rule => build_constrain(pair, origin),
        Rule::override_rule => build_override(pair, origin),
        Rule::bare_prop => build_bare_prop(pair, origin),
        other => unreachable!("unexpected rule alternative: {other:?}"),
    }
}

fn build_selector(pair: Pair<Rule>, origin: &str) -> Result<Selector, CcsError> {
    match pair.as_rule() {
        Rule::selector => {
            let mut products = pair
                .into_inner()
                .map(|p| build_selector(p, origin))
                .collect::<Result<Vec<_>, _>>()?;
            if products.len() == 1 {
                Ok(products.pop().unwrap())
            } else {
                Ok(Selector::Or(products))
            }
        }
        Rule::product => {
            let mut terms = pair
                .into_inner()
                .map(|p| build_selector(p, origin))
                .collect::<Result<Vec<_>, _>>()?;
            if terms.len() == 1 {
                Ok(terms.pop().unwrap())
            } else {
                Ok(Selector::And(terms))
            }
        }
        Rule::term => {
            let inner = pair.into_inner().next().expect("term wraps group or step");
            build_selector(inner, origin)
        }
        Rule::group => {
            let inner = pair.into_inner().next().expect("group wraps a selector");
            build_selector(inner, origin)
        }
        Rule::step => {
            let inner = pair.into_inner().next().expect("step wraps single_step or shorthand_step");
            build_selector(inner, origin)
        }
        Rule::single_step => Ok(Selector::Step(build_single_step(pair, origin)?)),
        Rule::shorthand_step => {
            let mut idents = pair.into_inner();
            let name = idents.next().expect("shorthand_step has a name").as_str();
            let values: BTreeSet<String> = idents.map(|p| p.as_str().to_string()).collect();
            Ok(Selector::Step(Key::new(name, values)))
        }
        other => unreachable!("unexpected selector pair: {other:?}"),
    }
}

fn build_single_step(pair: Pair<Rule>, _origin: &str) -> Result<Key, CcsError> {
    let mut idents = pair.into_inner();
    let name = idents.next().expect("single_step has a name").as_str();
    match idents.next() {
        Some(value) => Ok(Key::value(name, value.as_str())),
        None => Ok(Key::wildcard(name)),
    }
}

fn build_value(pair: Pair<Rule>, origin: &str) -> Result<PropertyValue, CcsError> {
    let inner = pair.into_inner().next().expect("value wraps string or numid");
    match inner.as_rule() {
        Rule::string => build_string(inner, origin),
        Rule::numid => Ok(PropertyValue::literal(inner.as_str())),
        other => unreachable!("unexpected value pair: {other:?}"),
    }
}

fn build_string(pair: Pair<Rule>, origin: &str) -> Result<PropertyValue, CcsError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    for part in pair.into_inner() {
        let inner = part
            .into_inner()
            .next()
            .expect("string_part wraps interpolation, escape, or plain_chars");
        match inner.as_rule() {
            Rule::plain_chars => literal.push_str(inner.as_str()),
            Rule::escape => {
                let raw = inner.as_str();
                let escaped = raw.chars().nth(1).expect("escape is '\\' plus one char");
                match escaped {
                    '"' => literal.push('"'),
                    '\\' => literal.push('\\'),
                    '$' => literal.push('$'),
                    '\'' => literal.push('\''),
                    't' => literal.push('\t'),
                    'n' => literal.push('\n'),
                    'r' => literal.push('\r'),
                    '\n' => {} // escaped newline: ignored
                    other => {
                        return Err(parse_error(
                            origin,
                            format!("unrecognized escape sequence: '\\{other}'"),
                        ))
                    }
                }
            }
            Rule::interpolation => {
                if !literal.is_empty() {
                    segments.push(ValueSegment::Literal(std::mem::take(&mut literal)));
                }
                let name = inner
                    .into_inner()
                    .next()
                    .expect("interpolation has an ident")
                    .as_str()
                    .to_string();
                segments.push(ValueSegment::Interpolate(name));
            }
            other => unreachable!("unexpected string_part pair: {other:?}"),
        }
    }
    if !literal.is_empty() || segments.is_empty() {
        segments.push(ValueSegment::Literal(literal));
    }
    Ok(PropertyValue(segments))
}
