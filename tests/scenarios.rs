//! End-to-end scenario tests: real `.ccs` source text through the whole
//! `parse -> build -> query` pipeline, mirroring the literal scenarios
//! enumerated in the engine's testable-properties notes.

use ccs::{CcsError, Context, ContextOptions, MapEnvLookup, NoImportResolver};
use std::sync::{Arc, Mutex};

fn load(source: &str) -> Context {
    Context::from_source(source, "<test>", &NoImportResolver, ContextOptions::default())
        .expect("source should parse")
}

/// Scenario 1: a duplicate definition at equal specificity is ambiguous; an
/// unset name is missing.
#[test]
fn ambiguous_and_missing() {
    let ctx = load("a = 1\na = 2\n");
    assert!(matches!(
        ctx.get_single_property("a"),
        Err(CcsError::AmbiguousProperty { .. })
    ));
    assert!(matches!(
        ctx.get_single_property("b"),
        Err(CcsError::MissingProperty { .. })
    ));
}

/// Scenario 2: a well-formed numeric value casts; a non-numeric one fails
/// the cast with a descriptive error.
#[test]
fn casting_succeeds_and_fails() {
    let ctx = load("c = 4.3\nd = \"cannotcast\"\n");
    let parse_float = |s: &str| s.parse::<f64>().map_err(|e| e.to_string());
    assert_eq!(ctx.get_single_value_cast("c", parse_float).unwrap(), 4.3);
    assert!(matches!(
        ctx.get_single_value_cast("d", parse_float),
        Err(CcsError::Cast { .. })
    ));
}

/// Scenario 3: nested scopes, augmenting each narrows which rule wins.
#[test]
fn nested_scopes_and_augment() {
    let source = r#"
        a, f b e, c { c d { x = y } e f { foobar = abc } }
        a, c, b e f : baz = quux
        x = outerx
        baz = outerbaz
    "#;
    let ctx = load(source);
    assert_eq!(ctx.get_single_value("baz").unwrap(), "outerbaz");
    assert_eq!(ctx.augment("a", None).get_single_value("baz").unwrap(), "quux");
    assert_eq!(
        ctx.augment("c", None).augment("d", None).get_single_value("x").unwrap(),
        "y"
    );
    assert_eq!(ctx.augment("c", None).get_single_value("x").unwrap(), "outerx");
}

/// Scenario 4: a root-level `@constrain` fires a step during initial
/// activation, letting a nested rule beat a root-level default.
#[test]
fn root_constrain_fires_at_construction() {
    let source = r#"
        @constrain z.underconstraint
        c = failure
        z.underconstraint { c = success }
    "#;
    let ctx = load(source);
    assert_eq!(ctx.get_single_value("c").unwrap(), "success");
}

/// Scenario 5: progressively narrowing nested scopes.
#[test]
fn nested_scope_narrowing() {
    let source = r#"
        multi {
            x = failure
            level { x = success }
        }
    "#;
    let ctx = load(source);
    let refined = ctx.augment("multi", None).augment("level", None);
    assert_eq!(refined.get_single_value("x").unwrap(), "success");
}

/// Scenario 6: the trace hook reports the augmentation path.
#[test]
fn trace_hook_reports_path() {
    let log = Arc::new(Mutex::new(Vec::<String>::new()));
    let log_clone = log.clone();
    let options = ContextOptions {
        trace: Some(Arc::new(move |msg: &str| log_clone.lock().unwrap().push(msg.to_string()))),
        ..ContextOptions::default()
    };
    let ctx = Context::from_source("c = value\n", "<test>", &NoImportResolver, options).unwrap();
    let ctx = ctx.augment("a", None).augment("b", None);
    ctx.get_single_value("c").unwrap();

    let log = log.lock().unwrap();
    assert!(log.iter().any(|line| line.contains("[a > b]")));
}

/// Scenario 7: a cyclic `@import` is dropped with a diagnostic, and every
/// other rule in both files still takes effect.
#[test]
fn circular_import_is_diagnosed_not_fatal() {
    struct CycleResolver;
    impl ccs::ImportResolver for CycleResolver {
        fn resolve(&self, location: &str) -> Result<String, String> {
            match location {
                "b.ccs" => Ok("@import \"a.ccs\"\ny = b\n".to_string()),
                other => Err(format!("unexpected import: {other}")),
            }
        }
    }

    let source = "@import \"b.ccs\"\nx = a\n";
    let (ctx, diagnostics) =
        Context::from_source_with_diagnostics(source, "a.ccs", &CycleResolver, ContextOptions::default())
            .unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(ctx.get_single_value("x").unwrap(), "a");
    assert_eq!(ctx.get_single_value("y").unwrap(), "b");
}

/// Scenario 8: a malformed rule in one imported file doesn't prevent the
/// importing file's own rules, or another successfully-parsed import, from
/// taking effect.
#[test]
fn malformed_import_does_not_block_the_rest() {
    struct MixedResolver;
    impl ccs::ImportResolver for MixedResolver {
        fn resolve(&self, location: &str) -> Result<String, String> {
            match location {
                "broken.ccs" => Ok("this is not } valid ccs {{{".to_string()),
                "good.ccs" => Ok("z = fromgood\n".to_string()),
                other => Err(format!("unexpected import: {other}")),
            }
        }
    }

    let source = "@import \"broken.ccs\"\n@import \"good.ccs\"\nx = a\n";
    let (ctx, diagnostics) = Context::from_source_with_diagnostics(
        source,
        "<test>",
        &MixedResolver,
        ContextOptions::default(),
    )
    .unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(ctx.get_single_value("x").unwrap(), "a");
    assert_eq!(ctx.get_single_value("z").unwrap(), "fromgood");
}

/// Scenario 9: the `key.{v1,v2}` shorthand matches identically to writing
/// out each disjunct by hand.
#[test]
fn shorthand_disjunction_matches_spelled_out_form() {
    let shorthand = load("key.{v1,v2} : prop = x\n");
    let spelled_out = load("key.v1, key.v2 : prop = x\n");

    for value in ["v1", "v2"] {
        assert_eq!(
            shorthand.augment("key", Some(value)).get_single_value("prop").unwrap(),
            "x"
        );
        assert_eq!(
            spelled_out.augment("key", Some(value)).get_single_value("prop").unwrap(),
            "x"
        );
    }
}

/// Scenario 10: interpolation resolves at query time, not parse time, so the
/// same parsed context yields different strings under different lookups.
#[test]
fn interpolation_resolves_per_query_environment() {
    let home_a = MapEnvLookup::from([("HOME".to_string(), "/home/a".to_string())]);
    let home_b = MapEnvLookup::from([("HOME".to_string(), "/home/b".to_string())]);

    let source = "path = \"prefix-${HOME}-suffix\"\n";

    let ctx_a = Context::from_source(
        source,
        "<test>",
        &NoImportResolver,
        ContextOptions {
            env: Arc::new(home_a),
            ..ContextOptions::default()
        },
    )
    .unwrap();
    let ctx_b = Context::from_source(
        source,
        "<test>",
        &NoImportResolver,
        ContextOptions {
            env: Arc::new(home_b),
            ..ContextOptions::default()
        },
    )
    .unwrap();

    assert_eq!(ctx_a.get_single_value("path").unwrap(), "prefix-/home/a-suffix");
    assert_eq!(ctx_b.get_single_value("path").unwrap(), "prefix-/home/b-suffix");
}

/// Poisoning: asserting one value of a key invalidates rules scoped on a
/// sibling value of the same key, so later asserting the sibling (e.g. to
/// probe both branches) does not make a property ambiguous.
#[test]
fn poisoning_excludes_sibling_value_rules() {
    let source = r#"
        env.dev { url = "dev-url" }
        env.prod { url = "prod-url" }
    "#;
    let ctx = load(source);
    let refined = ctx.augment("env", Some("prod"));
    assert_eq!(refined.get_single_value("url").unwrap(), "prod-url");
    let both = refined.augment("env", Some("dev"));
    assert_eq!(both.get_single_value("url").unwrap(), "prod-url");
}

/// `@override` raises a property's effective specificity above an
/// otherwise more deeply-nested ordinary definition.
#[test]
fn override_raises_specificity() {
    let source = r#"
        @override base = "overridden"
        deep.scope { base = "nested" }
    "#;
    let ctx = load(source);
    let refined = ctx.augment("deep", Some("scope"));
    assert_eq!(refined.get_single_value("base").unwrap(), "overridden");
}

/// `try_get_single_value` falls back to the given default rather than
/// raising when the property is simply unset.
#[test]
fn try_get_single_value_falls_back_to_default() {
    let ctx = load("a = 1\n");
    assert_eq!(ctx.try_get_single_value("missing", "fallback").unwrap(), "fallback");
    assert_eq!(ctx.try_get_single_value("a", "fallback").unwrap(), "1");
}
