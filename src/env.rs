//! Environment lookup capability consumed by `${VAR}` interpolation.

use std::collections::HashMap;

/// Host-supplied environment lookup for string interpolation.
///
/// The core never mandates a particular environment model; it only consumes
/// this capability at query time (see [crate::core::property::PropertyValue::resolve]).
pub trait EnvLookup {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Default [EnvLookup] backed by `std::env::var`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvLookup;

impl EnvLookup for StdEnvLookup {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// An in-memory [EnvLookup], useful for tests and for embedders who want a
/// deterministic snapshot rather than the live process environment.
#[derive(Debug, Clone, Default)]
pub struct MapEnvLookup(HashMap<String, String>);

impl<const N: usize> From<[(String, String); N]> for MapEnvLookup {
    fn from(pairs: [(String, String); N]) -> Self {
        Self(HashMap::from(pairs))
    }
}

impl EnvLookup for MapEnvLookup {
    fn lookup(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}
