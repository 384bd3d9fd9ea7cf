//! Property values, origins and the segments that make up interpolated text.

use std::fmt;

use crate::env::EnvLookup;
use crate::error::CcsError;

/// Where a parsed rule or property came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Origin {
    pub(crate) file: String,
    pub(crate) line: usize,
}

impl Origin {
    pub(crate) fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One segment of a property's value: either literal text or a
/// `${NAME}` interpolation reference, kept distinct until query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ValueSegment {
    Literal(String),
    Interpolate(String),
}

/// A property's textual value, as produced by the parser.
///
/// Numeric and identifier tokens are preserved verbatim as a single literal
/// segment; string literals may additionally carry interpolation segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PropertyValue(pub(crate) Vec<ValueSegment>);

impl PropertyValue {
    pub(crate) fn literal(text: impl Into<String>) -> Self {
        Self(vec![ValueSegment::Literal(text.into())])
    }

    /// Resolves interpolation segments against `env`, producing the final
    /// string. Resolution happens at query time so a property can be parsed
    /// once and queried against different environment snapshots.
    pub(crate) fn resolve(&self, env: &dyn EnvLookup) -> String {
        let mut out = String::new();
        for segment in &self.0 {
            match segment {
                ValueSegment::Literal(text) => out.push_str(text),
                ValueSegment::Interpolate(name) => {
                    if let Some(value) = env.lookup(name) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

/// A setting: its value, where it came from, and whether `@override` raised
/// its effective specificity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub(crate) name: String,
    pub(crate) value: PropertyValue,
    pub(crate) origin: Origin,
    pub(crate) override_level: u8,
}

impl Property {
    pub(crate) fn new(
        name: impl Into<String>,
        value: PropertyValue,
        origin: Origin,
        override_level: u8,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            origin,
            override_level,
        }
    }

    /// The property's name, as it was written in the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `file:line` of the rule this property came from.
    pub fn origin(&self) -> String {
        self.origin.to_string()
    }

    /// The `@override` level that was in effect where this property was set.
    pub fn override_level(&self) -> u8 {
        self.override_level
    }

    pub fn resolve(&self, env: &dyn EnvLookup) -> String {
        self.value.resolve(env)
    }
}

/// Casts a resolved string value, wrapping cast failures as [CcsError::Cast].
pub(crate) fn cast_with<T>(
    name: &str,
    value: &str,
    cast: &dyn Fn(&str) -> Result<T, String>,
) -> Result<T, CcsError> {
    cast(value).map_err(|message| CcsError::Cast {
        name: name.to_string(),
        value: value.to_string(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvLookup;

    #[test]
    fn resolves_interpolation_at_query_time() {
        let value = PropertyValue(vec![
            ValueSegment::Literal("prefix-".to_string()),
            ValueSegment::Interpolate("HOME".to_string()),
            ValueSegment::Literal("-suffix".to_string()),
        ]);
        let env_a = MapEnvLookup::from([("HOME".to_string(), "/a".to_string())]);
        let env_b = MapEnvLookup::from([("HOME".to_string(), "/b".to_string())]);
        assert_eq!(value.resolve(&env_a), "prefix-/a-suffix");
        assert_eq!(value.resolve(&env_b), "prefix-/b-suffix");
    }

    #[test]
    fn missing_env_var_resolves_empty() {
        let value = PropertyValue(vec![ValueSegment::Interpolate("NOPE".to_string())]);
        let env = MapEnvLookup::from([]);
        assert_eq!(value.resolve(&env), "");
    }
}
