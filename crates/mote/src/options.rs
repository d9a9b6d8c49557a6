// SPDX-License-Identifier: Apache-2.0
//! Serializer policies.
//!
//! A [`SerializerOptions`] value is captured by the converter cache at
//! construction and never mutated afterwards: changing a policy means
//! building a new serializer (and with it a fresh cache), so converters
//! may bake policy decisions in at build time.

/// Reference-preservation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefMode {
    /// No identity tracking; repeated references serialize repeatedly.
    #[default]
    Off,
    /// Track identity, but fail fast when a back-reference would point
    /// at an object whose serialization has not completed.
    RejectCycles,
    /// Track identity and emit back-references even to in-progress
    /// objects; deserialization fails only if such a cycle cannot be
    /// reconstructed.
    AllowCycles,
}

/// Which properties of a map-shaped object are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultsPolicy {
    /// Write every property.
    #[default]
    Always,
    /// Write required properties, plus any whose value differs from its
    /// declared default.
    Required,
    /// Write everything except null-valued properties.
    NeverNull,
}

/// Wire layout for arrays of rank greater than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiDimFormat {
    /// Recursive arrays, one level per dimension.
    #[default]
    Nested,
    /// One outer array: the dimension vector first, then the elements in
    /// row-major order.
    Flat,
}

/// Transformation applied to property names on the wire.
///
/// Explicitly renamed properties bypass the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingPolicy {
    /// Use declared names untouched.
    #[default]
    Identity,
    /// `player_score` → `playerScore`.
    CamelCase,
    /// `player_score` → `PlayerScore`.
    PascalCase,
    /// `PlayerScore` → `player_score`.
    SnakeCase,
    /// `PlayerScore` → `player-score`.
    KebabCase,
}

/// Splits a declared identifier into lowercase words at underscores,
/// dashes and lower-to-upper case transitions.
fn words(name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch == '_' || ch == '-' {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl NamingPolicy {
    /// Applies the policy to a declared property name.
    #[must_use]
    pub fn apply(self, name: &str) -> String {
        match self {
            Self::Identity => name.to_string(),
            Self::CamelCase => {
                let mut parts = words(name).into_iter();
                let mut out = parts.next().unwrap_or_default();
                for part in parts {
                    out.push_str(&capitalize(&part));
                }
                out
            }
            Self::PascalCase => words(name).iter().map(|w| capitalize(w)).collect(),
            Self::SnakeCase => words(name).join("_"),
            Self::KebabCase => words(name).join("-"),
        }
    }
}

/// Converts a declared name to its PascalCase variant.
///
/// Constructor-argument lookup tries this spelling in addition to the
/// declared one, so positional records deserialize regardless of which
/// convention produced the keys.
#[must_use]
pub(crate) fn pascal_variant(name: &str) -> String {
    NamingPolicy::PascalCase.apply(name)
}

/// Immutable policy snapshot for one serializer (and its cache).
#[derive(Debug, Clone)]
pub struct SerializerOptions {
    /// Reference-preservation mode.
    pub preserve_references: RefMode,
    /// Property-inclusion policy for map-shaped objects.
    pub serialize_defaults: DefaultsPolicy,
    /// Write enums by declared name instead of ordinal value.
    pub enum_by_name: bool,
    /// Layout for arrays of rank two or more.
    pub multi_dim_format: MultiDimFormat,
    /// Property-name transformation.
    pub naming_policy: NamingPolicy,
    /// Prefer small integer aliases over strings for union cases that
    /// declare both. Integer aliases are smaller and faster but renumber
    /// less gracefully across versions.
    pub prefer_compact_aliases: bool,
    /// Intern decoded `Arc<str>` values so repeated strings share one
    /// allocation per operation.
    pub intern_strings: bool,
    /// Hard ceiling on structural nesting.
    pub max_depth: usize,
    /// Pending-bytes threshold at which container boundaries flush a
    /// stream-backed sink.
    pub flush_threshold: usize,
    /// Extension type code used for reference back-references. Must be
    /// negative and must not collide with the timestamp code (−1).
    pub ref_ext_code: i8,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            preserve_references: RefMode::Off,
            serialize_defaults: DefaultsPolicy::Always,
            enum_by_name: false,
            multi_dim_format: MultiDimFormat::Nested,
            naming_policy: NamingPolicy::Identity,
            prefer_compact_aliases: false,
            intern_strings: false,
            max_depth: 64,
            flush_threshold: 32 * 1024,
            ref_ext_code: -2,
        }
    }
}
