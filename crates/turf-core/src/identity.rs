//! Free-text to canonical identity resolution.
//!
//! An [`AliasTable`] maps canonical keys to their aliases. The same table
//! type resolves member names, group names and reason keys. Resolution
//! tries, in order, first match wins:
//!
//! 1. Case-insensitive exact match against a canonical key.
//! 2. Case-insensitive exact match against an alias.
//! 3. Closest canonical key by normalized Levenshtein similarity, accepted
//!    at or above [`SIMILARITY_CUTOFF`].
//! 4. The input text itself, flagged [`Resolution::Unknown`].
//!
//! Resolution never fails and has no side effects. Ties always go to the
//! key that comes first in table order.

use tracing::trace;

/// Minimum normalized similarity for an approximate match.
pub const SIMILARITY_CUTOFF: f64 = 0.6;

/// Errors raised while building alias tables or resolving a scope.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Two entries declare the same alias.
    #[error("alias {alias:?} is declared for both {first:?} and {second:?}")]
    DuplicateAlias {
        /// The shared alias.
        alias: String,
        /// Entry that declared it first.
        first: String,
        /// Entry that declared it again.
        second: String,
    },

    /// Two entries share a canonical key.
    #[error("duplicate canonical key {key:?}")]
    DuplicateKey {
        /// The repeated key.
        key: String,
    },

    /// A scope selection named people who are not on the roster.
    #[error("not recognized: {}", names.join(", "))]
    UnknownMembers {
        /// The unrecognized names, as typed.
        names: Vec<String>,
    },
}

/// Outcome of resolving one piece of free text.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The text is a canonical key (ignoring case).
    Exact(String),
    /// The text is an alias of a canonical key.
    Alias {
        /// The canonical key.
        canonical: String,
        /// The alias as configured.
        alias: String,
    },
    /// The text is close enough to a canonical key.
    Approximate {
        /// The canonical key.
        canonical: String,
        /// Normalized similarity in `[SIMILARITY_CUTOFF, 1.0]`.
        score: f64,
    },
    /// Nothing matched; the text is returned unchanged.
    Unknown(String),
}

impl Resolution {
    /// The resolved identity, or the raw text for [`Resolution::Unknown`].
    pub fn identity(&self) -> &str {
        match self {
            Self::Exact(key) | Self::Unknown(key) => key,
            Self::Alias { canonical, .. } | Self::Approximate { canonical, .. } => canonical,
        }
    }

    /// Consume the resolution, returning the identity.
    pub fn into_identity(self) -> String {
        match self {
            Self::Exact(key) | Self::Unknown(key) => key,
            Self::Alias { canonical, .. } | Self::Approximate { canonical, .. } => canonical,
        }
    }

    /// Whether the text mapped to a canonical key.
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AliasEntry {
    key: String,
    aliases: Vec<String>,
}

/// Ordered canonical keys with their aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    /// Build a table from `(key, aliases)` pairs, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::DuplicateKey`] when two keys are equal
    /// ignoring case, and [`IdentityError::DuplicateAlias`] when an alias is
    /// declared for two different keys.
    pub fn new<I, K, A>(entries: I) -> Result<Self, IdentityError>
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let mut table = Self::default();
        for (key, aliases) in entries {
            let key = key.into();
            if table.entries.iter().any(|e| e.key.eq_ignore_ascii_case(&key)) {
                return Err(IdentityError::DuplicateKey { key });
            }
            let aliases: Vec<String> = aliases.into_iter().map(Into::into).collect();
            for alias in &aliases {
                if let Some(owner) = table.alias_owner(alias) {
                    return Err(IdentityError::DuplicateAlias {
                        alias: alias.clone(),
                        first: owner.to_owned(),
                        second: key,
                    });
                }
            }
            table.entries.push(AliasEntry { key, aliases });
        }
        Ok(table)
    }

    /// Number of canonical keys.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no keys.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical keys in table order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Aliases configured for `key` (exact key match).
    pub fn aliases_of(&self, key: &str) -> &[String] {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map_or(&[], |e| e.aliases.as_slice())
    }

    /// Whether `key` is a canonical key (exact match).
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    fn alias_owner(&self, alias: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.aliases.iter().any(|a| a.eq_ignore_ascii_case(alias)))
            .map(|e| e.key.as_str())
    }

    /// Resolve free text to a canonical key.
    pub fn resolve(&self, text: &str) -> Resolution {
        let text = text.trim();

        if let Some(entry) = self.entries.iter().find(|e| e.key.to_lowercase() == text.to_lowercase()) {
            return Resolution::Exact(entry.key.clone());
        }

        for entry in &self.entries {
            if let Some(alias) = entry
                .aliases
                .iter()
                .find(|a| a.to_lowercase() == text.to_lowercase())
            {
                return Resolution::Alias {
                    canonical: entry.key.clone(),
                    alias: alias.clone(),
                };
            }
        }

        if let Some((key, score)) = self.closest_key(text) {
            trace!(input = text, canonical = key, score, "Approximate identity match");
            return Resolution::Approximate {
                canonical: key.to_owned(),
                score,
            };
        }

        Resolution::Unknown(text.to_owned())
    }

    /// Resolve comma-separated free text, one resolution per non-empty
    /// piece, in input order.
    pub fn resolve_list(&self, text: &str) -> Vec<Resolution> {
        text.split(',')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|piece| self.resolve(piece))
            .collect()
    }

    fn closest_key(&self, text: &str) -> Option<(&str, f64)> {
        if text.is_empty() {
            return None;
        }
        let needle = text.to_lowercase();
        let mut best: Option<(&str, f64)> = None;
        for entry in &self.entries {
            let score = strsim::normalized_levenshtein(&needle, &entry.key.to_lowercase());
            if score < SIMILARITY_CUTOFF {
                continue;
            }
            // Strictly greater: the earlier key keeps a tie.
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((entry.key.as_str(), score));
            }
        }
        best
    }
}
