//! Roster, reporting groups and reason tables.
//!
//! All three are thin wrappers over an [`AliasTable`]: the roster resolves
//! member names, groups resolve reporting scopes, and reason tables resolve
//! reason keys and carry their default point value.

use std::collections::BTreeMap;

use turf_types::Member;

use crate::identity::{AliasTable, IdentityError, Resolution};

/// The fixed set of members a ledger tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    members: Vec<Member>,
    table: AliasTable,
}

impl Roster {
    /// Build a roster, rejecting duplicate names and shared aliases.
    pub fn new(members: Vec<Member>) -> Result<Self, IdentityError> {
        let table = AliasTable::new(
            members
                .iter()
                .map(|m| (m.name.clone(), m.aliases.clone())),
        )?;
        Ok(Self { members, table })
    }

    /// Members in roster order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Canonical names in roster order.
    pub fn names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    /// Number of members.
    pub const fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the roster is empty.
    pub const fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `name` is a canonical member name.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Resolve free text to a member.
    pub fn resolve(&self, text: &str) -> Resolution {
        self.table.resolve(text)
    }

    /// Resolve comma-separated free text to members.
    pub fn resolve_list(&self, text: &str) -> Vec<Resolution> {
        self.table.resolve_list(text)
    }

    /// The underlying alias table.
    pub const fn alias_table(&self) -> &AliasTable {
        &self.table
    }
}

/// Named member subsets used to scope reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupTable {
    table: AliasTable,
    members: BTreeMap<String, Vec<String>>,
}

impl GroupTable {
    /// Build from `group -> members` and `group -> aliases` maps.
    pub fn new(
        groups: &BTreeMap<String, Vec<String>>,
        aliases: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, IdentityError> {
        let table = AliasTable::new(groups.keys().map(|group| {
            let group_aliases = aliases.get(group).cloned().unwrap_or_default();
            (group.clone(), group_aliases)
        }))?;
        Ok(Self {
            table,
            members: groups.clone(),
        })
    }

    /// Members of the group that `text` resolves to, if any.
    pub fn lookup(&self, text: &str) -> Option<(&str, &[String])> {
        let resolution = self.table.resolve(text);
        if !resolution.is_known() {
            return None;
        }
        self.members
            .get_key_value(resolution.identity())
            .map(|(name, members)| (name.as_str(), members.as_slice()))
    }

    /// Group names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys()
    }

    /// Whether no groups are configured.
    pub const fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Reason keys with aliases and default point values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasonTable {
    table: AliasTable,
    values: BTreeMap<String, u32>,
}

impl ReasonTable {
    /// Build from `(key, aliases, value)` triples.
    pub fn new<I>(reasons: I) -> Result<Self, IdentityError>
    where
        I: IntoIterator<Item = (String, Vec<String>, u32)>,
    {
        let mut entries = Vec::new();
        let mut values = BTreeMap::new();
        for (key, aliases, value) in reasons {
            values.insert(key.clone(), value);
            entries.push((key, aliases));
        }
        Ok(Self {
            table: AliasTable::new(entries)?,
            values,
        })
    }

    /// Resolve free text to a reason key.
    pub fn resolve(&self, text: &str) -> Resolution {
        self.table.resolve(text)
    }

    /// Default point value for `key`; 1 for reasons that are not configured.
    pub fn default_value(&self, key: &str) -> u32 {
        self.values.get(key).copied().unwrap_or(1)
    }

    /// Whether `key` is a configured reason key.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Configured reason keys in table order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.table.keys()
    }

    /// Aliases configured for `key`.
    pub fn aliases_of(&self, key: &str) -> &[String] {
        self.table.aliases_of(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> GroupTable {
        let mut members = BTreeMap::new();
        members.insert("Board".to_owned(), vec!["Wouter".to_owned(), "Matthijs".to_owned()]);
        members.insert("Kitchen".to_owned(), vec!["Marieke".to_owned()]);
        let mut aliases = BTreeMap::new();
        aliases.insert("Board".to_owned(), vec!["b".to_owned(), "bestuur".to_owned()]);
        GroupTable::new(&members, &aliases).unwrap_or_default()
    }

    #[test]
    fn roster_resolves_aliases() {
        let roster = Roster::new(vec![
            Member::new("Wouter").with_aliases(["W"]),
            Member::new("Matthijs"),
        ])
        .unwrap_or_default();
        assert_eq!(roster.resolve("w").identity(), "Wouter");
        assert!(roster.contains("Matthijs"));
        assert!(!roster.contains("matthijs"));
        assert_eq!(roster.names(), ["Wouter", "Matthijs"]);
    }

    #[test]
    fn roster_rejects_shared_alias() {
        let result = Roster::new(vec![
            Member::new("Wouter").with_aliases(["W"]),
            Member::new("Willem").with_aliases(["w"]),
        ]);
        assert!(matches!(result, Err(IdentityError::DuplicateAlias { .. })));
    }

    #[test]
    fn group_lookup_by_name_and_alias() {
        let groups = groups();
        assert_eq!(groups.lookup("bestuur").map(|(name, _)| name), Some("Board"));
        assert_eq!(groups.lookup("kitchen").map(|(_, m)| m.len()), Some(1));
        assert!(groups.lookup("Wouter").is_none());
    }

    #[test]
    fn reason_defaults() {
        let reasons = ReasonTable::new([
            ("Beer".to_owned(), vec!["b".to_owned()], 1),
            ("Late".to_owned(), vec![], 2),
        ])
        .unwrap_or_default();
        assert_eq!(reasons.resolve("B").identity(), "Beer");
        assert_eq!(reasons.default_value("Late"), 2);
        assert_eq!(reasons.default_value("Singing"), 1);
    }
}
