//! Configuration loading and validation for the turf ledger.
//!
//! The configuration lives in a YAML file, usually `turf-config.yaml`.
//! [`RawConfig`] mirrors the file one-to-one. [`TurfConfig`] is the
//! validated form the engine consumes: alias tables are built, dates and
//! times are parsed, and cross-references are checked eagerly so that a bad
//! file fails at load time rather than halfway through an evaluation.
//!
//! ```yaml
//! names:
//!   wouter: Wouter
//!   matthijs: Matthijs
//! aliases:
//!   wouter: [W, Secretary]
//! groups:
//!   Board: [Wouter, Matthijs]
//! turfreasons:
//!   Beer: { aliases: [b], value: 1 }
//! turfrules:
//!   solidarity: true
//!   solidarityday: Monday
//!   solidaritytime: "20:00"
//!   forcenonegative: true
//! plotsettings:
//!   day0: "12:00 1 Jan 2024"
//!   maxreasons: 8
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{NaiveDateTime, NaiveTime, Weekday};
use serde::Deserialize;

use turf_types::Member;

use crate::identity::IdentityError;
use crate::roster::{GroupTable, ReasonTable, Roster};
use crate::solidarity::SolidaritySchedule;

/// Format of `plotsettings.day0`.
pub const DAY0_FORMAT: &str = "%H:%M %d %b %Y";

/// Format of `turfrules.solidaritytime`.
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The YAML parsed but its content is inconsistent.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },

    /// An alias table could not be built.
    #[error("invalid configuration: {source}")]
    Identity {
        /// The underlying identity error.
        #[from]
        source: IdentityError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Raw file structure
// ---------------------------------------------------------------------------

/// The configuration file as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// Member key to display name. Display names are the canonical identity.
    pub names: BTreeMap<String, String>,

    /// Member key to aliases.
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,

    /// Group name to member display names.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,

    /// Group name to aliases.
    #[serde(default)]
    pub groupsaliases: BTreeMap<String, Vec<String>>,

    /// Reasons for awards.
    #[serde(default)]
    pub turfreasons: BTreeMap<String, ReasonConfig>,

    /// Reasons for redemptions.
    #[serde(default)]
    pub inningreasons: BTreeMap<String, ReasonConfig>,

    /// Balance rules.
    #[serde(default)]
    pub turfrules: TurfRulesConfig,

    /// Reporting settings.
    #[serde(default)]
    pub plotsettings: PlotSettingsConfig,
}

/// One configured reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReasonConfig {
    /// Alternative spellings.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Points entered when no amount is given.
    #[serde(default = "default_reason_value")]
    pub value: u32,
}

/// The `turfrules` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurfRulesConfig {
    /// Enable the weekly solidarity rule.
    #[serde(default)]
    pub solidarity: bool,

    /// Weekday of the solidarity evaluation; the first two letters count.
    #[serde(default)]
    pub solidarityday: Option<String>,

    /// Time of day of the solidarity evaluation, `HH:MM`.
    #[serde(default)]
    pub solidaritytime: Option<String>,

    /// Floor redemptions at zero.
    #[serde(default)]
    pub forcenonegative: bool,
}

/// The `plotsettings` section. Chart keys such as `graphxticks` or
/// `colours` are accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlotSettingsConfig {
    /// Origin of the ledger, `HH:MM D Mon YYYY`.
    #[serde(default)]
    pub day0: Option<String>,

    /// Label of the origin.
    #[serde(default)]
    pub day0event: Option<String>,

    /// Maximum distinct reasons in a tally, "Other" included.
    #[serde(default = "default_max_reasons")]
    pub maxreasons: usize,

    /// Balance at which a member owes an anytimer.
    #[serde(default)]
    pub anytimeramount: Option<i64>,
}

impl Default for PlotSettingsConfig {
    fn default() -> Self {
        Self {
            day0: None,
            day0event: None,
            maxreasons: default_max_reasons(),
            anytimeramount: None,
        }
    }
}

const fn default_reason_value() -> u32 {
    1
}

const fn default_max_reasons() -> usize {
    8
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// Balance and reporting rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSettings {
    /// Redemptions never take a balance below zero.
    pub floor_at_zero: bool,
    /// Weekly solidarity schedule, when the rule is enabled.
    pub solidarity: Option<SolidaritySchedule>,
    /// Configured origin of the ledger.
    pub anchor: Option<NaiveDateTime>,
    /// Maximum distinct reasons in a tally.
    pub max_reasons: usize,
    /// Balance at which a member owes an anytimer.
    pub anytimer_threshold: Option<i64>,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            floor_at_zero: false,
            solidarity: None,
            anchor: None,
            max_reasons: default_max_reasons(),
            anytimer_threshold: None,
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurfConfig {
    /// Tracked members.
    pub roster: Roster,
    /// Reporting groups.
    pub groups: GroupTable,
    /// Reasons for awards.
    pub turf_reasons: ReasonTable,
    /// Reasons for redemptions.
    pub inning_reasons: ReasonTable,
    /// Balance rules.
    pub rules: RuleSettings,
    /// Label of the ledger origin, shown next to it in reports.
    pub day0_event: Option<String>,
}

impl TurfConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, and
    /// [`ConfigError::Invalid`] or [`ConfigError::Identity`] if its content
    /// does not validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// As [`TurfConfig::from_file`], minus the I/O case.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yml::from_str(yaml)?;
        Self::try_from(raw)
    }

    /// Every configured reason key, awards and redemptions together.
    pub fn recognized_reasons(&self) -> BTreeSet<String> {
        self.turf_reasons
            .keys()
            .chain(self.inning_reasons.keys())
            .map(str::to_owned)
            .collect()
    }
}

impl TryFrom<RawConfig> for TurfConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let roster = build_roster(&raw.names, &raw.aliases)?;

        for (group, members) in &raw.groups {
            if let Some(stranger) = members.iter().find(|m| !roster.contains(m)) {
                return Err(invalid(format!(
                    "group {group:?} lists {stranger:?}, who is not in names"
                )));
            }
        }
        if let Some(group) = raw.groupsaliases.keys().find(|g| !raw.groups.contains_key(*g)) {
            return Err(invalid(format!("groupsaliases names unknown group {group:?}")));
        }
        let groups = GroupTable::new(&raw.groups, &raw.groupsaliases)?;

        let turf_reasons = build_reasons("turfreasons", raw.turfreasons)?;
        let inning_reasons = build_reasons("inningreasons", raw.inningreasons)?;

        let plot = raw.plotsettings;
        if plot.maxreasons == 0 {
            return Err(invalid("plotsettings.maxreasons must be at least 1"));
        }
        let anchor = plot.day0.as_deref().map(parse_day0).transpose()?;
        let solidarity = build_schedule(&raw.turfrules, anchor)?;

        let rules = RuleSettings {
            floor_at_zero: raw.turfrules.forcenonegative,
            solidarity,
            anchor,
            max_reasons: plot.maxreasons,
            anytimer_threshold: plot.anytimeramount,
        };

        Ok(Self {
            roster,
            groups,
            turf_reasons,
            inning_reasons,
            rules,
            day0_event: plot.day0event,
        })
    }
}

fn build_roster(
    names: &BTreeMap<String, String>,
    aliases: &BTreeMap<String, Vec<String>>,
) -> Result<Roster, ConfigError> {
    if names.is_empty() {
        return Err(invalid("names must list at least one member"));
    }
    if let Some(key) = aliases.keys().find(|k| !names.contains_key(*k)) {
        return Err(invalid(format!("aliases names unknown member key {key:?}")));
    }

    let members = names
        .iter()
        .map(|(key, name)| {
            let member_aliases = aliases.get(key).cloned().unwrap_or_default();
            Member::new(name.trim()).with_aliases(member_aliases)
        })
        .collect();
    Ok(Roster::new(members)?)
}

fn build_reasons(
    section: &str,
    reasons: BTreeMap<String, ReasonConfig>,
) -> Result<ReasonTable, ConfigError> {
    if let Some(key) = reasons.iter().find_map(|(k, r)| (r.value == 0).then_some(k)) {
        return Err(invalid(format!("{section}.{key}: value must be at least 1")));
    }
    Ok(ReasonTable::new(
        reasons.into_iter().map(|(key, r)| (key, r.aliases, r.value)),
    )?)
}

fn build_schedule(
    rules: &TurfRulesConfig,
    anchor: Option<NaiveDateTime>,
) -> Result<Option<SolidaritySchedule>, ConfigError> {
    if !rules.solidarity {
        return Ok(None);
    }
    let day = rules
        .solidarityday
        .as_deref()
        .ok_or_else(|| invalid("turfrules.solidarityday is required when solidarity is on"))?;
    let time = rules
        .solidaritytime
        .as_deref()
        .ok_or_else(|| invalid("turfrules.solidaritytime is required when solidarity is on"))?;
    let anchor =
        anchor.ok_or_else(|| invalid("plotsettings.day0 is required when solidarity is on"))?;

    Ok(Some(SolidaritySchedule {
        anchor,
        weekday: parse_weekday(day)?,
        time_of_day: parse_time_of_day(time)?,
    }))
}

/// Parse a weekday from its first two letters, ignoring case.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for anything that does not start with
/// the first two letters of an English weekday.
pub fn parse_weekday(text: &str) -> Result<Weekday, ConfigError> {
    let prefix: String = text.trim().chars().take(2).collect::<String>().to_lowercase();
    match prefix.as_str() {
        "mo" => Ok(Weekday::Mon),
        "tu" => Ok(Weekday::Tue),
        "we" => Ok(Weekday::Wed),
        "th" => Ok(Weekday::Thu),
        "fr" => Ok(Weekday::Fri),
        "sa" => Ok(Weekday::Sat),
        "su" => Ok(Weekday::Sun),
        _ => Err(invalid(format!("unrecognized weekday {text:?}"))),
    }
}

/// Parse an `HH:MM` time of day.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the text is not a valid time.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(text.trim(), TIME_OF_DAY_FORMAT)
        .map_err(|e| invalid(format!("invalid time of day {text:?}: {e}")))
}

/// Parse an `HH:MM D Mon YYYY` moment.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the text does not match.
pub fn parse_day0(text: &str) -> Result<NaiveDateTime, ConfigError> {
    NaiveDateTime::parse_from_str(text.trim(), DAY0_FORMAT)
        .map_err(|e| invalid(format!("invalid day0 {text:?}: {e}")))
}
