//! Lifecycle rule model, along with the builder, validator and merger.
//!
//! The structures in this module mirror the shape of an S3 lifecycle
//! configuration closely enough to be pushed back to a server wholesale,
//! while the submodules contain the (pure) business rules around them.
use serde::{Deserialize, Serialize};

use std::fmt::{self, Display, Formatter};

pub mod builder;
pub mod date;
pub mod merge;
pub mod validate;

pub use self::builder::{build_rule, RuleOptions};
pub use self::date::LifecycleDate;
pub use self::merge::{remove_rule, upsert_rule};
pub use self::validate::{validate, TierPolicy};

/// Ordered collection of lifecycle rules for a single bucket.
///
/// Order is display order only; it carries no evaluation priority.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(rename = "Rules", default)]
    pub rules: Vec<LifecycleRule>,
}

impl RuleSet {
    /// Constructs a `RuleSet` from a list of rules.
    pub fn new(rules: Vec<LifecycleRule>) -> RuleSet {
        RuleSet { rules }
    }

    /// Determines whether there are any rules in this set.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Looks up a rule by identifier.
    pub fn find(&self, id: &str) -> Option<&LifecycleRule> {
        self.rules.iter().find(|rule| rule.id == id)
    }
}

/// Whether a rule is being applied by the server.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Enabled,
    Disabled,
}

impl Default for Status {
    fn default() -> Status {
        Status::Enabled
    }
}

impl Status {
    /// Returns the wire representation of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Enabled => "Enabled",
            Status::Disabled => "Disabled",
        }
    }

    /// Parses a wire status, ignoring case.
    pub fn parse(value: &str) -> Option<Status> {
        match value.to_ascii_lowercase().as_str() {
            "enabled" => Some(Status::Enabled),
            "disabled" => Some(Status::Disabled),
            _ => None,
        }
    }
}

/// A single lifecycle rule.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleRule {
    #[serde(rename = "ID")]
    pub id: String,
    pub status: Status,
    #[serde(default)]
    pub filter: RuleFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Expiration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noncurrent_version_expiration: Option<NoncurrentVersionExpiration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noncurrent_version_transition: Option<NoncurrentVersionTransition>,
}

impl LifecycleRule {
    /// Returns the prefix this rule selects, wherever it lives in the filter.
    pub fn prefix(&self) -> &str {
        if let Some(ref prefix) = self.filter.prefix {
            if !prefix.is_empty() {
                return prefix;
            }
        }
        self.filter
            .and
            .as_ref()
            .and_then(|and| and.prefix.as_deref())
            .unwrap_or("")
    }

    /// Returns all tags this rule selects on.
    pub fn tags(&self) -> Vec<&Tag> {
        let mut tags: Vec<&Tag> = self.filter.tag.iter().collect();
        if let Some(ref and) = self.filter.and {
            tags.extend(and.tags.iter());
        }
        tags
    }

    /// Returns the `(greater than, less than)` object size bounds.
    pub fn size_bounds(&self) -> (Option<u64>, Option<u64>) {
        let and = self.filter.and.as_ref();
        (
            self.filter
                .object_size_greater_than
                .or_else(|| and.and_then(|a| a.object_size_greater_than)),
            self.filter
                .object_size_less_than
                .or_else(|| and.and_then(|a| a.object_size_less_than)),
        )
    }

    /// Determines if this rule expires current versions by date or days.
    pub fn has_expiration(&self) -> bool {
        self.expiration.as_ref().map_or(false, |e| e.timing().is_some())
    }

    /// Determines if this rule transitions current versions by date or days.
    pub fn has_transition(&self) -> bool {
        self.transition.as_ref().map_or(false, |t| t.timing().is_some())
    }
}

/// Object selection for a rule.
///
/// A bare prefix is stored at the top level; any combination with tags or
/// size bounds lives under the `and` group.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_size_greater_than: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_size_less_than: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<AndOperator>,
}

/// Logical AND of several filter predicates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AndOperator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_size_greater_than: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_size_less_than: Option<u64>,
}

/// Object tag key/value pair used in filters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// When an action fires: an absolute date or a number of days.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Timing {
    Date(LifecycleDate),
    Days(u32),
}

/// Expiration of current object versions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Expiration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<LifecycleDate>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub expired_object_delete_marker: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub expired_object_all_versions: bool,
}

impl Expiration {
    /// Returns the timing of this expiration, preferring the date.
    pub fn timing(&self) -> Option<Timing> {
        timing(self.date, self.days)
    }
}

/// Transition of current object versions to a remote tier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<LifecycleDate>,
    #[serde(default)]
    pub storage_class: String,
}

impl Transition {
    /// Returns the timing of this transition, preferring the date.
    pub fn timing(&self) -> Option<Timing> {
        timing(self.date, self.days)
    }
}

/// Expiration of noncurrent object versions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoncurrentVersionExpiration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noncurrent_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newer_noncurrent_versions: Option<u32>,
}

/// Transition of noncurrent object versions to a remote tier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NoncurrentVersionTransition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noncurrent_days: Option<u32>,
    #[serde(default)]
    pub storage_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newer_noncurrent_versions: Option<u32>,
}

/// Actions a rule can carry, used to label errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Expiration,
    Transition,
    NoncurrentExpiration,
    NoncurrentTransition,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Action::Expiration => "expiration",
            Action::Transition => "transition",
            Action::NoncurrentExpiration => "noncurrent version expiration",
            Action::NoncurrentTransition => "noncurrent version transition",
        })
    }
}

/// Every way building or validating a rule can fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A tag pair without `=`, or with an empty key or value.
    InvalidTagFilter(String),
    /// Both a date and a day count were given for the same action.
    ConflictingTimeSpec(Action),
    /// An action was requested without a date or day count (or tier).
    IncompleteAction(Action),
    /// No rule identifier was given.
    MissingId,
    /// A transition is scheduled on or after the expiration.
    TransitionAfterExpiration,
    /// A transition into a reduced availability class is too early.
    TransitionTooSoon {
        days: u32,
        minimum: u32,
        storage_class: String,
    },
    /// A day count which is not a positive integer.
    InvalidDays { flag: &'static str, value: String },
    /// A date which is not `YYYY-MM-DD`.
    InvalidDate(String),
    /// A size which cannot be parsed.
    InvalidSize(String),
    /// The lower size bound is not below the upper bound.
    InvalidSizeRange { greater_than: u64, less_than: u64 },
    /// A rule without any action at all.
    NoAction,
    /// A date which has already passed.
    DateInPast(Action),
    /// Two rules in one set share an identifier.
    DuplicateId(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ValidationError::InvalidTagFilter(tag) => {
                write!(f, "invalid tag filter `{}`, expected key=value", tag)
            }
            ValidationError::ConflictingTimeSpec(action) => {
                write!(f, "only one of date or days may be set for {}", action)
            }
            ValidationError::IncompleteAction(action) => match action {
                Action::Transition | Action::NoncurrentTransition => {
                    write!(f, "{} requires both a tier and a date or days", action)
                }
                _ => write!(f, "{} requires a date or days", action),
            },
            ValidationError::MissingId => f.write_str("lifecycle rule cannot be added without an ID"),
            ValidationError::TransitionAfterExpiration => {
                f.write_str("transition should happen before expiration")
            }
            ValidationError::TransitionTooSoon {
                days,
                minimum,
                storage_class,
            } => write!(
                f,
                "transition after {} day(s) is below the {} day minimum for {}",
                days, minimum, storage_class
            ),
            ValidationError::InvalidDays { flag, value } => {
                write!(f, "invalid value `{}` for --{}, expected days > 0", value, flag)
            }
            ValidationError::InvalidDate(date) => {
                write!(f, "invalid date `{}`, expected YYYY-MM-DD", date)
            }
            ValidationError::InvalidSize(size) => write!(f, "invalid object size `{}`", size),
            ValidationError::InvalidSizeRange {
                greater_than,
                less_than,
            } => write!(
                f,
                "size-gt ({}) must be less than size-lt ({})",
                crate::render::convert_bytes(*greater_than),
                crate::render::convert_bytes(*less_than)
            ),
            ValidationError::NoAction => {
                f.write_str("at least one action (expiry or transition) needs to be specified")
            }
            ValidationError::DateInPast(action) => {
                write!(f, "{} date falls on or before today's date", action)
            }
            ValidationError::DuplicateId(id) => write!(f, "duplicate rule ID `{}`", id),
        }
    }
}

/// Resolves a date/days pair into a `Timing`.
fn timing(date: Option<LifecycleDate>, days: Option<u32>) -> Option<Timing> {
    match (date, days) {
        (Some(date), _) => Some(Timing::Date(date)),
        (None, Some(days)) => Some(Timing::Days(days)),
        (None, None) => None,
    }
}

/// Used to skip serializing unset boolean flags.
fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_prefix_from_either_location() {
        let mut rule = LifecycleRule::default();
        rule.filter.prefix = Some("logs/".into());
        assert_eq!(rule.prefix(), "logs/");

        rule.filter.prefix = None;
        rule.filter.and = Some(AndOperator {
            prefix: Some("docs/".into()),
            ..AndOperator::default()
        });
        assert_eq!(rule.prefix(), "docs/");

        rule.filter.and = None;
        assert_eq!(rule.prefix(), "");
    }

    #[test]
    fn collecting_tags_from_filter() {
        let mut rule = LifecycleRule::default();
        rule.filter.tag = Some(Tag {
            key: "a".into(),
            value: "1".into(),
        });
        rule.filter.and = Some(AndOperator {
            tags: vec![Tag {
                key: "b".into(),
                value: "2".into(),
            }],
            ..AndOperator::default()
        });

        let keys: Vec<&str> = rule.tags().iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn serializing_rules_with_wire_names() {
        let rule = LifecycleRule {
            id: "r1".into(),
            status: Status::Enabled,
            expiration: Some(Expiration {
                days: Some(200),
                ..Expiration::default()
            }),
            ..LifecycleRule::default()
        };

        let value = serde_json::to_value(&RuleSet::new(vec![rule])).unwrap();
        let first = &value["Rules"][0];

        assert_eq!(first["ID"], "r1");
        assert_eq!(first["Status"], "Enabled");
        assert_eq!(first["Expiration"]["Days"], 200);
        assert!(first.get("Transition").is_none());
        assert!(first["Expiration"].get("ExpiredObjectDeleteMarker").is_none());
    }

    #[test]
    fn parsing_status_ignores_case() {
        assert_eq!(Status::parse("enabled"), Some(Status::Enabled));
        assert_eq!(Status::parse("DISABLED"), Some(Status::Disabled));
        assert_eq!(Status::parse("paused"), None);
    }
}
