//! Construction of lifecycle rules from flat command line options.
//!
//! Every option is carried as the raw string the user typed, so that this
//! module owns all parsing (and all of the associated error reporting).
use regex::{Regex, RegexBuilder};

use super::{
    Action, AndOperator, LifecycleDate, LifecycleRule, RuleFilter, Status, Tag, ValidationError,
};

/// Separates tag pairs, as in `k1=v1&k2=v2`.
const TAG_SEPARATOR: char = '&';

/// Separates a tag key from its value.
const KEY_VALUE_SEPARATOR: char = '=';

/// Flat set of named options used to build (or edit) a rule.
#[derive(Clone, Debug, Default)]
pub struct RuleOptions {
    pub id: Option<String>,
    pub prefix: Option<String>,
    pub tags: Option<String>,
    pub size_lt: Option<String>,
    pub size_gt: Option<String>,
    pub expire_days: Option<String>,
    pub expire_date: Option<String>,
    pub expire_delete_marker: bool,
    pub expire_all_versions: bool,
    pub transition_days: Option<String>,
    pub transition_date: Option<String>,
    pub transition_tier: Option<String>,
    pub noncurrent_expire_days: Option<String>,
    pub noncurrent_expire_newer: Option<String>,
    pub noncurrent_transition_days: Option<String>,
    pub noncurrent_transition_tier: Option<String>,
    pub noncurrent_transition_newer: Option<String>,
    pub status: Option<Status>,
}

impl RuleOptions {
    /// Applies all provided options on top of an existing rule.
    ///
    /// Options which were not provided leave the rule untouched; a date
    /// replaces a day count (and vice versa), and an empty tag string
    /// removes all tags from the filter.
    pub fn apply_to(&self, mut rule: LifecycleRule) -> Result<LifecycleRule, ValidationError> {
        // filter components are merged, then re-laid out
        let prefix = match self.prefix {
            Some(ref prefix) => prefix.clone(),
            None => rule.prefix().to_string(),
        };
        let tags = match self.tags {
            Some(ref tags) => parse_tags(tags)?,
            None => rule.tags().into_iter().cloned().collect(),
        };
        let (mut gt, mut lt) = rule.size_bounds();
        if self.size_gt.is_some() || self.size_lt.is_some() {
            let sizes = SizeParser::new()?;
            if let Some(ref size) = self.size_gt {
                gt = Some(sizes.parse(size)?);
            }
            if let Some(ref size) = self.size_lt {
                lt = Some(sizes.parse(size)?);
            }
        }
        rule.filter = build_filter(&prefix, tags, gt, lt)?;

        // expiration of current versions
        let (date, days) = self.expiration_timing()?;
        if date.is_some() || days.is_some() || self.expire_delete_marker || self.expire_all_versions {
            let mut expiration = rule.expiration.take().unwrap_or_default();
            if date.is_some() || days.is_some() {
                expiration.date = date;
                expiration.days = days;
            }
            expiration.expired_object_delete_marker |= self.expire_delete_marker;
            expiration.expired_object_all_versions |= self.expire_all_versions;
            if expiration.timing().is_none() {
                return Err(ValidationError::IncompleteAction(Action::Expiration));
            }
            rule.expiration = Some(expiration);
        }

        // transition of current versions
        let (date, days) = self.transition_timing()?;
        let tier = tier_name(&self.transition_tier);
        if date.is_some() || days.is_some() || tier.is_some() {
            let mut transition = rule.transition.take().unwrap_or_default();
            if date.is_some() || days.is_some() {
                transition.date = date;
                transition.days = days;
            }
            if let Some(tier) = tier {
                transition.storage_class = tier;
            }
            if transition.timing().is_none() || transition.storage_class.is_empty() {
                return Err(ValidationError::IncompleteAction(Action::Transition));
            }
            rule.transition = Some(transition);
        }

        // noncurrent version expiration
        let days = parse_opt_days("noncurrent-expire-days", &self.noncurrent_expire_days)?;
        let newer = parse_opt_days("noncurrent-expire-newer", &self.noncurrent_expire_newer)?;
        if days.is_some() || newer.is_some() {
            let mut expiration = rule.noncurrent_version_expiration.take().unwrap_or_default();
            expiration.noncurrent_days = days.or(expiration.noncurrent_days);
            expiration.newer_noncurrent_versions = newer.or(expiration.newer_noncurrent_versions);
            if expiration.noncurrent_days.is_none() {
                return Err(ValidationError::IncompleteAction(Action::NoncurrentExpiration));
            }
            rule.noncurrent_version_expiration = Some(expiration);
        }

        // noncurrent version transition
        let days = parse_opt_days("noncurrent-transition-days", &self.noncurrent_transition_days)?;
        let newer = parse_opt_days("noncurrent-transition-newer", &self.noncurrent_transition_newer)?;
        let tier = tier_name(&self.noncurrent_transition_tier);
        if days.is_some() || newer.is_some() || tier.is_some() {
            let mut transition = rule.noncurrent_version_transition.take().unwrap_or_default();
            transition.noncurrent_days = days.or(transition.noncurrent_days);
            transition.newer_noncurrent_versions = newer.or(transition.newer_noncurrent_versions);
            if let Some(tier) = tier {
                transition.storage_class = tier;
            }
            if transition.noncurrent_days.is_none() || transition.storage_class.is_empty() {
                return Err(ValidationError::IncompleteAction(Action::NoncurrentTransition));
            }
            rule.noncurrent_version_transition = Some(transition);
        }

        if let Some(status) = self.status {
            rule.status = status;
        }

        Ok(rule)
    }

    /// Parses the expiration date/days pair.
    fn expiration_timing(&self) -> Result<(Option<LifecycleDate>, Option<u32>), ValidationError> {
        parse_timing(
            Action::Expiration,
            ("expire-date", &self.expire_date),
            ("expire-days", &self.expire_days),
        )
    }

    /// Parses the transition date/days pair.
    fn transition_timing(&self) -> Result<(Option<LifecycleDate>, Option<u32>), ValidationError> {
        parse_timing(
            Action::Transition,
            ("transition-date", &self.transition_date),
            ("transition-days", &self.transition_days),
        )
    }
}

/// Builds a brand new lifecycle rule from the provided options.
///
/// This only checks the shape of the input; ordering checks between the
/// actions of the rule belong to `validate`.
pub fn build_rule(opts: &RuleOptions) -> Result<LifecycleRule, ValidationError> {
    // identifiers are mandatory for new rules
    let id = opts
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ValidationError::MissingId)?;

    // start from an empty rule, then layer the options on top
    let base = LifecycleRule {
        id: id.to_string(),
        status: Status::Enabled,
        ..LifecycleRule::default()
    };
    let rule = opts.apply_to(base)?;

    // rules need at least one action
    if rule.expiration.is_none()
        && rule.transition.is_none()
        && rule.noncurrent_version_expiration.is_none()
        && rule.noncurrent_version_transition.is_none()
    {
        return Err(ValidationError::NoAction);
    }

    Ok(rule)
}

/// Builds a filter from its components.
///
/// A bare prefix is kept at the top level, while any tag or size predicate
/// moves everything (prefix included) under the AND group.
pub fn build_filter(
    prefix: &str,
    tags: Vec<Tag>,
    greater_than: Option<u64>,
    less_than: Option<u64>,
) -> Result<RuleFilter, ValidationError> {
    if let (Some(greater_than), Some(less_than)) = (greater_than, less_than) {
        if greater_than >= less_than {
            return Err(ValidationError::InvalidSizeRange {
                greater_than,
                less_than,
            });
        }
    }

    if tags.is_empty() && greater_than.is_none() && less_than.is_none() {
        return Ok(RuleFilter {
            prefix: Some(prefix.to_string()),
            ..RuleFilter::default()
        });
    }

    Ok(RuleFilter {
        and: Some(AndOperator {
            prefix: Some(prefix.to_string()).filter(|p| !p.is_empty()),
            tags,
            object_size_greater_than: greater_than,
            object_size_less_than: less_than,
        }),
        ..RuleFilter::default()
    })
}

/// Parses a tag string of the form `k1=v1&k2=v2`.
///
/// An empty string parses to no tags at all.
pub fn parse_tags(input: &str) -> Result<Vec<Tag>, ValidationError> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    input
        .split(TAG_SEPARATOR)
        .map(|pair| {
            let mut splitn = pair.splitn(2, KEY_VALUE_SEPARATOR);
            match (splitn.next(), splitn.next()) {
                (Some(key), Some(value)) if !key.is_empty() && !value.is_empty() => Ok(Tag {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
                _ => Err(ValidationError::InvalidTagFilter(pair.to_string())),
            }
        })
        .collect()
}

/// Parser for human readable object sizes.
///
/// Accepts plain byte counts alongside decimal (`KB`, `MB`, ...) and
/// binary (`KiB`, `MiB`, ...) units, ignoring case.
pub struct SizeParser {
    pattern: Regex,
}

impl SizeParser {
    /// Compiles the size pattern.
    pub fn new() -> Result<SizeParser, ValidationError> {
        let pattern = RegexBuilder::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:([kmgtpe])(i)?)?b?\s*$")
            .case_insensitive(true)
            .build()
            .map_err(|err| ValidationError::InvalidSize(err.to_string()))?;

        Ok(SizeParser { pattern })
    }

    /// Parses a human readable object size into bytes.
    pub fn parse(&self, input: &str) -> Result<u64, ValidationError> {
        let invalid = || ValidationError::InvalidSize(input.to_string());

        let captures = self.pattern.captures(input).ok_or_else(invalid)?;
        let value: f64 = captures[1].parse().map_err(|_| invalid())?;

        // binary units step by 1024, decimal units by 1000
        let base: f64 = if captures.get(3).is_some() { 1024.0 } else { 1000.0 };
        let exponent = match captures.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
            None => 0,
            Some(unit) => match unit.as_str() {
                "k" => 1,
                "m" => 2,
                "g" => 3,
                "t" => 4,
                "p" => 5,
                _ => 6,
            },
        };

        let bytes = value * base.powi(exponent);
        if !bytes.is_finite() || bytes > u64::max_value() as f64 {
            return Err(invalid());
        }

        Ok(bytes.round() as u64)
    }
}

/// Parses a strictly positive day (or version) count.
pub fn parse_days(flag: &'static str, value: &str) -> Result<u32, ValidationError> {
    match value.trim().parse::<u32>() {
        Ok(days) if days > 0 => Ok(days),
        _ => Err(ValidationError::InvalidDays {
            flag,
            value: value.to_string(),
        }),
    }
}

/// Parses an optional day count.
fn parse_opt_days(flag: &'static str, value: &Option<String>) -> Result<Option<u32>, ValidationError> {
    value.as_deref().map(|v| parse_days(flag, v)).transpose()
}

/// Parses a mutually exclusive date/days pair for an action.
fn parse_timing(
    action: Action,
    date: (&'static str, &Option<String>),
    days: (&'static str, &Option<String>),
) -> Result<(Option<LifecycleDate>, Option<u32>), ValidationError> {
    if date.1.is_some() && days.1.is_some() {
        return Err(ValidationError::ConflictingTimeSpec(action));
    }

    let parsed_date = date.1.as_deref().map(LifecycleDate::parse).transpose()?;
    let parsed_days = parse_opt_days(days.0, days.1)?;

    Ok((parsed_date, parsed_days))
}

/// Normalizes a tier name, treating blank names as absent.
fn tier_name(tier: &Option<String>) -> Option<String> {
    tier.as_deref()
        .map(str::trim)
        .filter(|tier| !tier.is_empty())
        .map(str::to_uppercase)
}
