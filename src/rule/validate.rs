//! Pure validation of lifecycle rules.
//!
//! Checks run in a fixed order and stop at the first failure; none of them
//! talk to the remote server (tier names are checked there, on apply).
use std::collections::HashSet;
use std::time::SystemTime;

use super::{Action, LifecycleDate, LifecycleRule, RuleSet, ValidationError};

/// Minimum transition age policy for reduced availability storage classes.
#[derive(Clone, Debug, PartialEq)]
pub struct TierPolicy {
    /// Transitions by days must wait at least this long.
    pub minimum_days: u32,
    /// Storage classes the minimum applies to, matched ignoring case.
    pub storage_classes: Vec<String>,
}

impl Default for TierPolicy {
    fn default() -> TierPolicy {
        TierPolicy {
            minimum_days: 30,
            storage_classes: vec!["STANDARD_IA".to_string()],
        }
    }
}

impl TierPolicy {
    /// Determines whether the minimum age applies to a storage class.
    pub fn applies_to(&self, storage_class: &str) -> bool {
        self.storage_classes
            .iter()
            .any(|class| class.eq_ignore_ascii_case(storage_class))
    }
}

/// Validates a rule against the provided `TierPolicy`.
pub fn validate(rule: &LifecycleRule, policy: &TierPolicy) -> Result<(), ValidationError> {
    // exactly one of date or days per action
    if let Some(ref expiration) = rule.expiration {
        check_time_spec(Action::Expiration, expiration.date, expiration.days)?;
    }
    if let Some(ref transition) = rule.transition {
        check_time_spec(Action::Transition, transition.date, transition.days)?;
    }

    // transitions must precede expirations
    if let (Some(expiration), Some(transition)) = (&rule.expiration, &rule.transition) {
        if let (Some(expire), Some(transit)) = (expiration.days, transition.days) {
            if transit >= expire {
                return Err(ValidationError::TransitionAfterExpiration);
            }
        }
        if let (Some(expire), Some(transit)) = (expiration.date, transition.date) {
            if transit >= expire {
                return Err(ValidationError::TransitionAfterExpiration);
            }
        }
    }

    // minimum transition age for reduced availability classes
    if let Some(ref transition) = rule.transition {
        if let Some(days) = transition.days {
            if days < policy.minimum_days && policy.applies_to(&transition.storage_class) {
                return Err(ValidationError::TransitionTooSoon {
                    days,
                    minimum: policy.minimum_days,
                    storage_class: transition.storage_class.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Validates a full rule set, as used when replacing it wholesale.
///
/// On top of validating each rule, identifiers must be present and unique.
pub fn validate_set(set: &RuleSet, policy: &TierPolicy) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for rule in &set.rules {
        if rule.id.trim().is_empty() {
            return Err(ValidationError::MissingId);
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(ValidationError::DuplicateId(rule.id.clone()));
        }
        validate(rule, policy)?;
    }
    Ok(())
}

/// Ensures action dates fall after the day containing `now`.
pub fn ensure_future_dates(rule: &LifecycleRule, now: SystemTime) -> Result<(), ValidationError> {
    let today = LifecycleDate::truncate(now);
    let expiry = rule.expiration.as_ref().and_then(|e| e.date);
    let transition = rule.transition.as_ref().and_then(|t| t.date);

    if expiry.map_or(false, |date| date <= today) {
        return Err(ValidationError::DateInPast(Action::Expiration));
    }
    if transition.map_or(false, |date| date <= today) {
        return Err(ValidationError::DateInPast(Action::Transition));
    }
    Ok(())
}

/// Ensures exactly one of a date or day count is set.
fn check_time_spec(
    action: Action,
    date: Option<LifecycleDate>,
    days: Option<u32>,
) -> Result<(), ValidationError> {
    match (date, days) {
        (Some(_), Some(_)) => Err(ValidationError::ConflictingTimeSpec(action)),
        (None, None) => Err(ValidationError::IncompleteAction(action)),
        _ => Ok(()),
    }
}
