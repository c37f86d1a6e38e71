//! Insertion and removal of rules within an ordered `RuleSet`.
use std::fmt::{self, Display, Formatter};

use super::{LifecycleRule, RuleSet};

/// Raised when a rule identifier does not exist in a `RuleSet`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownRule(pub String);

impl Display for UnknownRule {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "lifecycle rule for id `{}` not found", self.0)
    }
}

/// Inserts a rule into a set, replacing any rule with the same ID.
///
/// A replaced rule keeps its position in the set; new rules are appended.
pub fn upsert_rule(mut set: RuleSet, rule: LifecycleRule) -> RuleSet {
    match set.rules.iter().position(|existing| existing.id == rule.id) {
        Some(index) => set.rules[index] = rule,
        None => set.rules.push(rule),
    }
    set
}

/// Removes the rule with the provided ID from a set.
pub fn remove_rule(mut set: RuleSet, id: &str) -> Result<RuleSet, UnknownRule> {
    let count = set.rules.len();
    set.rules.retain(|rule| rule.id != id);

    if set.rules.len() == count {
        return Err(UnknownRule(id.to_string()));
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleFilter;

    fn rule(id: &str, prefix: &str) -> LifecycleRule {
        LifecycleRule {
            id: id.into(),
            filter: RuleFilter {
                prefix: Some(prefix.into()),
                ..RuleFilter::default()
            },
            ..LifecycleRule::default()
        }
    }

    fn ids(set: &RuleSet) -> Vec<&str> {
        set.rules.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn appending_new_rules() {
        let set = RuleSet::new(vec![rule("a", ""), rule("b", "")]);
        let set = upsert_rule(set, rule("c", "logs/"));

        assert_eq!(ids(&set), vec!["a", "b", "c"]);
        assert_eq!(set.rules.last().unwrap().prefix(), "logs/");
    }

    #[test]
    fn replacing_rules_in_place() {
        let set = RuleSet::new(vec![rule("a", ""), rule("b", "")]);
        let set = upsert_rule(set, rule("a", "new/"));

        assert_eq!(ids(&set), vec!["a", "b"]);
        assert_eq!(set.rules[0].prefix(), "new/");
        assert_eq!(set.rules[1].prefix(), "");
    }

    #[test]
    fn replacing_is_idempotent() {
        let set = RuleSet::new(vec![rule("a", ""), rule("b", "")]);
        let once = upsert_rule(set, rule("c", "x/"));
        let twice = upsert_rule(once.clone(), rule("c", "x/"));

        assert_eq!(once, twice);
    }

    #[test]
    fn inserting_into_empty_sets() {
        let set = upsert_rule(RuleSet::default(), rule("r1", ""));
        assert_eq!(ids(&set), vec!["r1"]);
    }

    #[test]
    fn removing_rules_by_id() {
        let set = RuleSet::new(vec![rule("a", ""), rule("b", ""), rule("c", "")]);
        let set = remove_rule(set, "b").unwrap();

        assert_eq!(ids(&set), vec!["a", "c"]);
        assert_eq!(
            remove_rule(set, "missing"),
            Err(UnknownRule("missing".into()))
        );
    }
}
