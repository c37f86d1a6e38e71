//! Presentation of lifecycle rule sets as tables or JSON.
//!
//! Which columns appear depends on the `View` requested, and which rules
//! appear depends on the actions they carry. A view which ends up with no
//! rules at all is reported as `RenderError::NoSuchConfiguration` rather
//! than as an empty table.
use pretty_bytes::converter::convert;

use std::fmt::{self, Display, Formatter};

use crate::rule::{LifecycleRule, RuleSet, Status, Timing};

pub mod table;
pub mod theme;

pub use self::table::{Align, Column, Table};
pub use self::theme::{Theme, CROSS, TICK};

/// Subset of columns (and rules) to display.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum View {
    /// Every column, for every rule.
    All,
    /// Identifiers, status and action markers only.
    Minimum,
    /// Expiration details of rules which expire objects.
    Expiry,
    /// Transition details of rules which transition objects.
    Transition,
}

/// Failures raised while rendering a rule set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// No rule matched the requested view.
    NoSuchConfiguration(View),
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            RenderError::NoSuchConfiguration(View::Expiry) => {
                f.write_str("lifecycle configuration has no expiration rules")
            }
            RenderError::NoSuchConfiguration(View::Transition) => {
                f.write_str("lifecycle configuration has no transition rules")
            }
            RenderError::NoSuchConfiguration(_) => f.write_str("lifecycle configuration is not set"),
        }
    }
}

/// Columns which can be displayed for a rule.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Field {
    Id,
    Prefix,
    Status,
    Expiry,
    ExpiryDate,
    Transition,
    TransitionDate,
    StorageClass,
    Tags,
}

impl Field {
    fn column(self) -> Column {
        match self {
            Field::Id => Column::new("ID", Align::Left),
            Field::Prefix => Column::new("Prefix", Align::Center),
            Field::Status => Column::new("Enabled", Align::Center),
            Field::Expiry => Column::new("Expiry", Align::Center),
            Field::ExpiryDate => Column::new("Date/Days", Align::Center),
            Field::Transition => Column::new("Transition", Align::Center),
            Field::TransitionDate => Column::new("Date/Days", Align::Center),
            Field::StorageClass => Column::new("Storage-Class", Align::Center),
            Field::Tags => Column::new("Tags", Align::Left),
        }
    }

    fn cell(self, rule: &LifecycleRule) -> Vec<String> {
        let text = match self {
            Field::Id => rule.id.clone(),
            Field::Prefix => match rule.prefix() {
                "" => "-".to_string(),
                prefix => prefix.to_string(),
            },
            Field::Status => mark(rule.status == Status::Enabled),
            Field::Expiry => mark(rule.has_expiration()),
            Field::ExpiryDate => timing_label(rule.expiration.as_ref().and_then(|e| e.timing())),
            Field::Transition => mark(rule.has_transition()),
            Field::TransitionDate => timing_label(rule.transition.as_ref().and_then(|t| t.timing())),
            Field::StorageClass => rule
                .transition
                .as_ref()
                .map(|t| t.storage_class.clone())
                .unwrap_or_default(),
            Field::Tags => {
                return rule
                    .tags()
                    .into_iter()
                    .map(|tag| format!("{}:{}", tag.key, tag.value))
                    .collect();
            }
        };
        vec![text]
    }
}

/// Renders a rule set as a table for the given view.
pub fn render(rules: &RuleSet, view: View, theme: &Theme) -> Result<String, RenderError> {
    let table = build_table(rules, view)?;
    debug!("Rendering {} rule(s) as a table", table.len());
    Ok(table.render(theme))
}

/// Renders a rule set as pretty printed JSON.
pub fn render_json(rules: &RuleSet) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(rules)
}

/// Converts a byte count to a `String` representation.
pub fn convert_bytes(bytes: u64) -> String {
    convert(bytes as f64).replacen(' ', "", 1)
}

/// Builds the table for a view, without rendering it.
fn build_table(rules: &RuleSet, view: View) -> Result<Table, RenderError> {
    let shown = rules
        .rules
        .iter()
        .filter(|rule| match view {
            View::All | View::Minimum => true,
            View::Expiry => rule.has_expiration(),
            View::Transition => rule.has_transition(),
        })
        .collect::<Vec<_>>();

    if shown.is_empty() {
        return Err(RenderError::NoSuchConfiguration(view));
    }

    // the tag column only appears when there's something to put in it
    let tagged = shown.iter().any(|rule| !rule.tags().is_empty());
    let mut fields = vec![Field::Id, Field::Prefix, Field::Status];

    match view {
        View::All => fields.extend_from_slice(&[
            Field::Expiry,
            Field::ExpiryDate,
            Field::Transition,
            Field::TransitionDate,
            Field::StorageClass,
            Field::Tags,
        ]),
        View::Minimum => fields.extend_from_slice(&[Field::Expiry, Field::Transition]),
        View::Expiry => fields.push(Field::ExpiryDate),
        View::Transition => fields.extend_from_slice(&[Field::TransitionDate, Field::StorageClass]),
    }

    if tagged && (view == View::Expiry || view == View::Transition) {
        fields.push(Field::Tags);
    }

    let mut table = Table::new(fields.iter().map(|field| field.column()).collect());
    for rule in shown {
        table.push(fields.iter().map(|field| field.cell(rule)).collect());
    }

    Ok(table)
}

/// Formats a boolean as a tick or cross marker.
fn mark(value: bool) -> String {
    let marker = if value { TICK } else { CROSS };
    marker.to_string()
}

/// Formats an action timing, e.g. `17 Sep 2020` or `30 day(s)`.
fn timing_label(timing: Option<Timing>) -> String {
    match timing {
        Some(Timing::Date(date)) => date.to_label(),
        Some(Timing::Days(days)) => format!("{} day(s)", days),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{build_rule, RuleOptions};

    fn rule(id: &str, configure: impl FnOnce(&mut RuleOptions)) -> LifecycleRule {
        let mut opts = RuleOptions {
            id: Some(id.into()),
            ..RuleOptions::default()
        };
        configure(&mut opts);
        build_rule(&opts).unwrap()
    }

    fn sample() -> RuleSet {
        RuleSet::new(vec![
            rule("expire", |o| {
                o.prefix = Some("logs/".into());
                o.expire_days = Some("200".into());
            }),
            rule("archive", |o| {
                o.tags = Some("team=data&tier=cold".into());
                o.transition_date = Some("2030-09-17".into());
                o.transition_tier = Some("glacier".into());
            }),
        ])
    }

    fn headers(table: &Table) -> String {
        table.render(&Theme::plain()).lines().next().unwrap().to_string()
    }

    #[test]
    fn converting_bytes_to_string() {
        assert_eq!(convert_bytes(512), "512B");
        assert_eq!(convert_bytes(512 * 512), "262.14kB");
        assert_eq!(convert_bytes(512 * 512 * 512), "134.22MB");
    }

    #[test]
    fn rendering_all_columns() {
        let rendered = render(&sample(), View::All, &Theme::plain()).unwrap();
        let lines = rendered.lines().collect::<Vec<_>>();

        for header in &["ID", "Prefix", "Enabled", "Expiry", "Transition", "Storage-Class", "Tags"] {
            assert!(lines[0].contains(header), "missing {}", header);
        }

        assert!(lines[2].contains("expire"));
        assert!(lines[2].contains("logs/"));
        assert!(lines[2].contains("200 day(s)"));
        assert!(lines[4].contains("archive"));
        assert!(lines[4].contains("17 Sep 2030"));
        assert!(lines[4].contains("GLACIER"));
        assert!(lines[4].contains("team:data"));
        assert!(lines[5].contains("tier:cold"));
        assert!(!lines[5].contains("archive"));

        // every line of the table has the same width
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|line| line.chars().count() == width));
    }

    #[test]
    fn rendering_minimum_columns() {
        let table = build_table(&sample(), View::Minimum).unwrap();
        let header = headers(&table);

        assert_eq!(table.len(), 2);
        assert!(header.contains("Expiry"));
        assert!(!header.contains("Date/Days"));
        assert!(!header.contains("Tags"));
    }

    #[test]
    fn filtering_rules_by_action() {
        let table = build_table(&sample(), View::Expiry).unwrap();
        let header = headers(&table);

        assert_eq!(table.len(), 1);
        assert!(!header.contains("Tags"));

        let table = build_table(&sample(), View::Transition).unwrap();
        let header = headers(&table);

        assert_eq!(table.len(), 1);
        assert!(header.contains("Storage-Class"));
        assert!(header.contains("Tags"));
    }

    #[test]
    fn reporting_views_without_matches() {
        let set = RuleSet::new(vec![rule("expire", |o| o.expire_days = Some("30".into()))]);

        assert_eq!(
            render(&set, View::Transition, &Theme::plain()),
            Err(RenderError::NoSuchConfiguration(View::Transition))
        );
        assert_eq!(
            render(&RuleSet::default(), View::All, &Theme::plain()),
            Err(RenderError::NoSuchConfiguration(View::All))
        );
    }

    #[test]
    fn rendering_json_with_wire_names() {
        let json = render_json(&sample()).unwrap();

        assert!(json.contains("\"Rules\""));
        assert!(json.contains("\"ID\": \"expire\""));
        assert!(json.contains("\"StorageClass\": \"GLACIER\""));
    }
}
