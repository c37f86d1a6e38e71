//! Result messages printed by each command.
//!
//! Every message has a stable JSON shape (used with `--json`) alongside a
//! human readable form, which is styled through the active `Theme`.
use serde::Serialize;

use crate::render::Theme;
use crate::rule::RuleSet;
use crate::types::UtilResult;

/// Status value carried by successful messages.
pub const SUCCESS: &str = "success";

/// A command result which can be printed as text or JSON.
pub trait Message: Serialize {
    /// Formats this message for a terminal.
    fn text(&self, theme: &Theme) -> String;
}

/// Prints a message to stdout, as JSON or text.
pub fn print_msg<M: Message>(msg: &M, json: bool, theme: &Theme) -> UtilResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(msg)?);
    } else {
        println!("{}", msg.text(theme));
    }
    Ok(())
}

/// Result of adding a rule.
#[derive(Debug, PartialEq, Serialize)]
pub struct AddMessage {
    pub status: &'static str,
    pub target: String,
    pub id: String,
}

impl Message for AddMessage {
    fn text(&self, theme: &Theme) -> String {
        format!(
            "Lifecycle configuration rule added with ID `{}` to {}.",
            theme.value(&self.id),
            theme.value(&self.target)
        )
    }
}

/// Result of editing a rule.
#[derive(Debug, PartialEq, Serialize)]
pub struct EditMessage {
    pub status: &'static str,
    pub target: String,
    pub id: String,
}

impl Message for EditMessage {
    fn text(&self, theme: &Theme) -> String {
        format!(
            "Lifecycle configuration rule with ID `{}` modified on {}.",
            theme.value(&self.id),
            theme.value(&self.target)
        )
    }
}

/// Result of removing one (or all) rules.
#[derive(Debug, PartialEq, Serialize)]
pub struct RemoveMessage {
    pub status: &'static str,
    pub id: String,
    pub target: String,
    pub all: bool,
}

impl Message for RemoveMessage {
    fn text(&self, theme: &Theme) -> String {
        if self.all {
            return format!(
                "Rules for {} removed.",
                theme.value(&self.target)
            );
        }
        format!(
            "Rule ID `{}` removed from {}.",
            theme.value(&self.id),
            theme.value(&self.target)
        )
    }
}

/// Result of listing rules; the table is rendered up front.
#[derive(Debug, PartialEq, Serialize)]
pub struct ListMessage {
    pub status: &'static str,
    pub target: String,
    pub config: RuleSet,
    #[serde(skip)]
    pub table: String,
}

impl Message for ListMessage {
    fn text(&self, _theme: &Theme) -> String {
        self.table.clone()
    }
}

/// Result of importing a rule set.
#[derive(Debug, PartialEq, Serialize)]
pub struct ImportMessage {
    pub status: &'static str,
    pub target: String,
    pub rules: usize,
}

impl Message for ImportMessage {
    fn text(&self, theme: &Theme) -> String {
        format!(
            "Lifecycle configuration imported to {} ({} rule(s)).",
            theme.value(&self.target),
            self.rules
        )
    }
}
