//! Terminal styling, passed explicitly to anything that prints.
use console::Style;

/// Marker used for enabled flags in tables.
pub const TICK: &str = "\u{2713}";

/// Marker used for disabled flags in tables.
pub const CROSS: &str = "\u{2717}";

/// Styling choices for terminal output.
///
/// A plain theme never emits escape codes, regardless of the terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    colored: bool,
}

impl Theme {
    /// Creates a `Theme`, colored or not.
    pub fn new(colored: bool) -> Theme {
        Theme { colored }
    }

    /// Creates a `Theme` without any styling.
    pub fn plain() -> Theme {
        Theme::new(false)
    }

    /// Creates a `Theme` based on whether stdout supports colors.
    pub fn detect() -> Theme {
        Theme::new(console::colors_enabled())
    }

    /// Styles a table header cell.
    pub fn header(&self, text: &str) -> String {
        self.paint(Style::new().bold(), text)
    }

    /// Styles table borders and separators.
    pub fn border(&self, text: &str) -> String {
        self.paint(Style::new().dim(), text)
    }

    /// Styles a table cell, coloring tick and cross markers.
    ///
    /// The `raw` value is the cell content before padding was applied.
    pub fn cell(&self, padded: &str, raw: &str) -> String {
        match raw {
            TICK => self.success(padded),
            CROSS => self.failure(padded),
            _ => padded.to_string(),
        }
    }

    /// Styles a value the user supplied, such as an ID or target.
    pub fn value(&self, text: &str) -> String {
        self.paint(Style::new().cyan().bold(), text)
    }

    /// Styles a successful status.
    pub fn success(&self, text: &str) -> String {
        self.paint(Style::new().green(), text)
    }

    /// Styles a failed status.
    pub fn failure(&self, text: &str) -> String {
        self.paint(Style::new().red(), text)
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if !self.colored {
            return text.to_string();
        }
        style.force_styling(true).apply_to(text).to_string()
    }
}
