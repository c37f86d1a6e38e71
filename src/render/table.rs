//! Aligned text tables with multi-line cells.
use console::measure_text_width;

use super::theme::Theme;

/// Horizontal alignment of a column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Column definition; widths are derived from content on render.
#[derive(Clone, Debug)]
pub struct Column {
    pub header: &'static str,
    pub align: Align,
}

impl Column {
    pub fn new(header: &'static str, align: Align) -> Column {
        Column { header, align }
    }
}

/// A table of rows, where each cell may span several lines.
///
/// Extra lines of a cell are emitted as sub-rows beneath the main row,
/// with every other column left blank.
#[derive(Clone, Debug)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Vec<String>>>,
}

impl Table {
    /// Creates a new empty `Table` with the given columns.
    pub fn new(columns: Vec<Column>) -> Table {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row; each cell is a list of lines.
    ///
    /// Missing trailing cells are rendered blank.
    pub fn push(&mut self, row: Vec<Vec<String>>) {
        self.rows.push(row);
    }

    /// Returns the number of rows in this table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Computes the width of each column from the header and every line.
    pub fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .flat_map(|cell| cell.iter())
                    .map(|line| measure_text_width(line))
                    .fold(measure_text_width(column.header), usize::max)
            })
            .collect()
    }

    /// Renders this table into a `String`, one line per table line.
    pub fn render(&self, theme: &Theme) -> String {
        // first pass: every width is known before anything is emitted
        let widths = self.widths();
        let total = widths.iter().map(|w| w + 3).sum::<usize>() + 1;
        let divider = theme.border(&"-".repeat(total));

        let mut output = Vec::with_capacity(self.rows.len() * 2 + 2);

        // header, always centered
        let header = self
            .columns
            .iter()
            .zip(widths.iter())
            .map(|(column, width)| theme.header(&pad(column.header, Align::Center, *width)))
            .collect::<Vec<_>>();

        output.push(self.join(header, theme));
        output.push(divider.clone());

        // second pass: each row with its sub-rows, then a divider
        for row in &self.rows {
            let height = row.iter().map(Vec::len).max().unwrap_or(0).max(1);

            for line in 0..height {
                let cells = self
                    .columns
                    .iter()
                    .zip(widths.iter())
                    .enumerate()
                    .map(|(idx, (column, width))| {
                        let text = row
                            .get(idx)
                            .and_then(|cell| cell.get(line))
                            .map(String::as_str)
                            .unwrap_or("");
                        theme.cell(&pad(text, column.align, *width), text)
                    })
                    .collect::<Vec<_>>();

                output.push(self.join(cells, theme));
            }

            output.push(divider.clone());
        }

        output.join("\n")
    }

    /// Joins rendered cells with column separators.
    fn join(&self, cells: Vec<String>, theme: &Theme) -> String {
        let separator = theme.border("|");
        format!(
            "{} {} {}",
            separator,
            cells.join(&format!(" {} ", separator)),
            separator
        )
    }
}

/// Pads text to a width using the provided alignment.
fn pad(text: &str, align: Align, width: usize) -> String {
    let space = width.saturating_sub(measure_text_width(text));
    match align {
        Align::Left => format!("{}{}", text, " ".repeat(space)),
        Align::Center => {
            let left = space / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(space - left))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn padding_text() {
        assert_eq!(pad("ab", Align::Left, 5), "ab   ");
        assert_eq!(pad("ab", Align::Center, 5), " ab  ");
        assert_eq!(pad("abcdef", Align::Center, 3), "abcdef");
    }

    #[test]
    fn computing_widths_from_content() {
        let mut table = Table::new(vec![
            Column::new("ID", Align::Left),
            Column::new("Tags", Align::Left),
        ]);
        table.push(vec![cell(&["rule-one"]), cell(&["a:1", "longer:tag"])]);
        table.push(vec![cell(&["r"])]);

        assert_eq!(table.widths(), vec![8, 10]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rendering_sub_rows() {
        let mut table = Table::new(vec![
            Column::new("ID", Align::Left),
            Column::new("Tags", Align::Left),
        ]);
        table.push(vec![cell(&["r1"]), cell(&["a:1", "b:2"])]);

        let rendered = table.render(&Theme::plain());
        let lines = rendered.lines().collect::<Vec<_>>();

        assert_eq!(
            lines,
            vec![
                "| ID | Tags |",
                "-------------",
                "| r1 | a:1  |",
                "|    | b:2  |",
                "-------------",
            ]
        );
    }
}
