//! Result rendering.
//!
//! Formats a [`ResultSet`] as a bordered table with auto-sized columns and
//! colored rows, or as CSV.

use std::io::Write;

use crossterm::style::{Color, Stylize};
use tracing::warn;

use crate::engine::ResultSet;
use crate::error::{AthqError, Result};

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 60;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Text shown for cells the engine returned no value for.
const NULL_DISPLAY: &str = "NULL";

/// Renders a result set as a table.
pub struct ResultTable<'a> {
    title: &'a str,
    results: &'a ResultSet,
    colors: Vec<Color>,
}

impl<'a> ResultTable<'a> {
    /// Creates a new uncolored table.
    pub fn new(title: &'a str, results: &'a ResultSet) -> Self {
        Self {
            title,
            results,
            colors: Vec::new(),
        }
    }

    /// Cycles the given colors across data rows. Unknown names are skipped.
    pub fn with_colors<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.colors = names.iter().filter_map(|n| parse_color(n.as_ref())).collect();
        self
    }

    /// Calculates the width of each column.
    fn calculate_column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .results
            .column_labels
            .iter()
            .map(|label| display_width(label).max(MIN_COLUMN_WIDTH))
            .collect();

        for row in &self.results.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(display_width(cell_text(cell)));
                }
            }
        }

        widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
    }

    /// Truncates a string to fit within the given width, adding ellipsis if needed.
    fn truncate(s: &str, max_width: usize) -> String {
        if display_width(s) <= max_width {
            s.to_string()
        } else if max_width <= 3 {
            s.chars().take(max_width).collect()
        } else {
            let mut out: String = s.chars().take(max_width - 3).collect();
            out.push_str("...");
            out
        }
    }

    /// Renders the table to plain lines, without colors.
    pub fn render_to_lines(&self) -> Vec<String> {
        let mut lines = vec![self.title.to_string()];

        if self.results.column_labels.is_empty() {
            lines.push("(empty result)".to_string());
            return lines;
        }

        let widths = self.calculate_column_widths();

        lines.push(Self::render_border(&widths, '┌', '┬', '┐'));
        lines.push(Self::render_row(
            self.results.column_labels.iter().map(String::as_str),
            &widths,
        ));
        lines.push(Self::render_border(&widths, '├', '┼', '┤'));
        for row in &self.results.rows {
            lines.push(Self::render_row(row.iter().map(cell_text), &widths));
        }
        lines.push(Self::render_border(&widths, '└', '┴', '┘'));

        let count = self.results.row_count();
        lines.push(format!(
            "{} row{} returned",
            count,
            if count == 1 { "" } else { "s" }
        ));

        lines
    }

    /// Writes the table, coloring data rows when colors are set.
    pub fn write_to(&self, out: &mut impl Write) -> Result<()> {
        let lines = self.render_to_lines();
        // Title, top border, header and separator precede the data rows.
        let first_row = 4;
        let row_count = self.results.row_count();

        for (i, line) in lines.into_iter().enumerate() {
            let row_index = i.checked_sub(first_row).filter(|&r| r < row_count);
            let written = match (row_index, self.colors.is_empty()) {
                (Some(r), false) => {
                    let color = self.colors[r % self.colors.len()];
                    writeln!(out, "{}", line.with(color))
                }
                _ => writeln!(out, "{}", line),
            };
            written.map_err(write_error)?;
        }
        Ok(())
    }

    fn render_border(widths: &[usize], left: char, mid: char, right: char) -> String {
        let mut border = String::new();
        border.push(left);
        for (i, &width) in widths.iter().enumerate() {
            border.push_str(&"─".repeat(width + 2));
            if i < widths.len() - 1 {
                border.push(mid);
            }
        }
        border.push(right);
        border
    }

    fn render_row<'c>(cells: impl Iterator<Item = &'c str>, widths: &[usize]) -> String {
        let mut cells = cells;
        let mut line = String::from("│");
        for &width in widths {
            let text = Self::truncate(cells.next().unwrap_or(""), width);
            let padding = width.saturating_sub(display_width(&text));
            line.push(' ');
            line.push_str(&text);
            line.push_str(&" ".repeat(padding + 1));
            line.push('│');
        }
        line
    }
}

fn cell_text(cell: &Option<String>) -> &str {
    cell.as_deref().unwrap_or(NULL_DISPLAY)
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}

fn write_error(e: std::io::Error) -> AthqError {
    AthqError::internal(format!("Failed to write output: {}", e))
}

/// Maps a configured color name to a terminal color.
pub fn parse_color(name: &str) -> Option<Color> {
    match Color::try_from(name.trim().to_lowercase().as_str()) {
        Ok(color) => Some(color),
        Err(_) => {
            warn!("Unknown color '{}', ignoring", name);
            None
        }
    }
}

/// Writes a result set as CSV (RFC 4180). Missing cells are empty.
pub fn write_csv(out: &mut impl Write, results: &ResultSet) -> Result<()> {
    let header: Vec<String> = results.column_labels.iter().map(|l| csv_field(l)).collect();
    writeln!(out, "{}", header.join(",")).map_err(write_error)?;

    for row in &results.rows {
        let fields: Vec<String> = row
            .iter()
            .map(|cell| csv_field(cell.as_deref().unwrap_or("")))
            .collect();
        writeln!(out, "{}", fields.join(",")).map_err(write_error)?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
