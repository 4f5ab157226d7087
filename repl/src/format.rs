//! Output formatting utilities for the console.

use sqlbook_core::{ColumnDescriptor, Row};

/// Text shown for a null cell.
const NULL_TEXT: &str = "NULL";

/// Render a page of rows as a text table.
///
/// The header holds the column names, then their `[type]` annotations,
/// then a rule of `=`. Every column is padded to its widest entry.
pub fn render_table(columns: &[ColumnDescriptor], rows: &[Row]) -> String {
    let types: Vec<String> = columns
        .iter()
        .map(|c| format!("[{}]", c.type_name))
        .collect();
    let cells: Vec<Vec<&str>> = rows
        .iter()
        .map(|row| {
            row.cells()
                .map(|(_, cell)| cell.unwrap_or(NULL_TEXT))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let widest_cell = cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            column
                .name
                .chars()
                .count()
                .max(types[i].chars().count())
                .max(widest_cell)
        })
        .collect();

    let mut out = String::new();
    push_line(&mut out, columns.iter().map(|c| c.name.as_str()), &widths);
    push_line(&mut out, types.iter().map(String::as_str), &widths);
    let rules: Vec<String> = widths.iter().map(|w| "=".repeat(*w)).collect();
    push_line(&mut out, rules.iter().map(String::as_str), &widths);
    for row in &cells {
        push_line(&mut out, row.iter().copied(), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, items: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = items
        .zip(widths)
        .map(|(item, width)| format!("{:<width$}", item, width = *width))
        .collect();
    out.push_str(line.join(" ").trim_end());
    out.push('\n');
}

/// Help text for the console.
pub fn help_text() -> String {
    [
        "SQLBook Commands:",
        "  \\dt              List tables",
        "  \\dv              List views",
        "  \\d <name>        Describe columns of [catalog.][schema.]table",
        "  help, \\h         Show this help",
        "  quit, \\q         Exit",
        "",
        "Statements end with ';' and may span several lines.",
        "Long results are shown one page at a time.",
    ]
    .join("\n")
}
