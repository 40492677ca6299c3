//! Tana Paste rendering of a table.

use crate::table::{Cell, Table};
use std::fmt::Write as _;

pub const PASTE_HEADER: &str = "%%tana%%\n\n";

/// `#Tag`, or `#[[Tag Name]]` when the name contains whitespace.
pub fn tag_reference(name: &str) -> String {
    if name.chars().any(char::is_whitespace) {
        format!("#[[{}]]", name)
    } else {
        format!("#{}", name)
    }
}

/// Splits `value` on `delimiter` when the delimiter is non-empty and present.
/// Pieces are trimmed; empty pieces are kept.
pub fn split_value<'a>(value: &'a str, delimiter: Option<&str>) -> Option<Vec<&'a str>> {
    let d = delimiter.filter(|d| !d.is_empty() && value.contains(*d))?;
    Some(value.split(d).map(str::trim).collect())
}

pub fn format_table(table: &Table, delimiter: Option<&str>) -> String {
    let mut out = String::new();
    let tag = tag_reference(table.tag_column());

    for row in table.rows() {
        let name = row[0].as_text().unwrap_or("");
        let _ = writeln!(out, "- {} {}", name, tag);

        for (idx, column) in table.field_columns() {
            let value = match &row[idx] {
                Cell::Absent => "",
                Cell::Text(s) => s.as_str(),
            };
            match split_value(value, delimiter) {
                Some(items) => {
                    let _ = writeln!(out, "  - {}::", column);
                    for item in items {
                        let _ = writeln!(out, "    - {}", item);
                    }
                }
                None => {
                    let _ = writeln!(out, "  - {}:: {}", column, value);
                }
            }
        }
        out.push('\n');
    }
    out
}
