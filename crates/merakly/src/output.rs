//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Fixed-shape rows
//! use the `Tabled` derive; the event grid builds its columns at runtime.
//! Structured formats always serialize the original data.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, builder::Builder, settings::Style};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Print a status line to stderr, respecting quiet mode.
pub fn print_status(message: &str, color: &ColorMode, quiet: bool) {
    if quiet {
        return;
    }
    if should_color(color) {
        eprintln!("{}", message.bold().green());
    } else {
        eprintln!("{message}");
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: builds a pretty table from the `Tabled` row type
/// - `json` / `json-compact` / `yaml`: serializes the original data
/// - `plain`: calls `id_fn` on each item, one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Plain => data.iter().map(id_fn).collect::<Vec<_>>().join("\n"),
        structured => render_structured(structured, data),
    }
}

/// Render a list whose columns are only known at runtime.
///
/// `cells` must yield one entry per header, in header order.
pub fn render_grid<T, I>(
    format: &OutputFormat,
    data: &[T],
    headers: &[String],
    cells: impl Fn(&T) -> I,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    I: IntoIterator<Item = String>,
{
    match format {
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(headers.iter().cloned());
            for item in data {
                builder.push_record(cells(item));
            }
            let mut table = builder.build();
            table.with(Style::rounded());
            table.to_string()
        }
        OutputFormat::Plain => data.iter().map(id_fn).collect::<Vec<_>>().join("\n"),
        structured => render_structured(structured, data),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, which returns a pre-formatted
/// `Label: value` block.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Plain => id_fn(data),
        structured => render_structured(structured, data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Left-aligned `Label: value` lines for detail views.
pub fn detail_lines<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let pairs: Vec<(&str, String)> = pairs.into_iter().collect();
    let width = pairs.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 1;
    pairs
        .iter()
        .map(|(label, value)| format!("{:<width$} {value}", format!("{label}:")))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_structured<T: serde::Serialize + ?Sized>(format: &OutputFormat, data: &T) -> String {
    match format {
        OutputFormat::JsonCompact => render_json_compact(data),
        OutputFormat::Yaml => render_yaml(data),
        _ => render_json_pretty(data),
    }
}

fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).expect("serialization should not fail")
}

fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).expect("serialization should not fail")
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        id: &'static str,
        size: u32,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "ID")]
        id: String,
    }

    const ITEMS: [Item; 2] = [Item { id: "a", size: 1 }, Item { id: "b", size: 2 }];

    #[test]
    fn plain_emits_one_identifier_per_line() {
        let out = render_list(
            &OutputFormat::Plain,
            &ITEMS,
            |i| ItemRow { id: i.id.into() },
            |i| i.id.to_owned(),
        );
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn compact_json_serializes_original_data() {
        let out = render_list(
            &OutputFormat::JsonCompact,
            &ITEMS,
            |i| ItemRow { id: i.id.into() },
            |i| i.id.to_owned(),
        );
        assert_eq!(out, r#"[{"id":"a","size":1},{"id":"b","size":2}]"#);
    }

    #[test]
    fn grid_table_has_runtime_headers() {
        let headers = vec!["Key".to_owned(), "Size ▲".to_owned()];
        let out = render_grid(
            &OutputFormat::Table,
            &ITEMS,
            &headers,
            |i| [i.id.to_owned(), i.size.to_string()],
            |i| i.id.to_owned(),
        );
        assert!(out.contains("Size ▲"));
        assert!(out.contains('╭'));
        assert_eq!(out.lines().filter(|l| l.contains("│ a")).count(), 1);
    }

    #[test]
    fn detail_lines_align_values() {
        let out = detail_lines([("ID", "a".to_owned()), ("Name", "Lab".to_owned())]);
        assert_eq!(out, "ID:   a\nName: Lab");
    }
}
