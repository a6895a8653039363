//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `bindkit bind` | `render_arguments_table()` |
//! | `bindkit inspect` | `render_parameters_table()` |
//! | `bindkit binders` | `render_binders_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use bindkit_core::{ActionBindingResult, ParameterInfo};

use super::format::{summarize_value, truncate_str};
use super::style::Style;

/// Width reserved for the columns in front of VALUE.
const VALUE_OFFSET: usize = 40;

/// Room left for the VALUE column; 80-column terminals when unknown.
fn value_column_width() -> usize {
    let width = terminal_size::terminal_size().map_or(80, |(w, _)| usize::from(w.0));
    width.saturating_sub(VALUE_OFFSET).max(20)
}

/// Render the arguments of a binding run for `bindkit bind`.
///
/// ```text
/// PARAM    TYPE       SOURCE    VALUE
/// id       int        bound     42
/// page     int        default   1
/// when     ?DateTime  missing   -
/// ```
pub fn render_arguments_table(result: &ActionBindingResult, style: &Style) -> String {
    if result.parameters().is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("PARAM"),
        Cell::new("TYPE"),
        Cell::new("SOURCE"),
        Cell::new("VALUE"),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(8)), // PARAM
        ColumnConstraint::LowerBoundary(Width::Fixed(8)), // TYPE
        ColumnConstraint::LowerBoundary(Width::Fixed(8)), // SOURCE
    ]);

    let value_width = value_column_width();
    for info in result.parameters() {
        let Some(argument) = result.argument(&info.name) else {
            continue;
        };
        let value = argument
            .value()
            .map(summarize_value)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&info.name),
            Cell::new(info.declared_type.as_deref().unwrap_or("mixed")),
            Cell::new(style.source(argument.source())),
            Cell::new(truncate_str(&value, value_width)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render parameter descriptors for `bindkit inspect`.
///
/// ```text
/// PARAM    TYPE       NULL   ARRAY   DEFAULT
/// id       int        no     no      -
/// tags     array      yes    yes     null
/// ```
pub fn render_parameters_table(parameters: &[ParameterInfo]) -> String {
    if parameters.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("PARAM"),
        Cell::new("TYPE"),
        Cell::new("NULL"),
        Cell::new("ARRAY"),
        Cell::new("DEFAULT"),
    ]);

    for info in parameters {
        let default = info
            .default_value
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        table.add_row(vec![
            Cell::new(&info.name),
            Cell::new(info.declared_type.as_deref().unwrap_or("mixed")),
            Cell::new(yes_no(info.allows_null)),
            Cell::new(yes_no(info.is_array)),
            Cell::new(truncate_str(&default, 30)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render the effective binder chain for `bindkit binders`.
///
/// ```text
///   #   BINDER
///   1   builtin
///   2   active_record
/// ```
pub fn render_binders_table(keys: &[&str]) -> String {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("BINDER"),
    ]);

    for (position, key) in keys.iter().enumerate() {
        table.add_row(vec![
            Cell::new(position + 1).set_alignment(CellAlignment::Right),
            Cell::new(key),
        ]);
    }

    table.trim_fmt().to_string()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
