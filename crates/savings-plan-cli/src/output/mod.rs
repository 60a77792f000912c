//! Renderers for `--output`. Every command hands over the JSON form of a
//! `ComputationOutput` envelope; projections and comparisons carry their
//! breakdown rows as arrays of objects inside `result`.

pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use serde_json::{Map, Value};

use crate::OutputFormat;

/// Row arrays in the order a single-table format prefers them.
pub(crate) const ROW_SETS: [&str; 3] = ["monthly_breakdown", "yearly_breakdown", "ranking"];

pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` of an envelope, or the value itself when it is bare.
pub(crate) fn result_of(value: &Value) -> &Value {
    value.get("result").unwrap_or(value)
}

/// Scalar fields of a result, and its named arrays of row objects.
pub(crate) struct ResultParts<'a> {
    pub fields: Vec<(&'a str, &'a Value)>,
    pub row_sets: Vec<(&'a str, &'a [Value])>,
}

impl<'a> ResultParts<'a> {
    pub fn split(result: &'a Map<String, Value>) -> Self {
        let mut parts = ResultParts {
            fields: Vec::new(),
            row_sets: Vec::new(),
        };
        for (key, val) in result {
            match val {
                Value::Array(rows) if rows.first().is_some_and(Value::is_object) => {
                    parts.row_sets.push((key.as_str(), rows.as_slice()))
                }
                _ => parts.fields.push((key.as_str(), val)),
            }
        }
        parts
    }

    /// The most detailed breakdown present.
    pub fn primary_rows(&self) -> Option<&'a [Value]> {
        ROW_SETS.iter().find_map(|wanted| {
            self.row_sets
                .iter()
                .find(|(name, _)| name == wanted)
                .map(|(_, rows)| *rows)
        })
    }
}

/// Header row plus data rows, keyed by the fields of the first row.
pub(crate) fn tabulate(rows: &[Value]) -> (Vec<String>, Vec<Vec<String>>) {
    let Some(Value::Object(first)) = rows.first() else {
        return (Vec::new(), rows.iter().map(|v| vec![cell(v)]).collect());
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let body = rows
        .iter()
        .filter_map(Value::as_object)
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(h).map(cell).unwrap_or_default())
                .collect()
        })
        .collect();
    (headers, body)
}

/// Text of one cell. Decimal amounts arrive as strings and pass through
/// untouched; `null` (an unset optional) is blank.
pub(crate) fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}
