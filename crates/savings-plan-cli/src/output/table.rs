use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{cell, result_of, tabulate, ResultParts};

/// Scalar result fields as a Field/Value table, then one table per
/// breakdown, then the envelope's warnings and methodology.
pub fn print_table(value: &Value) {
    match result_of(value) {
        Value::Object(result) => {
            let parts = ResultParts::split(result);
            let mut builder = Builder::default();
            builder.push_record(["Field".to_string(), "Value".to_string()]);
            for (key, val) in &parts.fields {
                builder.push_record([key.to_string(), cell(val)]);
            }
            println!("{}", Table::from(builder));

            for (name, rows) in &parts.row_sets {
                println!("\n{name}:");
                print_rows(rows);
            }
        }
        Value::Array(rows) => print_rows(rows),
        other => println!("{}", cell(other)),
    }
    print_notes(value);
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(no rows)");
        return;
    }
    let (headers, body) = tabulate(rows);
    let mut builder = Builder::default();
    if !headers.is_empty() {
        builder.push_record(headers);
    }
    for row in body {
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

fn print_notes(value: &Value) {
    let warnings: Vec<&str> = value
        .get("warnings")
        .and_then(Value::as_array)
        .map(|w| w.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }
    if let Some(methodology) = value.get("methodology").and_then(Value::as_str) {
        println!("\nMethodology: {methodology}");
    }
}
