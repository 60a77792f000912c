use serde_json::Value;
use std::io;

use super::{cell, result_of, tabulate, ResultParts};

/// CSV on stdout. A projection writes its most detailed breakdown, one
/// line per month or year; a result without rows becomes field,value pairs.
pub fn print_csv(value: &Value) {
    let mut wtr = csv::Writer::from_writer(io::stdout().lock());
    if let Err(e) = write_csv(&mut wtr, value) {
        eprintln!("CSV output error: {}", e);
    }
}

fn write_csv<W: io::Write>(wtr: &mut csv::Writer<W>, value: &Value) -> csv::Result<()> {
    match result_of(value) {
        Value::Object(result) => {
            let parts = ResultParts::split(result);
            match parts.primary_rows() {
                Some(rows) => write_rows(wtr, rows)?,
                None => {
                    wtr.write_record(["field", "value"])?;
                    for (key, val) in &parts.fields {
                        wtr.write_record([key.to_string(), cell(val)])?;
                    }
                }
            }
        }
        Value::Array(rows) => write_rows(wtr, rows)?,
        other => wtr.write_record([cell(other)])?,
    }
    wtr.flush()?;
    Ok(())
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let (headers, body) = tabulate(rows);
    if !headers.is_empty() {
        wtr.write_record(&headers)?;
    }
    for row in &body {
        wtr.write_record(row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_breakdown_rows_become_csv_lines() {
        let value = json!({
            "result": {
                "final_balance": "240000",
                "yearly_breakdown": [
                    {"year": 1, "end_balance": "120000"},
                    {"year": 2, "end_balance": "240000"}
                ]
            }
        });
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_csv(&mut wtr, &value).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("240000"));
    }

    #[test]
    fn test_plain_result_becomes_field_value_pairs() {
        let value = json!({"result": {"version": "0.1.0"}});
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_csv(&mut wtr, &value).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(text, "field,value\nversion,0.1.0\n");
    }
}
