use serde_json::Value;

use super::{cell, result_of};

/// Projection fields worth printing on their own, best first.
const HEADLINE_FIELDS: [&str; 3] = ["final_balance", "surrender_value", "total_contributions"];

/// One line: a comparison prints its best product and that product's
/// surrender value, a projection its final balance.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);
    println!("{}", headline(result));
}

fn headline(result: &Value) -> String {
    let Value::Object(map) = result else {
        return cell(result);
    };

    if let Some(best) = map
        .get("ranking")
        .and_then(Value::as_array)
        .and_then(|ranking| ranking.first())
    {
        let field = |key: &str| best.get(key).map(cell).unwrap_or_default();
        return format!("{} {}", field("id"), field("surrender_value"));
    }

    if let Some(val) = HEADLINE_FIELDS
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|val| !val.is_null())
    {
        return cell(val);
    }

    map.iter()
        .next()
        .map(|(key, val)| format!("{key}: {}", cell(val)))
        .unwrap_or_default()
}
