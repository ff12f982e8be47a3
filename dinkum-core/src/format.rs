//! JSON writer matching the layout of the ES3 engine serializer
//!
//! ES3 writes JSON with CRLF line endings, tab indentation, `"key" : value`
//! pairs, primitive arrays on a single line and object arrays glued
//! together as `},{`. The game's loader accepts what it wrote itself, so
//! re-encrypted saves go through this writer instead of a generic pretty
//! printer. Untouched fields come out byte-identical to the original.

use serde_json::{Map, Number, Value};

const CRLF: &str = "\r\n";

/// Serialize a value tree in ES3 layout
pub fn serialize(value: &Value) -> String {
    let mut output = String::new();
    write_value(value, &mut output, 0);
    output
}

fn write_tabs(output: &mut String, depth: usize) {
    for _ in 0..depth {
        output.push('\t');
    }
}

fn write_value(value: &Value, output: &mut String, depth: usize) {
    match value {
        Value::Null => output.push_str("null"),
        Value::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, output),
        Value::String(s) => write_string(s, output),
        Value::Array(arr) => write_array(arr, output, depth),
        Value::Object(map) => write_object(map, output, depth),
    }
}

fn write_array(arr: &[Value], output: &mut String, depth: usize) {
    output.push('[');
    output.push_str(CRLF);
    write_tabs(output, depth + 1);

    // Empty arrays keep a blank indented line. Primitive and object arrays
    // share one line: the element writer decides whether it spans several.
    // A heterogeneous array follows its first element.
    for (i, item) in arr.iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        write_value(item, output, depth + 1);
    }

    output.push_str(CRLF);
    write_tabs(output, depth);
    output.push(']');
}

fn write_object(map: &Map<String, Value>, output: &mut String, depth: usize) {
    output.push('{');
    output.push_str(CRLF);

    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            output.push(',');
            output.push_str(CRLF);
        }
        write_tabs(output, depth + 1);
        write_string(key, output);
        output.push_str(" : ");
        write_value(value, output, depth + 1);
    }

    if !map.is_empty() {
        output.push_str(CRLF);
    }
    write_tabs(output, depth);
    output.push('}');
}

/// Numbers print the way JavaScript's `Number#toString` does: integers
/// without a fraction, floats in their shortest round-trip form, exponent
/// notation outside `[1e-6, 1e21)`.
fn write_number(n: &Number, output: &mut String) {
    output.push_str(&number_text(n));
}

pub(crate) fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(format_float).unwrap_or_default()
    }
}

pub(crate) fn format_float(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }

    let abs = f.abs();
    if (1e-6..1e21).contains(&abs) {
        // Display gives the shortest round-trip digits without an exponent
        return f.to_string();
    }

    let exp = format!("{:e}", f);
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
        _ => exp,
    }
}

/// Quotes a string with the escapes `JSON.stringify` uses
fn write_string(s: &str, output: &mut String) {
    output.push('"');
    for ch in s.chars() {
        match ch {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            '\u{08}' => output.push_str("\\b"),
            '\u{0c}' => output.push_str("\\f"),
            c if (c as u32) < 0x20 => output.push_str(&format!("\\u{:04x}", c as u32)),
            c => output.push(c),
        }
    }
    output.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_array() {
        assert_eq!(serialize(&json!([])), "[\r\n\t\r\n]");
    }

    #[test]
    fn test_primitive_array() {
        assert_eq!(serialize(&json!([1, 2, 3])), "[\r\n\t1,2,3\r\n]");
        assert_eq!(
            serialize(&json!(["a", true, null])),
            "[\r\n\t\"a\",true,null\r\n]"
        );
    }

    #[test]
    fn test_single_key_object() {
        assert_eq!(serialize(&json!({"a": 1})), "{\r\n\t\"a\" : 1\r\n}");
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(serialize(&json!({})), "{\r\n}");
        assert_eq!(
            serialize(&json!({"value": {}})),
            "{\r\n\t\"value\" : {\r\n\t}\r\n}"
        );
    }

    #[test]
    fn test_object_array_is_glued() {
        let out = serialize(&json!([{"a": 1}, {"b": 2}]));
        assert_eq!(out, "[\r\n\t{\r\n\t\t\"a\" : 1\r\n\t},{\r\n\t\t\"b\" : 2\r\n\t}\r\n]");
        assert!(out.contains("},{"));
    }

    #[test]
    fn test_nested_layout() {
        let value = json!({
            "playerInfo": {
                "value": {
                    "money": 100,
                    "slots": [1, -1],
                    "empty": []
                }
            },
            "name": "x"
        });

        let expected = concat!(
            "{\r\n",
            "\t\"playerInfo\" : {\r\n",
            "\t\t\"value\" : {\r\n",
            "\t\t\t\"money\" : 100,\r\n",
            "\t\t\t\"slots\" : [\r\n",
            "\t\t\t\t1,-1\r\n",
            "\t\t\t],\r\n",
            "\t\t\t\"empty\" : [\r\n",
            "\t\t\t\t\r\n",
            "\t\t\t]\r\n",
            "\t\t}\r\n",
            "\t},\r\n",
            "\t\"name\" : \"x\"\r\n",
            "}"
        );
        assert_eq!(serialize(&value), expected);
    }

    #[test]
    fn test_key_order_preserved() {
        let value: Value = serde_json::from_str(r#"{"zeta":1,"alpha":2,"mid":3}"#).unwrap();
        let out = serialize(&value);

        let zeta = out.find("zeta").unwrap();
        let alpha = out.find("alpha").unwrap();
        let mid = out.find("mid").unwrap();
        assert!(zeta < alpha && alpha < mid);
    }

    #[test]
    fn test_heterogeneous_array_follows_first_element() {
        assert_eq!(
            serialize(&json!([1, {"a": 2}])),
            "[\r\n\t1,{\r\n\t\t\"a\" : 2\r\n\t}\r\n]"
        );
        assert_eq!(
            serialize(&json!([{"a": 1}, null])),
            "[\r\n\t{\r\n\t\t\"a\" : 1\r\n\t},null\r\n]"
        );
    }

    #[test]
    fn test_no_bare_lf() {
        let out = serialize(&json!({"a": [{"b": []}], "c": {}}));
        for (i, b) in out.bytes().enumerate() {
            if b == b'\n' {
                assert_eq!(out.as_bytes()[i - 1], b'\r');
            }
        }
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            serialize(&json!("a\"b\\c\nd\te\u{01}")),
            "\"a\\\"b\\\\c\\nd\\te\\u0001\""
        );
        // non-ASCII stays as is
        assert_eq!(serialize(&json!("Zoë")), "\"Zoë\"");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(serialize(&json!(-1)), "-1");
        assert_eq!(serialize(&json!(u64::MAX)), "18446744073709551615");
        assert_eq!(serialize(&json!(50.5)), "50.5");
        assert_eq!(serialize(&json!(0.1)), "0.1");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1");
        assert_eq!(format_float(-0.0), "0");
        assert_eq!(format_float(100.25), "100.25");
        assert_eq!(format_float(1e21), "1e+21");
        assert_eq!(format_float(1.5e-7), "1.5e-7");
        assert_eq!(format_float(0.000001), "0.000001");
    }

    #[test]
    fn test_deterministic() {
        let value = json!({"a": [{"b": 1.5}], "c": "d"});
        assert_eq!(serialize(&value), serialize(&value.clone()));
    }
}
