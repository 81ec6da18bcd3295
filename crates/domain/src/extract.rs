//! 厂商字段提取工具
//!
//! 所有函数都是全函数：字段缺失或类型不符时返回空值，从不失败。

use serde_json::{Map, Value};

/// 读取字符串字段，数字与布尔值转为文本
pub fn string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(scalar_to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 读取包装日期字段，如 `{"$date": "2020-01-01T00:00:00Z"}`
///
/// 同时接受 `$date` 与 `date` 键，以及直接给出的字符串或数字。
pub fn wrapped_date(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(unwrap_date)
}

fn unwrap_date(value: &Value) -> Option<String> {
    match value {
        Value::Object(inner) => inner
            .get("$date")
            .or_else(|| inner.get("date"))
            .or_else(|| inner.get("$numberLong"))
            .and_then(unwrap_date),
        other => scalar_to_string(other),
    }
}

pub fn boolean(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    match obj.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// 读取任意非空 JSON 字段
pub fn json(obj: &Map<String, Value>, key: &str) -> Option<Value> {
    obj.get(key).filter(|v| !v.is_null()).cloned()
}

/// 读取数组字段，非数组视为空
pub fn list(obj: &Map<String, Value>, key: &str) -> Vec<Value> {
    match obj.get(key) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// 读取字符串列表，对象元素取其 `name` 字段
pub fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    list(obj, key)
        .iter()
        .filter_map(|item| match item {
            Value::Object(inner) => string(inner, "name"),
            other => scalar_to_string(other),
        })
        .collect()
}

/// 以空格连接非空片段，全部为空时返回 `None`
pub fn joined(parts: &[Option<String>]) -> Option<String> {
    let present: Vec<&str> = parts.iter().flatten().map(String::as_str).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_string_accepts_scalars() {
        let obj = object(json!({"a": "x", "b": 42, "c": null, "d": [1]}));
        assert_eq!(string(&obj, "a").as_deref(), Some("x"));
        assert_eq!(string(&obj, "b").as_deref(), Some("42"));
        assert_eq!(string(&obj, "c"), None);
        assert_eq!(string(&obj, "d"), None);
        assert_eq!(string(&obj, "missing"), None);
    }

    #[test]
    fn test_wrapped_date_variants() {
        let obj = object(json!({
            "mongo": {"$date": "2020-01-01T00:00:00.000Z"},
            "plain": {"date": "2021-02-03T00:00:00Z"},
            "long": {"$date": {"$numberLong": "1577836800000"}},
            "bare": "2022-01-01",
            "empty": {}
        }));
        assert_eq!(
            wrapped_date(&obj, "mongo").as_deref(),
            Some("2020-01-01T00:00:00.000Z")
        );
        assert_eq!(
            wrapped_date(&obj, "plain").as_deref(),
            Some("2021-02-03T00:00:00Z")
        );
        assert_eq!(wrapped_date(&obj, "long").as_deref(), Some("1577836800000"));
        assert_eq!(wrapped_date(&obj, "bare").as_deref(), Some("2022-01-01"));
        assert_eq!(wrapped_date(&obj, "empty"), None);
        assert_eq!(wrapped_date(&obj, "missing"), None);
    }

    #[test]
    fn test_string_list_mixed_elements() {
        let obj = object(json!({"tags": ["prod", {"name": "linux"}, {"id": 3}, 7]}));
        assert_eq!(string_list(&obj, "tags"), vec!["prod", "linux", "7"]);
        let obj = object(json!({"tags": "not-a-list"}));
        assert!(string_list(&obj, "tags").is_empty());
    }

    #[test]
    fn test_joined() {
        assert_eq!(
            joined(&[Some("Dell".into()), Some("1.2".into())]).as_deref(),
            Some("Dell 1.2")
        );
        assert_eq!(joined(&[None, Some("1.2".into())]).as_deref(), Some("1.2"));
        assert_eq!(joined(&[None, None]), None);
    }
}
