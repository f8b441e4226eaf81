//! Dotted-path access into document trees.
//!
//! Paths are dot-separated segments; a numeric segment indexes into an
//! array. Writes create missing intermediate containers, choosing an array
//! when the next segment is numeric and a map otherwise. Array writes accept
//! in-bounds indices (replace) and the one-past-the-end index (append);
//! anything beyond that, or a write through an existing scalar, is an
//! invalid path.

use crate::{Error, Map, Result, Value};

/// Look up a value by dotted path. Returns `None` when any segment is
/// missing or traverses a scalar.
pub fn get<'a>(doc: &'a Map, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Map(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write a value at a dotted path, creating intermediate containers as
/// needed.
pub fn set(doc: &mut Map, path: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(Error::InvalidPath(path.to_string()));
    }
    set_in_map(doc, &segments, value, path)
}

fn set_in_map(map: &mut Map, segments: &[&str], value: Value, full: &str) -> Result<()> {
    let Some((first, rest)) = segments.split_first() else {
        return Err(Error::InvalidPath(full.to_string()));
    };

    if rest.is_empty() {
        map.insert(first.to_string(), value);
        return Ok(());
    }

    let node = map
        .entry(first.to_string())
        .or_insert_with(|| empty_container(rest[0]));
    set_in_value(node, rest, value, full)
}

fn set_in_value(node: &mut Value, segments: &[&str], value: Value, full: &str) -> Result<()> {
    let Some((first, rest)) = segments.split_first() else {
        return Err(Error::InvalidPath(full.to_string()));
    };

    match node {
        Value::Map(map) => set_in_map(map, segments, value, full),
        Value::Array(items) => {
            let index = first
                .parse::<usize>()
                .map_err(|_| Error::InvalidPath(full.to_string()))?;
            if index > items.len() {
                return Err(Error::InvalidPath(full.to_string()));
            }

            if rest.is_empty() {
                if index == items.len() {
                    items.push(value);
                } else {
                    items[index] = value;
                }
                return Ok(());
            }

            if index == items.len() {
                items.push(empty_container(rest[0]));
            }
            set_in_value(&mut items[index], rest, value, full)
        }
        _ => Err(Error::InvalidPath(full.to_string())),
    }
}

fn empty_container(next_segment: &str) -> Value {
    if next_segment.parse::<usize>().is_ok() {
        Value::Array(Vec::new())
    } else {
        Value::Map(Map::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(json: serde_json::Value) -> Map {
        match Value::from_json(json) {
            Value::Map(map) => map,
            _ => panic!("not a map"),
        }
    }

    #[test]
    fn get_traverses_maps_and_arrays() {
        let d = doc(json!({
            "name": "foo",
            "home": {"street": "main"},
            "addresses": [{"street": "first"}, {"street": "second"}]
        }));

        assert_eq!(get(&d, "name"), Some(&Value::from("foo")));
        assert_eq!(get(&d, "home.street"), Some(&Value::from("main")));
        assert_eq!(get(&d, "addresses.1.street"), Some(&Value::from("second")));

        assert_eq!(get(&d, "nope"), None);
        assert_eq!(get(&d, "home.nope"), None);
        assert_eq!(get(&d, "addresses.2.street"), None);
        assert_eq!(get(&d, "addresses.x.street"), None);
        assert_eq!(get(&d, "name.deeper"), None);
    }

    #[test]
    fn set_top_level_and_nested() {
        let mut d = Map::new();
        set(&mut d, "name", Value::from("foo")).unwrap();
        set(&mut d, "home.street", Value::from("main")).unwrap();

        assert_eq!(get(&d, "name"), Some(&Value::from("foo")));
        assert_eq!(get(&d, "home.street"), Some(&Value::from("main")));
    }

    #[test]
    fn set_creates_array_for_numeric_segment() {
        let mut d = Map::new();
        set(&mut d, "addresses.0.street", Value::from("first")).unwrap();
        set(&mut d, "addresses.1.street", Value::from("second")).unwrap();
        set(&mut d, "addresses.0.street", Value::from("updated")).unwrap();

        assert_eq!(get(&d, "addresses.0.street"), Some(&Value::from("updated")));
        assert_eq!(get(&d, "addresses.1.street"), Some(&Value::from("second")));
        assert_eq!(
            d.get("addresses").and_then(Value::as_array).map(Vec::len),
            Some(2)
        );
    }

    #[test]
    fn set_rejects_index_past_append_position() {
        let mut d = doc(json!({"tags": ["a"]}));
        assert_eq!(
            set(&mut d, "tags.5", Value::from("z")),
            Err(Error::InvalidPath("tags.5".into()))
        );

        // replace and append are fine
        set(&mut d, "tags.0", Value::from("x")).unwrap();
        set(&mut d, "tags.1", Value::from("y")).unwrap();
        assert_eq!(get(&d, "tags.1"), Some(&Value::from("y")));
    }

    #[test]
    fn set_rejects_non_numeric_array_segment() {
        let mut d = doc(json!({"tags": ["a"]}));
        assert_eq!(
            set(&mut d, "tags.first", Value::from("x")),
            Err(Error::InvalidPath("tags.first".into()))
        );
    }

    #[test]
    fn set_rejects_empty_segments() {
        let mut d = Map::new();
        assert!(set(&mut d, "", Value::Null).is_err());
        assert!(set(&mut d, "a..b", Value::Null).is_err());
    }

    #[test]
    fn set_rejects_write_through_scalar() {
        let mut d = doc(json!({"home": "main"}));
        assert_eq!(
            set(&mut d, "home.street", Value::from("elm")),
            Err(Error::InvalidPath("home.street".into()))
        );
        // the scalar survives
        assert_eq!(get(&d, "home"), Some(&Value::from("main")));
    }
}
