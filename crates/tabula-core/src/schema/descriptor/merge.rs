use serde_json::Value;

/// Merges `local` onto `base`. Objects merge per key; arrays of objects
/// that carry a `"name"` merge element-wise by case-insensitive name, new
/// names are appended; any other value is replaced by the local one.
pub fn merge(base: &mut Value, local: Value) {
    match (base, local) {
        (Value::Object(base), Value::Object(local)) => {
            for (key, value) in local {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(local)) if is_named_list(base) && is_named_list(&local) => {
            for item in local {
                let position = name_of(&item).and_then(|name| {
                    base.iter()
                        .position(|existing| name_of(existing).is_some_and(|n| n.eq_ignore_ascii_case(name)))
                });
                match position {
                    Some(index) => merge(&mut base[index], item),
                    None => base.push(item),
                }
            }
        }
        (base, local) => *base = local,
    }
}

fn is_named_list(list: &[Value]) -> bool {
    list.iter().all(|item| name_of(item).is_some())
}

fn name_of(item: &Value) -> Option<&str> {
    item.as_object()?.get("name")?.as_str()
}
