use serde_json::{json, Value};

const FILE_CATEGORIES: [&str; 3] = ["commands", "rules", "tools"];

/// Normalize a raw state document into the current schema.
///
/// Older versions recorded managed files as bare path strings. Those become
/// `{ "path": .., "hash": "" }`, the "unknown baseline" form. Duplicate project
/// paths are collapsed, keeping the first occurrence. Anything already in the
/// current shape passes through untouched.
pub fn normalize_state(mut raw: Value) -> Value {
    let Some(extensions) = raw
        .get_mut("installedExtensions")
        .and_then(Value::as_array_mut)
    else {
        return raw;
    };

    for record in extensions.iter_mut() {
        if let Some(paths) = record.get_mut("projectPaths").and_then(Value::as_array_mut) {
            dedupe_in_place(paths);
        }

        let Some(managed) = record.get_mut("managed").and_then(Value::as_object_mut) else {
            continue;
        };
        for project_state in managed.values_mut() {
            for category in FILE_CATEGORIES {
                if let Some(entries) = project_state
                    .get_mut(category)
                    .and_then(Value::as_array_mut)
                {
                    for entry in entries.iter_mut() {
                        if let Value::String(path) = entry {
                            *entry = json!({ "path": path.clone(), "hash": "" });
                        }
                    }
                }
            }
        }
    }
    raw
}

fn dedupe_in_place(values: &mut Vec<Value>) {
    let mut seen: Vec<Value> = Vec::with_capacity(values.len());
    values.retain(|v| {
        if seen.contains(v) {
            false
        } else {
            seen.push(v.clone());
            true
        }
    });
}
