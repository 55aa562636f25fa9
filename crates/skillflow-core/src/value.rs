//! Open, string-keyed maps of JSON values used at every skill boundary.

pub use serde_json::Value;

/// String-keyed map of tagged-union values.
///
/// Skills narrow the entries they need; the core assumes no schema.
pub type ValueMap = serde_json::Map<String, Value>;

/// Copies every entry of `src` into `dst`, replacing existing keys.
pub fn merge_into(dst: &mut ValueMap, src: &ValueMap) {
    for (key, value) in src {
        dst.insert(key.clone(), value.clone());
    }
}

/// Returns `base` with `overlay` applied on top.
pub fn overlay(base: &ValueMap, overlay: &ValueMap) -> ValueMap {
    let mut merged = base.clone();
    merge_into(&mut merged, overlay);
    merged
}
