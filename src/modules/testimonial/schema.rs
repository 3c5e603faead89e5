use serde_json::Value;
use tracing::warn;

use crate::modules::wire::truthy;

fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Pulls the testimonial records out of any accepted response body.
///
/// Accepted, in order: `{success, data: {testimonials}}`, `{success, data}`,
/// a bare array, `{testimonials}`.
pub fn extract_testimonials(mut body: Value) -> Vec<Value> {
    let success = truthy(body.get("success"));

    if success && truthy(body.get("data").and_then(|d| d.get("testimonials"))) {
        return into_list(body["data"]["testimonials"].take());
    }
    if success && truthy(body.get("data")) {
        return into_list(body["data"].take());
    }
    if body.is_array() {
        return into_list(body);
    }
    if truthy(body.get("testimonials")) {
        return into_list(body["testimonials"].take());
    }

    warn!(%body, "unexpected testimonials response format");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepted_shapes() {
        let nested = json!({ "success": true, "data": { "testimonials": [{ "name": "A" }] } });
        assert_eq!(extract_testimonials(nested).len(), 1);

        let data = json!({ "success": true, "data": [{ "name": "A" }, { "name": "B" }] });
        assert_eq!(extract_testimonials(data).len(), 2);

        let bare = json!([{ "name": "A" }]);
        assert_eq!(extract_testimonials(bare).len(), 1);

        let root = json!({ "testimonials": [{ "name": "A" }, {}, {}] });
        assert_eq!(extract_testimonials(root).len(), 3);
    }

    #[test]
    fn test_unknown_shape_is_empty() {
        assert!(extract_testimonials(json!({ "success": false })).is_empty());
        assert!(extract_testimonials(json!({ "success": true, "data": { "items": [] } })).is_empty());
        assert!(extract_testimonials(json!({ "success": 0, "data": [{ "name": "A" }] })).is_empty());
    }
}
