//! JSON-RPC 2.0 request envelope validation

use serde_json::Value;

/// Keys allowed at the top level of a request object
const ALLOWED_KEYS: [&str; 4] = ["jsonrpc", "method", "params", "id"];

/// Check a single request value against the JSON-RPC 2.0 envelope rules.
///
/// A valid request is an object whose keys are drawn from
/// `jsonrpc`/`method`/`params`/`id`, carries `jsonrpc == "2.0"` and a string
/// `method`, and has structured (array or object) `params` when present.
/// Batches are validated element by element by the caller.
pub fn validate(req: &Value) -> bool {
    let Some(obj) = req.as_object() else {
        return false;
    };

    if obj.keys().any(|key| !ALLOWED_KEYS.contains(&key.as_str())) {
        return false;
    }

    if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return false;
    }

    if !obj.get("method").is_some_and(Value::is_string) {
        return false;
    }

    match obj.get("params") {
        None => true,
        Some(params) => params.is_array() || params.is_object(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_request() {
        assert!(validate(&json!({"jsonrpc": "2.0", "method": "ping", "id": 1})));
        assert!(validate(&json!({"jsonrpc": "2.0", "method": "ping"})));
    }

    #[test]
    fn test_params_shapes() {
        assert!(validate(&json!({"jsonrpc": "2.0", "method": "m", "params": [1, 2]})));
        assert!(validate(&json!({"jsonrpc": "2.0", "method": "m", "params": {"a": 1}})));
        assert!(!validate(&json!({"jsonrpc": "2.0", "method": "m", "params": 3})));
        assert!(!validate(&json!({"jsonrpc": "2.0", "method": "m", "params": "x"})));
        assert!(!validate(&json!({"jsonrpc": "2.0", "method": "m", "params": null})));
    }

    #[test]
    fn test_not_an_object() {
        for value in [json!(null), json!(true), json!(1), json!("req"), json!([])] {
            assert!(!validate(&value), "{value} should be rejected");
        }
    }

    #[test]
    fn test_extra_key_rejected() {
        assert!(!validate(
            &json!({"jsonrpc": "2.0", "method": "ping", "id": 1, "extra": true})
        ));
    }

    #[test]
    fn test_missing_or_mistyped_fields() {
        assert!(!validate(&json!({"method": "ping", "id": 1})));
        assert!(!validate(&json!({"jsonrpc": "2.0", "id": 1})));
        assert!(!validate(&json!({"jsonrpc": "1.0", "method": "ping"})));
        assert!(!validate(&json!({"jsonrpc": 2.0, "method": "ping"})));
        assert!(!validate(&json!({"jsonrpc": "2.0", "method": 5})));
    }

    #[test]
    fn test_id_not_interpreted() {
        for id in [json!(null), json!("abc"), json!(3), json!(1.5)] {
            assert!(validate(&json!({"jsonrpc": "2.0", "method": "m", "id": id})));
        }
    }
}
