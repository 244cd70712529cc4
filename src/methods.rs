//! Methods exposed by the `minirpc` binary
//!
//! - `ping` - `{"message": "OK", "params": <params>}`
//! - `echo` - the request envelope itself
//! - `build_info` - package name and version
//! - `unimplemented` - always fails with "Not Implemented"

use serde_json::{json, Value};

use crate::rpc::{
    serve_build_info, serve_unimplemented, DispatchResult, MethodTable, RpcError, RpcRequest,
};

/// Dispatcher with every built-in method registered
pub fn default_methods() -> MethodTable {
    MethodTable::new()
        .register("ping", serve_ping)
        .register("echo", serve_echo)
        .register("build_info", serve_build_info)
        .register("unimplemented", serve_unimplemented)
}

fn serve_ping(req: &RpcRequest) -> DispatchResult {
    Ok(json!({
        "message": "OK",
        "params": req.params_or_null(),
    }))
}

fn serve_echo(req: &RpcRequest) -> DispatchResult {
    serde_json::to_value(req).map_err(|e| RpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::jsonrpc::{INTERNAL_ERROR, METHOD_NOT_FOUND};
    use crate::rpc::MethodDispatcher;

    #[test]
    fn test_ping_echoes_params() {
        let methods = default_methods();
        let req = RpcRequest::new("ping", Some(json!({"x": 1})), json!(1));
        assert_eq!(
            methods.serve(&req).unwrap(),
            json!({"message": "OK", "params": {"x": 1}})
        );
    }

    #[test]
    fn test_echo_returns_envelope() {
        let methods = default_methods();
        let req = RpcRequest::new("echo", Some(json!([true])), json!("id-1"));
        assert_eq!(
            methods.serve(&req).unwrap(),
            json!({"jsonrpc": "2.0", "method": "echo", "params": [true], "id": "id-1"})
        );
    }

    #[test]
    fn test_fallbacks() {
        let methods = default_methods();
        let unimplemented = RpcRequest::new("unimplemented", None, Value::Null);
        assert_eq!(methods.serve(&unimplemented).unwrap_err().code, INTERNAL_ERROR);

        let missing = RpcRequest::new("missing", None, json!(7));
        assert_eq!(methods.serve(&missing).unwrap_err().code, METHOD_NOT_FOUND);
    }

    #[test]
    fn test_registered_names() {
        assert_eq!(
            default_methods().names(),
            vec!["build_info", "echo", "ping", "unimplemented"]
        );
    }
}
