//! Method dispatch capability
//!
//! The embedding application supplies one [`MethodDispatcher`]. It is shared
//! by every worker thread, so implementations synchronize their own state.

use std::collections::HashMap;

use serde_json::{json, Value};

use super::jsonrpc::{RpcError, RpcRequest};

/// Outcome of a single method call: `Ok` carries the `result`, `Err` the
/// `error` object of the response envelope.
pub type DispatchResult = Result<Value, RpcError>;

/// Executes one named method against its params.
///
/// Unknown methods must be reported through the return value (usually via
/// [`serve_method_not_found`]), never by panicking.
pub trait MethodDispatcher: Send + Sync {
    fn serve(&self, req: &RpcRequest) -> DispatchResult;
}

impl<F> MethodDispatcher for F
where
    F: Fn(&RpcRequest) -> DispatchResult + Send + Sync,
{
    fn serve(&self, req: &RpcRequest) -> DispatchResult {
        self(req)
    }
}

/// Fallback for unknown method names
pub fn serve_method_not_found(_req: &RpcRequest) -> DispatchResult {
    Err(RpcError::method_not_found())
}

/// Fallback for methods that are declared but not implemented yet
pub fn serve_unimplemented(_req: &RpcRequest) -> DispatchResult {
    Err(RpcError::internal_error("Not Implemented"))
}

/// Report the name and version of the running build
pub fn serve_build_info(_req: &RpcRequest) -> DispatchResult {
    Ok(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

type MethodFn = Box<dyn Fn(&RpcRequest) -> DispatchResult + Send + Sync>;

/// Dispatcher that routes by method name to registered closures.
///
/// Names without a registration fall through to [`serve_method_not_found`].
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<String, MethodFn>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `name`
    pub fn register<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&RpcRequest) -> DispatchResult + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered method names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl MethodDispatcher for MethodTable {
    fn serve(&self, req: &RpcRequest) -> DispatchResult {
        match self.methods.get(&req.method) {
            Some(method) => method(req),
            None => serve_method_not_found(req),
        }
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodTable")
            .field("methods", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::jsonrpc::{INTERNAL_ERROR, METHOD_NOT_FOUND};

    fn request(method: &str) -> RpcRequest {
        RpcRequest::new(method, Some(json!([1, 2])), json!(1))
    }

    #[test]
    fn test_method_not_found() {
        let err = serve_method_not_found(&request("nope")).unwrap_err();
        assert_eq!(err.code, METHOD_NOT_FOUND);
        assert_eq!(err.message, "Invalid Request");
    }

    #[test]
    fn test_unimplemented() {
        let err = serve_unimplemented(&request("later")).unwrap_err();
        assert_eq!(err.code, INTERNAL_ERROR);
        assert_eq!(err.message, "Not Implemented");
    }

    #[test]
    fn test_build_info() {
        let info = serve_build_info(&request("build_info")).unwrap();
        assert_eq!(info["name"], "minirpc");
        assert!(info["version"].is_string());
    }

    #[test]
    fn test_closure_dispatcher() {
        let dispatcher = |req: &RpcRequest| -> DispatchResult { Ok(json!(req.method.len())) };
        assert_eq!(dispatcher.serve(&request("four")).unwrap(), json!(4));
    }

    #[test]
    fn test_method_table_routing() {
        let table = MethodTable::new()
            .register("sum", |req: &RpcRequest| {
                let params = req.params_or_null();
                let items = params
                    .as_array()
                    .ok_or_else(|| RpcError::invalid_params("expected an array"))?;
                Ok(json!(items.iter().filter_map(Value::as_i64).sum::<i64>()))
            })
            .register("later", serve_unimplemented);

        assert!(table.contains("sum"));
        assert_eq!(table.names(), vec!["later", "sum"]);
        assert_eq!(table.serve(&request("sum")).unwrap(), json!(3));
        assert_eq!(
            table.serve(&request("later")).unwrap_err().code,
            INTERNAL_ERROR
        );
        assert_eq!(
            table.serve(&request("missing")).unwrap_err().code,
            METHOD_NOT_FOUND
        );
    }
}
