//! Client for the example key/value data service.
//!
//! The service exposes `GET /data`, `GET /data/{key_path}`, `PUT /data/{key_path}`
//! and `DELETE /data/{key_path}`. Its base URL defaults to
//! `http://localhost:5000` and can be overridden with `EXAMPLE_API_BASE`.

use anyhow::{Result, anyhow};
use automation_registry::{ApiImplementation, CapabilityRegistry, OperationArguments};
use automation_util::block_on_future;
use reqwest::Method;
use serde_json::Value;
use tracing::info;

use crate::client::HttpApiClient;

pub const EXAMPLE_API_NAME: &str = "ExampleApi";
pub const EXAMPLE_API_MODULE: &str = "apis.example";
pub const EXAMPLE_API_BASE_ENV: &str = "EXAMPLE_API_BASE";
pub const EXAMPLE_API_TOKEN_ENV: &str = "EXAMPLE_API_TOKEN";
pub const EXAMPLE_API_DEFAULT_BASE: &str = "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct ExampleApi {
    client: HttpApiClient,
}

impl ApiImplementation for ExampleApi {
    fn instantiate() -> Result<Self> {
        let client = HttpApiClient::from_env(EXAMPLE_API_BASE_ENV, EXAMPLE_API_DEFAULT_BASE, EXAMPLE_API_TOKEN_ENV)?;
        info!(base_url = %client.base_url, "example API client ready");
        Ok(Self { client })
    }
}

impl ExampleApi {
    pub fn base_url(&self) -> &str {
        &self.client.base_url
    }

    /// Fetches all data, or the entry at `key_path` when given.
    pub fn call_get_data(&self, arguments: &OperationArguments) -> Result<Value> {
        let path = self.data_path(optional_string(arguments, "key_path")?);
        let request = self.client.request(Method::GET, &path);
        block_on_future(HttpApiClient::send_json(request))
    }

    /// Stores `value` at `key_path`.
    pub fn call_put_data(&self, arguments: &OperationArguments) -> Result<Value> {
        let key_path = required_string(arguments, "key_path")?;
        let value = arguments.get("value").cloned().unwrap_or(Value::Null);
        let request = self.client.request(Method::PUT, &self.data_path(Some(key_path))).json(&value);
        block_on_future(HttpApiClient::send_json(request))
    }

    /// Removes the entry at `key_path`.
    pub fn call_delete_data(&self, arguments: &OperationArguments) -> Result<Value> {
        let key_path = required_string(arguments, "key_path")?;
        let request = self.client.request(Method::DELETE, &self.data_path(Some(key_path)));
        block_on_future(HttpApiClient::send_json(request))
    }

    fn data_path(&self, key_path: Option<&str>) -> String {
        match key_path.map(|key| key.trim_matches('/')).filter(|key| !key.is_empty()) {
            Some(key) => format!("/data/{key}"),
            None => "/data".to_string(),
        }
    }
}

/// Declares [`ExampleApi`] and its operations.
pub fn register(registry: &mut CapabilityRegistry) {
    registry
        .register_api::<ExampleApi>(EXAMPLE_API_NAME)
        .in_module(EXAMPLE_API_MODULE)
        .described_operation("call_get_data", "Fetch all data or one key path", ExampleApi::call_get_data)
        .described_operation("call_put_data", "Store a value at a key path", ExampleApi::call_put_data)
        .described_operation("call_delete_data", "Delete the value at a key path", ExampleApi::call_delete_data);
}

fn optional_string<'a>(arguments: &'a OperationArguments, key: &str) -> Result<Option<&'a str>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(other) => Err(anyhow!("argument '{key}' must be a string, got {other}")),
    }
}

fn required_string<'a>(arguments: &'a OperationArguments, key: &str) -> Result<&'a str> {
    optional_string(arguments, key)?.ok_or_else(|| anyhow!("missing required argument '{key}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_path_handles_optional_key() {
        let api = ExampleApi {
            client: HttpApiClient::new(EXAMPLE_API_DEFAULT_BASE, None).unwrap(),
        };
        assert_eq!(api.data_path(None), "/data");
        assert_eq!(api.data_path(Some("/users/1/")), "/data/users/1");
        assert_eq!(api.data_path(Some("")), "/data");
    }

    #[test]
    fn argument_helpers_validate_types() {
        let mut arguments = OperationArguments::new();
        arguments.insert("key_path".into(), json!(7));
        assert!(optional_string(&arguments, "key_path").is_err());
        assert!(required_string(&OperationArguments::new(), "key_path").is_err());
    }

    #[test]
    fn instantiate_reads_base_url_from_env() {
        temp_env::with_var(EXAMPLE_API_BASE_ENV, Some("http://127.0.0.1:9999/"), || {
            let api = ExampleApi::instantiate().expect("instantiate");
            assert_eq!(api.base_url(), "http://127.0.0.1:9999");
        });
        temp_env::with_var(EXAMPLE_API_BASE_ENV, Some("http://remote.example.com"), || {
            assert!(ExampleApi::instantiate().is_err());
        });
    }

    #[test]
    fn registers_three_marked_operations() {
        let mut registry = CapabilityRegistry::new();
        register(&mut registry);
        let names: Vec<_> = registry
            .list_operations::<ExampleApi>()
            .into_iter()
            .map(|op| op.display_name)
            .collect();
        assert_eq!(names, vec!["Call Get Data", "Call Put Data", "Call Delete Data"]);
    }
}
