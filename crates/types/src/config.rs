//! Configuration document model.
//!
//! The canonical document is an object with a top-level `apis` map:
//!
//! ```json
//! { "apis": { "Ex": { "module": "apis.example", "class": "ExampleApi",
//!     "environments": { "qa": { "tenants": { "acme": {} } } } } } }
//! ```
//!
//! Older documents used a flat `{ "<api>": { "<env>": ["tenant", ...] } }`
//! shape. [`ConfigTree::from_document`] accepts both and migrates the legacy
//! shape in memory; migrated APIs carry no module/class binding.
//!
//! A level written as `null` (or a bare YAML key) reads as empty, the same
//! as a missing one, so one sparse entry never invalidates the document.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Which document shape a configuration was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSchema {
    /// `{ "apis": { ... } }`
    Nested,
    /// `{ "<api>": { "<env>": ["tenant", ...] } }`
    LegacyFlat,
}

impl ConfigSchema {
    pub fn detect(document: &Value) -> Self {
        match document.get("apis") {
            Some(Value::Object(_)) => Self::Nested,
            _ => Self::LegacyFlat,
        }
    }
}

/// Loaded API → environment → tenant hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigTree {
    #[serde(default, deserialize_with = "nullable_map")]
    pub apis: IndexMap<String, ApiConfig>,
}

/// One API entry in the configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default, deserialize_with = "nullable_map")]
    pub environments: IndexMap<String, EnvironmentConfig>,
}

/// One environment under an API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Tenant name to free-form tenant settings.
    #[serde(default, deserialize_with = "nullable_map")]
    pub tenants: IndexMap<String, Value>,
}

/// Reads a map whose value, or any of whose entries, may be `null`.
fn nullable_map<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de> + Default,
{
    let entries: Option<IndexMap<String, Option<V>>> = Option::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect())
}

/// Legacy `{ "<api>": { "<env>": ["tenant", ...] } }` with `null` allowed at every level.
type LegacyDocument = IndexMap<String, Option<IndexMap<String, Option<Vec<String>>>>>;

/// Module/class pair naming the implementation bound to an API entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImplementationLocator {
    pub module: String,
    pub class: String,
}

impl std::fmt::Display for ImplementationLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module, self.class)
    }
}

impl ApiConfig {
    /// Returns the implementation binding when both `module` and `class` are present and non-blank.
    pub fn locator(&self) -> Option<ImplementationLocator> {
        let module = self.module.as_deref().map(str::trim).filter(|value| !value.is_empty())?;
        let class = self.class.as_deref().map(str::trim).filter(|value| !value.is_empty())?;
        Some(ImplementationLocator {
            module: module.to_string(),
            class: class.to_string(),
        })
    }
}

impl ConfigTree {
    /// Builds a tree from a parsed document in either supported shape.
    pub fn from_document(document: Value) -> Result<Self, serde_json::Error> {
        match ConfigSchema::detect(&document) {
            ConfigSchema::Nested => serde_json::from_value(document),
            ConfigSchema::LegacyFlat => {
                let legacy: LegacyDocument = serde_json::from_value(document)?;
                Ok(Self::from_legacy(legacy))
            }
        }
    }

    fn from_legacy(legacy: LegacyDocument) -> Self {
        let apis = legacy
            .into_iter()
            .map(|(api_name, environments)| {
                let environments = environments
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(env_name, tenants)| {
                        let tenants = tenants
                            .unwrap_or_default()
                            .into_iter()
                            .map(|tenant| (tenant, Value::Object(Default::default())))
                            .collect();
                        (env_name, EnvironmentConfig { tenants })
                    })
                    .collect();
                (
                    api_name,
                    ApiConfig {
                        environments,
                        ..Default::default()
                    },
                )
            })
            .collect();
        Self { apis }
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }

    pub fn api(&self, api_name: &str) -> Option<&ApiConfig> {
        self.apis.get(api_name)
    }

    /// API names, sorted.
    pub fn api_names(&self) -> Vec<String> {
        sorted_keys(self.apis.keys())
    }

    /// Environment names under `api_name`, sorted. Empty when the API is unknown.
    pub fn environment_names(&self, api_name: &str) -> Vec<String> {
        self.api(api_name)
            .map(|api| sorted_keys(api.environments.keys()))
            .unwrap_or_default()
    }

    /// Tenant names under `api_name`/`env_name`, sorted. Empty when either key is unknown.
    pub fn tenant_names(&self, api_name: &str, env_name: &str) -> Vec<String> {
        self.api(api_name)
            .and_then(|api| api.environments.get(env_name))
            .map(|environment| sorted_keys(environment.tenants.keys()))
            .unwrap_or_default()
    }

    /// Settings object for a tenant, if present. A tenant written without settings reads as `null`.
    pub fn tenant_settings(&self, api_name: &str, env_name: &str, tenant_name: &str) -> Option<&Value> {
        self.api(api_name)?.environments.get(env_name)?.tenants.get(tenant_name)
    }
}

fn sorted_keys<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut names: Vec<String> = keys.cloned().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_document_parses_with_missing_levels() {
        let tree = ConfigTree::from_document(json!({
            "apis": {
                "Ex": {
                    "module": "m",
                    "class": "C",
                    "environments": { "qa": { "tenants": { "t": {} } }, "dev": {} }
                },
                "Bare": {}
            }
        }))
        .expect("parse nested");

        assert_eq!(tree.api_names(), vec!["Bare", "Ex"]);
        assert_eq!(tree.environment_names("Ex"), vec!["dev", "qa"]);
        assert_eq!(tree.tenant_names("Ex", "qa"), vec!["t"]);
        assert!(tree.tenant_names("Ex", "dev").is_empty());
        assert!(tree.environment_names("Bare").is_empty());
        assert_eq!(
            tree.api("Ex").and_then(ApiConfig::locator),
            Some(ImplementationLocator {
                module: "m".into(),
                class: "C".into()
            })
        );
        assert_eq!(tree.api("Bare").and_then(ApiConfig::locator), None);
    }

    #[test]
    fn legacy_flat_document_is_migrated() {
        let document = json!({ "Ex": { "prod": ["b", "a"], "qa": [] } });
        assert_eq!(ConfigSchema::detect(&document), ConfigSchema::LegacyFlat);

        let tree = ConfigTree::from_document(document).expect("parse legacy");
        assert_eq!(tree.environment_names("Ex"), vec!["prod", "qa"]);
        assert_eq!(tree.tenant_names("Ex", "prod"), vec!["a", "b"]);
        assert!(tree.api("Ex").and_then(ApiConfig::locator).is_none());
    }

    #[test]
    fn blank_binding_fields_do_not_form_a_locator() {
        let api = ApiConfig {
            module: Some("  ".into()),
            class: Some("C".into()),
            ..Default::default()
        };
        assert!(api.locator().is_none());
    }

    #[test]
    fn null_levels_read_as_empty_without_losing_siblings() {
        let tree = ConfigTree::from_document(json!({
            "apis": {
                "Ex": {
                    "module": "m",
                    "class": "C",
                    "environments": { "qa": { "tenants": null }, "dev": null, "prod": { "tenants": { "t": null } } }
                },
                "Other": { "environments": null },
                "Empty": null
            }
        }))
        .expect("null levels");

        assert_eq!(tree.api_names(), vec!["Empty", "Ex", "Other"]);
        assert_eq!(tree.environment_names("Ex"), vec!["dev", "prod", "qa"]);
        assert!(tree.tenant_names("Ex", "qa").is_empty());
        assert!(tree.tenant_names("Ex", "dev").is_empty());
        assert_eq!(tree.tenant_names("Ex", "prod"), vec!["t"]);
        assert_eq!(tree.tenant_settings("Ex", "prod", "t"), Some(&Value::Null));
        assert!(tree.environment_names("Other").is_empty());
        assert!(tree.api("Ex").and_then(ApiConfig::locator).is_some());

        let nothing = ConfigTree::from_document(json!({ "apis": {} })).expect("empty");
        assert!(nothing.is_empty());
    }

    #[test]
    fn bare_yaml_keys_read_as_empty_levels() {
        let yaml = "apis:\n  Ex:\n    environments:\n      qa:\n        tenants:\n          t: {}\n      dev:\n  Other:\n";
        let document: Value = serde_yaml::from_str(yaml).expect("yaml");
        let tree = ConfigTree::from_document(document).expect("tree");
        assert_eq!(tree.api_names(), vec!["Ex", "Other"]);
        assert_eq!(tree.environment_names("Ex"), vec!["dev", "qa"]);
        assert_eq!(tree.tenant_names("Ex", "qa"), vec!["t"]);
    }

    #[test]
    fn legacy_document_tolerates_null_levels() {
        let tree = ConfigTree::from_document(json!({ "Ex": { "prod": null, "qa": ["t"] }, "Bare": null })).expect("legacy");
        assert_eq!(tree.api_names(), vec!["Bare", "Ex"]);
        assert!(tree.tenant_names("Ex", "prod").is_empty());
        assert_eq!(tree.tenant_names("Ex", "qa"), vec!["t"]);
    }

    #[test]
    fn yaml_documents_map_onto_the_same_model() {
        let yaml = "apis:\n  Ex:\n    module: m\n    class: C\n    environments:\n      qa:\n        tenants:\n          t: {}\n";
        let document: Value = serde_yaml::from_str(yaml).expect("yaml");
        let tree = ConfigTree::from_document(document).expect("tree");
        assert_eq!(tree.tenant_names("Ex", "qa"), vec!["t"]);
    }
}
