//! Request payloads and list filters for the Faythe resources.
//!
//! Every resource call accepts any `Serialize` body, so these types are a
//! convenience: a `serde_json::Value` works just as well.

use faythe_core::query::QueryParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered query filters for list calls.
///
/// Filters are sent in the order they were added.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListFilter {
    params: QueryParams,
}

impl ListFilter {
    /// Create an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match resources carrying all of the given tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.params.push("tags", join(tags));
        self
    }

    /// Match resources carrying any of the given tags.
    #[must_use]
    pub fn with_tags_any<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.params.push("tags_any", join(tags));
        self
    }

    /// Match clouds registered for a provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl AsRef<str>) -> Self {
        self.params.push("provider", provider.as_ref());
        self
    }

    /// Add an arbitrary filter understood by the service.
    #[must_use]
    pub fn with_param(mut self, key: &'static str, value: impl AsRef<str>) -> Self {
        self.params.push(key, value.as_ref());
        self
    }

    /// The collected pairs in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[(&'static str, String)] {
        self.params.pairs()
    }

    /// Returns true if no filter has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

fn join<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| value.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Payload registering a cloud with the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloudRegistration {
    /// Provider credentials.
    pub auth: CloudAuth,
    /// Metrics backend used to evaluate scaler and healer queries.
    pub monitor: MonitorBackend,
    /// Automation engine that executes actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atengine: Option<AutomationEngine>,
    /// Provider name, e.g. `openstack`.
    pub provider: String,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Provider credentials (OpenStack keystone style).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloudAuth {
    /// Identity service URL.
    pub auth_url: String,
    /// Provider user.
    pub username: String,
    /// Provider password.
    pub password: String,
    /// Project to scope to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Domain of the user and project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    /// Region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
}

/// Metrics backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorBackend {
    /// Backend kind, e.g. `prometheus`.
    pub backend: String,
    /// Backend address.
    pub address: String,
    /// Optional basic-auth user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Optional basic-auth password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Automation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutomationEngine {
    /// Engine kind, e.g. `stackstorm`.
    pub backend: String,
    /// Engine address.
    pub address: String,
    /// API key.
    pub apikey: String,
}

/// An action fired by a scaler or healer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    /// Action kind, e.g. `http` or `mail`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Target URL for HTTP actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// HTTP method for HTTP actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Delivery attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Delay between attempts, e.g. `50ms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,
    /// `fixed` or `backoff`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_type: Option<String>,
}

/// Payload creating or updating a scaler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalerSpec {
    /// Metrics query that triggers the scaler.
    pub query: String,
    /// How long the query must hold, e.g. `5m`.
    pub duration: String,
    /// Evaluation interval, e.g. `60s`.
    pub interval: String,
    /// Named actions.
    pub actions: BTreeMap<String, Action>,
    /// Quiet period after firing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<String>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Whether the scaler is evaluated.
    pub active: bool,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload creating a healer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealerSpec {
    /// Metrics query that detects unhealthy instances.
    pub query: String,
    /// Named actions.
    pub actions: BTreeMap<String, Action>,
    /// Evaluation interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// How long the query must hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Notification receivers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<String>,
    /// Whether the healer is evaluated.
    pub active: bool,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload creating a silence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SilenceSpec {
    /// Name of the silence.
    pub name: String,
    /// Pattern of instances to silence.
    pub pattern: String,
    /// Duration of the silence, e.g. `1h`.
    pub ttl: String,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload creating a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Initial password.
    pub password: String,
}

/// Payload changing a user's password.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct PasswordChange<'a> {
    pub(crate) password: &'a str,
}

/// An authorization policy: a path and the method allowed on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Policy {
    /// Request path, e.g. `/clouds/*`.
    pub path: String,
    /// HTTP method, e.g. `GET`.
    pub method: String,
}

impl Policy {
    /// Create a policy.
    #[must_use]
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_filter_keeps_order_and_joins_tags() {
        let filter = ListFilter::new()
            .with_tags_any(["b"])
            .with_tags(["x", "y"])
            .with_param("name", "web");
        assert_eq!(
            filter.pairs(),
            &[
                ("tags_any", "b".to_string()),
                ("tags", "x,y".to_string()),
                ("name", "web".to_string()),
            ]
        );
    }

    #[test]
    fn empty_filter() {
        assert!(ListFilter::new().is_empty());
        assert!(!ListFilter::new().with_provider("openstack").is_empty());
    }

    #[test]
    fn scaler_spec_serializes_action_type() {
        let mut actions = BTreeMap::new();
        actions.insert(
            "scale_out".to_string(),
            Action {
                kind: "http".into(),
                url: Some("http://heat/signal".into()),
                method: Some("POST".into()),
                attempts: Some(4),
                delay: Some("50ms".into()),
                delay_type: Some("backoff".into()),
            },
        );
        let spec = ScalerSpec {
            query: "avg(cpu) > 75".into(),
            duration: "5m".into(),
            interval: "60s".into(),
            actions,
            cooldown: Some("10m".into()),
            metadata: BTreeMap::new(),
            active: true,
            tags: Vec::new(),
            description: None,
        };

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["actions"]["scale_out"]["type"], "http");
        assert_eq!(value["actions"]["scale_out"]["attempts"], 4);
        assert!(value.get("metadata").is_none());
        assert!(value.get("tags").is_none());
    }

    #[test]
    fn cloud_registration_from_service_json() {
        let registration: CloudRegistration = serde_json::from_value(json!({
            "auth": {
                "username": "admin",
                "auth_url": "http://192.169.1.2:5000/v3",
                "password": "fakepassword",
                "project_name": "admin",
                "domain_name": "Default",
                "region_name": "RegionOne"
            },
            "monitor": {
                "backend": "prometheus",
                "address": "http://192.169.1.3:9091/"
            },
            "atengine": {
                "backend": "stackstorm",
                "address": "http://192.169.1.4",
                "apikey": "fakepassword"
            },
            "provider": "openstack",
            "tags": ["test"]
        }))
        .unwrap();

        assert_eq!(registration.provider, "openstack");
        assert_eq!(registration.auth.region_name.as_deref(), Some("RegionOne"));
        assert!(registration.monitor.username.is_none());
        assert_eq!(registration.tags, vec!["test"]);
    }

    #[test]
    fn password_change_shape() {
        let value = serde_json::to_value(PasswordChange { password: "n3w" }).unwrap();
        assert_eq!(value, json!({"password": "n3w"}));
    }
}
