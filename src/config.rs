use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonData {
    #[serde(default)]
    pub use_auth_token: bool,
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Datasource instance settings as the host stores them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSettings {
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub with_credentials: bool,
    #[serde(default)]
    pub basic_auth: Option<String>,
    #[serde(default)]
    pub json_data: Option<JsonData>,
}

impl InstanceSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Value of the `Authorization` header: a bearer token when enabled,
    /// otherwise a non-empty pre-built basic auth string.
    pub fn authorization(&self) -> Option<String> {
        let json_data = self.json_data.clone().unwrap_or_default();

        if let (true, Some(token)) = (json_data.use_auth_token, json_data.auth_token) {
            return Some(format!("Bearer {}", token));
        }

        self.basic_auth
            .as_ref()
            .filter(|basic| !basic.is_empty())
            .cloned()
    }
}

/// Settings for the HTTP gateway binary, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout: Option<Duration>,
    pub instance: InstanceSettings,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let request_timeout = env::var("MANGO_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);

        let auth_token = env::var("MANGO_AUTH_TOKEN").ok().filter(|t| !t.is_empty());

        let instance = InstanceSettings {
            url: env::var("MANGO_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            name: env::var("MANGO_NAME").unwrap_or_else(|_| "mango".to_string()),
            kind: "mango-datasource".to_string(),
            with_credentials: env::var("MANGO_WITH_CREDENTIALS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            basic_auth: env::var("MANGO_BASIC_AUTH").ok(),
            json_data: Some(JsonData {
                use_auth_token: auth_token.is_some(),
                auth_token,
            }),
        };

        Self {
            port,
            request_timeout,
            instance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_preferred() {
        let settings = InstanceSettings {
            basic_auth: Some("Basic YWRtaW46YWRtaW4=".into()),
            json_data: Some(JsonData {
                use_auth_token: true,
                auth_token: Some("abc.def".into()),
            }),
            ..InstanceSettings::new("http://mango:8080")
        };
        assert_eq!(settings.authorization().as_deref(), Some("Bearer abc.def"));
    }

    #[test]
    fn test_basic_auth_fallback() {
        let settings = InstanceSettings {
            basic_auth: Some("Basic YWRtaW46YWRtaW4=".into()),
            json_data: Some(JsonData {
                use_auth_token: false,
                auth_token: Some("ignored".into()),
            }),
            ..InstanceSettings::new("http://mango:8080")
        };
        assert_eq!(settings.authorization().as_deref(), Some("Basic YWRtaW46YWRtaW4="));
    }

    #[test]
    fn test_no_authorization() {
        let mut settings = InstanceSettings::new("http://mango:8080");
        assert_eq!(settings.authorization(), None);

        settings.basic_auth = Some(String::new());
        assert_eq!(settings.authorization(), None);

        // enabled but no token configured
        settings.json_data = Some(JsonData {
            use_auth_token: true,
            auth_token: None,
        });
        assert_eq!(settings.authorization(), None);
    }

    #[test]
    fn test_settings_from_host_json() {
        let settings: InstanceSettings = serde_json::from_value(serde_json::json!({
            "url": "http://mango:8080/",
            "name": "Mango",
            "type": "mango-datasource",
            "withCredentials": true,
            "jsonData": {"useAuthToken": true, "authToken": "tok"}
        }))
        .unwrap();

        assert_eq!(settings.base_url(), "http://mango:8080");
        assert!(settings.with_credentials);
        assert_eq!(settings.authorization().as_deref(), Some("Bearer tok"));
    }
}
