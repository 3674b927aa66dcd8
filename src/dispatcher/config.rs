use serde::{Deserialize, Serialize};

/// Dispatcher settings.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```ignore
/// let config = DispatcherConfig::from_json_str(r#"{ "strict_bindings": true }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Status code of successful envelopes.
    pub success_status_code: u16,
    /// Fail `build` when an interceptor or filter is bound to a request or
    /// handler with no registration. When off, such bindings are logged and
    /// never run.
    pub strict_bindings: bool,
    /// Run dispatches inside a transaction when a manager is configured.
    pub transactional: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            success_status_code: 200,
            strict_bindings: false,
            transactional: true,
        }
    }
}

impl DispatcherConfig {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
