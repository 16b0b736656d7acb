use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Severity of an alert attached to an API response.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub text: String,
    pub level: AlertLevel,
}

impl Alert {
    pub fn success(text: impl Into<String>) -> Self { Self { text: text.into(), level: AlertLevel::Success } }
    pub fn warning(text: impl Into<String>) -> Self { Self { text: text.into(), level: AlertLevel::Warning } }
    pub fn error(text: impl Into<String>) -> Self { Self { text: text.into(), level: AlertLevel::Error } }
}

/// Response envelope: `{"response": ..., "alerts": [...]}`.
///
/// Either part may be absent; error responses carry only alerts.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<Alert>,
}

impl<T> Envelope<T> {
    pub fn response(response: T) -> Self { Self { response: Some(response), alerts: Vec::new() } }

    pub fn with_alert(mut self, alert: Alert) -> Self {
        self.alerts.push(alert);
        self
    }
}

impl Envelope<()> {
    pub fn alerts(alerts: Vec<Alert>) -> Self { Self { response: None, alerts } }
}
