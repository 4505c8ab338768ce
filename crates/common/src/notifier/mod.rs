//! Report delivery abstraction
//!
//! Notifies a requester that their report is ready:
//! - Resend email API
//! - Mock notifier for tests and local development
//!
//! Delivery is best effort. The polling loop logs a failed notification and
//! leaves the completed request untouched; the report stays readable in the
//! store either way.

use crate::config::NotifierConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Build the notification subject line for a topic.
pub fn subject_line(topic: &str) -> String {
    format!("Your deep research on \"{topic}\" is ready")
}

/// Render a plain text report as a minimal HTML body.
fn html_body(report: &str) -> String {
    report.replace('\n', "<br>")
}

/// Trait for report delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a finished report to its requester
    async fn notify(&self, recipient: &str, subject: &str, report: &str) -> Result<()>;
}

/// Resend email client
pub struct ResendNotifier {
    client: reqwest::Client,
    api_key: String,
    from_address: String,
    base_url: String,
}

#[derive(Serialize)]
struct EmailRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

impl ResendNotifier {
    /// Create a new Resend notifier from configuration
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "notifier.api_key must be set for the resend provider".to_string(),
        })?;
        let from_address = config
            .from_address
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "notifier.from_address must be set for the resend provider".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            from_address,
            base_url: config.api_base.clone(),
        })
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn notify(&self, recipient: &str, subject: &str, report: &str) -> Result<()> {
        let url = format!("{}/emails", self.base_url);

        let request = EmailRequest {
            from: self.from_address.clone(),
            to: vec![recipient.to_string()],
            subject: subject.to_string(),
            html: html_body(report),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::DeliveryError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::DeliveryError {
                message: format!("API error {}: {}", status, body),
            });
        }

        Ok(())
    }
}

/// A notification captured by [`MockNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub recipient: String,
    pub subject: String,
    pub report: String,
}

/// Mock notifier for testing
///
/// Records every delivery so tests can assert on exactly what went out.
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// Fail every delivery attempt
    pub fn failing() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    /// Snapshot of everything delivered so far
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, recipient: &str, subject: &str, report: &str) -> Result<()> {
        if self.fail {
            return Err(AppError::DeliveryError {
                message: "mock delivery failure".to_string(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentNotification {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                report: report.to_string(),
            });
        }
        Ok(())
    }
}

/// Create a notifier based on configuration
pub fn create_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    match config.provider.as_str() {
        "resend" => Ok(Arc::new(ResendNotifier::from_config(config)?)),
        "mock" => Ok(Arc::new(MockNotifier::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown notifier provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_line() {
        assert_eq!(
            subject_line("supply chain forecasting"),
            "Your deep research on \"supply chain forecasting\" is ready"
        );
    }

    #[test]
    fn test_html_body_replaces_newlines() {
        assert_eq!(html_body("line one\nline two\n"), "line one<br>line two<br>");
        assert_eq!(html_body("no newlines"), "no newlines");
    }

    #[tokio::test]
    async fn test_mock_records_deliveries() {
        let notifier = MockNotifier::new();
        notifier
            .notify("alice@example.com", &subject_line("rust"), "Report A")
            .await
            .unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "alice@example.com");
        assert_eq!(sent[0].subject, "Your deep research on \"rust\" is ready");
        assert_eq!(sent[0].report, "Report A");
    }

    #[tokio::test]
    async fn test_mock_failure_records_nothing() {
        let notifier = MockNotifier::failing();
        let err = notifier
            .notify("alice@example.com", "subject", "Report A")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DeliveryError { .. }));
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn test_create_notifier_requires_resend_credentials() {
        let config = NotifierConfig {
            provider: "resend".to_string(),
            api_key: None,
            api_base: "https://api.resend.com".to_string(),
            from_address: Some("research@deepscout.dev".to_string()),
            timeout_secs: 30,
        };
        assert!(create_notifier(&config).is_err());
    }

    #[test]
    fn test_create_notifier_rejects_unknown_provider() {
        let config = NotifierConfig {
            provider: "carrier-pigeon".to_string(),
            api_key: None,
            api_base: "https://api.resend.com".to_string(),
            from_address: None,
            timeout_secs: 30,
        };
        assert!(create_notifier(&config).is_err());
    }
}
