//! Scheme delivery by SMS.
//!
//! [`DeliveryService`] validates the phone number, applies the SMS rate
//! governor, looks the program up and hands it to a [`MessageDelivery`]
//! backend under a timeout. Backend failures are reported as a `failed`
//! receipt and never retried.

pub mod sms;
pub mod twilio;

pub use sms::compose_sms;
pub use twilio::{TwilioConfig, TwilioDelivery};

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{CatalogProvider, ProgramRecord};
use crate::error::DeliveryError;
use crate::governor::{Admission, RateGovernor};

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Indian mobile numbers: ten digits starting with 6-9.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[6-9]\d{9}$").expect("phone pattern"));

/// A validated ten-digit Indian mobile number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, DeliveryError> {
        let trimmed = raw.trim();
        if PHONE_PATTERN.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(DeliveryError::InvalidRecipient(
                "Phone number must be 10 digits starting with 6, 7, 8, or 9".to_string(),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// E.164 form with the +91 country code.
    pub fn e164(&self) -> String {
        format!("+91{}", self.0)
    }

    /// E.164 form with all but the last four digits hidden, for logs.
    pub fn masked(&self) -> String {
        let full = self.e164();
        let visible = full.len().saturating_sub(4);
        format!("{}{}", "*".repeat(visible), &full[visible..])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// Outcome reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub status: DeliveryStatus,
    pub message: String,
    /// Backend message id, when the backend returns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl DeliveryReceipt {
    pub fn sent(message: impl Into<String>, provider_id: Option<String>) -> Self {
        Self {
            status: DeliveryStatus::Sent,
            message: message.into(),
            provider_id,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: DeliveryStatus::Failed,
            message: "Failed to send SMS. Please try again later.".to_string(),
            provider_id: None,
        }
    }
}

/// Sends one program's details to one recipient.
#[async_trait]
pub trait MessageDelivery: Send + Sync {
    /// Backend name for logs and health reporting.
    fn name(&self) -> &str;

    /// Whether this backend really sends (false for the mock).
    fn is_live(&self) -> bool {
        true
    }

    async fn deliver(
        &self,
        recipient: &PhoneNumber,
        program: &ProgramRecord,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Backend used when no SMS provider is configured. Logs instead of sending.
#[derive(Debug, Default)]
pub struct MockDelivery;

#[async_trait]
impl MessageDelivery for MockDelivery {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn deliver(
        &self,
        recipient: &PhoneNumber,
        program: &ProgramRecord,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let body = compose_sms(program);
        let preview: String = body.chars().take(50).collect();
        info!(to = %recipient.masked(), "Mock SMS: {}...", preview);
        Ok(DeliveryReceipt::sent("SMS sent successfully (mock mode)", None))
    }
}

/// Validates, rate-limits and dispatches SMS requests.
pub struct DeliveryService {
    backend: Arc<dyn MessageDelivery>,
    catalog: Arc<dyn CatalogProvider>,
    governor: Arc<RateGovernor>,
    timeout: Duration,
}

impl DeliveryService {
    pub fn new(
        backend: Arc<dyn MessageDelivery>,
        catalog: Arc<dyn CatalogProvider>,
        governor: Arc<RateGovernor>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            catalog,
            governor,
            timeout,
        }
    }

    pub fn backend(&self) -> &dyn MessageDelivery {
        self.backend.as_ref()
    }

    /// Send the details of `program_id` to `phone`.
    ///
    /// Errors are for the caller's input (bad number, unknown program, rate
    /// limit). A backend failure or timeout is a `failed` receipt.
    pub async fn send(&self, phone: &str, program_id: &str) -> Result<DeliveryReceipt, DeliveryError> {
        let recipient = PhoneNumber::parse(phone)?;

        if let Admission::Denied { retry_after } = self.governor.admit(recipient.as_str()) {
            return Err(DeliveryError::RateLimited { retry_after });
        }

        let program = self
            .catalog
            .find(program_id)
            .await?
            .ok_or_else(|| DeliveryError::NotFound {
                id: program_id.to_string(),
            })?;

        let outcome = match tokio::time::timeout(
            self.timeout,
            self.backend.deliver(&recipient, &program),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout {
                provider: self.backend.name().to_string(),
                timeout: self.timeout,
            }),
        };

        match outcome {
            Ok(receipt) => {
                info!(
                    to = %recipient.masked(),
                    program = %program.id,
                    backend = self.backend.name(),
                    "SMS delivered"
                );
                Ok(receipt)
            }
            Err(e) => {
                warn!(to = %recipient.masked(), program = %program.id, "SMS delivery failed: {}", e);
                Ok(DeliveryReceipt::failed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::governor::RateLimit;
    use std::sync::Mutex;

    enum Mode {
        Succeed,
        Fail,
        Hang,
    }

    struct RecordingDelivery {
        mode: Mode,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingDelivery {
        fn new(mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MessageDelivery for RecordingDelivery {
        fn name(&self) -> &str {
            "recording"
        }

        async fn deliver(
            &self,
            recipient: &PhoneNumber,
            program: &ProgramRecord,
        ) -> Result<DeliveryReceipt, DeliveryError> {
            self.sent
                .lock()
                .unwrap()
                .push((recipient.e164(), program.id.clone()));
            match self.mode {
                Mode::Succeed => Ok(DeliveryReceipt::sent("SMS sent successfully", Some("SM1".into()))),
                Mode::Fail => Err(DeliveryError::SendFailed {
                    provider: "recording".into(),
                    reason: "down".into(),
                }),
                Mode::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(DeliveryReceipt::failed())
                }
            }
        }
    }

    fn service(backend: Arc<RecordingDelivery>, limit: usize) -> DeliveryService {
        DeliveryService::new(
            backend,
            Arc::new(StaticCatalog::builtin().unwrap()),
            Arc::new(RateGovernor::new("sms", RateLimit::per_minute(limit))),
            DEFAULT_DELIVERY_TIMEOUT,
        )
    }

    #[test]
    fn phone_validation() {
        for ok in ["9876543210", "6000000000", " 7123456789 "] {
            assert!(PhoneNumber::parse(ok).is_ok(), "{ok}");
        }
        for bad in ["5876543210", "987654321", "98765432101", "+919876543210", "98765abcde", ""] {
            assert!(
                matches!(PhoneNumber::parse(bad), Err(DeliveryError::InvalidRecipient(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn phone_masking_keeps_last_four() {
        let phone = PhoneNumber::parse("9876543210").unwrap();
        assert_eq!(phone.e164(), "+919876543210");
        assert_eq!(phone.masked(), "*********3210");
    }

    #[tokio::test]
    async fn sends_known_program() {
        let backend = RecordingDelivery::new(Mode::Succeed);
        let svc = service(Arc::clone(&backend), 5);
        let receipt = svc.send("9876543210", "scheme_1").await.unwrap();
        assert_eq!(receipt.status, DeliveryStatus::Sent);
        assert_eq!(
            *backend.sent.lock().unwrap(),
            vec![("+919876543210".to_string(), "scheme_1".to_string())]
        );
    }

    #[tokio::test]
    async fn invalid_phone_never_reaches_backend() {
        let backend = RecordingDelivery::new(Mode::Succeed);
        let svc = service(Arc::clone(&backend), 5);
        let err = svc.send("12345", "scheme_1").await.unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidRecipient(_)));
        assert!(backend.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_program_is_not_found() {
        let backend = RecordingDelivery::new(Mode::Succeed);
        let svc = service(Arc::clone(&backend), 5);
        let err = svc.send("9876543210", "scheme_999").await.unwrap_err();
        assert!(matches!(err, DeliveryError::NotFound { id } if id == "scheme_999"));
        assert!(backend.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sixth_sms_per_minute_is_rate_limited() {
        let backend = RecordingDelivery::new(Mode::Succeed);
        let svc = service(Arc::clone(&backend), 5);
        for _ in 0..5 {
            svc.send("9876543210", "scheme_1").await.unwrap();
        }
        let err = svc.send("9876543210", "scheme_1").await.unwrap_err();
        assert!(matches!(err, DeliveryError::RateLimited { .. }));
        assert_eq!(backend.sent.lock().unwrap().len(), 5);

        // Another number is unaffected.
        assert!(svc.send("9123456789", "scheme_1").await.is_ok());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(svc.send("9876543210", "scheme_1").await.is_ok());
    }

    #[tokio::test]
    async fn backend_failure_is_a_failed_receipt() {
        let backend = RecordingDelivery::new(Mode::Fail);
        let svc = service(Arc::clone(&backend), 5);
        let receipt = svc.send("9876543210", "scheme_1").await.unwrap();
        assert_eq!(receipt, DeliveryReceipt::failed());
        assert_eq!(backend.sent.lock().unwrap().len(), 1, "no retry");
    }

    #[tokio::test(start_paused = true)]
    async fn backend_timeout_is_a_failed_receipt() {
        let backend = RecordingDelivery::new(Mode::Hang);
        let svc = service(backend, 5);
        let receipt = svc.send("9876543210", "scheme_1").await.unwrap();
        assert_eq!(receipt.status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn mock_backend_reports_mock_mode() {
        let program = StaticCatalog::builtin()
            .unwrap()
            .find("scheme_1")
            .await
            .unwrap()
            .unwrap();
        let receipt = MockDelivery
            .deliver(&PhoneNumber::parse("9876543210").unwrap(), &program)
            .await
            .unwrap();
        assert_eq!(receipt.status, DeliveryStatus::Sent);
        assert!(receipt.message.contains("mock mode"));
        assert!(!MockDelivery.is_live());
    }
}
