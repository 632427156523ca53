pub mod email;

use thiserror::Error;

use crate::config::DeliverySettings;

/// Capability contract implemented by every delivery backend.
pub trait DeliveryProvider {
    /// Stable identifier for this backend, used in configuration and errors.
    fn name(&self) -> &'static str;

    /// Check the configuration locally, without opening a connection.
    fn validate_config(&self) -> Result<(), DeliveryError>;

    /// Deliver a message to the configured recipients.
    fn deliver(
        &self,
        content: &str,
        content_html: Option<&str>,
    ) -> Result<DeliveryResult, DeliveryError>;
}

/// Validated parameter bag handed to delivery backends by value.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub recipients: Vec<String>,
    pub subject: Option<String>,
}

impl From<&DeliverySettings> for DeliveryConfig {
    fn from(settings: &DeliverySettings) -> Self {
        Self {
            recipients: settings.recipients.clone(),
            subject: settings.subject.clone(),
        }
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub recipients_count: usize,
    pub error: Option<String>,
}

/// Errors raised by delivery backends and their factory.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery configuration error: {0}")]
    Configuration(String),
    #[error("unknown delivery provider '{0}'")]
    UnknownProvider(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Environment pair consulted when credentials are not supplied in code.
pub const EMAIL_SENDER_ENV: &str = "PROMPTCAST_EMAIL_SENDER";
pub const EMAIL_PASSWORD_ENV: &str = "PROMPTCAST_EMAIL_APP_PASSWORD";

/// Sender identity and credential for the email backend.
#[derive(Debug, Clone)]
pub struct EmailCredentials {
    pub sender: String,
    pub app_password: String,
}

impl EmailCredentials {
    /// Read the credential pair from the environment.
    pub fn from_env() -> Result<Self, DeliveryError> {
        Ok(Self {
            sender: require_env(EMAIL_SENDER_ENV)?,
            app_password: require_env(EMAIL_PASSWORD_ENV)?,
        })
    }
}

fn require_env(name: &str) -> Result<String, DeliveryError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| DeliveryError::Configuration(format!("{name} is not set")))
}

/// Build the delivery backend named by the prompt specification.
///
/// Dispatch is static, mirroring the completion factory.
pub fn create_provider(
    settings: &DeliverySettings,
    credentials: Option<EmailCredentials>,
) -> Result<Box<dyn DeliveryProvider>, DeliveryError> {
    match settings.provider.as_str() {
        email::PROVIDER_NAME => {
            let credentials = match credentials {
                Some(credentials) => credentials,
                None => EmailCredentials::from_env()?,
            };
            Ok(Box::new(email::EmailDeliveryProvider::new(
                credentials,
                DeliveryConfig::from(settings),
            )))
        }
        other => Err(DeliveryError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_a_distinct_error() {
        let settings = DeliverySettings {
            provider: "pigeon".to_string(),
            ..DeliverySettings::default()
        };
        let credentials = EmailCredentials {
            sender: "a@example.com".to_string(),
            app_password: "abcdabcdabcdabcd".to_string(),
        };
        let err = create_provider(&settings, Some(credentials))
            .map(|_| ())
            .expect_err("unrecognized provider id must fail");
        match err {
            DeliveryError::UnknownProvider(name) => assert_eq!(name, "pigeon"),
            other => panic!("expected UnknownProvider, got {other:?}"),
        }
    }
}
