use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::Code;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info};

use super::{DeliveryConfig, DeliveryError, DeliveryProvider, DeliveryResult, EmailCredentials};

pub const PROVIDER_NAME: &str = "email";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
/// 587 is the submission port: plain connect, then STARTTLS before AUTH.
pub const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SUBJECT: &str = "promptcast";
const APP_PASSWORD_LEN: usize = 16;

/// SMTP delivery backend authenticating with a Gmail-style app password.
///
/// App passwords are 16-character codes; the format check below catches
/// truncated paste jobs, it is not a credential verification.
pub struct EmailDeliveryProvider {
    sender: String,
    app_password: String,
    config: DeliveryConfig,
    smtp_host: String,
    smtp_port: u16,
}

impl EmailDeliveryProvider {
    pub fn new(credentials: EmailCredentials, config: DeliveryConfig) -> Self {
        Self::with_server(credentials, config, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT)
    }

    /// App passwords are often pasted with grouping spaces; they are stripped
    /// here so the format check and authentication see the canonical form.
    pub fn with_server(
        credentials: EmailCredentials,
        config: DeliveryConfig,
        smtp_host: &str,
        smtp_port: u16,
    ) -> Self {
        let app_password = credentials
            .app_password
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Self {
            sender: credentials.sender,
            app_password,
            config,
            smtp_host: smtp_host.to_string(),
            smtp_port,
        }
    }

    fn build_message(
        &self,
        content: &str,
        content_html: Option<&str>,
    ) -> Result<Message, DeliveryError> {
        let from: Mailbox = self.sender.parse().map_err(|err| {
            DeliveryError::Configuration(format!(
                "invalid sender address '{}': {err}",
                self.sender
            ))
        })?;

        let mut builder = Message::builder()
            .from(from)
            .subject(self.config.subject.as_deref().unwrap_or(DEFAULT_SUBJECT));
        for recipient in &self.config.recipients {
            let to: Mailbox = recipient.parse().map_err(|err| {
                DeliveryError::Configuration(format!(
                    "invalid recipient address '{recipient}': {err}"
                ))
            })?;
            builder = builder.to(to);
        }

        let body = match content_html {
            Some(html) => MultiPart::alternative_plain_html(content.to_string(), html.to_string()),
            None => MultiPart::alternative().singlepart(SinglePart::plain(content.to_string())),
        };

        builder
            .multipart(body)
            .map_err(|err| DeliveryError::Failed(format!("failed to build message: {err}")))
    }
}

impl DeliveryProvider for EmailDeliveryProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn validate_config(&self) -> Result<(), DeliveryError> {
        if self.config.recipients.is_empty() {
            return Err(DeliveryError::Configuration(
                "at least one recipient must be specified".to_string(),
            ));
        }
        if self.sender.trim().is_empty() {
            return Err(DeliveryError::Configuration(
                "sender address must be specified".to_string(),
            ));
        }
        if self.app_password.is_empty() {
            return Err(DeliveryError::Configuration(
                "app password must be specified".to_string(),
            ));
        }
        if self.app_password.len() != APP_PASSWORD_LEN {
            return Err(DeliveryError::Configuration(format!(
                "app password must be {APP_PASSWORD_LEN} characters, got {}",
                self.app_password.len()
            )));
        }
        Ok(())
    }

    fn deliver(
        &self,
        content: &str,
        content_html: Option<&str>,
    ) -> Result<DeliveryResult, DeliveryError> {
        let message = self.build_message(content, content_html)?;

        let transport = SmtpTransport::starttls_relay(&self.smtp_host)
            .map_err(|err| {
                DeliveryError::Connection(format!(
                    "failed to configure transport for {}:{}: {err}",
                    self.smtp_host, self.smtp_port
                ))
            })?
            .port(self.smtp_port)
            .credentials(Credentials::new(
                self.sender.clone(),
                self.app_password.clone(),
            ))
            .build();

        debug!(
            host = %self.smtp_host,
            port = self.smtp_port,
            recipients = self.config.recipients.len(),
            "sending message"
        );

        match transport.send(&message) {
            Ok(response) => {
                info!(
                    recipients = self.config.recipients.len(),
                    "message accepted by SMTP server"
                );
                Ok(DeliveryResult {
                    success: true,
                    message_id: response.message().next().map(|line| line.to_string()),
                    recipients_count: self.config.recipients.len(),
                    error: None,
                })
            }
            Err(err) => Err(classify_smtp_error(err)),
        }
    }
}

/// SMTP 534/535/538 are the authentication-failure replies. Errors carrying
/// any other server reply are protocol-level delivery failures; errors
/// without a reply never reached the server.
fn classify_smtp_error(err: lettre::transport::smtp::Error) -> DeliveryError {
    match err.status() {
        Some(code) if is_auth_code(code) => DeliveryError::Auth(err.to_string()),
        Some(_) => DeliveryError::Failed(err.to_string()),
        None => DeliveryError::Connection(err.to_string()),
    }
}

fn is_auth_code(code: Code) -> bool {
    matches!(code.to_string().as_str(), "534" | "535" | "538")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(password: &str) -> EmailCredentials {
        EmailCredentials {
            sender: "sender@example.com".to_string(),
            app_password: password.to_string(),
        }
    }

    fn config(recipients: &[&str]) -> DeliveryConfig {
        DeliveryConfig {
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            subject: None,
        }
    }

    #[test]
    fn whitespace_is_stripped_from_the_app_password() {
        let provider = EmailDeliveryProvider::new(
            credentials("abcd efgh ijkl mnop"),
            config(&["to@example.com"]),
        );
        assert!(provider.validate_config().is_ok());
    }

    #[test]
    fn validation_requires_at_least_one_recipient() {
        let provider = EmailDeliveryProvider::new(credentials("abcdefghijklmnop"), config(&[]));
        assert!(matches!(
            provider.validate_config(),
            Err(DeliveryError::Configuration(_))
        ));
    }

    #[test]
    fn validation_requires_a_sender() {
        let mut creds = credentials("abcdefghijklmnop");
        creds.sender = String::new();
        let provider = EmailDeliveryProvider::new(creds, config(&["to@example.com"]));
        assert!(matches!(
            provider.validate_config(),
            Err(DeliveryError::Configuration(_))
        ));
    }

    #[test]
    fn validation_rejects_wrong_length_passwords() {
        let provider =
            EmailDeliveryProvider::new(credentials("tooshort"), config(&["to@example.com"]));
        let err = provider.validate_config().unwrap_err();
        assert!(matches!(err, DeliveryError::Configuration(_)), "got {err:?}");
    }

    #[test]
    fn message_subject_falls_back_to_the_default() {
        let provider = EmailDeliveryProvider::new(
            credentials("abcdefghijklmnop"),
            config(&["to@example.com"]),
        );
        let message = provider.build_message("hello", None).expect("message");
        let rendered = String::from_utf8(message.formatted()).expect("utf8");
        assert!(rendered.contains(&format!("Subject: {DEFAULT_SUBJECT}")));
    }

    #[test]
    fn html_alternative_is_attached_when_supplied() {
        let provider = EmailDeliveryProvider::new(
            credentials("abcdefghijklmnop"),
            DeliveryConfig {
                recipients: vec!["to@example.com".to_string()],
                subject: Some("Daily Briefing".to_string()),
            },
        );
        let message = provider
            .build_message("hello", Some("<p>hello</p>"))
            .expect("message");
        let rendered = String::from_utf8(message.formatted()).expect("utf8");
        assert!(rendered.contains("Subject: Daily Briefing"));
        assert!(rendered.contains("multipart/alternative"));
        assert!(rendered.contains("text/html"));
    }

    #[test]
    fn invalid_recipient_is_a_configuration_error() {
        let provider = EmailDeliveryProvider::new(
            credentials("abcdefghijklmnop"),
            config(&["not an address"]),
        );
        let err = provider.build_message("hello", None).unwrap_err();
        assert!(matches!(err, DeliveryError::Configuration(_)), "got {err:?}");
    }
}
