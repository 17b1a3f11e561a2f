use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tokio::time::sleep;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;
const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Email recipient is invalid: {0}")]
    InvalidRecipient(String),

    #[error("RESEND_API_KEY is not configured")]
    NotConfigured,

    #[error("Failed after {retries} retries: {message}")]
    Delivery { retries: u32, message: String },
}

/// Sends transactional email through the Resend API.
#[derive(Debug, Clone)]
pub struct Mailer {
    client: Client,
    api_key: Option<String>,
    from_email: String,
}

impl Mailer {
    pub fn new(api_key: Option<String>, from_email: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Mailer {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            from_email,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fills `template` and sends it. Placeholder values are HTML-escaped.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        template: &str,
        placeholders: &[(&str, String)],
    ) -> Result<(), MailError> {
        if to_email.is_empty() || !to_email.contains('@') {
            return Err(MailError::InvalidRecipient(to_email.to_string()));
        }

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            tracing::warn!("Email to {} skipped, Resend is not configured", to_email);
            MailError::NotConfigured
        })?;

        let html_body = render_template(template, placeholders);
        self.send_with_retries(api_key, to_email, subject, &html_body).await
    }

    async fn send_with_retries(
        &self,
        api_key: &str,
        to_email: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), MailError> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_via_resend(api_key, to_email, subject, html_body).await {
                Ok(email_id) => {
                    tracing::info!("Email sent to {} (id: {})", to_email, email_id);
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < MAX_RETRIES {
                        let delay = RETRY_DELAY_MS * (2_u64.pow(attempt - 1));
                        tracing::warn!(
                            "Email send attempt {} failed for {}. Retrying in {}ms...",
                            attempt,
                            to_email,
                            delay
                        );
                        sleep(Duration::from_millis(delay)).await;
                    }
                }
            }
        }

        let message = last_error.unwrap_or_else(|| "Unknown email sending error".to_string());
        tracing::error!("Email failed for {}: {}", to_email, message);
        Err(MailError::Delivery {
            retries: MAX_RETRIES,
            message,
        })
    }

    async fn send_via_resend(
        &self,
        api_key: &str,
        to_email: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<String, String> {
        let request_body = json!({
            "from": self.from_email,
            "to": to_email,
            "subject": subject,
            "html": html_body,
        });

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .unwrap_or_else(|_| "No response body".to_string());

        if status.is_success() {
            let id = serde_json::from_str::<serde_json::Value>(&response_text)
                .ok()
                .and_then(|body| body.get("id").and_then(|v| v.as_str()).map(str::to_string))
                .unwrap_or_else(|| "success".to_string());
            Ok(id)
        } else {
            Err(format!(
                "Resend API error ({}): {}",
                status.as_u16(),
                response_text
            ))
        }
    }
}

/// Replaces `{{name}}` markers. Values are escaped and newlines become `<br>`.
pub fn render_template(template: &str, placeholders: &[(&str, String)]) -> String {
    let mut html = template.to_string();
    for (key, value) in placeholders {
        let escaped = value
            .lines()
            .map(ammonia::clean_text)
            .collect::<Vec<_>>()
            .join("<br>");
        html = html.replace(&format!("{{{{{}}}}}", key), &escaped);
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_escaped() {
        let html = render_template(
            "<p>Hola {{name}}</p><p>{{message}}</p>",
            &[
                ("name", "Ana".to_string()),
                ("message", "<script>alert(1)</script>".to_string()),
            ],
        );
        assert!(html.starts_with("<p>Hola Ana</p>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn newlines_become_line_breaks() {
        let html = render_template("{{body}}", &[("body", "uno\ndos".to_string())]);
        assert_eq!(html, "uno<br>dos");
    }

    #[tokio::test]
    async fn unconfigured_mailer_refuses_to_send() {
        let mailer = Mailer::new(None, "Inmobiliaria <noreply@inmobiliaria.app>".to_string(), Duration::from_secs(1));
        assert!(!mailer.is_configured());

        let err = mailer
            .send_email("ana@example.com", "Hola", "{{x}}", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::NotConfigured));

        let err = mailer.send_email("not-an-email", "Hola", "", &[]).await.unwrap_err();
        assert!(matches!(err, MailError::InvalidRecipient(_)));
    }
}
