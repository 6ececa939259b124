// src/email.rs
//
// Magic-link delivery through the Forward Email HTTP API. Without configured
// credentials (local development, tests) the link is logged instead of sent.

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct EmailResult {
    pub success: bool,
    pub error: Option<String>,
}

impl EmailResult {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

pub struct Mailer {
    client: reqwest::Client,
    api_url: String,
    credentials: Option<(String, String)>,
    ttl_minutes: i64,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Self {
        let credentials = match (&config.forwardemail_user, &config.forwardemail_pass) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        };

        Self {
            client: reqwest::Client::new(),
            api_url: config.forwardemail_api_url.clone(),
            credentials,
            ttl_minutes: config.magic_link_ttl_minutes,
        }
    }

    pub async fn send_magic_link(&self, to: &str, magic_link: &str) -> EmailResult {
        let subject = "Sign in to Class Portal";
        let text = format!(
            "Sign in to Class Portal\n\n\
             Click the link below to sign in. This link expires in {} minutes.\n\n\
             {}\n\n\
             If you didn't request this link, you can safely ignore this email.\n",
            self.ttl_minutes, magic_link
        );

        self.send(to, subject, &text).await
    }

    async fn send(&self, to: &str, subject: &str, text: &str) -> EmailResult {
        let Some((user, pass)) = &self.credentials else {
            tracing::info!(to, subject, body = text, "email delivery not configured, logging instead");
            return EmailResult::ok();
        };

        let payload = serde_json::json!({
            "from": user,
            "to": to,
            "subject": subject,
            "text": text,
        });

        let response = self
            .client
            .post(&self.api_url)
            .basic_auth(user, Some(pass))
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(to, "email sent");
                EmailResult::ok()
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                tracing::error!(to, %status, body, "email API rejected request");
                EmailResult::failed(format!("email API returned {status}"))
            }
            Err(e) => {
                tracing::error!(to, error = %e, "email request failed");
                EmailResult::failed(e.to_string())
            }
        }
    }
}
