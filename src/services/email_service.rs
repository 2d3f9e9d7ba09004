use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

/// Posts outbound mail to the platform's email dispatch function.
///
/// Fire-and-forget: a failure is logged and never surfaced to callers, so a
/// broken mail pipeline cannot roll back a status transition.
#[derive(Clone)]
pub struct EmailService {
    client: Client,
    dispatch_url: Option<String>,
}

impl EmailService {
    pub fn new(dispatch_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            dispatch_url,
        }
    }

    pub async fn send_best_effort(&self, to: &[String], title: &str, message: &str, mail_type: &str) {
        let Some(url) = self.dispatch_url.as_deref() else {
            info!("Email dispatch URL not configured, skipping outbound mail");
            return;
        };
        if to.is_empty() {
            return;
        }

        let payload = json!({
            "to": to,
            "title": title,
            "message": message,
            "type": mail_type,
        });

        match self.client.post(url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(recipients = to.len(), "Outbound mail dispatched");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Email dispatch function returned an error");
            }
            Err(err) => {
                warn!(error = ?err, "Failed to reach email dispatch function");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_dispatch_is_a_silent_no_op() {
        let mailer = EmailService::new(None);
        mailer
            .send_best_effort(
                &["admin@example.com".to_string()],
                "Lien de signature expiré",
                "test",
                "signature_link_expired",
            )
            .await;
    }

    #[tokio::test]
    async fn empty_recipient_list_skips_dispatch() {
        // A configured URL must not be hit for zero recipients.
        let mailer = EmailService::new(Some("http://127.0.0.1:9/never".to_string()));
        mailer.send_best_effort(&[], "title", "message", "test").await;
    }
}
