use crate::base::{Config, IxError, IxResult};
use bigdecimal::BigDecimal;
use lettre::Message;
use rocket::tokio::time;
use rusoto_ses::{RawMessage, SendRawEmailRequest, Ses, SesClient};
use slog_scope::{info, warn};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct InvoiceNotification {
    pub user_email: String,
    pub supplier_name: String,
    pub total_amount: BigDecimal,
    pub file_url: String,
}

#[derive(Clone)]
struct EmailChannel {
    ses: SesClient,
    from: String,
    to: String,
}

#[derive(Clone)]
pub struct Notifier {
    channel: Option<EmailChannel>,
    timeout: Duration,
}

impl Notifier {
    pub fn from_config(config: &Config) -> Notifier {
        let channel = match (&config.notify_from, &config.notify_to) {
            (Some(from), Some(to)) => Some(EmailChannel {
                ses: SesClient::new(config.region()),
                from: from.clone(),
                to: to.clone(),
            }),
            _ => None,
        };
        Notifier {
            channel,
            timeout: Duration::from_secs(config.notify_timeout_secs),
        }
    }

    // Fire and forget: the ingest response never waits on this, and a delivery
    // failure is logged and swallowed.
    pub fn dispatch(&self, event: InvoiceNotification) {
        let notifier = self.clone();
        rocket::tokio::spawn(async move {
            if let Err(e) = notifier.send(event).await {
                warn!("invoice notification failed"; "error" => %e);
            }
        });
    }

    async fn send(&self, event: InvoiceNotification) -> IxResult<()> {
        let channel = match &self.channel {
            Some(channel) => channel,
            None => {
                info!("notification skipped, no email channel configured");
                return Ok(());
            }
        };

        let body = format!(
            "A new invoice was processed.\n\nSupplier: {}\nTotal: {}\nFile: {}\nUploaded by: {}\n",
            event.supplier_name, event.total_amount, event.file_url, event.user_email
        );
        let email = Message::builder()
            .from(channel.from.parse().map_err(|e| {
                IxError::NotificationFailed(format!("bad from address: {}", e))
            })?)
            .to(channel.to.parse().map_err(|e| {
                IxError::NotificationFailed(format!("bad to address: {}", e))
            })?)
            .subject(format!("New invoice from {}", event.supplier_name))
            .body(body)
            .map_err(|e| IxError::NotificationFailed(e.to_string()))?;

        let request = SendRawEmailRequest {
            raw_message: RawMessage {
                data: base64::encode(email.formatted()).into(),
            },
            ..Default::default()
        };

        let sent = time::timeout(self.timeout, channel.ses.send_raw_email(request))
            .await
            .map_err(|_| IxError::NotificationFailed(String::from("delivery timed out")))?
            .map_err(|e| IxError::NotificationFailed(e.to_string()))?;
        info!("invoice notification delivered"; "message_id" => %sent.message_id);
        Ok(())
    }
}
