//! SMTP delivery via an authenticated relay.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::Response;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::archive::ArchiveFile;
use crate::config::NotifyConfig;
use crate::error::{
    AttachmentTypeSnafu, BuildMessageSnafu, NotifyError, ReadAttachmentSnafu, RelaySnafu,
    SenderSnafu, TransportSnafu,
};
use crate::grid::RunSummary;

use super::{Delivery, Notifier, render_html};

/// MIME type of the attached workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Port on which the relay speaks TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Sends reports through an SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    subject: String,
}

impl SmtpNotifier {
    /// Build the relay transport. No connection is made until the first send.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let from = config.sender().context(SenderSnafu)?;
        let to = config.recipient_mailboxes().context(SenderSnafu)?;

        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        }
        .context(RelaySnafu {
            host: &config.smtp_host,
        })?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.timeout()))
            .build();

        debug!(
            host = %config.smtp_host,
            port = config.smtp_port,
            recipients = to.len(),
            "SMTP transport configured"
        );

        Ok(Self {
            transport,
            from,
            to,
            subject: config.subject.clone(),
        })
    }

    /// Compose the report: one message, every recipient on the To line.
    pub fn build_message(
        &self,
        summary: &RunSummary,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<Message, NotifyError> {
        let content_type = ContentType::parse(XLSX_CONTENT_TYPE).context(AttachmentTypeSnafu)?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(self.subject.as_str());
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        builder
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(render_html(summary)))
                    .singlepart(Attachment::new(file_name.to_string()).body(contents, content_type)),
            )
            .context(BuildMessageSnafu)
    }
}

/// Flatten a server reply into its code and message lines.
fn delivery_from(response: &Response) -> Delivery {
    Delivery {
        code: response.code().to_string(),
        message: response.message().collect::<Vec<_>>().join(" "),
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(
        &self,
        summary: &RunSummary,
        archive: &ArchiveFile,
    ) -> Result<Delivery, NotifyError> {
        let contents = tokio::fs::read(&archive.path)
            .await
            .context(ReadAttachmentSnafu {
                path: &archive.path,
            })?;
        let message = self.build_message(summary, &archive.file_name(), contents)?;

        let response = self.transport.send(message).await.context(TransportSnafu)?;
        let delivery = delivery_from(&response);

        info!(code = %delivery.code, message = %delivery.message, "Email sent");
        Ok(delivery)
    }
}
