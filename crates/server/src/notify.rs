use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{error, info};

use tripdesk_core::config::NotificationConfig;
use tripdesk_core::domain::travel_request::{TravelMode, TravelRequest};

const EMAIL_TEMPLATE: &str = "email/new_request.html";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email template failed to render: {0}")]
    Template(#[from] tera::Error),
    #[error("email transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("email api responded with {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Side channel told about newly created requests.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn new_request(&self, request: &TravelRequest) -> Result<(), NotifyError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn new_request(&self, _request: &TravelRequest) -> Result<(), NotifyError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: String,
    html: String,
}

/// Sends an HTML e-mail through a Resend-compatible JSON API.
pub struct HttpEmailNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    from: String,
    recipients: Vec<String>,
    templates: Arc<Tera>,
}

impl HttpEmailNotifier {
    pub fn new(
        config: &NotificationConfig,
        api_key: SecretString,
        templates: Arc<Tera>,
    ) -> Result<Self, NotifyError> {
        let client =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            from: config.from.clone(),
            recipients: config.recipients.clone(),
            templates,
        })
    }
}

#[async_trait]
impl Notifier for HttpEmailNotifier {
    async fn new_request(&self, request: &TravelRequest) -> Result<(), NotifyError> {
        let payload = EmailPayload {
            from: &self.from,
            to: &self.recipients,
            subject: email_subject(request),
            html: render_email(&self.templates, request)?,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

/// Picks the notifier for `config`. Anything short of enabled-with-key gets the no-op.
pub fn from_config(
    config: &NotificationConfig,
    templates: Arc<Tera>,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    match (&config.api_key, config.is_active()) {
        (Some(key), true) => Ok(Arc::new(HttpEmailNotifier::new(config, key.clone(), templates)?)),
        _ => Ok(Arc::new(NoopNotifier)),
    }
}

pub fn email_subject(request: &TravelRequest) -> String {
    format!("New Travel Request: {} - {}", request.employee_name, request.route_label())
}

pub fn render_email(templates: &Tera, request: &TravelRequest) -> Result<String, tera::Error> {
    let mut context = Context::new();
    context.insert("request", request);
    context.insert("is_flight", &(request.travel_mode == TravelMode::Flight));
    context.insert("route", &request.route_label());
    context.insert("services", &request.service_labels());
    context.insert("start_date", &request.start_date.format("%d %b %Y").to_string());
    context.insert("end_date", &request.end_date.format("%d %b %Y").to_string());
    templates.render(EMAIL_TEMPLATE, &context)
}

/// Fires the notification on a detached task. The caller never waits and never sees failures.
pub fn spawn_new_request(notifier: Arc<dyn Notifier>, request: TravelRequest, correlation_id: String) {
    if !notifier.is_enabled() {
        return;
    }

    tokio::spawn(async move {
        match notifier.new_request(&request).await {
            Ok(()) => info!(
                event_name = "notification.email.sent",
                correlation_id = %correlation_id,
                request_id = %request.id,
                "new request notification sent"
            ),
            Err(error) => error!(
                event_name = "notification.email.failed",
                correlation_id = %correlation_id,
                request_id = %request.id,
                error = %error,
                "new request notification failed"
            ),
        }
    });
}
