//! HTTP client for the finance backend
//!
//! Thin reqwest wrapper over the reminder and notification-preference
//! endpoints. Authentication is a bearer token.

use crate::api::models::{
    CreateReminderRequest, NotificationPreferences, Reminder, ReminderId, ReminderScope,
};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Anything the poller can fetch reminders from
#[async_trait]
pub trait ReminderSource: Send + Sync {
    async fn list_reminders(&self, scope: ReminderScope) -> Result<Vec<Reminder>>;
}

/// REST client for the reminders backend
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::Config("API base URL is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("alarm-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL listing reminders for a scope
    pub fn reminders_url(&self, scope: ReminderScope) -> String {
        match scope {
            ReminderScope::Global => format!("{}/reminders", self.base_url),
            ReminderScope::Account(id) => format!("{}/accounts/{}/reminders", self.base_url, id),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map non-2xx responses to `AppError::Api`
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self.authorize(self.http.get(url)).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// List all reminders visible in a scope
    pub async fn fetch_reminders(&self, scope: ReminderScope) -> Result<Vec<Reminder>> {
        self.get_json(&self.reminders_url(scope)).await
    }

    /// Create a new reminder
    pub async fn create_reminder(&self, request: &CreateReminderRequest) -> Result<Reminder> {
        let url = format!("{}/reminders", self.base_url);
        tracing::info!("Creating reminder at {}", request.reminder_time);

        let response = self
            .authorize(self.http.post(&url).json(request))
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json::<Reminder>().await?)
    }

    /// Delete a reminder
    pub async fn delete_reminder(&self, id: &ReminderId) -> Result<()> {
        let url = format!("{}/reminders/{}", self.base_url, id);
        tracing::info!("Deleting reminder {}", id);

        let response = self.authorize(self.http.delete(&url)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Fetch the user's notification preferences
    pub async fn fetch_notification_preferences(&self) -> Result<NotificationPreferences> {
        self.get_json(&format!("{}/notification-preferences", self.base_url))
            .await
    }
}

#[async_trait]
impl ReminderSource for ApiClient {
    async fn list_reminders(&self, scope: ReminderScope) -> Result<Vec<Reminder>> {
        self.fetch_reminders(scope).await
    }
}
