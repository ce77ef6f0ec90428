//! Gmail REST adapter.
//!
//! Lists recent message ids and fetches message metadata one request per
//! candidate. Access tokens come from a `TokenProvider`; the OAuth
//! authorization flow itself lives outside the core.
//!
//! Message ids are only placed in a request path when they consist of
//! URL-safe characters; anything else is skipped without a request.

use crate::config::GmailConfig;
use crate::source::email::{email_to_task, EmailMessage};
use crate::source::{
    Conversion, RawCandidate, SourceAdapter, SourceError, SourceResult, SourceStage,
};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const GMAIL_SOURCE_ID: &str = "gmail";

static MESSAGE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("valid message id regex"));

/// Supplies bearer tokens for authenticated requests.
pub trait TokenProvider {
    fn access_token(&self) -> SourceResult<String>;
}

/// Token provider backed by an already-issued access token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    fn access_token(&self) -> SourceResult<String> {
        let token = self.0.trim();
        if token.is_empty() {
            return Err(SourceError::new(
                GMAIL_SOURCE_ID,
                SourceStage::Auth,
                "missing_token",
                "access token is empty",
                false,
            ));
        }
        Ok(token.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// Source adapter for the Gmail `users.messages` API.
pub struct GmailSource {
    api_base: String,
    max_results: u32,
    agent: ureq::Agent,
    tokens: Box<dyn TokenProvider>,
    access_token: Option<String>,
}

impl GmailSource {
    /// Builds an adapter whose HTTP calls are bounded by `timeout`.
    pub fn new(config: &GmailConfig, timeout: Duration, tokens: Box<dyn TokenProvider>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            max_results: config.max_results,
            agent,
            tokens,
            access_token: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    fn bearer(&self, stage: SourceStage) -> SourceResult<String> {
        match self.access_token.as_deref() {
            Some(token) => Ok(format!("Bearer {token}")),
            None => Err(SourceError::new(
                GMAIL_SOURCE_ID,
                stage,
                "not_authenticated",
                "authenticate() must succeed before fetching",
                false,
            )),
        }
    }
}

impl SourceAdapter for GmailSource {
    fn source_id(&self) -> &str {
        GMAIL_SOURCE_ID
    }

    fn authenticate(&mut self) -> SourceResult<()> {
        let token = self.tokens.access_token()?;
        self.access_token = Some(token);
        info!("event=source_auth module=source status=ok source_id={GMAIL_SOURCE_ID}");
        Ok(())
    }

    fn fetch_candidates(&mut self) -> SourceResult<Vec<RawCandidate>> {
        let bearer = self.bearer(SourceStage::List)?;
        let url = format!("{}/messages", self.api_base);
        let response = self
            .agent
            .get(&url)
            .query("maxResults", &self.max_results.to_string())
            .set("Authorization", &bearer)
            .call()
            .map_err(|err| transport_error(SourceStage::List, err))?;

        let list: MessageListResponse = response.into_json().map_err(|err| {
            SourceError::new(
                GMAIL_SOURCE_ID,
                SourceStage::List,
                "invalid_response",
                err.to_string(),
                false,
            )
        })?;

        debug!(
            "event=source_list module=source status=ok source_id={GMAIL_SOURCE_ID} count={}",
            list.messages.len()
        );
        Ok(list
            .messages
            .into_iter()
            .map(|message| {
                let payload = json!({ "id": message.id });
                RawCandidate::new(Some(message.id), payload)
            })
            .collect())
    }

    fn convert(&mut self, candidate: &RawCandidate) -> SourceResult<Conversion> {
        let Some(message_id) = candidate.natural_key.as_deref() else {
            return Ok(Conversion::Skipped("candidate has no message id".to_string()));
        };
        if !is_path_safe_id(message_id) {
            return Ok(Conversion::Skipped("message id is not URL-safe".to_string()));
        }
        let bearer = self.bearer(SourceStage::Fetch)?;
        let url = format!("{}/messages/{message_id}", self.api_base);
        let result = self
            .agent
            .get(&url)
            .query("format", "metadata")
            .set("Authorization", &bearer)
            .call();

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => {
                return Ok(Conversion::Skipped("message no longer exists".to_string()));
            }
            Err(err) => return Err(transport_error(SourceStage::Fetch, err)),
        };

        match response.into_json::<EmailMessage>() {
            Ok(message) => Ok(email_to_task(GMAIL_SOURCE_ID, &message)),
            Err(err) => Ok(Conversion::Skipped(format!(
                "undecodable message payload: {err}"
            ))),
        }
    }
}

fn is_path_safe_id(message_id: &str) -> bool {
    MESSAGE_ID_RE.is_match(message_id)
}

fn transport_error(stage: SourceStage, err: ureq::Error) -> SourceError {
    match err {
        ureq::Error::Status(status, _) => SourceError::new(
            GMAIL_SOURCE_ID,
            stage,
            format!("http_{status}"),
            format!("server responded with status {status}"),
            status == 429 || status >= 500,
        ),
        ureq::Error::Transport(transport) => SourceError::new(
            GMAIL_SOURCE_ID,
            stage,
            "transport",
            transport.to_string(),
            true,
        ),
    }
}
