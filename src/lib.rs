//! Portcullis - policy resolution core for a single-sign-on gateway
//!
//! Portcullis answers two per-request questions for an SSO gateway:
//! whether the application presenting itself at a request matches a
//! registered access pattern (and so may participate in sign-on), and
//! which theme and device classification apply to the request, resolved
//! across session, registry, host-header and default sources.
//!
//! Both decisions are deterministic and fail closed: a malformed
//! candidate, an empty pattern or an absent input never grants access
//! or aborts the request.

pub mod config;
pub mod matcher;
pub mod registry;
pub mod resolver;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Core error types for Portcullis
#[derive(Error, Debug)]
pub enum PortcullisError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Access pattern error: {0}")]
    Pattern(#[from] matcher::PatternError),
}

/// The identifier of the application requesting sign-on.
///
/// A URL-like string, immutable for the duration of one request. How it
/// is derived from the inbound network request is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateService {
    id: String,
}

impl CandidateService {
    /// Create a candidate service from its identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The identifier as presented, case preserved
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl From<&str> for CandidateService {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CandidateService {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for CandidateService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Context for a request being resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier
    pub request_id: String,
    /// When the request was received
    pub timestamp: DateTime<Utc>,
    /// `Host` header, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// `User-Agent` header, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Identifier of the caller's session, if one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Per-request attribute bag read by downstream consumers
    #[serde(default)]
    attributes: HashMap<String, String>,
}

impl RequestContext {
    /// Create a new request context with generated ID
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            host: None,
            user_agent: None,
            session_id: None,
            attributes: HashMap::new(),
        }
    }

    /// Set the `Host` header value
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the `User-Agent` header value
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Attach an existing session identifier
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Write an attribute into the request attribute bag
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Read an attribute from the request attribute bag
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
