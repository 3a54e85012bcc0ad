//! Theme and device-classification resolution
//!
//! Resolves the presentation attributes of a request from layered
//! override sources, with higher precedence first:
//!
//! 1. The `theme` value stored in the caller's session, if not blank.
//! 2. The theme of the registered service matching the candidate.
//! 3. A theme mapped from the `Host` header.
//! 4. The configured default theme.
//!
//! Device classification is independent of theme precedence: the first
//! configured rule whose expression fully matches the `User-Agent`
//! header sets `isMobile` and `browserType`.
//!
//! The resolved values are returned and also written into the request
//! attribute bag; downstream consumers read either surface.

mod session;

pub use session::{MemorySessionStore, SessionStore};

use crate::registry::ServiceRegistry;
use crate::{CandidateService, RequestContext};
use arc_swap::ArcSwap;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Request attribute holding the resolved theme
pub const THEME_ATTRIBUTE: &str = "theme";
/// Request attribute set to `"true"` for mobile user agents
pub const IS_MOBILE_ATTRIBUTE: &str = "isMobile";
/// Request attribute holding the matched browser classification
pub const BROWSER_TYPE_ATTRIBUTE: &str = "browserType";

/// Session key holding the theme override
pub const SESSION_THEME_KEY: &str = "theme";

/// Theme used when no override source produces a value
pub const DEFAULT_THEME_NAME: &str = "default";

// Passing the session key itself as an override means "reset".
const OVERRIDE_RESET: &str = "theme";

/// One device-classification rule: a full-match user-agent expression
/// and the browser label it assigns
#[derive(Debug, Clone)]
pub struct DeviceRule {
    raw: String,
    expr: Regex,
    browser_type: String,
}

impl DeviceRule {
    /// Compile a rule, failing loudly on a malformed expression
    pub fn new(pattern: &str, browser_type: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            raw: pattern.to_string(),
            expr: Regex::new(&format!(r"\A(?:{pattern})\z"))?,
            browser_type: browser_type.into(),
        })
    }

    /// The expression as configured
    pub fn pattern(&self) -> &str {
        &self.raw
    }

    /// The browser classification this rule assigns
    pub fn browser_type(&self) -> &str {
        &self.browser_type
    }
}

/// Attributes resolved for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAttributes {
    /// Effective theme, always present
    pub theme: String,
    /// Whether a device rule classified the user agent as mobile
    pub is_mobile: bool,
    /// Browser classification from the matching device rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_type: Option<String>,
}

/// Read-mostly resolver configuration, replaced wholesale on reload
#[derive(Debug, Clone)]
struct ResolverSnapshot {
    default_theme: String,
    host_header_themes: HashMap<String, String>,
    device_rules: Vec<DeviceRule>,
}

impl Default for ResolverSnapshot {
    fn default() -> Self {
        Self {
            default_theme: DEFAULT_THEME_NAME.to_string(),
            host_header_themes: HashMap::new(),
            device_rules: Vec::new(),
        }
    }
}

/// Resolves theme and device classification per request
pub struct ThemeResolver {
    registry: Arc<dyn ServiceRegistry>,
    sessions: Arc<dyn SessionStore>,
    snapshot: ArcSwap<ResolverSnapshot>,
}

impl ThemeResolver {
    /// Create a resolver over a service registry and a session store
    pub fn new(registry: Arc<dyn ServiceRegistry>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            registry,
            sessions,
            snapshot: ArcSwap::from_pointee(ResolverSnapshot::default()),
        }
    }

    /// Replace the default theme
    pub fn set_default_theme(&self, theme: impl Into<String>) {
        let mut next = ResolverSnapshot::clone(&self.snapshot.load());
        next.default_theme = theme.into();
        self.snapshot.store(Arc::new(next));
    }

    /// Replace the whole host-to-theme override map.
    ///
    /// Keys are case-folded at load time. The swap is atomic; concurrent
    /// readers see either the old map or the new one, never a mix.
    pub fn set_host_header_themes(&self, themes: HashMap<String, String>) {
        let mut next = ResolverSnapshot::clone(&self.snapshot.load());
        next.host_header_themes = themes
            .into_iter()
            .map(|(host, theme)| (host.to_lowercase(), theme))
            .collect();
        self.snapshot.store(Arc::new(next));
    }

    /// Replace the whole device-classification rule list.
    ///
    /// Rules are evaluated in the given order, first full match wins.
    pub fn set_device_rules(&self, rules: Vec<DeviceRule>) {
        let mut next = ResolverSnapshot::clone(&self.snapshot.load());
        next.device_rules = rules;
        self.snapshot.store(Arc::new(next));
    }

    /// Resolve the theme and device classification for one request.
    ///
    /// Never fails: every absent or unusable tier is skipped and the
    /// default theme terminates the walk. The results are written into
    /// the request attribute bag as well as returned.
    pub fn resolve(
        &self,
        ctx: &mut RequestContext,
        candidate: Option<&CandidateService>,
    ) -> ResolvedAttributes {
        let snapshot = self.snapshot.load();

        let theme = self.resolve_theme(ctx, candidate, &snapshot);
        let browser_type = classify_device(ctx.user_agent.as_deref(), &snapshot.device_rules);

        ctx.set_attribute(THEME_ATTRIBUTE, theme.clone());
        if let Some(browser) = &browser_type {
            ctx.set_attribute(IS_MOBILE_ATTRIBUTE, "true");
            ctx.set_attribute(BROWSER_TYPE_ATTRIBUTE, browser.clone());
        }

        ResolvedAttributes {
            theme,
            is_mobile: browser_type.is_some(),
            browser_type,
        }
    }

    /// Store or clear the session-scoped theme override.
    ///
    /// `None` or the literal `"theme"` clears any stored override without
    /// creating a session; any other value is persisted, creating the
    /// session if the request has none yet. Host-header and registry
    /// configuration are never touched.
    pub fn set_override(&self, ctx: &mut RequestContext, theme: Option<&str>) {
        match theme {
            None | Some(OVERRIDE_RESET) => {
                if let Some(session_id) = &ctx.session_id {
                    self.sessions.remove(session_id, SESSION_THEME_KEY);
                    tracing::debug!(session = %session_id, "Cleared session theme override");
                }
            }
            Some(theme) => {
                let session_id = ctx
                    .session_id
                    .get_or_insert_with(|| Uuid::new_v4().to_string())
                    .clone();
                self.sessions.insert(&session_id, SESSION_THEME_KEY, theme);
                tracing::debug!(session = %session_id, theme = %theme, "Stored session theme override");
            }
        }
    }

    fn resolve_theme(
        &self,
        ctx: &RequestContext,
        candidate: Option<&CandidateService>,
        snapshot: &ResolverSnapshot,
    ) -> String {
        if let Some(session_id) = &ctx.session_id {
            if let Some(theme) = self
                .sessions
                .get(session_id, SESSION_THEME_KEY)
                .and_then(non_blank)
            {
                tracing::debug!(theme = %theme, source = "session", "Resolved theme");
                return theme;
            }
        }

        if let Some(service) = self.registry.find_service_by(candidate) {
            if let Some(theme) = service.theme.and_then(non_blank) {
                tracing::debug!(theme = %theme, source = "registry", "Resolved theme");
                return theme;
            }
        }

        if let Some(host) = &ctx.host {
            if let Some(theme) = snapshot
                .host_header_themes
                .get(&host.to_lowercase())
                .cloned()
                .and_then(non_blank)
            {
                tracing::debug!(theme = %theme, source = "host-header", "Resolved theme");
                return theme;
            }
        }

        tracing::debug!(theme = %snapshot.default_theme, source = "default", "Resolved theme");
        snapshot.default_theme.clone()
    }
}

/// First rule fully matching the user agent wins, in configured order
fn classify_device(user_agent: Option<&str>, rules: &[DeviceRule]) -> Option<String> {
    let user_agent = user_agent?;
    let rule = rules.iter().find(|rule| rule.expr.is_match(user_agent))?;
    tracing::debug!(
        browser_type = %rule.browser_type,
        pattern = %rule.raw,
        "Classified user agent"
    );
    Some(rule.browser_type.clone())
}

/// Blank or whitespace-only overrides count as absent
fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
