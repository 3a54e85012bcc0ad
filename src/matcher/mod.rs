//! Service identifier matching for registered access patterns
//!
//! An access pattern decides whether a candidate service identifier is
//! authorized to participate in sign-on. The matching scheme is selected
//! by an optional prefix on the configured string:
//!
//! - `regex:` match the whole identifier against a regular expression
//! - `domain:` match the identifier's host against a single domain
//! - `domainlist:` match against any of a comma-separated list of domains
//! - anything else: Ant-style glob over the whole identifier
//!
//! The scheme is decided once when the pattern is parsed and carries its
//! own precompiled state, so matching on the request path does no prefix
//! re-parsing and no pattern compilation. Malformed patterns are rejected
//! at parse time; matching itself never fails, it only declines.

use crate::CandidateService;
use glob::{MatchOptions, Pattern};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors raised while parsing an access pattern
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(#[from] glob::PatternError),
}

/// The matching scheme of an access pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    /// Ant-style glob over the full identifier (the default scheme)
    Glob,
    /// Full-match regular expression over the full identifier
    Regex,
    /// Host match against a single domain, subdomains included
    Domain,
    /// Host match against any of a list of domains
    DomainList,
}

impl std::fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemeKind::Glob => write!(f, "glob"),
            SchemeKind::Regex => write!(f, "regex"),
            SchemeKind::Domain => write!(f, "domain"),
            SchemeKind::DomainList => write!(f, "domainlist"),
        }
    }
}

/// Compiled matcher state, one variant per scheme
#[derive(Debug, Clone)]
enum MatchScheme {
    Glob(Pattern),
    Regex(Regex),
    Domain(String),
    DomainList(Vec<String>),
}

/// A registered authorization rule for candidate service identifiers.
///
/// The compiled state is derived from the raw string once, at parse
/// time, and is immutable afterwards. Changing a pattern means parsing
/// a new `AccessPattern`, so stale compiled state cannot be observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessPattern {
    raw: String,
    scheme: MatchScheme,
}

impl AccessPattern {
    /// Parse a configured pattern string, compiling its matcher state.
    ///
    /// Fails loudly on a malformed regular expression or glob so that
    /// bad configuration surfaces at load time, not during matching.
    pub fn parse(raw: impl Into<String>) -> Result<Self, PatternError> {
        let raw = raw.into();

        let scheme = if let Some(expr) = raw.strip_prefix("regex:") {
            // Whole-identifier match, like Java's Matcher.matches. The
            // expression itself is compiled as written; only the
            // candidate is case-folded.
            MatchScheme::Regex(Regex::new(&format!(r"\A(?:{expr})\z"))?)
        } else if let Some(name) = raw.strip_prefix("domain:") {
            MatchScheme::Domain(normalize_domain(name))
        } else if let Some(list) = raw.strip_prefix("domainlist:") {
            MatchScheme::DomainList(list.split(',').map(normalize_domain).collect())
        } else {
            MatchScheme::Glob(Pattern::new(&raw.to_lowercase())?)
        };

        Ok(Self { raw, scheme })
    }

    /// The configured pattern string as written
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Which matching scheme this pattern uses
    pub fn kind(&self) -> SchemeKind {
        match self.scheme {
            MatchScheme::Glob(_) => SchemeKind::Glob,
            MatchScheme::Regex(_) => SchemeKind::Regex,
            MatchScheme::Domain(_) => SchemeKind::Domain,
            MatchScheme::DomainList(_) => SchemeKind::DomainList,
        }
    }

    /// Decide whether a candidate service identifier matches.
    ///
    /// Fails closed: an empty pattern never matches, and a candidate
    /// that cannot be parsed as a URL never matches a domain scheme.
    pub fn matches(&self, candidate: &CandidateService) -> bool {
        if self.raw.trim().is_empty() {
            return false;
        }

        let id = candidate.id().to_lowercase();

        match &self.scheme {
            MatchScheme::Glob(pattern) => pattern.matches_with(&id, ant_style()),
            MatchScheme::Regex(expr) => expr.is_match(&id),
            MatchScheme::Domain(domain) => {
                candidate_host(&id).is_some_and(|host| host_matches(&host, domain))
            }
            MatchScheme::DomainList(domains) => candidate_host(&id)
                .is_some_and(|host| domains.iter().any(|domain| host_matches(&host, domain))),
        }
    }
}

impl TryFrom<String> for AccessPattern {
    type Error = PatternError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<AccessPattern> for String {
    fn from(pattern: AccessPattern) -> Self {
        pattern.raw
    }
}

impl std::fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Ant-style wildcards: `*` and `?` stay within a path segment, `**`
/// crosses segments. Case folding happens before matching.
fn ant_style() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Trim, case-fold and strip one leading dot from a configured domain
fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().to_lowercase();
    match domain.strip_prefix('.') {
        Some(rest) => rest.to_string(),
        None => domain,
    }
}

/// Extract the host of an already lower-cased candidate identifier.
/// Returns `None` for anything that does not parse as a URL with a host.
fn candidate_host(id: &str) -> Option<String> {
    let url = Url::parse(id).ok()?;
    url.host_str().map(str::to_string)
}

/// Exact host or subdomain-of-domain match
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}
