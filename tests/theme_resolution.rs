//! Integration tests for the resolution core
//!
//! Tests the full flow: config file -> registry -> theme resolver.

use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;

use portcullis::config::{Config, ConfigError};
use portcullis::registry::{InMemoryServiceRegistry, ServiceRegistry};
use portcullis::resolver::{
    MemorySessionStore, ThemeResolver, BROWSER_TYPE_ATTRIBUTE, IS_MOBILE_ATTRIBUTE,
    THEME_ATTRIBUTE,
};
use portcullis::{CandidateService, RequestContext};

const CONFIG: &str = r#"
[themes]
default = "campus"

[themes.host_overrides]
"cas.domain1.com" = "domain1theme"

[[device_rules]]
pattern = ".*iPhone.*"
browser_type = "iphone"

[[device_rules]]
pattern = ".*(Android|Mobile).*"
browser_type = "generic-mobile"

[[services]]
name = "intranet"
service_id = "domain:example.com"
theme = "corp"

[[services]]
name = "partner"
service_id = "regex:^https://portal\\.partner\\.net/.*$"

[[services]]
name = "retired"
service_id = "https://retired.example.org/**"
enabled = false
"#;

/// Build a wired resolver from a parsed configuration
fn wire(config: &Config) -> (ThemeResolver, Arc<InMemoryServiceRegistry>) {
    let registry = Arc::new(InMemoryServiceRegistry::new());
    registry.load_services(config.services.clone());

    let resolver = ThemeResolver::new(registry.clone(), Arc::new(MemorySessionStore::new()));
    resolver.set_default_theme(&config.default_theme);
    resolver.set_host_header_themes(config.host_header_themes.clone());
    resolver.set_device_rules(config.device_rules.clone());

    (resolver, registry)
}

/// Config load from disk, then authorization matching against it
#[tokio::test]
async fn test_load_config_and_authorize_candidates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("portcullis.toml");
    tokio::fs::write(&path, CONFIG).await.unwrap();

    let config = Config::load(&path).await.unwrap();
    let (_, registry) = wire(&config);

    // Domain scheme: exact host and subdomains participate.
    let candidate = CandidateService::new("https://sso.example.com/app");
    let matched = registry.find_service_by(Some(&candidate)).unwrap();
    assert_eq!(matched.name, "intranet");

    // Regex scheme: full match required, mixed case folded.
    let candidate = CandidateService::new("https://Portal.Partner.NET/login");
    let matched = registry.find_service_by(Some(&candidate)).unwrap();
    assert_eq!(matched.name, "partner");
    let candidate = CandidateService::new("https://portal.partner.net");
    assert!(registry.find_service_by(Some(&candidate)).is_none());

    // Disabled registrations never authorize.
    let candidate = CandidateService::new("https://retired.example.org/app");
    assert!(registry.find_service_by(Some(&candidate)).is_none());

    // Unknown candidates and absent candidates fail closed.
    let candidate = CandidateService::new("https://unknown.net/app");
    assert!(registry.find_service_by(Some(&candidate)).is_none());
    assert!(registry.find_service_by(None).is_none());
}

/// Missing config files are a loud load error, not a silent default
#[tokio::test]
async fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    let err = Config::load(dir.path().join("absent.toml")).await.unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

/// Theme precedence across all four tiers of a loaded configuration
#[test]
fn test_theme_precedence_end_to_end() {
    let config = Config::parse(CONFIG).unwrap();
    let (resolver, registry) = wire(&config);

    let candidate = CandidateService::new("https://example.com/app");
    let mut ctx = RequestContext::new().with_host("cas.domain1.com");

    // Registry theme beats the host override.
    let resolved = resolver.resolve(&mut ctx, Some(&candidate));
    assert_eq!(resolved.theme, "corp");

    // A session override beats the registry.
    resolver.set_override(&mut ctx, Some("user-picked"));
    let resolved = resolver.resolve(&mut ctx, Some(&candidate));
    assert_eq!(resolved.theme, "user-picked");
    assert_eq!(ctx.attribute(THEME_ATTRIBUTE), Some("user-picked"));

    // Resetting with the sentinel falls back to the registry.
    resolver.set_override(&mut ctx, Some("theme"));
    let resolved = resolver.resolve(&mut ctx, Some(&candidate));
    assert_eq!(resolved.theme, "corp");

    // Without a registry match the host override applies.
    let resolved = resolver.resolve(&mut ctx, None);
    assert_eq!(resolved.theme, "domain1theme");

    // With nothing else, the configured default applies.
    registry.load_services(Vec::new());
    let mut bare = RequestContext::new();
    let resolved = resolver.resolve(&mut bare, None);
    assert_eq!(resolved.theme, "campus");
}

/// Device classification rides along with theme resolution
#[test]
fn test_device_classification_end_to_end() {
    let config = Config::parse(CONFIG).unwrap();
    let (resolver, _) = wire(&config);

    let mut ctx = RequestContext::new()
        .with_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 15_0) Mobile/15E148");
    let resolved = resolver.resolve(&mut ctx, None);
    assert!(resolved.is_mobile);
    // Both rules match; the first configured rule wins.
    assert_eq!(resolved.browser_type.as_deref(), Some("iphone"));
    assert_eq!(ctx.attribute(IS_MOBILE_ATTRIBUTE), Some("true"));
    assert_eq!(ctx.attribute(BROWSER_TYPE_ATTRIBUTE), Some("iphone"));

    let mut ctx = RequestContext::new().with_user_agent("Mozilla/5.0 (X11; Linux x86_64)");
    let resolved = resolver.resolve(&mut ctx, None);
    assert!(!resolved.is_mobile);
    assert_eq!(resolved.browser_type, None);
    assert_eq!(ctx.attribute(IS_MOBILE_ATTRIBUTE), None);
}

/// Hot reload swaps whole maps; stale entries must disappear
#[test]
fn test_hot_reload_replaces_snapshots() {
    let config = Config::parse(CONFIG).unwrap();
    let (resolver, _) = wire(&config);

    let mut ctx = RequestContext::new().with_host("cas.domain1.com");
    assert_eq!(resolver.resolve(&mut ctx, None).theme, "domain1theme");

    resolver.set_host_header_themes(HashMap::from([(
        "cas.domain2.org".to_string(),
        "domain2theme".to_string(),
    )]));

    let mut ctx = RequestContext::new().with_host("cas.domain1.com");
    assert_eq!(resolver.resolve(&mut ctx, None).theme, "campus");
    let mut ctx = RequestContext::new().with_host("cas.domain2.org");
    assert_eq!(resolver.resolve(&mut ctx, None).theme, "domain2theme");
}

/// Overrides are per session, not per request
#[test]
fn test_session_override_spans_requests() {
    let config = Config::parse(CONFIG).unwrap();
    let (resolver, _) = wire(&config);

    let mut first = RequestContext::new();
    resolver.set_override(&mut first, Some("night"));
    let session_id = first.session_id.clone().unwrap();

    // A later request in the same session sees the stored override.
    let mut second = RequestContext::new().with_session(session_id);
    assert_eq!(resolver.resolve(&mut second, None).theme, "night");

    // A request in a different session does not.
    let mut other = RequestContext::new();
    assert_eq!(resolver.resolve(&mut other, None).theme, "campus");
}
