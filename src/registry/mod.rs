//! Registered service records and lookup
//!
//! The registry is the authorization side of the gateway: a candidate
//! service may only participate in sign-on if some enabled registered
//! service's access pattern matches its identifier.

use crate::matcher::AccessPattern;
use crate::CandidateService;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered service: an access pattern plus presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredService {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The access pattern candidate identifiers are matched against
    pub service_id: AccessPattern,
    /// Theme applied to requests from this service, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Disabled services never match and never contribute a theme
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// When the registration was created
    pub created_at: DateTime<Utc>,
    /// When the registration was last updated
    pub updated_at: DateTime<Utc>,
}

fn enabled_default() -> bool {
    true
}

impl RegisteredService {
    /// Create a new enabled registration with generated ID and timestamps
    pub fn new(name: impl Into<String>, service_id: AccessPattern) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            service_id,
            theme: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the theme for this registration
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    /// Set the description for this registration
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Disable this registration
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Lookup of the registered service matching a candidate.
///
/// Implementations are synchronous in-memory lookups; an absent
/// candidate resolves to no service (fail closed).
pub trait ServiceRegistry: Send + Sync {
    /// Find the first enabled registered service whose pattern matches
    fn find_service_by(&self, candidate: Option<&CandidateService>) -> Option<RegisteredService>;
}

/// In-memory registry, first match wins in registration order
pub struct InMemoryServiceRegistry {
    services: RwLock<Vec<RegisteredService>>,
}

impl InMemoryServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            services: RwLock::new(Vec::new()),
        }
    }

    /// Add a registration at the end of the evaluation order
    pub fn add_service(&self, service: RegisteredService) {
        let mut services = self.services.write();
        services.push(service);
    }

    /// Remove a registration by ID
    pub fn remove_service(&self, id: &str) -> bool {
        let mut services = self.services.write();
        let len_before = services.len();
        services.retain(|s| s.id != id);
        services.len() < len_before
    }

    /// List all registrations
    pub fn list_services(&self) -> Vec<RegisteredService> {
        let services = self.services.read();
        services.clone()
    }

    /// Replace the whole registration list
    pub fn load_services(&self, services: Vec<RegisteredService>) {
        let mut s = self.services.write();
        *s = services;
    }
}

impl Default for InMemoryServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn find_service_by(&self, candidate: Option<&CandidateService>) -> Option<RegisteredService> {
        let candidate = candidate?;
        let services = self.services.read();
        let found = services
            .iter()
            .find(|s| s.enabled && s.service_id.matches(candidate));

        if let Some(service) = found {
            tracing::debug!(
                service = %service.name,
                pattern = %service.service_id,
                candidate = %candidate,
                "Candidate matched registered service"
            );
        } else {
            tracing::debug!(candidate = %candidate, "Candidate matched no registered service");
        }

        found.cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, pattern: &str) -> RegisteredService {
        RegisteredService::new(name, AccessPattern::parse(pattern).unwrap())
    }

    #[test]
    fn test_absent_candidate_matches_nothing() {
        let registry = InMemoryServiceRegistry::new();
        registry.add_service(service("anything", "**"));
        assert!(registry.find_service_by(None).is_none());
    }

    #[test]
    fn test_first_match_wins_in_registration_order() {
        let registry = InMemoryServiceRegistry::new();
        registry.add_service(service("intranet", "domain:example.com").with_theme("corp"));
        registry.add_service(service("catch-all", "**").with_theme("generic"));

        let candidate = CandidateService::new("https://sso.example.com/app");
        let found = registry.find_service_by(Some(&candidate)).unwrap();
        assert_eq!(found.name, "intranet");
        assert_eq!(found.theme.as_deref(), Some("corp"));

        let candidate = CandidateService::new("https://elsewhere.net/app");
        let found = registry.find_service_by(Some(&candidate)).unwrap();
        assert_eq!(found.name, "catch-all");
    }

    #[test]
    fn test_disabled_services_are_skipped() {
        let registry = InMemoryServiceRegistry::new();
        registry.add_service(service("old", "domain:example.com").disabled());

        let candidate = CandidateService::new("https://example.com/x");
        assert!(registry.find_service_by(Some(&candidate)).is_none());
    }

    #[test]
    fn test_remove_service() {
        let registry = InMemoryServiceRegistry::new();
        let svc = service("intranet", "domain:example.com");
        let id = svc.id.clone();
        registry.add_service(svc);

        assert!(registry.remove_service(&id));
        assert!(!registry.remove_service(&id));
        assert!(registry.list_services().is_empty());
    }

    #[test]
    fn test_load_services_replaces_prior_list() {
        let registry = InMemoryServiceRegistry::new();
        registry.add_service(service("stale", "**"));
        registry.load_services(vec![service("fresh", "domain:example.com")]);

        let services = registry.list_services();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "fresh");
    }
}
