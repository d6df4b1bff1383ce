//! Readiness reporting for components the server depends on.

use serde::Serialize;

/// Health check status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// Component is operational
    Healthy,

    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is unhealthy
    #[must_use]
    pub const fn is_unhealthy(self) -> bool {
        matches!(self, Self::Unhealthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::Unhealthy => f.write_str("unhealthy"),
        }
    }
}

/// Health check result for a component
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    /// Name of the component being checked
    pub component: String,

    /// Current health status
    pub status: HealthStatus,

    /// Failure detail
    pub message: Option<String>,

    /// Extra facts about the check, e.g. how long it took
    pub metadata: Vec<(String, String)>,
}

impl HealthCheck {
    /// Create a healthy check result
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: None,
            metadata: Vec::new(),
        }
    }

    /// Create an unhealthy check result
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            metadata: Vec::new(),
        }
    }

    /// Add metadata to the health check
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unhealthy_check_serializes_message_and_metadata() {
        let check = HealthCheck::unhealthy("tickets", "connection refused")
            .with_metadata("latency_ms", "12");
        let json = serde_json::to_value(&check).unwrap();

        assert_eq!(json["status"], "Unhealthy");
        assert_eq!(json["message"], "connection refused");
        assert_eq!(json["metadata"][0][0], "latency_ms");
        assert!(check.status.is_unhealthy());
        assert_eq!(check.status.to_string(), "unhealthy");
    }

    #[test]
    fn healthy_check_has_no_message() {
        let check = HealthCheck::healthy("tickets");
        assert!(!check.status.is_unhealthy());
        assert!(check.message.is_none());
    }
}
