use thiserror::Error;

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Template lookup miss. `chain` holds the templates being expanded when the miss happened.
    #[error("dashboard '{name}' not found in namespace '{namespace}' (dependency chain: [{}])", .chain.join(" -> "))]
    NotFound {
        namespace: String,
        name: String,
        chain: Vec<String>,
    },

    #[error("cannot load dashboard '{reference}' due to circular dependency detected (dependency chain: [{}])", .chain.join(" -> "))]
    CircularDependency { reference: String, chain: Vec<String> },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl DashboardError {
    pub fn not_found(namespace: &str, name: &str) -> Self {
        DashboardError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
            chain: Vec::new(),
        }
    }

    /// Attach the dependency chain accumulated so far.
    pub fn in_chain(self, loaded: &[String]) -> Self {
        match self {
            DashboardError::NotFound { namespace, name, .. } => DashboardError::NotFound {
                namespace,
                name,
                chain: loaded.to_vec(),
            },
            DashboardError::BackendUnavailable(msg) if !loaded.is_empty() => {
                DashboardError::BackendUnavailable(format!(
                    "{} (dependency chain: [{}])",
                    msg,
                    loaded.join(" -> ")
                ))
            }
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DashboardError::NotFound { .. })
    }
}

impl From<kube::Error> for DashboardError {
    fn from(err: kube::Error) -> Self {
        DashboardError::BackendUnavailable(format!("kubernetes API: {}", err))
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::BackendUnavailable(format!("http: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_carries_chain() {
        let err = DashboardError::not_found("ns1", "child")
            .in_chain(&["parent".to_string(), "child".to_string()]);
        let msg = err.to_string();
        assert!(err.is_not_found());
        assert!(msg.contains("'child'"));
        assert!(msg.contains("ns1"));
        assert!(msg.contains("parent -> child"));
    }

    #[test]
    fn test_backend_error_without_chain_is_unchanged() {
        let err = DashboardError::BackendUnavailable("timeout".to_string()).in_chain(&[]);
        assert_eq!(err.to_string(), "backend unavailable: timeout");
    }

    #[test]
    fn test_circular_dependency_message() {
        let err = DashboardError::CircularDependency {
            reference: "a".to_string(),
            chain: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        };
        assert!(err.to_string().contains("a -> b -> c"));
    }
}
