use thiserror::Error;

use super::LifecycleState;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Fetching {path} returned status {status}")]
    Status { path: String, status: u16 },

    #[error("Cache storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid cache entry: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cannot {event} while {state}")]
    InvalidTransition {
        state: LifecycleState,
        event: &'static str,
    },

    #[error("Asset worker has stopped")]
    WorkerClosed,
}

/// Maximum length for a path echoed back in error messages
const MAX_ERROR_PATH_LENGTH: usize = 200;

impl AssetError {
    /// Truncate a request path to avoid logging excessive data
    fn truncate_path(path: &str) -> String {
        if path.len() <= MAX_ERROR_PATH_LENGTH {
            path.to_string()
        } else {
            let mut end = MAX_ERROR_PATH_LENGTH;
            while !path.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &path[..end], path.len())
        }
    }

    pub fn from_status(path: &str, status: u16) -> Self {
        AssetError::Status {
            path: Self::truncate_path(path),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_message() {
        let err = AssetError::from_status("/app.js", 404);
        assert_eq!(err.to_string(), "Fetching /app.js returned status 404");
    }

    #[test]
    fn test_from_status_truncates_long_paths() {
        let path = format!("/{}", "a".repeat(500));
        match AssetError::from_status(&path, 500) {
            AssetError::Status { path: shown, .. } => {
                assert!(shown.starts_with("/aaa"));
                assert!(shown.ends_with("(truncated, 501 total bytes)"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = AssetError::InvalidTransition {
            state: LifecycleState::Uninstalled,
            event: "activate",
        };
        assert_eq!(err.to_string(), "Cannot activate while uninstalled");
    }
}
