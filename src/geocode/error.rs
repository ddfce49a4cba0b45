use reqwest::StatusCode;
use thiserror::Error;

/// Why a single geocoding lookup produced no answer.
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("geocoding service answered with status {status}")]
    Status { status: StatusCode },

    #[error("malformed geocoding response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("geocoding service returned an invalid coordinate {value:?}")]
    InvalidCoordinate { value: String },
}

impl GeocodeError {
    /// Failures worth retrying after a pause: network trouble, throttling
    /// and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            GeocodeError::Transport(_) => true,
            GeocodeError::Status { status } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            GeocodeError::Decode(_) | GeocodeError::InvalidCoordinate { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let throttled = GeocodeError::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
        };
        let unavailable = GeocodeError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
        };
        let forbidden = GeocodeError::Status {
            status: StatusCode::FORBIDDEN,
        };
        assert!(throttled.is_transient());
        assert!(unavailable.is_transient());
        assert!(!forbidden.is_transient());
    }

    #[test]
    fn test_invalid_coordinate_is_permanent() {
        let err = GeocodeError::InvalidCoordinate {
            value: "north".to_string(),
        };
        assert!(!err.is_transient());
        assert!(err.to_string().contains("north"));
    }
}
