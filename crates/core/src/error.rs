use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid round phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },

    #[error("Unknown {kind}: '{value}'")]
    UnknownValue { kind: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_value_display() {
        let error = CoreError::UnknownValue {
            kind: "session status",
            value: "paused".to_string(),
        };
        assert_eq!(error.to_string(), "Unknown session status: 'paused'");
    }

    #[test]
    fn test_transition_error_display() {
        let error = CoreError::InvalidPhaseTransition {
            from: "intro".to_string(),
            to: "defense".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid round phase transition from intro to defense"
        );
    }
}
