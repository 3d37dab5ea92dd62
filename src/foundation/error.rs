/// Result alias for every fallible engine, loader and config call.
pub type RaceResult<T> = Result<T, RaceError>;

/// Failure categories surfaced by the race engine.
#[derive(thiserror::Error, Debug)]
pub enum RaceError {
    /// Config or constructor arguments outside their allowed range.
    #[error("validation error: {0}")]
    Validation(String),

    /// Snapshot data that cannot drive a race: bad dates, ids or values.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Per-frame requests the engine cannot answer, such as an out-of-range frame.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// JSON (de)serialization failures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// IO and other lower-level failures, with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RaceError {
    /// Build a [`RaceError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`RaceError::MalformedInput`].
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    /// Build a [`RaceError::Evaluation`].
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`RaceError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for RaceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            RaceError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            RaceError::malformed("x")
                .to_string()
                .contains("malformed input:")
        );
        assert!(
            RaceError::evaluation("x")
                .to_string()
                .contains("evaluation error:")
        );
        assert!(
            RaceError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn json_errors_map_to_serde() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(RaceError::from(err), RaceError::Serde(_)));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = RaceError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
