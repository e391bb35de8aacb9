use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trace identity threaded through every queue payload and status record
/// for a single document's journey through the pipeline.
///
/// Minted once by the extraction manager when it claims a file; every
/// downstream job, log line, and persisted record for that document
/// carries the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Generate a new trace id using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TraceId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<&str> for TraceId {
    fn from(id: &str) -> Self {
        Uuid::try_parse(id).map_or_else(|_| Self(Uuid::new_v4()), Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_uuid_string() {
        let id = TraceId::new();
        let roundtrip = TraceId::from(id.to_string().as_str());
        assert_eq!(id, roundtrip);
    }

    #[test]
    fn falls_back_to_random_on_garbage_input() {
        let id = TraceId::from("not-a-uuid");
        assert_ne!(id.to_string(), "not-a-uuid");
    }
}
