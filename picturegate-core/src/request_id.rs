//! Request ID generation

use uuid::Uuid;

/// Header carrying the request ID on requests and responses
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest inbound request ID that is propagated as-is
const MAX_INBOUND_LEN: usize = 128;

/// Per-request identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId {
    pub id: String,
}

impl RequestId {
    /// Generate a new request ID
    pub fn new() -> Self {
        let id = Uuid::new_v4().simple().to_string().to_uppercase();
        Self { id }
    }

    /// Create a request ID with a specific value (for testing)
    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Reuse a caller-supplied ID when it is sane, otherwise generate one
    pub fn from_inbound(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v)
                if !v.is_empty()
                    && v.len() <= MAX_INBOUND_LEN
                    && v.chars().all(|c| c.is_ascii_graphic()) =>
            {
                Self::with_id(v)
            }
            _ => Self::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();

        // IDs should be unique
        assert_ne!(id1.id, id2.id);

        // ID should be uppercase hex
        assert!(id1.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id1.id, id1.id.to_uppercase());
    }

    #[test]
    fn test_request_id_with_id() {
        let id = RequestId::with_id("test-id-123");
        assert_eq!(id.as_str(), "test-id-123");
        assert_eq!(id.to_string(), "test-id-123");
    }

    #[test]
    fn test_inbound_id_is_preserved() {
        let id = RequestId::from_inbound(Some("upstream-42"));
        assert_eq!(id.as_str(), "upstream-42");
    }

    #[test]
    fn test_inbound_id_rejected_when_blank_or_oversized() {
        assert_eq!(RequestId::from_inbound(Some("   ")).id.len(), 32);
        assert_eq!(RequestId::from_inbound(None).id.len(), 32);

        let long = "a".repeat(MAX_INBOUND_LEN + 1);
        assert_ne!(RequestId::from_inbound(Some(&long)).id, long);
        assert_ne!(RequestId::from_inbound(Some("has space")).id, "has space");
    }
}
