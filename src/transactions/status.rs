//! Mapping of upstream transaction statuses.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Transaction status as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Success,
    Failed,
    Pending,
    /// Any other upstream value, upper-cased.
    Other(String),
}

impl TransactionStatus {
    /// Map a raw upstream value, case-insensitively.
    ///
    /// `completed` and `success` map to `SUCCESS`; unknown values pass
    /// through upper-cased.
    pub fn from_upstream(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "completed" | "success" => Self::Success,
            "failed" => Self::Failed,
            "pending" => Self::Pending,
            _ => Self::Other(raw.to_uppercase()),
        }
    }

    /// Map the `transactionStatus` field of a callback or detail record.
    /// A missing field maps to `UNKNOWN`.
    pub fn from_record(record: &serde_json::Value) -> Self {
        let raw = record
            .get("transactionStatus")
            .and_then(|v| v.as_str())
            .unwrap_or("UNKNOWN");
        Self::from_upstream(raw)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Pending => "PENDING",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TransactionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransactionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_upstream(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_insensitive_mapping() {
        for raw in ["completed", "COMPLETED", "Completed", "success", "Success"] {
            assert_eq!(TransactionStatus::from_upstream(raw), TransactionStatus::Success);
        }
        assert_eq!(TransactionStatus::from_upstream("FAILED"), TransactionStatus::Failed);
        assert_eq!(TransactionStatus::from_upstream("pending"), TransactionStatus::Pending);
    }

    #[test]
    fn test_unknown_passes_through_upper_cased() {
        let status = TransactionStatus::from_upstream("weird");
        assert_eq!(status, TransactionStatus::Other("WEIRD".to_string()));
        assert_eq!(status.to_string(), "WEIRD");
    }

    #[test]
    fn test_mapping_is_idempotent() {
        for raw in ["completed", "failed", "pending", "weird"] {
            let once = TransactionStatus::from_upstream(raw);
            let twice = TransactionStatus::from_upstream(once.as_str());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_from_record() {
        assert_eq!(
            TransactionStatus::from_record(&json!({"transactionStatus": "Completed"})),
            TransactionStatus::Success
        );
        assert_eq!(
            TransactionStatus::from_record(&json!({})),
            TransactionStatus::Other("UNKNOWN".to_string())
        );
    }

    #[test]
    fn test_serializes_as_string() {
        assert_eq!(serde_json::to_value(TransactionStatus::Failed).unwrap(), json!("FAILED"));
    }
}
