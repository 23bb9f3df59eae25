//! Result of one reconciliation call.

use serde::Serialize;

/// What a reconciliation call did.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReconcileOutcome<R> {
    /// True if a mutating call was made.
    pub changed: bool,
    /// Human-readable summary naming the resource.
    #[serde(rename = "msg")]
    pub message: String,
    /// The resource after the call; `None` once deleted or never existing.
    pub resource: Option<R>,
    /// Line diff of an update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl<R> ReconcileOutcome<R> {
    /// Outcome of a call that changed something.
    #[must_use]
    pub const fn changed(message: String, resource: Option<R>) -> Self {
        Self {
            changed: true,
            message,
            resource,
            diff: None,
        }
    }

    /// Outcome of a call that left everything as it was.
    #[must_use]
    pub const fn unchanged(message: String, resource: Option<R>) -> Self {
        Self {
            changed: false,
            message,
            resource,
            diff: None,
        }
    }

    /// Attaches a diff.
    #[must_use]
    pub fn with_diff(mut self, diff: Option<String>) -> Self {
        self.diff = diff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let outcome = ReconcileOutcome::changed(String::from("disk 'data-1' created"), Some(1));
        let json = serde_json::to_value(&outcome).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({"changed": true, "msg": "disk 'data-1' created", "resource": 1})
        );
    }
}
