//! Generic message wrapper exchanged through a queue.

use serde::{Deserialize, Serialize};

/// A queue message: an identifier plus a typed body.
///
/// Producers normally set `id` (the scheduler uses the event id). When a
/// consumer receives an envelope with an empty `id`, the broker-assigned
/// message identifier is filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub id: String,
    pub body: T,
}

impl<T> Envelope<T> {
    pub fn new(id: impl Into<String>, body: T) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// Fill `id` from the transport-level identifier when the producer left
    /// it empty.
    pub fn fill_missing_id(&mut self, message_id: Option<&str>) {
        if self.id.is_empty() {
            if let Some(message_id) = message_id {
                self.id = message_id.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_missing_id_only_when_empty() {
        let mut set = Envelope::new("producer-id", 1);
        set.fill_missing_id(Some("broker-id"));
        assert_eq!(set.id, "producer-id");

        let mut unset = Envelope::new("", 1);
        unset.fill_missing_id(Some("broker-id"));
        assert_eq!(unset.id, "broker-id");

        let mut none = Envelope::new("", 1);
        none.fill_missing_id(None);
        assert!(none.id.is_empty());
    }

    #[test]
    fn missing_id_field_deserializes_as_empty() {
        let env: Envelope<u32> = serde_json::from_str(r#"{"body": 7}"#).unwrap();
        assert!(env.id.is_empty());
        assert_eq!(env.body, 7);
    }
}
