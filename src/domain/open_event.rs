//! Open event model handed to the caller's callback.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A snapshot of one pixel fetch.
///
/// Created once per request whose token decodes, then moved into the
/// dispatch queue; the tracker keeps no reference to it afterwards.
///
/// Missing request metadata is represented as an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenEvent {
    /// Identifier decoded from the link token, unchanged.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub remote_address: String,
    pub user_agent: String,
}

impl OpenEvent {
    /// Creates an event stamped with the current time.
    ///
    /// # Examples
    ///
    /// ```
    /// use mail_tracker::OpenEvent;
    ///
    /// let event = OpenEvent::new("12".to_string(), "203.0.113.9".to_string(), Some("Thunderbird"));
    /// assert_eq!(event.id, "12");
    /// assert_eq!(event.user_agent, "Thunderbird");
    /// ```
    pub fn new(id: String, remote_address: String, user_agent: Option<&str>) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            remote_address,
            user_agent: user_agent.unwrap_or_default().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_event_creation_full() {
        let before = Utc::now();
        let event = OpenEvent::new(
            "12".to_string(),
            "192.168.1.1".to_string(),
            Some("Mozilla/5.0"),
        );

        assert_eq!(event.id, "12");
        assert_eq!(event.remote_address, "192.168.1.1");
        assert_eq!(event.user_agent, "Mozilla/5.0");
        assert!(event.timestamp >= before);
        assert!(event.timestamp <= Utc::now());
    }

    #[test]
    fn test_open_event_without_user_agent() {
        let event = OpenEvent::new("x".to_string(), "10.0.0.1".to_string(), None);
        assert_eq!(event.user_agent, "");
    }

    #[test]
    fn test_open_event_serializes_as_json() {
        let event = OpenEvent::new("13".to_string(), "10.0.0.1".to_string(), Some("Outlook"));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["id"], "13");
        assert_eq!(json["remote_address"], "10.0.0.1");
        assert_eq!(json["user_agent"], "Outlook");
        assert!(json["timestamp"].is_string());
    }
}
