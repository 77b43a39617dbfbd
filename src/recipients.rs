//! Identifier → recipient lookup used by the `mail-tracker` binary.
//!
//! Replaces scanning a recipient list on every open with a map built once.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::open_event::OpenEvent;
use crate::domain::open_handler::OpenHandler;

/// One recipient as listed in the recipients file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub email: String,
}

/// Read-only map from identifier to recipient email.
///
/// Implements [`OpenHandler`] by logging which recipient opened the mail.
#[derive(Debug, Clone, Default)]
pub struct RecipientDirectory {
    by_id: HashMap<String, String>,
}

impl RecipientDirectory {
    pub fn new(recipients: impl IntoIterator<Item = Recipient>) -> Self {
        Self {
            by_id: recipients
                .into_iter()
                .map(|recipient| (recipient.id, recipient.email))
                .collect(),
        }
    }

    /// Parses a JSON array of `{"id": "...", "email": "..."}` objects.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON, or if an identifier is empty or repeated.
    pub fn from_json(json: &str) -> Result<Self> {
        let recipients: Vec<Recipient> =
            serde_json::from_str(json).context("Recipients must be a JSON array of {id, email}")?;

        let mut by_id = HashMap::with_capacity(recipients.len());
        for recipient in recipients {
            if recipient.id.is_empty() {
                anyhow::bail!("Recipient '{}' has an empty id", recipient.email);
            }
            if by_id.contains_key(&recipient.id) {
                anyhow::bail!("Duplicate recipient id '{}'", recipient.id);
            }
            by_id.insert(recipient.id, recipient.email);
        }

        Ok(Self { by_id })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipients from {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid recipients file {}", path.display()))
    }

    pub fn email(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Identifiers in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_id.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl OpenHandler for RecipientDirectory {
    fn on_open(&self, event: OpenEvent) -> Result<()> {
        match self.email(&event.id) {
            Some(email) => tracing::info!(
                id = %event.id,
                email = %email,
                remote = %event.remote_address,
                user_agent = %event.user_agent,
                opened_at = %event.timestamp.to_rfc3339(),
                "Email opened"
            ),
            None => tracing::warn!(
                id = %event.id,
                remote = %event.remote_address,
                "Email opened by an unknown recipient"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"id": "12", "email": "test@gmail.com"},
        {"id": "13", "email": "test2@gmail.com"}
    ]"#;

    #[test]
    fn test_from_json() {
        let directory = RecipientDirectory::from_json(SAMPLE).unwrap();

        assert_eq!(directory.len(), 2);
        assert_eq!(directory.email("12"), Some("test@gmail.com"));
        assert_eq!(directory.email("13"), Some("test2@gmail.com"));
        assert_eq!(directory.email("14"), None);
        assert_eq!(directory.ids(), vec!["12", "13"]);
    }

    #[test]
    fn test_from_json_rejects_duplicates() {
        let json = r#"[{"id": "1", "email": "a@x"}, {"id": "1", "email": "b@x"}]"#;
        let err = RecipientDirectory::from_json(json).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_from_json_rejects_empty_id() {
        let json = r#"[{"id": "", "email": "a@x"}]"#;
        assert!(RecipientDirectory::from_json(json).is_err());
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(RecipientDirectory::from_json("{}").is_err());
        assert!(RecipientDirectory::from_json(r#"[{"id": "1"}]"#).is_err());
    }

    #[test]
    fn test_unknown_recipient_is_not_a_failure() {
        let directory = RecipientDirectory::new(vec![Recipient {
            id: "12".to_string(),
            email: "test@gmail.com".to_string(),
        }]);

        let known = OpenEvent::new("12".to_string(), "127.0.0.1".to_string(), None);
        let unknown = OpenEvent::new("99".to_string(), "127.0.0.1".to_string(), None);

        assert!(directory.on_open(known).is_ok());
        assert!(directory.on_open(unknown).is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = RecipientDirectory::load(Path::new("/nonexistent/recipients.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read recipients"));
    }
}
