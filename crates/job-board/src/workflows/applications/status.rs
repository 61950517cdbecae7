use std::fmt;

use serde::{Deserialize, Serialize};

/// Key of a status drawn from the configured [`StatusSet`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationStatus(String);

impl ApplicationStatus {
    /// Wrap a key read back from storage. Values written through the services
    /// are always resolved against a [`StatusSet`] first.
    pub(crate) fn from_stored(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDefinition {
    pub key: String,
    pub label: String,
}

/// Deployment-configured, ordered set of review statuses.
///
/// Board columns follow the set order and the first entry is the status given
/// to fresh submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSet {
    definitions: Vec<StatusDefinition>,
}

impl StatusSet {
    pub fn new(definitions: Vec<StatusDefinition>) -> Result<Self, StatusSetError> {
        if definitions.is_empty() {
            return Err(StatusSetError::Empty);
        }

        for (index, definition) in definitions.iter().enumerate() {
            if !is_valid_key(&definition.key) {
                return Err(StatusSetError::InvalidKey(definition.key.clone()));
            }
            if definitions[..index]
                .iter()
                .any(|earlier| earlier.key == definition.key)
            {
                return Err(StatusSetError::Duplicate(definition.key.clone()));
            }
        }

        Ok(Self { definitions })
    }

    pub fn standard() -> Self {
        let definitions = [
            ("pending", "Pending"),
            ("reviewing", "Reviewing"),
            ("interview", "Interview"),
            ("offered", "Offered"),
            ("rejected", "Rejected"),
        ]
        .into_iter()
        .map(|(key, label)| StatusDefinition {
            key: key.to_string(),
            label: label.to_string(),
        })
        .collect();

        Self { definitions }
    }

    /// Parse `key:Label` entries separated by commas. A missing label is
    /// derived from the key (`on_hold` becomes `On Hold`).
    pub fn parse(raw: &str) -> Result<Self, StatusSetError> {
        let definitions = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (key, label) = match entry.split_once(':') {
                    Some((key, label)) => (key.trim(), label.trim()),
                    None => (entry, ""),
                };
                let label = if label.is_empty() {
                    humanize_key(key)
                } else {
                    label.to_string()
                };
                StatusDefinition {
                    key: key.to_string(),
                    label,
                }
            })
            .collect();

        Self::new(definitions)
    }

    pub fn resolve(&self, key: &str) -> Option<ApplicationStatus> {
        let key = key.trim();
        self.definitions
            .iter()
            .find(|definition| definition.key == key)
            .map(|definition| ApplicationStatus(definition.key.clone()))
    }

    pub fn contains(&self, status: &ApplicationStatus) -> bool {
        self.definitions
            .iter()
            .any(|definition| definition.key == status.0)
    }

    /// Label for display; unknown keys (e.g. left over from an older
    /// configuration) fall back to a humanized key.
    pub fn label_for(&self, status: &ApplicationStatus) -> String {
        self.definitions
            .iter()
            .find(|definition| definition.key == status.0)
            .map(|definition| definition.label.clone())
            .unwrap_or_else(|| humanize_key(&status.0))
    }

    pub fn initial(&self) -> ApplicationStatus {
        ApplicationStatus(self.definitions[0].key.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusDefinition> {
        self.definitions.iter()
    }

    pub fn statuses(&self) -> impl Iterator<Item = ApplicationStatus> + '_ {
        self.definitions
            .iter()
            .map(|definition| ApplicationStatus(definition.key.clone()))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for StatusSet {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusSetError {
    #[error("at least one application status must be configured")]
    Empty,
    #[error("invalid status key '{0}': use lowercase letters, digits, '_' or '-'")]
    InvalidKey(String),
    #[error("status key '{0}' is configured more than once")]
    Duplicate(String),
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// `years_experience` -> `Years Experience`.
pub(crate) fn humanize_key(key: &str) -> String {
    key.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
