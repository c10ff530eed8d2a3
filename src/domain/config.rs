use std::{fmt, num::NonZeroUsize, path::Path, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

/// The prefix of every storage key.
///
/// A namespace becomes part of a file name, so it must be non-empty, must not
/// start with a '.', and must not contain path separators or control
/// characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(NonEmptyString);

impl Namespace {
    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Errors raised when parsing a [`Namespace`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    /// The namespace is empty.
    #[error("namespace must not be empty")]
    Empty,

    /// The namespace would name a hidden file.
    #[error("namespace '{0}' must not start with '.'")]
    LeadingDot(String),

    /// The namespace contains a character that cannot appear in a file name.
    #[error("namespace '{0}' must not contain path separators or control characters")]
    InvalidCharacter(String),
}

impl TryFrom<String> for Namespace {
    type Error = NamespaceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.starts_with('.') {
            return Err(NamespaceError::LeadingDot(value));
        }
        if value.contains(['/', '\\']) || value.chars().any(char::is_control) {
            return Err(NamespaceError::InvalidCharacter(value));
        }
        NonEmptyString::new(value)
            .map(Self)
            .map_err(|_| NamespaceError::Empty)
    }
}

impl FromStr for Namespace {
    type Err = NamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<Namespace> for String {
    fn from(namespace: Namespace) -> Self {
        namespace.0.into()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for permit storage and numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Prefix of every storage key.
    ///
    /// Drafts are stored under `{namespace}-{permit id}` and
    /// `{namespace}-latest`.
    namespace: Namespace,

    /// The maximum number of audit events kept per permit.
    ///
    /// When a save would exceed the limit the oldest events are dropped. The
    /// most recent event always survives.
    audit_trail_limit: NonZeroUsize,

    /// Prefix of generated permit numbers, e.g. 'PTW'.
    permit_prefix: String,

    /// Prefix of generated certificate numbers, e.g. 'CERT'.
    certificate_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            audit_trail_limit: default_audit_trail_limit(),
            permit_prefix: default_permit_prefix(),
            certificate_prefix: default_certificate_prefix(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the storage key namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// Sets the storage key namespace.
    pub fn set_namespace(&mut self, namespace: Namespace) {
        self.namespace = namespace;
    }

    /// Returns the maximum number of audit events kept per permit.
    #[must_use]
    pub const fn audit_trail_limit(&self) -> NonZeroUsize {
        self.audit_trail_limit
    }

    /// Sets the maximum number of audit events kept per permit.
    pub const fn set_audit_trail_limit(&mut self, limit: NonZeroUsize) {
        self.audit_trail_limit = limit;
    }

    /// Returns the permit number prefix.
    #[must_use]
    pub fn permit_prefix(&self) -> &str {
        &self.permit_prefix
    }

    /// Returns the certificate number prefix.
    #[must_use]
    pub fn certificate_prefix(&self) -> &str {
        &self.certificate_prefix
    }
}

fn default_namespace() -> Namespace {
    Namespace(NonEmptyString::new("permit-draft".to_string()).expect("non-empty"))
}

const fn default_audit_trail_limit() -> NonZeroUsize {
    NonZeroUsize::new(200).expect("non-zero")
}

fn default_permit_prefix() -> String {
    "PTW".to_string()
}

fn default_certificate_prefix() -> String {
    "CERT".to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_namespace")]
        namespace: Namespace,

        #[serde(default = "default_audit_trail_limit")]
        audit_trail_limit: NonZeroUsize,

        #[serde(default = "default_permit_prefix")]
        permit_prefix: String,

        #[serde(default = "default_certificate_prefix")]
        certificate_prefix: String,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                namespace,
                audit_trail_limit,
                permit_prefix,
                certificate_prefix,
            } => Self {
                namespace,
                audit_trail_limit,
                permit_prefix,
                certificate_prefix,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            namespace: config.namespace,
            audit_trail_limit: config.audit_trail_limit,
            permit_prefix: config.permit_prefix,
            certificate_prefix: config.certificate_prefix,
        }
    }
}
