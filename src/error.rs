use std::{fmt, io};

use http::status::StatusCode;
use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;
use thiserror::Error;

/// Code carried by [PolicyError::ConcurrentModification]. API layers test for it to offer a
/// reload-and-retry flow instead of a generic failure message.
pub const CONCURRENT_MODIFICATION_CODE: &str = "alerting.policies.conflict";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum PolicyError {
    #[error("Reference not found: no such route with ID {0}")]
    ReferenceNotFound(String),
    #[error("Cannot remove the root policy")]
    RootDeletionForbidden,
    #[error("Cannot add a sibling policy to the root policy")]
    RootSiblingForbidden,
    #[error(
        "The notification policy tree has been updated by another user since it was loaded. \
        Reload the policies and apply your changes again"
    )]
    ConcurrentModification,
    #[error("Policy tree is nested deeper than the supported {0} levels")]
    TreeTooDeep(usize),
    #[error("Invalid matcher operator: {0}")]
    InvalidMatcherOperator(String),
    #[error("Invalid matcher: {0}")]
    InvalidMatcher(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
}

impl PolicyError {
    /// Stable, machine readable code for each error kind.
    pub fn code(&self) -> &'static str {
        match self {
            PolicyError::ReferenceNotFound(_) => "alerting.policies.reference-not-found",
            PolicyError::RootDeletionForbidden => "alerting.policies.root-deletion",
            PolicyError::RootSiblingForbidden => "alerting.policies.root-sibling",
            PolicyError::ConcurrentModification => CONCURRENT_MODIFICATION_CODE,
            PolicyError::TreeTooDeep(_) => "alerting.policies.too-deep",
            PolicyError::InvalidMatcherOperator(_) => "alerting.policies.invalid-matcher-operator",
            PolicyError::InvalidMatcher(_) => "alerting.policies.invalid-matcher",
            PolicyError::Serialization(_) => "alerting.policies.serialization",
            PolicyError::Io(_) => "alerting.policies.io",
            PolicyError::NotFound(_) => "alerting.policies.not-found",
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.code() == CONCURRENT_MODIFICATION_CODE
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PolicyError::ReferenceNotFound(_) => StatusCode::NOT_FOUND,
            PolicyError::RootDeletionForbidden => StatusCode::BAD_REQUEST,
            PolicyError::RootSiblingForbidden => StatusCode::BAD_REQUEST,
            PolicyError::ConcurrentModification => StatusCode::CONFLICT,
            PolicyError::TreeTooDeep(_) => StatusCode::BAD_REQUEST,
            PolicyError::InvalidMatcherOperator(_) => StatusCode::BAD_REQUEST,
            PolicyError::InvalidMatcher(_) => StatusCode::BAD_REQUEST,
            PolicyError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PolicyError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PolicyError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<toml::de::Error> for PolicyError {
    fn from(src: toml::de::Error) -> PolicyError {
        PolicyError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for PolicyError {
    fn from(src: toml::ser::Error) -> PolicyError {
        PolicyError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for PolicyError {
    fn from(src: JsonError) -> PolicyError {
        PolicyError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<YamlError> for PolicyError {
    fn from(src: YamlError) -> PolicyError {
        PolicyError::Serialization(format!("YAML (de)serialization error: {src}"))
    }
}

impl From<uuid::Error> for PolicyError {
    fn from(src: uuid::Error) -> PolicyError {
        PolicyError::Serialization(format!("UUID conversion failed: {src}"))
    }
}

impl From<io::Error> for PolicyError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => PolicyError::NotFound(format!("{x}")),
            _ => PolicyError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for PolicyError {
    fn from(x: fmt::Error) -> Self {
        PolicyError::Serialization(format!("{x}"))
    }
}

impl From<RegexError> for PolicyError {
    fn from(x: RegexError) -> Self {
        PolicyError::InvalidMatcher(format!("Regex parse failed: {x}"))
    }
}
