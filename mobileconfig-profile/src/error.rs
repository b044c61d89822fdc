// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {mobileconfig_signing::ProfileSigningError, thiserror::Error};

/// A problem with a single [crate::ProfileConfig] field.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldError {
    /// Name of the offending field, as spelled in YAML.
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl ToString) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile configuration: {}", format_field_errors(.0))]
    InvalidConfig(Vec<FieldError>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Signing(#[from] ProfileSigningError),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("unknown DNS provider: {0}")]
    UnknownProvider(String),

    #[error("unknown command")]
    CliUnknownCommand,

    #[error("bad argument")]
    CliBadArgument,
}

impl ProfileError {
    /// Field errors carried by an [ProfileError::InvalidConfig].
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::InvalidConfig(errors) => errors,
            _ => &[],
        }
    }
}
