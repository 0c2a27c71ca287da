use thiserror::Error;

#[derive(Error, Debug)]
pub enum CharmError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration parse error: {message}")]
    ConfigParseError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Provisioning failed: {message}")]
    ProvisioningError { message: String },

    #[error("Command `{program}` failed (exit code {code:?}): {stderr}")]
    CommandError {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Could not determine installed version from package metadata: {output}")]
    VersionMetadataError { output: String },

    #[error("Template {template} failed: {message}")]
    TemplateError { template: String, message: String },

    #[error("Private key is not valid base64: {0}")]
    KeyDecodeError(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, CharmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Provisioning,
    ExternalTool,
    Filesystem,
    Rendering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CharmError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CharmError::ConfigParseError { .. }
            | CharmError::InvalidConfigValueError { .. }
            | CharmError::MissingConfigError { .. }
            | CharmError::ConfigError { .. }
            | CharmError::KeyDecodeError(_) => ErrorCategory::Configuration,
            CharmError::ProvisioningError { .. } => ErrorCategory::Provisioning,
            CharmError::CommandError { .. } | CharmError::VersionMetadataError { .. } => {
                ErrorCategory::ExternalTool
            }
            CharmError::IoError(_) | CharmError::SerializationError(_) => {
                ErrorCategory::Filesystem
            }
            CharmError::TemplateError { .. } => ErrorCategory::Rendering,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CharmError::MissingConfigError { .. } => ErrorSeverity::Low,
            CharmError::CommandError { .. } => ErrorSeverity::Medium,
            CharmError::ProvisioningError { .. } | CharmError::IoError(_) => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the charm configuration file and correct the reported option"
            }
            ErrorCategory::Provisioning => {
                "Make sure the charm runs as root and useradd/groupadd/chown are available"
            }
            ErrorCategory::ExternalTool => {
                "Inspect the command output above; the next pass retries the same step"
            }
            ErrorCategory::Filesystem => {
                "Check free disk space and permissions under the base path"
            }
            ErrorCategory::Rendering => "Check the template directory passed with --templates",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CharmError::ConfigError { message } => format!("Configuration problem: {}", message),
            CharmError::CommandError { program, .. } => {
                format!("External command `{}` did not succeed", program)
            }
            CharmError::VersionMetadataError { .. } => {
                "The installed errbot package metadata could not be read".to_string()
            }
            other => other.to_string(),
        }
    }
}
