//! Error types for the release tool.
//!
//! Every failure is terminal for the current invocation. Nothing here is
//! retried internally; a periodic caller simply runs the tool again later.

use thiserror::Error;

/// Main error type for release tool operations.
#[derive(Error, Debug)]
pub enum ReleaseError {
    // Cli args / configuration errors
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown cadence [{0}]: must be one of daily, monthly")]
    UnknownCadence(String),

    // Version / naming errors
    #[error("Invalid version [{version}]: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error(
        "malformed release branch name [{0}]. Branch name must be formatted as release-[x].[y]. For example a branch for release 0.30.0 would be release-0.30"
    )]
    MalformedBranchName(String),

    #[error("Invalid tag [{tag}]: must be a valid semver version: {reason}")]
    InvalidTagFormat { tag: String, reason: String },

    #[error(
        "--promote-release-candidate={0} is invalid. Must point to a release candidate tag in the form of v[x].[y].[z]-rc.[n]. Example v0.31.0-rc.1 is valid and will result in the promotion of official v0.31.0 release"
    )]
    InvalidRcFormat(String),

    // Release policy errors
    #[error(
        "--new-release and --promote-release-candidate can not be used together. --promote-release-candidate detects the correct tag to make an official release out of"
    )]
    PromotionConflict,

    #[error("Unable to find release candidate [{0}] to promote")]
    RcNotFound(String),

    #[error("RC [{0}] is ineligible to be promoted due to blockers")]
    IneligiblePromotion(String),

    #[error(
        "The tag [{0}] must be promoted from a release candidate since it is the first release of a patch series"
    )]
    MustPromoteFromRc(String),

    #[error("release branch [{branch}] not found for new release [{tag}]")]
    BranchNotFound { branch: String, tag: String },

    #[error("Branch [{0}] can not be cut: open release blockers exist")]
    BranchBlocked(String),

    #[error("Release on branch [{0}] is blocked by open release blockers")]
    ReleaseBlocked(String),

    #[error(
        "unable to generate release notes for [{0}] because no previous tag detected"
    )]
    MissingPreviousTag(String),

    // Forge / git errors
    #[error("Forge operation failed: {0}")]
    ForgeError(String),

    #[error("Command [{command}] failed: {output}")]
    GitCommand { command: String, output: String },

    #[error("Template rendering failed: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Regular expression error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] log::SetLoggerError),

    // Generic wrapper for other errors
    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

/// Result type alias using ReleaseError
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a forge error with context
    pub fn forge(msg: impl Into<String>) -> Self {
        Self::ForgeError(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }

    /// Create a failed command error carrying the combined output
    pub fn command(
        command: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::GitCommand {
            command: command.into(),
            output: output.into(),
        }
    }
}

// Implement From for std::io::Error - wraps in Other variant for generic I/O errors
impl From<std::io::Error> for ReleaseError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(color_eyre::Report::from(err))
    }
}

impl From<semver::Error> for ReleaseError {
    fn from(err: semver::Error) -> Self {
        Self::InvalidVersion {
            version: String::new(),
            reason: err.to_string(),
        }
    }
}

// Implement From for octocrab errors (GitHub API)
impl From<octocrab::Error> for ReleaseError {
    fn from(err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. }
                if source.message.contains("rate limit") =>
            {
                Self::ForgeError(format!(
                    "GitHub API rate limit exceeded: {}",
                    source.message
                ))
            }
            _ => Self::ForgeError(format!("GitHub API error: {}", err)),
        }
    }
}
