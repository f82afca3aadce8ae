//! Configuration for the forge connection.
use secrecy::{ExposeSecret, SecretString};

/// Default GitHub host.
pub const DEFAULT_HOST: &str = "github.com";
/// Default page size for paginated list queries.
pub const DEFAULT_PAGE_SIZE: u8 = 100;
/// Prefix of the label that marks an issue or PR as a release blocker.
pub const BLOCKER_LABEL_PREFIX: &str = "release-blocker/";

/// Remote repository connection configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Remote forge host (e.g., "github.com").
    pub host: String,
    /// URL scheme (http or https).
    pub scheme: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Access token for authentication.
    pub token: SecretString,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            scheme: "https".to_string(),
            owner: "".to_string(),
            repo: "".to_string(),
            token: SecretString::from("".to_string()),
        }
    }
}

impl RemoteConfig {
    /// Base URI of the REST API.
    pub fn api_base_uri(&self) -> String {
        format!("{}://api.{}", self.scheme, self.host)
    }

    /// Authenticated clone / push URL for the repository.
    pub fn authenticated_url(&self) -> String {
        authenticated_url(self, &self.owner, &self.repo)
    }

    /// Link to the release page of a tag.
    pub fn release_link(&self, tag: &str) -> String {
        format!(
            "{}://{}/{}/{}/releases/tag/{}",
            self.scheme, self.host, self.owner, self.repo, tag
        )
    }
}

/// Authenticated URL for any repository on the configured host.
pub fn authenticated_url(
    config: &RemoteConfig,
    owner: &str,
    repo: &str,
) -> String {
    format!(
        "{}://{}@{}/{}/{}.git",
        config.scheme,
        config.token.expose_secret(),
        config.host,
        owner,
        repo
    )
}

/// Label string that marks blockers for a branch.
pub fn blocker_label(branch: &str) -> String {
    format!("{BLOCKER_LABEL_PREFIX}{branch}")
}
