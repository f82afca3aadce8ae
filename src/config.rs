//! Configuration loading and parsing for `release-tool.toml` files.
//!
//! Every field is optional. A missing file yields the defaults, which match
//! the KubeVirt release process.
use log::*;
use serde::Deserialize;
use std::{fs, path::Path};

use crate::{
    error::{ReleaseError, Result},
    notes::DEFAULT_TEMPLATE,
};

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "release-tool.toml";

/// Release notes content settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)] // Use default for missing fields
pub struct NotesConfig {
    /// Automation account left out of the contributor list.
    pub bot_account: String,
    /// Mailing list linked in the footer.
    pub mailing_list: String,
    /// Chat channel linked in the footer.
    pub slack: String,
    /// Project name used in the notes prose.
    pub project_name: String,
    /// Display name of the container registry.
    pub registry_name: String,
    /// Registry host that pre-built containers are published to.
    pub container_registry: String,
    /// Repository under the org holding an easy to use demo.
    pub demo_repo: String,
    /// Tera template rendering the notes file.
    pub template: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            bot_account: "kubevirt-bot".into(),
            mailing_list:
                "https://groups.google.com/forum/#!forum/kubevirt-dev".into(),
            slack: "https://kubernetes.slack.com/messages/virtualization"
                .into(),
            project_name: "KubeVirt".into(),
            registry_name: "Quay".into(),
            container_registry: "quay.io".into(),
            demo_repo: "demo".into(),
            template: DEFAULT_TEMPLATE.into(),
        }
    }
}

/// CI job configuration forking for new release branches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Org of the repository holding job configuration.
    pub infra_org: String,
    /// Repository holding job configuration.
    pub infra_repo: String,
    /// Executable that forks a presubmit configuration for a version.
    pub config_forker: String,
    /// Executable that opens a pull request from a pushed branch.
    pub pr_creator: String,
    /// Directory in the infra repository containing `<org>/<repo>` job
    /// folders.
    pub jobs_path: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            infra_org: "kubevirt".into(),
            infra_repo: "project-infra".into(),
            config_forker: "/usr/bin/config-forker".into(),
            pr_creator: "/usr/bin/pr-creator".into(),
            jobs_path: "github/ci/prow-deploy/files/jobs".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Branch new release branches are cut from.
    pub default_branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".into(),
        }
    }
}

/// Root configuration structure for `release-tool.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notes: NotesConfig,
    pub jobs: JobsConfig,
    pub git: GitConfig,
}

impl Config {
    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.git.default_branch.trim().is_empty() {
            return Err(ReleaseError::invalid_config(
                "git.default_branch must not be empty",
            ));
        }

        if self.jobs.infra_org.is_empty() || self.jobs.infra_repo.is_empty() {
            return Err(ReleaseError::invalid_config(
                "jobs.infra_org and jobs.infra_repo must be set",
            ));
        }

        Ok(())
    }

    /// Loads `path`. An explicitly requested file must exist; the default
    /// file falls back to built in defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        if !explicit && !path.exists() {
            debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            return Ok(Config::default());
        }

        info!("loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_defaults() {
        let config = Config::default();
        assert_eq!(config.notes.bot_account, "kubevirt-bot");
        assert_eq!(config.notes.container_registry, "quay.io");
        assert_eq!(config.notes.project_name, "KubeVirt");
        assert_eq!(config.notes.registry_name, "Quay");
        assert!(!config.notes.template.is_empty());
        assert_eq!(config.jobs.infra_org, "kubevirt");
        assert_eq!(config.jobs.infra_repo, "project-infra");
        assert_eq!(config.git.default_branch, "main");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
[notes]
bot_account = "my-bot"

[jobs]
infra_org = "my-org"
"#,
        )
        .unwrap();

        assert_eq!(config.notes.bot_account, "my-bot");
        assert_eq!(config.notes.demo_repo, "demo");
        assert_eq!(config.jobs.infra_org, "my-org");
        assert_eq!(config.jobs.infra_repo, "project-infra");
        assert_eq!(config.git.default_branch, "main");
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = Config::parse("[notes\nbot_account = 1").unwrap_err();
        assert!(matches!(err, ReleaseError::TomlParseError(_)));
    }

    #[test]
    fn rejects_empty_default_branch() {
        let err =
            Config::parse("[git]\ndefault_branch = \"\"\n").unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidConfig(_)));
    }

    #[test]
    fn explicit_file_must_exist() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.toml");
        assert!(Config::load(Some(&missing)).is_err());

        let present = tmp.path().join("release-tool.toml");
        fs::write(&present, "[git]\ndefault_branch = \"trunk\"\n").unwrap();
        let config = Config::load(Some(&present)).unwrap();
        assert_eq!(config.git.default_branch, "trunk");
    }
}
