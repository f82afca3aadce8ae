//! CLI argument parsing and wiring of a release run.
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser};
use secrecy::SecretString;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    cadence::{Cadence, Policy},
    config::{Config, JobsConfig},
    error::{ReleaseError, Result},
    executor::Executor,
    forge::{
        config::{RemoteConfig, authenticated_url},
        github::Github,
        mirror::ForgeMirror,
    },
    git::{GitIdentity, SystemRunner, Workspace},
    pipeline::{self, Outcome},
    state::{ReleaseParams, ReleaseState},
};

pub const DEFAULT_CACHE_DIR: &str = "/tmp/release-tool";
pub const DEFAULT_PROMOTE_AFTER_DAYS: u32 = 7;

/// Cuts release branches and tags for a GitHub repository.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long)]
    /// GitHub organization of the repository.
    pub org: String,

    #[arg(long)]
    /// Repository to release.
    pub repo: String,

    #[arg(long)]
    /// Release branch to cut from the default branch, e.g. release-0.31.
    pub new_branch: Option<String>,

    #[arg(long)]
    /// Tag to create, e.g. v0.31.0-rc.0.
    pub new_release: Option<String>,

    #[arg(long)]
    /// Release candidate tag to promote to an official release.
    pub promote_release_candidate: Option<String>,

    #[arg(long, default_value_t = false)]
    /// Detect the next action from the release history.
    pub auto_release: bool,

    #[arg(
        long = "auto-release-cadance",
        alias = "auto-release-cadence",
        value_enum,
        default_value_t = Cadence::Monthly
    )]
    /// How often auto release starts a new minor series.
    pub auto_release_cadence: Cadence,

    #[arg(long, default_value_t = DEFAULT_PROMOTE_AFTER_DAYS)]
    /// Days a release candidate must exist before auto promotion.
    pub auto_promote_after_days: u32,

    #[arg(long, default_value_t = false)]
    /// Ignore release blockers and allow tags outside the normal flow.
    pub force: bool,

    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    /// Do everything locally without pushing. Pass --dry-run=false to
    /// publish.
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    /// Tag with an empty release notes message.
    pub skip_release_notes: bool,

    #[arg(long, default_value_t = false)]
    /// Do not fork CI job configuration when cutting a branch.
    pub skip_prow: bool,

    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    /// Directory holding cached clones.
    pub cache_dir: PathBuf,

    #[arg(
        long,
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    /// Remove cached clones before running.
    pub clean_cache: bool,

    #[arg(long)]
    /// File containing a GitHub token. Falls back to GITHUB_TOKEN env var.
    pub github_token_file: Option<PathBuf>,

    #[arg(long)]
    /// Committer name set on fresh clones.
    pub git_user: String,

    #[arg(long)]
    /// Committer email set on fresh clones.
    pub git_email: String,

    #[arg(long)]
    /// Path to a release-tool.toml configuration file.
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

impl Args {
    /// Release inputs for a run starting at `now`.
    pub fn release_params(&self, now: DateTime<Utc>) -> Result<ReleaseParams> {
        let mut builder = ReleaseParams::builder();

        builder
            .org(self.org.clone())
            .repo(self.repo.clone())
            .now(now)
            .force(self.force)
            .dry_run(self.dry_run)
            .skip_release_notes(self.skip_release_notes);

        if let Some(tag) = &self.new_release {
            builder.tag(tag.clone());
        }

        if let Some(branch) = &self.new_branch {
            builder.new_branch(branch.clone());
        }

        if let Some(rc) = &self.promote_release_candidate {
            builder.promote_rc(rc.clone());
        }

        if self.auto_release {
            builder.auto_release(Policy {
                cadence: self.auto_release_cadence,
                promote_after_days: self.auto_promote_after_days,
            });
        }

        builder.build()
    }

    pub fn identity(&self) -> GitIdentity {
        GitIdentity {
            name: self.git_user.clone(),
            email: self.git_email.clone(),
        }
    }

    /// Cached clones of the released repository and the infra repository.
    pub fn workspaces(
        &self,
        remote: &RemoteConfig,
        jobs: &JobsConfig,
    ) -> (Workspace, Workspace) {
        let repo = Workspace::new(
            workspace_dir(&self.cache_dir, &remote.owner, &remote.repo),
            SecretString::from(remote.authenticated_url()),
        );

        let infra = Workspace::new(
            workspace_dir(&self.cache_dir, &jobs.infra_org, &jobs.infra_repo),
            SecretString::from(authenticated_url(
                remote,
                &jobs.infra_org,
                &jobs.infra_repo,
            )),
        );

        (repo, infra)
    }
}

fn workspace_dir(cache_dir: &Path, owner: &str, repo: &str) -> PathBuf {
    cache_dir.join(owner).join(format!("https-{repo}"))
}

/// Token from `token_file` when given and non empty, else `env_token`.
pub fn resolve_token(
    token_file: Option<&Path>,
    env_token: Option<String>,
) -> Result<SecretString> {
    let mut token = String::new();

    if let Some(path) = token_file {
        token = fs::read_to_string(path)?.trim().to_string();
    }

    if token.is_empty()
        && let Some(env_token) = env_token
    {
        token = env_token.trim().to_string();
    }

    if token.is_empty() {
        return Err(ReleaseError::invalid_args(
            "must set a github token with --github-token-file or GITHUB_TOKEN",
        ));
    }

    Ok(SecretString::from(token))
}

/// Runs one release invocation against GitHub.
pub fn run(args: &Args) -> Result<Outcome> {
    let config = Config::load(args.config.as_deref())?;

    let token = resolve_token(
        args.github_token_file.as_deref(),
        env::var("GITHUB_TOKEN").ok(),
    )?;

    let remote = RemoteConfig {
        owner: args.org.clone(),
        repo: args.repo.clone(),
        token,
        ..Default::default()
    };

    let (repo, infra) = args.workspaces(&remote, &config.jobs);
    let runner = SystemRunner;
    let executor = Executor::new(
        &runner,
        &config,
        args.identity(),
        repo,
        infra,
        args.github_token_file.clone(),
    );

    if args.clean_cache {
        executor.clean_cache()?;
    }

    let mirror = ForgeMirror::new(Box::new(Github::new(remote)?));
    let params = args.release_params(Utc::now())?;
    let mut state = ReleaseState::new(params, mirror);

    pipeline::run(&mut state, &executor, args.skip_prow)
}
