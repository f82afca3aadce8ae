//! Performs the git mutations of a verified release: branch cuts, signed
//! tags and forked CI job configuration.
//!
//! In dry-run mode everything happens locally and only pushes and pull
//! request creation are suppressed.
use log::*;
use std::path::{Path, PathBuf};

use crate::{
    config::Config,
    error::{ReleaseError, Result},
    git::{CommandRunner, Git, GitIdentity, Workspace},
    notes,
    state::ReleaseState,
    version,
};

/// pr-creator output when the job config pull request is already open.
const PR_EXISTS_MARKER: &str = "A pull request already exists";

pub struct Executor<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a Config,
    identity: GitIdentity,
    repo: Workspace,
    infra: Workspace,
    /// Token file handed to pr-creator.
    token_path: Option<PathBuf>,
}

impl<'a> Executor<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        config: &'a Config,
        identity: GitIdentity,
        repo: Workspace,
        infra: Workspace,
        token_path: Option<PathBuf>,
    ) -> Self {
        Self {
            runner,
            config,
            identity,
            repo,
            infra,
            token_path,
        }
    }

    /// Removes both cached workspaces.
    pub fn clean_cache(&self) -> Result<()> {
        self.repo.clean()?;
        self.infra.clean()
    }

    fn default_branch(&self) -> &str {
        &self.config.git.default_branch
    }

    /// Cuts `state.new_branch` from the tip of the default branch.
    ///
    /// Unless `skip_jobs` is set the CI job configuration is forked for the
    /// branch first. Cached branches and blockers are dropped afterwards so
    /// later steps of the run see the new branch.
    pub fn cut_branch(
        &self,
        state: &mut ReleaseState,
        skip_jobs: bool,
    ) -> Result<()> {
        let Some(branch) = state.new_branch.clone() else {
            return Err(ReleaseError::invalid_args("no branch to cut"));
        };

        if !skip_jobs {
            self.infra.bootstrap(
                self.runner,
                &self.identity,
                self.default_branch(),
            )?;
            self.fork_jobs(state, &branch)?;
        }

        self.repo
            .bootstrap(self.runner, &self.identity, self.default_branch())?;

        let git = Git::new(self.runner, &self.repo.dir);
        git.run(&["checkout", "-b", &branch])?;

        if state.dry_run {
            info!("dry_run: skipping push of branch [{branch}]");
        } else {
            git.run(&["push", self.repo.url_arg(), &branch])?;
            info!("pushed branch [{branch}]");
        }

        state.mirror.invalidate();
        if state.dry_run {
            state.mirror.add_local_branch(&branch);
        }

        Ok(())
    }

    /// Creates the signed tag `state.tag` with the release notes as its
    /// message. Returns the notes file.
    pub fn cut_tag(&self, state: &ReleaseState) -> Result<PathBuf> {
        let (Some(tag), Some(branch)) =
            (state.tag.as_deref(), state.tag_branch.as_deref())
        else {
            return Err(ReleaseError::invalid_args("no verified tag to cut"));
        };

        self.repo
            .bootstrap(self.runner, &self.identity, self.default_branch())?;

        let git = Git::new(self.runner, &self.repo.dir);

        match state.promote_rc.as_deref() {
            Some(rc) => {
                git.run(&["checkout", rc])?;
            }
            None => {
                git.run(&["checkout", branch])?;
                if state.mirror.is_unpushed(branch) {
                    info!("dry_run: [{branch}] was never pushed, not pulling");
                } else {
                    git.run(&["pull", "origin", branch])?;
                }
            }
        }

        let notes_file =
            notes::write_release_notes(state, &git, &self.config.notes)?;
        let notes_arg = notes_file.display().to_string();

        git.run(&["tag", "-s", tag, "-F", &notes_arg])?;

        if state.dry_run {
            info!("dry_run: skipping push of tag [{tag}]");
        } else {
            git.run(&["push", self.repo.url_arg(), tag])?;
            info!("pushed tag [{tag}]");
        }

        Ok(notes_file)
    }

    /// Forks the repository's presubmit job configuration for `branch` in
    /// the infra workspace and proposes it as a pull request.
    pub fn fork_jobs(&self, state: &ReleaseState, branch: &str) -> Result<()> {
        let jobs = &self.config.jobs;
        let series = branch
            .strip_prefix(version::BRANCH_PREFIX)
            .unwrap_or(branch);

        let jobs_dir = Path::new(&jobs.jobs_path)
            .join(&state.org)
            .join(&state.repo);
        let job_config = self
            .infra
            .dir
            .join(&jobs_dir)
            .join(format!("{}-presubmits.yaml", state.repo));
        let output = jobs_dir
            .join(format!("{}-presubmits-{series}.yaml", state.repo))
            .display()
            .to_string();
        let full_output = self.infra.dir.join(&output);

        let git = Git::new(self.runner, &self.infra.dir);
        let config_branch =
            format!("{}_{}_{branch}_configs", state.org, state.repo);

        if git.run(&["checkout", "-b", &config_branch]).is_err() {
            git.run(&["checkout", "-B", &config_branch])?;
        }

        // the branch may not exist upstream yet
        if let Err(err) = git.run(&["pull", "origin", &config_branch]) {
            debug!("pull of [{config_branch}] failed: {err}");
        }

        if !job_config.exists() {
            info!(
                "no presubmit job config at {}, nothing to fork",
                job_config.display()
            );
            return Ok(());
        }

        if full_output.exists() {
            info!("job config {output} already exists");
        } else {
            info!("Creating new prow yaml at path {}", full_output.display());
            self.runner.run(
                &jobs.config_forker,
                &[
                    "--job-config".to_string(),
                    job_config.display().to_string(),
                    "--version".to_string(),
                    series.to_string(),
                    "--output".to_string(),
                    full_output.display().to_string(),
                ],
            )?;

            git.run(&["add", &output])?;
            git.run(&[
                "commit",
                "-s",
                "-m",
                &format!("add presubmit job for branch {branch}"),
            ])?;

            if state.dry_run {
                info!("dry_run: skipping push of [{config_branch}]");
            } else {
                git.run(&["push", self.infra.url_arg(), &config_branch])?;
            }
        }

        if state.dry_run {
            info!("dry_run: skipping pull request for [{config_branch}]");
            return Ok(());
        }

        self.create_jobs_pull_request(state, branch, &config_branch)
    }

    fn create_jobs_pull_request(
        &self,
        state: &ReleaseState,
        branch: &str,
        config_branch: &str,
    ) -> Result<()> {
        let jobs = &self.config.jobs;
        let Some(token_path) = self.token_path.as_ref() else {
            return Err(ReleaseError::invalid_args(
                "--github-token-file is required to open the job config pull request",
            ));
        };

        info!("Creating PR for new prow yamls");
        let args = vec![
            "--org".to_string(),
            jobs.infra_org.clone(),
            "--repo".to_string(),
            jobs.infra_repo.clone(),
            "--branch".to_string(),
            self.default_branch().to_string(),
            "--github-token-path".to_string(),
            token_path.display().to_string(),
            "--title".to_string(),
            format!(
                "Release configs for {}/{} release branch {branch}",
                state.org, state.repo
            ),
            "--body".to_string(),
            "adds new release configs".to_string(),
            "--source".to_string(),
            format!("{}:{config_branch}", jobs.infra_org),
            "--confirm".to_string(),
        ];

        match self.runner.run(&jobs.pr_creator, &args) {
            Ok(_) => Ok(()),
            Err(ReleaseError::GitCommand { output, .. })
                if output.contains(PR_EXISTS_MARKER) =>
            {
                info!("job config pull request already exists");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
