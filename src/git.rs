//! Local git executable and the workspaces it operates on.
//!
//! Every invocation goes through a [`CommandRunner`] so mutation sequences
//! can be recorded instead of executed.
use log::*;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
    sync::LazyLock,
};

#[cfg(test)]
use mockall::automock;

use crate::error::{ReleaseError, Result};

static CREDENTIALS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"://[^@/\s]+@").unwrap());

/// Replaces credentials embedded in URLs with `***`.
pub fn redact(text: &str) -> String {
    CREDENTIALS_REGEX.replace_all(text, "://***@").into_owned()
}

/// Runs an external program to completion.
#[cfg_attr(test, automock)]
pub trait CommandRunner {
    /// Runs `program` with `args` and returns its standard output. A non
    /// zero exit is a [`ReleaseError::GitCommand`] carrying the combined
    /// output.
    fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

/// Runs programs as child processes of this one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        let line = redact(&format!("{program} {}", args.join(" ")));
        debug!("executing '{line}'");

        let output = Command::new(program).args(args).output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = redact(&format!("{stdout}{stderr}"));
            error!("command output: {combined}");
            return Err(ReleaseError::command(line, combined));
        }

        Ok(stdout)
    }
}

/// Git scoped to one working directory.
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    dir: PathBuf,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner, dir: &Path) -> Self {
        Self {
            runner,
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `git -C <dir> <args>`
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let mut full = vec!["-C".to_string(), self.dir.display().to_string()];
        full.extend(args.iter().map(|a| a.to_string()));
        self.runner.run("git", &full)
    }
}

/// Author identity configured on fresh clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

/// A cached clone of a remote repository.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub dir: PathBuf,
    /// Authenticated clone and push URL.
    pub url: SecretString,
}

impl Workspace {
    pub fn new(dir: PathBuf, url: SecretString) -> Self {
        Self { dir, url }
    }

    /// Push URL as a command argument.
    pub fn url_arg(&self) -> &str {
        self.url.expose_secret()
    }

    /// Removes the cached clone.
    pub fn clean(&self) -> Result<()> {
        if self.dir.exists() {
            info!("removing cached workspace {}", self.dir.display());
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Brings the workspace up to date with its remote.
    ///
    /// An existing healthy clone checks out `default_branch` and pulls.
    /// Anything else is removed and cloned fresh, with `identity` set as the
    /// committer.
    pub fn bootstrap(
        &self,
        runner: &dyn CommandRunner,
        identity: &GitIdentity,
        default_branch: &str,
    ) -> Result<()> {
        let git = Git::new(runner, &self.dir);

        if self.dir.exists() {
            if git.run(&["status"]).is_ok() {
                git.run(&["checkout", default_branch])?;
                git.run(&["pull"])?;
                return Ok(());
            }
            warn!(
                "workspace {} is not a usable clone, recloning",
                self.dir.display()
            );
            fs::remove_dir_all(&self.dir)?;
        }

        fs::create_dir_all(&self.dir)?;

        runner.run(
            "git",
            &[
                "clone".to_string(),
                self.url_arg().to_string(),
                self.dir.display().to_string(),
            ],
        )?;

        git.run(&["config", "user.name", &identity.name])?;
        git.run(&["config", "user.email", &identity.email])?;

        Ok(())
    }
}
