//! Common test helper functions shared across test modules.
//!
//! Fixture builders for forge records plus the release history most decision
//! tests start from.
use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use std::sync::{Arc, Mutex};

use crate::{
    error::{ReleaseError, Result},
    forge::{
        config::{RemoteConfig, blocker_label},
        mirror::ForgeMirror,
        traits::MockForge,
        types::{
            BlockerIssue, BlockerPullRequest, BlockerSet, BranchRecord,
            EntityState, PullRequestDetails, ReleaseRecord,
        },
    },
    git::CommandRunner,
};

/// Midnight UTC on the given day.
pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    datetime(year, month, day, 0)
}

/// The given hour UTC on the given day.
pub fn datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid test date")
}

/// Published official release with one asset.
pub fn release(tag: &str, created_at: DateTime<Utc>) -> ReleaseRecord {
    ReleaseRecord {
        tag: tag.to_string(),
        created_at,
        draft: false,
        prerelease: false,
        asset_count: 1,
    }
}

/// Release candidate marked as prerelease.
pub fn candidate(tag: &str, created_at: DateTime<Utc>) -> ReleaseRecord {
    ReleaseRecord {
        prerelease: true,
        ..release(tag, created_at)
    }
}

pub fn branch(name: &str) -> BranchRecord {
    BranchRecord {
        name: name.to_string(),
    }
}

pub fn open_issue(number: u64) -> BlockerIssue {
    BlockerIssue {
        number,
        state: EntityState::Open,
        url: format!("https://github.com/fake-org/fake-repo/issues/{number}"),
        title: format!("blocker issue {number}"),
        closed_at: None,
        labels: vec![],
    }
}

pub fn closed_issue(number: u64, closed_at: DateTime<Utc>) -> BlockerIssue {
    BlockerIssue {
        state: EntityState::Closed,
        closed_at: Some(closed_at),
        ..open_issue(number)
    }
}

pub fn open_pr(number: u64) -> BlockerPullRequest {
    BlockerPullRequest {
        number,
        state: EntityState::Open,
        url: format!("https://github.com/fake-org/fake-repo/pull/{number}"),
        title: format!("blocker pr {number}"),
        closed_at: None,
        labels: vec![],
    }
}

pub fn closed_pr(number: u64, closed_at: DateTime<Utc>) -> BlockerPullRequest {
    BlockerPullRequest {
        state: EntityState::Closed,
        closed_at: Some(closed_at),
        ..open_pr(number)
    }
}

pub fn labeled_issue(mut issue: BlockerIssue, branch: &str) -> BlockerIssue {
    issue.labels.push(blocker_label(branch));
    issue
}

pub fn labeled_pr(
    mut pr: BlockerPullRequest,
    branch: &str,
) -> BlockerPullRequest {
    pr.labels.push(blocker_label(branch));
    pr
}

pub fn pull_request(
    number: u64,
    author: &str,
    body: &str,
) -> PullRequestDetails {
    PullRequestDetails {
        number,
        body: Some(body.to_string()),
        labels: vec![],
        author: author.to_string(),
    }
}

pub fn create_test_remote_config() -> RemoteConfig {
    RemoteConfig {
        owner: "fake-org".to_string(),
        repo: "fake-repo".to_string(),
        token: SecretString::from("fake-token".to_string()),
        ..Default::default()
    }
}

/// `v0.1.0` released 2020-01-01 07:00 after `v0.1.0-rc.1` at 01:00, with
/// branch `release-0.1`.
pub fn base_history() -> (Vec<ReleaseRecord>, Vec<BranchRecord>) {
    (
        vec![
            release("v0.1.0", datetime(2020, 1, 1, 7)),
            candidate("v0.1.0-rc.1", datetime(2020, 1, 1, 1)),
        ],
        vec![branch("release-0.1")],
    )
}

/// Mirror over [`base_history`] with empty blocker sets for `main`,
/// `release-0.1` and `release-0.2`. Nothing is fetched from the forge.
pub fn seeded_mirror(
    extra_releases: Vec<ReleaseRecord>,
    extra_branches: Vec<BranchRecord>,
) -> ForgeMirror {
    let mut mock_forge = MockForge::new();
    mock_forge
        .expect_remote_config()
        .returning(create_test_remote_config);

    let (mut releases, mut branches) = base_history();
    releases.extend(extra_releases);
    branches.extend(extra_branches);

    let mut mirror = ForgeMirror::new(Box::new(mock_forge));
    mirror.seed(releases, branches);
    for b in ["main", "release-0.1", "release-0.2"] {
        mirror.seed_blockers(b, BlockerSet::default());
    }
    mirror
}

/// Command runner that records every invocation and answers from a list of
/// canned outputs keyed by a substring of the command line.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    pub seen: Arc<Mutex<Vec<String>>>,
    responses: Vec<(String, std::result::Result<String, String>)>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `needle` with `output`.
    pub fn respond(mut self, needle: &str, output: &str) -> Self {
        self.responses
            .push((needle.to_string(), Ok(output.to_string())));
        self
    }

    /// Fail commands containing `needle` with `output`.
    pub fn fail(mut self, needle: &str, output: &str) -> Self {
        self.responses
            .push((needle.to_string(), Err(output.to_string())));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.seen.lock().expect("lock").clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.seen.lock().expect("lock").push(line.clone());

        for (needle, response) in self.responses.iter() {
            if line.contains(needle.as_str()) {
                return match response {
                    Ok(out) => Ok(out.clone()),
                    Err(out) => Err(ReleaseError::command(&line, out.clone())),
                };
            }
        }

        Ok(String::new())
    }
}
