//! Forge agnostic records for releases, branches and blocker entities.
use chrono::{DateTime, Utc};

/// A published (or draft) release as reported by the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    pub tag: String,
    pub created_at: DateTime<Utc>,
    pub draft: bool,
    pub prerelease: bool,
    pub asset_count: usize,
}

impl ReleaseRecord {
    /// Not a draft, not a prerelease and carries at least one asset.
    pub fn is_published(&self) -> bool {
        !self.draft && !self.prerelease && self.asset_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRecord {
    pub name: String,
}

/// Open / closed state of an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Open,
    Closed,
}

/// Issue carrying a release blocker label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockerIssue {
    pub number: u64,
    pub state: EntityState,
    pub url: String,
    pub title: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
}

/// Pull request carrying a release blocker label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockerPullRequest {
    pub number: u64,
    pub state: EntityState,
    pub url: String,
    pub title: String,
    pub closed_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
}

impl BlockerPullRequest {
    /// A pull request without a close time is still open, whatever its
    /// reported state says.
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none() || self.state == EntityState::Open
    }
}

/// All issues and pull requests labeled as blockers for one branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockerSet {
    pub issues: Vec<BlockerIssue>,
    pub pull_requests: Vec<BlockerPullRequest>,
}

/// Which entities a list request should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    Open,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Request to list issues carrying a label.
pub struct ListIssuesRequest {
    pub label: String,
    pub state: ListState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Request to list pull requests targeting a base branch.
pub struct ListPullRequestsRequest {
    pub base: String,
    pub state: ListState,
}

/// Single pull request as needed for release notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestDetails {
    pub number: u64,
    pub body: Option<String>,
    pub labels: Vec<String>,
    pub author: String,
}
