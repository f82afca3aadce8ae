//! Traits related to remote git forges
#[cfg(test)]
use mockall::automock;

use crate::{
    error::Result,
    forge::{
        config::RemoteConfig,
        types::{
            BlockerIssue, BlockerPullRequest, BranchRecord, ListIssuesRequest,
            ListPullRequestsRequest, PullRequestDetails, ReleaseRecord,
        },
    },
};

/// Read access to the forge. Every call blocks until the forge answers and
/// returns all pages.
#[cfg_attr(test, automock)]
pub trait Forge {
    fn remote_config(&self) -> RemoteConfig;
    fn list_releases(&self) -> Result<Vec<ReleaseRecord>>;
    fn list_branches(&self) -> Result<Vec<BranchRecord>>;
    fn list_issues(&self, req: ListIssuesRequest) -> Result<Vec<BlockerIssue>>;
    fn list_pull_requests(
        &self,
        req: ListPullRequestsRequest,
    ) -> Result<Vec<BlockerPullRequest>>;
    fn get_pull_request(&self, number: u64) -> Result<PullRequestDetails>;
}
