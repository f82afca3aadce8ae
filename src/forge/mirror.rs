//! Read-through, in-process mirror of the forge state a release run needs.
//!
//! Releases and branches are fetched once per run. Blocker sets are cached by
//! their label string. A branch cut changes what the forge reports, so the
//! executor calls [`ForgeMirror::invalidate`] right after a successful cut.
use log::*;
use std::collections::HashMap;

use crate::{
    error::Result,
    forge::{
        config::{RemoteConfig, blocker_label},
        traits::Forge,
        types::{
            BlockerSet, BranchRecord, ListIssuesRequest,
            ListPullRequestsRequest, ListState, PullRequestDetails,
            ReleaseRecord,
        },
    },
};

/// Branch whose blockers are only ever listed in open state.
pub const MAIN_BRANCH: &str = "main";

pub struct ForgeMirror {
    forge: Box<dyn Forge>,
    releases: Option<Vec<ReleaseRecord>>,
    branches: Option<Vec<BranchRecord>>,
    local_branches: Vec<String>,
    blockers: HashMap<String, BlockerSet>,
}

impl ForgeMirror {
    pub fn new(forge: Box<dyn Forge>) -> Self {
        Self {
            forge,
            releases: None,
            branches: None,
            local_branches: vec![],
            blockers: HashMap::new(),
        }
    }

    pub fn remote_config(&self) -> RemoteConfig {
        self.forge.remote_config()
    }

    /// All releases of the repository, fetched on first use.
    pub fn releases(&mut self) -> Result<&[ReleaseRecord]> {
        if self.releases.is_none() {
            debug!("fetching releases");
            self.releases = Some(self.forge.list_releases()?);
        }
        Ok(self.releases.as_deref().unwrap_or_default())
    }

    /// All branches of the repository, fetched on first use. Branches that
    /// were created locally during a dry run are appended.
    pub fn branches(&mut self) -> Result<&[BranchRecord]> {
        if self.branches.is_none() {
            debug!("fetching branches");
            let mut branches = self.forge.list_branches()?;
            for name in self.local_branches.iter() {
                if !branches.iter().any(|b| &b.name == name) {
                    branches.push(BranchRecord { name: name.clone() });
                }
            }
            self.branches = Some(branches);
        }
        Ok(self.branches.as_deref().unwrap_or_default())
    }

    pub fn has_branch(&mut self, name: &str) -> Result<bool> {
        Ok(self.branches()?.iter().any(|b| b.name == name))
    }

    /// Issues and PRs labeled `release-blocker/<branch>`.
    ///
    /// For `main` only open entities are listed. For release branches closed
    /// entities are kept too, because their close time decides whether an
    /// existing candidate is still valid. Forge side label filtering is not
    /// trusted, every entity is checked for the exact label.
    pub fn blockers(&mut self, branch: &str) -> Result<&BlockerSet> {
        let label = blocker_label(branch);

        if !self.blockers.contains_key(&label) {
            let set = self.fetch_blockers(branch, &label)?;
            self.blockers.insert(label.clone(), set);
        }

        Ok(&self.blockers[&label])
    }

    fn fetch_blockers(&self, branch: &str, label: &str) -> Result<BlockerSet> {
        let state = if branch == MAIN_BRANCH {
            ListState::Open
        } else {
            ListState::All
        };

        debug!("fetching blockers for label {label} with state {state:?}");

        let issues = self.forge.list_issues(ListIssuesRequest {
            label: label.to_string(),
            state,
        })?;

        let pull_requests =
            self.forge.list_pull_requests(ListPullRequestsRequest {
                base: branch.to_string(),
                state,
            })?;

        Ok(BlockerSet {
            issues: issues
                .into_iter()
                .filter(|i| i.labels.iter().any(|l| l == label))
                .collect(),
            pull_requests: pull_requests
                .into_iter()
                .filter(|pr| pr.labels.iter().any(|l| l == label))
                .collect(),
        })
    }

    pub fn get_pull_request(&self, number: u64) -> Result<PullRequestDetails> {
        self.forge.get_pull_request(number)
    }

    /// Drops cached branches and blocker sets so they are fetched again.
    pub fn invalidate(&mut self) {
        debug!("invalidating branch and blocker caches");
        self.branches = None;
        self.blockers.clear();
    }

    /// Records a branch that exists locally but was never pushed, so the
    /// rest of a dry run sees it.
    pub fn add_local_branch(&mut self, name: &str) {
        if !self.local_branches.iter().any(|b| b == name) {
            self.local_branches.push(name.to_string());
        }
        if let Some(branches) = self.branches.as_mut()
            && !branches.iter().any(|b| b.name == name)
        {
            branches.push(BranchRecord {
                name: name.to_string(),
            });
        }
    }

    /// True for a branch cut during this dry run that the forge never saw.
    pub fn is_unpushed(&self, name: &str) -> bool {
        self.local_branches.iter().any(|b| b == name)
    }

    /// Pre-populates the caches. Used to replay a known forge state.
    #[cfg(test)]
    pub fn seed(
        &mut self,
        releases: Vec<ReleaseRecord>,
        branches: Vec<BranchRecord>,
    ) {
        self.releases = Some(releases);
        self.branches = Some(branches);
    }

    /// Pre-populates the blocker set of a branch.
    #[cfg(test)]
    pub fn seed_blockers(&mut self, branch: &str, set: BlockerSet) {
        self.blockers.insert(blocker_label(branch), set);
    }
}
