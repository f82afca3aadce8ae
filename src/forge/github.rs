//! Implements the Forge trait for Github
use log::*;
use octocrab::{
    Octocrab,
    models::{IssueState, Label},
    params,
};
use tokio::runtime::Runtime;

use crate::{
    error::Result,
    forge::{
        config::{DEFAULT_PAGE_SIZE, RemoteConfig},
        traits::Forge,
        types::{
            BlockerIssue, BlockerPullRequest, BranchRecord, EntityState,
            ListIssuesRequest, ListPullRequestsRequest, ListState,
            PullRequestDetails, ReleaseRecord,
        },
    },
};

/// GitHub forge implementation using Octocrab. Calls are driven to
/// completion on a private current-thread runtime so callers stay
/// synchronous.
pub struct Github {
    config: RemoteConfig,
    base_uri: String,
    rt: Runtime,
}

impl Github {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let base_uri = config.api_base_uri();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            config,
            base_uri,
            rt,
        })
    }

    fn new_instance(&self) -> Result<Octocrab> {
        let instance = Octocrab::builder()
            .personal_token(self.config.token.clone())
            .base_uri(self.base_uri.clone())?
            .build()?;
        Ok(instance)
    }
}

fn params_state(state: ListState) -> params::State {
    match state {
        ListState::Open => params::State::Open,
        ListState::All => params::State::All,
    }
}

fn entity_state(state: Option<&IssueState>) -> EntityState {
    match state {
        Some(IssueState::Open) => EntityState::Open,
        _ => EntityState::Closed,
    }
}

fn label_names(labels: &[Label]) -> Vec<String> {
    labels.iter().map(|l| l.name.clone()).collect()
}

impl Github {
    async fn fetch_releases(&self) -> Result<Vec<ReleaseRecord>> {
        let octocrab = self.new_instance()?;
        let page = octocrab
            .repos(&self.config.owner, &self.config.repo)
            .releases()
            .list()
            .per_page(DEFAULT_PAGE_SIZE)
            .send()
            .await?;
        let releases = octocrab.all_pages(page).await?;

        debug!("fetched {} releases", releases.len());

        Ok(releases
            .into_iter()
            .filter_map(|r| {
                let Some(created_at) = r.created_at else {
                    warn!(
                        "skipping release {} without creation time",
                        r.tag_name
                    );
                    return None;
                };
                Some(ReleaseRecord {
                    tag: r.tag_name,
                    created_at,
                    draft: r.draft,
                    prerelease: r.prerelease,
                    asset_count: r.assets.len(),
                })
            })
            .collect())
    }

    async fn fetch_branches(&self) -> Result<Vec<BranchRecord>> {
        let octocrab = self.new_instance()?;
        let page = octocrab
            .repos(&self.config.owner, &self.config.repo)
            .list_branches()
            .per_page(DEFAULT_PAGE_SIZE)
            .send()
            .await?;
        let branches = octocrab.all_pages(page).await?;

        debug!("fetched {} branches", branches.len());

        Ok(branches
            .into_iter()
            .map(|b| BranchRecord { name: b.name })
            .collect())
    }

    async fn fetch_issues(
        &self,
        req: ListIssuesRequest,
    ) -> Result<Vec<BlockerIssue>> {
        let octocrab = self.new_instance()?;
        let labels = vec![req.label.clone()];
        let page = octocrab
            .issues(&self.config.owner, &self.config.repo)
            .list()
            .labels(&labels)
            .state(params_state(req.state))
            .per_page(DEFAULT_PAGE_SIZE)
            .send()
            .await?;
        let issues = octocrab.all_pages(page).await?;

        // the issues endpoint also returns pull requests
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(|i| BlockerIssue {
                number: i.number,
                state: entity_state(Some(&i.state)),
                url: i.html_url.to_string(),
                title: i.title,
                closed_at: i.closed_at,
                labels: label_names(&i.labels),
            })
            .collect())
    }

    async fn fetch_pull_requests(
        &self,
        req: ListPullRequestsRequest,
    ) -> Result<Vec<BlockerPullRequest>> {
        let octocrab = self.new_instance()?;
        let page = octocrab
            .pulls(&self.config.owner, &self.config.repo)
            .list()
            .base(req.base.clone())
            .state(params_state(req.state))
            .per_page(DEFAULT_PAGE_SIZE)
            .send()
            .await?;
        let prs = octocrab.all_pages(page).await?;

        Ok(prs
            .into_iter()
            .map(|pr| BlockerPullRequest {
                number: pr.number,
                state: entity_state(pr.state.as_ref()),
                url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
                title: pr.title.unwrap_or_default(),
                closed_at: pr.closed_at,
                labels: pr
                    .labels
                    .map(|l| label_names(&l))
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn fetch_pull_request(
        &self,
        number: u64,
    ) -> Result<PullRequestDetails> {
        let octocrab = self.new_instance()?;
        let pr = octocrab
            .pulls(&self.config.owner, &self.config.repo)
            .get(number)
            .await?;

        Ok(PullRequestDetails {
            number: pr.number,
            body: pr.body,
            labels: pr
                .labels
                .map(|l| label_names(&l))
                .unwrap_or_default(),
            author: pr.user.map(|u| u.login).unwrap_or_default(),
        })
    }
}

impl Forge for Github {
    fn remote_config(&self) -> RemoteConfig {
        self.config.clone()
    }

    fn list_releases(&self) -> Result<Vec<ReleaseRecord>> {
        self.rt.block_on(self.fetch_releases())
    }

    fn list_branches(&self) -> Result<Vec<BranchRecord>> {
        self.rt.block_on(self.fetch_branches())
    }

    fn list_issues(&self, req: ListIssuesRequest) -> Result<Vec<BlockerIssue>> {
        self.rt.block_on(self.fetch_issues(req))
    }

    fn list_pull_requests(
        &self,
        req: ListPullRequestsRequest,
    ) -> Result<Vec<BlockerPullRequest>> {
        self.rt.block_on(self.fetch_pull_requests(req))
    }

    fn get_pull_request(&self, number: u64) -> Result<PullRequestDetails> {
        self.rt.block_on(self.fetch_pull_request(number))
    }
}
