//! Single entry point of a release run: detect, verify, then mutate.
//!
//! At most one branch and one tag are created per run. Every failure is
//! terminal and leaves the forge untouched past the last successful push.
use log::*;
use std::path::PathBuf;

use crate::{
    blocker,
    cadence::{self, Decision},
    error::{ReleaseError, Result},
    executor::Executor,
    forge::mirror::MAIN_BRANCH,
    state::ReleaseState,
    verify::{self, BranchCheck, TagCheck},
};

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Auto-detected decision, when auto release was requested.
    pub decision: Option<Decision>,
    pub branch_cut: Option<String>,
    pub tag_cut: Option<String>,
    pub notes_file: Option<PathBuf>,
}

/// Runs the release described by `state`.
pub fn run(
    state: &mut ReleaseState,
    executor: &Executor,
    skip_jobs: bool,
) -> Result<Outcome> {
    let mut outcome = Outcome::default();

    if let Some(policy) = state.auto_release {
        info!(
            "auto release with {} cadence, promoting after {} days",
            policy.cadence, policy.promote_after_days
        );
        let decision = cadence::detect(&mut state.mirror, policy, state.now)?;
        state.apply(&decision);
        outcome.decision = Some(decision);
    }

    if state.promote_rc.is_some() {
        verify::verify_promote(state)?;
    }

    state.log_inputs();

    if state.is_idle() {
        info!("nothing to release");
        return Ok(outcome);
    }

    if let Some(branch) = state.new_branch.clone() {
        match verify::verify_branch(state)? {
            BranchCheck::Exists => {}
            BranchCheck::New => {
                if blocker::is_branch_blocked(
                    &mut state.mirror,
                    MAIN_BRANCH,
                    state.force,
                )? {
                    return Err(ReleaseError::BranchBlocked(branch));
                }
                executor.cut_branch(state, skip_jobs)?;
                info!("created branch [{branch}]");
                outcome.branch_cut = Some(branch);
            }
        }
    }

    if let Some(tag) = state.tag.clone() {
        match verify::verify_tag(state)? {
            TagCheck::Exists => {}
            TagCheck::Ready => {
                let branch = state.tag_branch.clone().unwrap_or_default();
                if blocker::is_branch_blocked(
                    &mut state.mirror,
                    &branch,
                    state.force,
                )? {
                    return Err(ReleaseError::ReleaseBlocked(branch));
                }
                let notes_file = executor.cut_tag(state)?;
                info!("created tag [{tag}] on [{branch}]");
                outcome.tag_cut = Some(tag);
                outcome.notes_file = Some(notes_file);
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cadence::{Cadence, Policy},
        config::Config,
        forge::{
            mirror::ForgeMirror,
            traits::MockForge,
            types::{
                BlockerIssue, BlockerPullRequest, BranchRecord, EntityState,
                ListState, ReleaseRecord,
            },
        },
        git::{GitIdentity, Workspace},
        state::{ReleaseParams, ReleaseParamsBuilder},
        test_helpers::*,
    };
    use chrono::{DateTime, Utc};
    use secrecy::SecretString;
    use tempfile::TempDir;

    struct ForgeState {
        releases: Vec<ReleaseRecord>,
        branches: Vec<BranchRecord>,
        issues: Vec<BlockerIssue>,
        pull_requests: Vec<BlockerPullRequest>,
    }

    impl ForgeState {
        fn new(extra: Vec<ReleaseRecord>) -> Self {
            let (mut releases, branches) = base_history();
            releases.extend(extra);
            Self {
                releases,
                branches,
                issues: vec![],
                pull_requests: vec![],
            }
        }

        fn mirror(self) -> ForgeMirror {
            let mut mock_forge = MockForge::new();
            mock_forge
                .expect_remote_config()
                .returning(create_test_remote_config);
            mock_forge
                .expect_list_releases()
                .returning(move || Ok(self.releases.clone()));
            mock_forge
                .expect_list_branches()
                .returning(move || Ok(self.branches.clone()));
            let issues = self.issues;
            mock_forge.expect_list_issues().returning(move |req| {
                Ok(issues
                    .iter()
                    .filter(|i| {
                        req.state == ListState::All
                            || i.state == EntityState::Open
                    })
                    .cloned()
                    .collect())
            });
            let pull_requests = self.pull_requests;
            mock_forge
                .expect_list_pull_requests()
                .returning(move |_| Ok(pull_requests.clone()));
            ForgeMirror::new(Box::new(mock_forge))
        }
    }

    struct Fixture {
        tmp: TempDir,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tmp: TempDir::new().unwrap(),
                config: Config::default(),
            }
        }

        fn repo_dir(&self) -> PathBuf {
            self.tmp.path().join("fake-org").join("https-fake-repo")
        }

        fn executor<'a>(&'a self, runner: &'a RecordingRunner) -> Executor<'a> {
            Executor::new(
                runner,
                &self.config,
                GitIdentity {
                    name: "fake-user".into(),
                    email: "fake-email@fake.fake".into(),
                },
                Workspace::new(
                    self.repo_dir(),
                    SecretString::from(
                        "https://fake-token@github.com/fake-org/fake-repo.git"
                            .to_string(),
                    ),
                ),
                Workspace::new(
                    self.tmp.path().join("kubevirt").join("https-project-infra"),
                    SecretString::from(
                        "https://fake-token@github.com/kubevirt/project-infra.git"
                            .to_string(),
                    ),
                ),
                None,
            )
        }
    }

    fn params(now: DateTime<Utc>) -> ReleaseParamsBuilder {
        let mut builder = ReleaseParams::builder();
        builder.org("fake-org").repo("fake-repo").now(now);
        builder
    }

    fn monthly() -> Policy {
        Policy {
            cadence: Cadence::Monthly,
            promote_after_days: 7,
        }
    }

    #[test_log::test]
    fn auto_release_cuts_branch_and_first_candidate() {
        let fx = Fixture::new();
        // the branch only exists in the local clone during a dry run
        let runner = RecordingRunner::new().fail(
            "pull origin release-0.2",
            "fatal: couldn't find remote ref release-0.2",
        );
        let mirror = ForgeState::new(vec![]).mirror();
        let params = params(datetime(2020, 2, 1, 1))
            .auto_release(monthly())
            .build()
            .unwrap();
        let mut state = ReleaseState::new(params, mirror);

        let outcome = run(&mut state, &fx.executor(&runner), true).unwrap();

        assert_eq!(
            outcome.decision,
            Some(Decision::CutMinor {
                branch: "release-0.2".into(),
                tag: "v0.2.0-rc.0".into(),
            })
        );
        assert_eq!(outcome.branch_cut.as_deref(), Some("release-0.2"));
        assert_eq!(outcome.tag_cut.as_deref(), Some("v0.2.0-rc.0"));
        assert_eq!(
            outcome.notes_file,
            Some(fx.repo_dir().join("v0.2.0-rc.0-release-notes.txt"))
        );

        let repo = fx.repo_dir().display().to_string();
        let commands = runner.commands();
        let position = |needle: &str| {
            commands
                .iter()
                .position(|c| c.ends_with(needle))
                .unwrap_or_else(|| panic!("missing command {needle}"))
        };
        assert!(
            position("checkout -b release-0.2")
                < position("checkout release-0.2")
        );
        assert!(
            position("checkout release-0.2")
                < position("log --merges --oneline v0.1.0..release-0.2")
        );
        assert!(!commands.iter().any(|c| c.contains("origin/release-0.2")));
        assert!(commands.last().unwrap().ends_with(&format!(
            "tag -s v0.2.0-rc.0 -F {repo}/v0.2.0-rc.0-release-notes.txt"
        )));
        // dry run by default
        assert!(!commands.iter().any(|c| c.contains(" push ")));
    }

    #[test_log::test]
    fn auto_release_promotes_candidate() {
        let fx = Fixture::new();
        let runner = RecordingRunner::new();
        let mut forge = ForgeState::new(vec![candidate(
            "v0.2.0-rc.1",
            datetime(2020, 2, 1, 1),
        )]);
        forge.branches.push(branch("release-0.2"));
        let params = params(datetime(2020, 2, 8, 1))
            .auto_release(monthly())
            .dry_run(false)
            .build()
            .unwrap();
        let mut state = ReleaseState::new(params, forge.mirror());

        let outcome = run(&mut state, &fx.executor(&runner), true).unwrap();

        assert_eq!(
            outcome.decision,
            Some(Decision::PromoteRc {
                tag: "v0.2.0-rc.1".into()
            })
        );
        assert_eq!(outcome.branch_cut, None);
        assert_eq!(outcome.tag_cut.as_deref(), Some("v0.2.0"));

        let notes =
            std::fs::read_to_string(outcome.notes_file.unwrap()).unwrap();
        assert!(notes.contains(
            "v0.2.0 is a promotion of release candidate v0.2.0-rc.1 which was originally published 2020-02-01"
        ));

        let commands = runner.commands();
        assert!(commands.iter().any(|c| c.ends_with("checkout v0.2.0-rc.1")));
        assert!(commands.last().unwrap().ends_with(
            "push https://fake-token@github.com/fake-org/fake-repo.git v0.2.0"
        ));
    }

    #[test]
    fn auto_release_without_action_touches_nothing() {
        let fx = Fixture::new();
        let runner = RecordingRunner::new();
        let params = params(datetime(2020, 1, 31, 1))
            .auto_release(monthly())
            .build()
            .unwrap();
        let mut state =
            ReleaseState::new(params, ForgeState::new(vec![]).mirror());

        let outcome = run(&mut state, &fx.executor(&runner), true).unwrap();

        assert_eq!(outcome.decision, Some(Decision::NoAction));
        assert_eq!(outcome.branch_cut, None);
        assert_eq!(outcome.tag_cut, None);
        assert!(runner.commands().is_empty());
    }

    #[test_log::test]
    fn open_main_blocker_stops_branch_cut() {
        let fx = Fixture::new();
        let runner = RecordingRunner::new();
        let mut forge = ForgeState::new(vec![]);
        forge.issues.push(labeled_issue(open_issue(9), "main"));
        let params = params(datetime(2020, 2, 1, 1))
            .new_branch("release-0.2")
            .build()
            .unwrap();
        let mut state = ReleaseState::new(params, forge.mirror());

        let err = run(&mut state, &fx.executor(&runner), true).unwrap_err();

        assert!(matches!(err, ReleaseError::BranchBlocked(ref b) if b == "release-0.2"));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn force_ignores_blockers() {
        let fx = Fixture::new();
        let runner = RecordingRunner::new();
        let mut forge = ForgeState::new(vec![]);
        forge.issues.push(labeled_issue(open_issue(9), "main"));
        let params = params(datetime(2020, 2, 1, 1))
            .new_branch("release-0.2")
            .force(true)
            .build()
            .unwrap();
        let mut state = ReleaseState::new(params, forge.mirror());

        let outcome = run(&mut state, &fx.executor(&runner), true).unwrap();
        assert_eq!(outcome.branch_cut.as_deref(), Some("release-0.2"));
    }

    #[test_log::test]
    fn open_release_blocker_stops_tag() {
        let fx = Fixture::new();
        let runner = RecordingRunner::new();
        let mut forge = ForgeState::new(vec![]);
        forge
            .pull_requests
            .push(labeled_pr(open_pr(12), "release-0.1"));
        let params = params(datetime(2020, 2, 1, 1))
            .tag("v0.1.1")
            .build()
            .unwrap();
        let mut state = ReleaseState::new(params, forge.mirror());

        let err = run(&mut state, &fx.executor(&runner), true).unwrap_err();

        assert!(matches!(err, ReleaseError::ReleaseBlocked(ref b) if b == "release-0.1"));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn existing_branch_and_tag_are_no_ops() {
        let fx = Fixture::new();
        let runner = RecordingRunner::new();
        let params = params(datetime(2020, 2, 1, 1))
            .new_branch("release-0.1")
            .tag("v0.1.0")
            .build()
            .unwrap();
        let mut state =
            ReleaseState::new(params, ForgeState::new(vec![]).mirror());

        let outcome = run(&mut state, &fx.executor(&runner), true).unwrap();

        assert_eq!(outcome.branch_cut, None);
        assert_eq!(outcome.tag_cut, None);
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn promotion_conflicts_with_explicit_tag() {
        let fx = Fixture::new();
        let runner = RecordingRunner::new();
        let params = params(datetime(2020, 2, 1, 1))
            .tag("v0.2.0")
            .promote_rc("v0.2.0-rc.1")
            .build()
            .unwrap();
        let mut state =
            ReleaseState::new(params, ForgeState::new(vec![]).mirror());

        let err = run(&mut state, &fx.executor(&runner), true).unwrap_err();
        assert!(matches!(err, ReleaseError::PromotionConflict));
    }
}
