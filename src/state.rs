//! Per invocation release state.
//!
//! The state is built once from the resolved inputs, then filled in by
//! auto-detection and verification before any mutation runs.
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use log::*;

use crate::{
    cadence::{Decision, Policy},
    error::{ReleaseError, Result},
    forge::mirror::ForgeMirror,
};

/// Inputs of a single release run.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct ReleaseParams {
    pub org: String,
    pub repo: String,
    /// Tag to create.
    #[builder(default, setter(strip_option))]
    pub tag: Option<String>,
    /// Branch to cut.
    #[builder(default, setter(strip_option))]
    pub new_branch: Option<String>,
    /// Release candidate to promote to an official release.
    #[builder(default, setter(strip_option))]
    pub promote_rc: Option<String>,
    /// Decide the action from the release history instead of the inputs.
    #[builder(default, setter(strip_option))]
    pub auto_release: Option<Policy>,
    /// Injected clock.
    pub now: DateTime<Utc>,
    #[builder(default)]
    pub force: bool,
    #[builder(default = "true")]
    pub dry_run: bool,
    #[builder(default)]
    pub skip_release_notes: bool,
}

impl ReleaseParamsBuilder {
    pub fn build(&self) -> Result<ReleaseParams> {
        self._build().map_err(|e| {
            ReleaseError::invalid_args(format!(
                "Failed to build release parameters: {e}"
            ))
        })
    }
}

impl ReleaseParams {
    pub fn builder() -> ReleaseParamsBuilder {
        ReleaseParamsBuilder::default()
    }
}

/// Inputs plus everything resolved while verifying them.
pub struct ReleaseState {
    pub org: String,
    pub repo: String,
    pub tag: Option<String>,
    pub new_branch: Option<String>,
    /// Branch the tag is cut from, set by tag verification.
    pub tag_branch: Option<String>,
    pub promote_rc: Option<String>,
    /// Creation time of the promoted candidate.
    pub promote_rc_time: Option<DateTime<Utc>>,
    /// Highest official release below the tag, start of the notes span.
    pub previous_tag: Option<String>,
    pub auto_release: Option<Policy>,
    pub now: DateTime<Utc>,
    pub force: bool,
    pub dry_run: bool,
    pub skip_release_notes: bool,
    pub mirror: ForgeMirror,
}

impl ReleaseState {
    pub fn new(params: ReleaseParams, mirror: ForgeMirror) -> Self {
        Self {
            org: params.org,
            repo: params.repo,
            tag: params.tag,
            new_branch: params.new_branch,
            tag_branch: None,
            promote_rc: params.promote_rc,
            promote_rc_time: None,
            previous_tag: None,
            auto_release: params.auto_release,
            now: params.now,
            force: params.force,
            dry_run: params.dry_run,
            skip_release_notes: params.skip_release_notes,
            mirror,
        }
    }

    /// Records an auto-detected decision as explicit inputs.
    pub fn apply(&mut self, decision: &Decision) {
        match decision {
            Decision::CutMinor { branch, tag } => {
                self.tag = Some(tag.clone());
                self.new_branch = Some(branch.clone());
                self.tag_branch = Some(branch.clone());
            }
            Decision::CutNewRc { branch, tag } => {
                self.tag = Some(tag.clone());
                self.tag_branch = Some(branch.clone());
            }
            Decision::PromoteRc { tag } => {
                self.promote_rc = Some(tag.clone());
            }
            Decision::NoAction => {}
        }
    }

    /// Git ref the tag branch is read from: `origin/<branch>`, or the local
    /// branch when it was cut by this dry run and never pushed.
    pub fn tag_branch_ref(&self) -> Option<String> {
        let branch = self.tag_branch.as_deref()?;
        if self.mirror.is_unpushed(branch) {
            Some(branch.to_string())
        } else {
            Some(format!("origin/{branch}"))
        }
    }

    /// True when there is nothing to cut.
    pub fn is_idle(&self) -> bool {
        self.tag.is_none()
            && self.new_branch.is_none()
            && self.promote_rc.is_none()
    }

    /// Logs the resolved inputs. The token never appears here.
    pub fn log_inputs(&self) {
        let unset = || "-".to_string();
        let marker = if self.dry_run { "DRY-RUN " } else { "" };
        info!(
            "{marker}release inputs: org [{}] repo [{}] tag [{}] new branch [{}] promote [{}] force [{}]",
            self.org,
            self.repo,
            self.tag.clone().unwrap_or_else(unset),
            self.new_branch.clone().unwrap_or_else(unset),
            self.promote_rc.clone().unwrap_or_else(unset),
            self.force,
        );
    }
}
