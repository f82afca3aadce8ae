//! Validation of the requested branch, tag and promotion before anything is
//! mutated.
use log::*;
use semver::Version;

use crate::{
    blocker,
    error::{ReleaseError, Result},
    forge::types::ReleaseRecord,
    state::ReleaseState,
    version,
};

/// Result of verifying the branch to cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCheck {
    /// Already on the forge, nothing to cut.
    Exists,
    /// Well formed and ready to be cut.
    New,
}

/// Result of verifying the tag to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCheck {
    /// Already released, nothing to tag.
    Exists,
    /// Ready to be tagged on the resolved branch.
    Ready,
}

/// Checks the branch requested in `state`.
pub fn verify_branch(state: &mut ReleaseState) -> Result<BranchCheck> {
    let Some(branch) = state.new_branch.clone() else {
        return Err(ReleaseError::invalid_args("no branch to verify"));
    };

    if state.mirror.has_branch(&branch)? {
        info!("Release branch [{branch}] already exists.");
        return Ok(BranchCheck::Exists);
    }

    if !version::is_release_branch(&branch) {
        return Err(ReleaseError::MalformedBranchName(branch));
    }

    Ok(BranchCheck::New)
}

/// Checks the candidate requested for promotion and derives the official tag
/// it becomes.
pub fn verify_promote(state: &mut ReleaseState) -> Result<()> {
    let Some(rc) = state.promote_rc.as_deref() else {
        return Err(ReleaseError::invalid_args("no candidate to promote"));
    };

    if state.tag.is_some() {
        return Err(ReleaseError::PromotionConflict);
    }

    let tag = version::official_tag_for_rc(rc)?;
    info!("Promoting release candidate [{rc}] to [{tag}]");
    state.tag = Some(tag);
    Ok(())
}

/// Checks the tag requested in `state`, resolving the branch it is cut
/// from and the release it follows.
pub fn verify_tag(state: &mut ReleaseState) -> Result<TagCheck> {
    let Some(tag) = state.tag.clone() else {
        return Err(ReleaseError::invalid_args("no tag to verify"));
    };

    let target = version::parse_version(&tag).map_err(|e| {
        ReleaseError::InvalidTagFormat {
            tag: tag.clone(),
            reason: e.to_string(),
        }
    })?;

    let expected_branch = version::branch_for(&target);
    let releases = state.mirror.releases()?.to_vec();

    if releases.iter().any(|r| r.tag == tag) {
        info!("Release tag [{tag}] already exists");
        return Ok(TagCheck::Exists);
    }

    if let Some(rc) = state.promote_rc.clone() {
        let Some(record) = releases.iter().find(|r| r.tag == rc) else {
            return Err(ReleaseError::RcNotFound(rc));
        };

        let validity =
            blocker::is_invalid(&mut state.mirror, record, &expected_branch)?;
        if validity.invalid {
            return Err(ReleaseError::IneligiblePromotion(rc));
        }
        state.promote_rc_time = Some(record.created_at);
    } else if target.patch == 0
        && !version::is_rc_tag(&tag)
        && !state.force
    {
        return Err(ReleaseError::MustPromoteFromRc(tag));
    }

    state.previous_tag = previous_release(&releases, &target);
    match state.previous_tag.as_deref() {
        Some(previous) => info!("Previous Tag [{previous}]"),
        None => info!("No previous release tag found for tag [{tag}]"),
    }

    if !state.mirror.has_branch(&expected_branch)? {
        return Err(ReleaseError::BranchNotFound {
            branch: expected_branch,
            tag,
        });
    }

    state.tag_branch = Some(expected_branch);
    Ok(TagCheck::Ready)
}

/// Highest published release strictly below `target`. Published release
/// candidates count here, unlike when looking for the current series.
fn previous_release(
    releases: &[ReleaseRecord],
    target: &Version,
) -> Option<String> {
    let mut published: Vec<Version> = releases
        .iter()
        .filter(|r| r.is_published())
        .filter_map(|r| version::parse_version(&r.tag).ok())
        .collect();
    published.sort_by(|a, b| b.cmp(a));

    published
        .into_iter()
        .find(|v| v < target)
        .map(|v| version::tag_for(&v))
}
