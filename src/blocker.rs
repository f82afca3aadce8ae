//! Release blocker evaluation.
//!
//! A blocker is an issue or pull request labeled `release-blocker/<branch>`.
//! An open blocker invalidates every candidate on the branch and prevents a
//! new one from being cut. A blocker closed after a candidate was created
//! only invalidates that candidate: the fix landed after it, so a new
//! candidate can be cut.
use chrono::{DateTime, Utc};
use log::*;

use crate::{
    error::Result,
    forge::{
        mirror::ForgeMirror,
        types::{BlockerSet, EntityState, ReleaseRecord},
    },
};

/// Outcome of checking a candidate against the blockers of its branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Validity {
    /// The candidate must be superseded.
    pub invalid: bool,
    /// No new candidate may be cut yet.
    pub blocks_new_candidate: bool,
}

/// Evaluates a blocker set against a candidate created at `created_at`.
pub fn evaluate(set: &BlockerSet, created_at: DateTime<Utc>) -> Validity {
    let mut validity = Validity::default();

    for issue in set.issues.iter() {
        if issue.state == EntityState::Open {
            info!(
                "RC Promotion blocked [issue #{} - {}] {}",
                issue.number, issue.url, issue.title
            );
            validity.invalid = true;
            validity.blocks_new_candidate = true;
        } else if issue.closed_at.is_some_and(|closed| closed > created_at) {
            info!(
                "RC Promotion invalidated by [issue #{} - {}] {}",
                issue.number, issue.url, issue.title
            );
            validity.invalid = true;
        }
    }

    for pr in set.pull_requests.iter() {
        if pr.is_open() {
            info!("BLOCKED BY [PR #{} - {}] {}", pr.number, pr.url, pr.title);
            validity.invalid = true;
            validity.blocks_new_candidate = true;
        } else if pr.closed_at.is_some_and(|closed| closed > created_at) {
            info!(
                "RC Invalidated by [PR #{} - {}] {}",
                pr.number, pr.url, pr.title
            );
            validity.invalid = true;
        }
    }

    validity
}

/// Checks whether `candidate` is invalidated by the blockers of `branch`.
pub fn is_invalid(
    mirror: &mut ForgeMirror,
    candidate: &ReleaseRecord,
    branch: &str,
) -> Result<Validity> {
    let set = mirror.blockers(branch)?;
    Ok(evaluate(set, candidate.created_at))
}

/// Returns true if any blocker of `branch` is currently open. Every open
/// blocker is logged.
pub fn has_open_blockers(
    mirror: &mut ForgeMirror,
    branch: &str,
) -> Result<bool> {
    let set = mirror.blockers(branch)?;
    let mut open = false;

    for pr in set.pull_requests.iter() {
        if pr.state == EntityState::Open {
            warn!("BLOCKED BY [PR #{} - {}] {}", pr.number, pr.url, pr.title);
            open = true;
        }
    }

    for issue in set.issues.iter() {
        if issue.state == EntityState::Open {
            warn!(
                "BLOCKED BY [issue #{} - {}] {}",
                issue.number, issue.url, issue.title
            );
            open = true;
        }
    }

    Ok(open)
}

/// Like [`has_open_blockers`], but `force` lets the release proceed anyway.
pub fn is_branch_blocked(
    mirror: &mut ForgeMirror,
    branch: &str,
    force: bool,
) -> Result<bool> {
    if has_open_blockers(mirror, branch)? {
        if force {
            warn!("Ignoring blockers for [{branch}] due to use of [--force]");
            return Ok(false);
        }
        return Ok(true);
    }

    info!("no blockers found for [{branch}]");
    Ok(false)
}
