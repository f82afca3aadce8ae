//! Decides which single release action a periodic run should take.
//!
//! Outcomes are mutually exclusive and checked in order: cutting a new minor
//! series wins over anything the release candidate of the next series would
//! ask for.
use chrono::{DateTime, Datelike, Utc};
use clap::ValueEnum;
use log::*;
use std::{fmt::Display, str::FromStr};

use crate::{
    blocker,
    error::{ReleaseError, Result},
    forge::mirror::ForgeMirror,
    selector, version,
};

/// Grace window absorbing periodic job scheduling jitter.
pub const PROMOTION_TOLERANCE_SECONDS: i64 = 3 * 60 * 60;

const SECONDS_PER_DAY: i64 = 86400;

/// How often a new minor release series is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Cadence {
    Daily,
    Monthly,
}

impl FromStr for Cadence {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Cadence::Daily),
            "monthly" => Ok(Cadence::Monthly),
            other => Err(ReleaseError::UnknownCadence(other.to_string())),
        }
    }
}

impl Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cadence::Daily => f.write_str("daily"),
            Cadence::Monthly => f.write_str("monthly"),
        }
    }
}

/// Auto release policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub cadence: Cadence,
    pub promote_after_days: u32,
}

/// The one action chosen for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Cut `branch` and tag its first candidate `tag`.
    CutMinor { branch: String, tag: String },
    /// Supersede an invalidated candidate with `tag` on `branch`.
    CutNewRc { branch: String, tag: String },
    /// Promote candidate `tag` to an official release.
    PromoteRc { tag: String },
    NoAction,
}

/// Compares calendar fields, not elapsed time: crossing midnight counts as a
/// new day for the daily cadence even if fewer than 24 hours passed.
pub fn is_minor_due(
    cadence: Cadence,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    if cadence == Cadence::Daily && now.day() > created_at.day() {
        return true;
    }
    now.month() > created_at.month() || now.year() > created_at.year()
}

/// Seconds left before a candidate created at `created_at` may be promoted.
/// Zero or negative means promotion is due.
pub fn promotion_remaining_seconds(
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    promote_after_days: u32,
) -> i64 {
    let wait = SECONDS_PER_DAY * i64::from(promote_after_days)
        - PROMOTION_TOLERANCE_SECONDS;
    let elapsed = now.timestamp() - created_at.timestamp();
    wait - elapsed
}

/// Inspects the release history and blockers and picks the next action.
pub fn detect(
    mirror: &mut ForgeMirror,
    policy: Policy,
    now: DateTime<Utc>,
) -> Result<Decision> {
    let releases = mirror.releases()?.to_vec();

    let Some(series) = selector::current_minor_series(&releases) else {
        warn!("no official x.y.0 release found, nothing to detect");
        return Ok(Decision::NoAction);
    };

    if !selector::next_series_started(&releases, &series)
        && is_minor_due(policy.cadence, series.current.created_at, now)
    {
        info!(
            "Auto mode detected a new branch [{}] and new tag [{}] should be created",
            series.next_branch, series.next_rc0_tag
        );
        return Ok(Decision::CutMinor {
            branch: series.next_branch,
            tag: series.next_rc0_tag,
        });
    }

    let Some(rc) = selector::highest_rc(&releases, &series) else {
        return Ok(Decision::NoAction);
    };

    info!(
        "Most recent RC for next release series is detected as {}",
        rc.release.tag
    );

    let validity =
        blocker::is_invalid(mirror, &rc.release, &series.next_branch)?;

    if validity.invalid {
        if validity.blocks_new_candidate {
            info!("RC {} is blocked, waiting on open blockers", rc.release.tag);
            return Ok(Decision::NoAction);
        }

        let parsed = version::parse_version(&rc.release.tag)?;
        let tag = version::rc_tag(parsed.major, parsed.minor, rc.ordinal + 1);
        info!(
            "Auto creating new RC [{tag}] for branch [{}] due to blocker",
            series.next_branch
        );
        return Ok(Decision::CutNewRc {
            branch: series.next_branch,
            tag,
        });
    }

    let remaining = promotion_remaining_seconds(
        rc.release.created_at,
        now,
        policy.promote_after_days,
    );

    if remaining <= 0 {
        info!(
            "Auto promoting rc [{}] after [{}] days",
            rc.release.tag, policy.promote_after_days
        );
        return Ok(Decision::PromoteRc {
            tag: rc.release.tag,
        });
    }

    info!(
        "Waiting to promote RC {}. {remaining} seconds remain",
        rc.release.tag
    );
    Ok(Decision::NoAction)
}
