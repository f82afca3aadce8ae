//! Finds the current minor series, the next one, and the newest release
//! candidate of the next series.
use log::*;
use semver::Version;

use crate::{
    forge::types::ReleaseRecord,
    version::{self, parse_version},
};

/// The most recent `x.y.0` release and the series that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinorSeries {
    /// Release record of the current `x.y.0`.
    pub current: ReleaseRecord,
    /// `vX.Y+1.0`
    pub next_tag: String,
    /// `vX.Y+1.0-rc.0`
    pub next_rc0_tag: String,
    /// `vX.Y+1.0-rc.`
    pub next_rc_prefix: String,
    /// `release-X.Y+1`
    pub next_branch: String,
}

/// Newest release candidate of the next series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcCandidate {
    pub release: ReleaseRecord,
    pub ordinal: u64,
}

/// Official releases, newest first. Release candidates never count, even
/// when they were published without the prerelease flag.
pub fn official_releases(
    releases: &[ReleaseRecord],
) -> Vec<(Version, &ReleaseRecord)> {
    let mut official: Vec<(Version, &ReleaseRecord)> = releases
        .iter()
        .filter(|r| r.is_published() && !r.tag.contains("-rc."))
        .filter_map(|r| parse_version(&r.tag).ok().map(|v| (v, r)))
        .collect();

    official.sort_by(|a, b| b.0.cmp(&a.0));
    official
}

/// Most recent official `x.y.0` release and the names of the series after it.
pub fn current_minor_series(releases: &[ReleaseRecord]) -> Option<MinorSeries> {
    let (current, record) = official_releases(releases)
        .into_iter()
        .find(|(v, _)| v.patch == 0)?;

    let next_minor = current.minor + 1;

    info!("Last Minor Release Series: v{}.{}", current.major, current.minor);
    info!("Next Minor Release Series: v{}.{}", current.major, next_minor);

    Some(MinorSeries {
        current: record.clone(),
        next_tag: version::minor_tag(current.major, next_minor),
        next_rc0_tag: version::rc_tag(current.major, next_minor, 0),
        next_rc_prefix: version::rc_prefix(current.major, next_minor),
        next_branch: version::branch_name(current.major, next_minor),
    })
}

/// True once the next series has an official release or any candidate.
pub fn next_series_started(
    releases: &[ReleaseRecord],
    series: &MinorSeries,
) -> bool {
    releases.iter().any(|r| {
        r.tag == series.next_tag
            || r.tag == series.next_rc0_tag
            || r.tag.starts_with(&series.next_rc_prefix)
    })
}

/// Highest-numbered candidate of the next series. On equal ordinals the
/// last one listed wins. Returns `None` once the series has an official
/// release.
pub fn highest_rc(
    releases: &[ReleaseRecord],
    series: &MinorSeries,
) -> Option<RcCandidate> {
    let mut best: Option<RcCandidate> = None;

    for release in releases.iter() {
        if release.tag == series.next_tag {
            debug!("{} already released, no candidate to promote", release.tag);
            return None;
        }

        let Some(ordinal) =
            version::rc_ordinal(&release.tag, &series.next_rc_prefix)
        else {
            continue;
        };

        // TODO: `>=` makes the winner depend on forge listing order for
        // duplicated ordinals; switch to `>` once confirmed intended.
        if best.as_ref().is_none_or(|b| ordinal >= b.ordinal) {
            best = Some(RcCandidate {
                release: release.clone(),
                ordinal,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn picks_highest_x_y_0_as_current() {
        let releases = vec![
            release("v0.30.0", date(2020, 1, 1)),
            release("v0.31.2", date(2020, 3, 1)),
            release("v0.31.0", date(2020, 2, 1)),
            release("v0.29.4", date(2020, 4, 1)),
        ];

        let series = current_minor_series(&releases).unwrap();
        assert_eq!(series.current.tag, "v0.31.0");
        assert_eq!(series.next_tag, "v0.32.0");
        assert_eq!(series.next_rc0_tag, "v0.32.0-rc.0");
        assert_eq!(series.next_rc_prefix, "v0.32.0-rc.");
        assert_eq!(series.next_branch, "release-0.32");
    }

    #[test]
    fn ignores_unpublished_and_candidate_releases() {
        let mut draft = release("v0.5.0", date(2020, 1, 1));
        draft.draft = true;
        let mut no_assets = release("v0.4.0", date(2020, 1, 1));
        no_assets.asset_count = 0;
        let mut unflagged_rc = release("v0.3.0-rc.1", date(2020, 1, 1));
        unflagged_rc.prerelease = false;

        let releases = vec![
            draft,
            no_assets,
            unflagged_rc,
            candidate("v0.6.0", date(2020, 1, 1)),
            release("not-a-version", date(2020, 1, 1)),
            release("v0.2.0", date(2020, 1, 1)),
        ];

        let official = official_releases(&releases);
        assert_eq!(official.len(), 1);
        assert_eq!(official[0].1.tag, "v0.2.0");
        assert_eq!(
            current_minor_series(&releases).unwrap().next_tag,
            "v0.3.0"
        );
    }

    #[test]
    fn no_official_release_means_no_series() {
        let releases = vec![candidate("v0.1.0-rc.0", date(2020, 1, 1))];
        assert!(current_minor_series(&releases).is_none());
    }

    #[test]
    fn detects_started_series() {
        let (releases, _) = base_history();
        let series = current_minor_series(&releases).unwrap();
        assert!(!next_series_started(&releases, &series));

        let mut with_rc0 = releases.clone();
        with_rc0.push(candidate("v0.2.0-rc.0", date(2020, 2, 1)));
        assert!(next_series_started(&with_rc0, &series));

        let mut with_rc1 = releases.clone();
        with_rc1.push(candidate("v0.2.0-rc.1", date(2020, 2, 1)));
        assert!(next_series_started(&with_rc1, &series));

        let mut with_official = releases;
        with_official.push(release("v0.2.0", date(2020, 2, 1)));
        assert!(next_series_started(&with_official, &series));
    }

    #[test]
    fn finds_highest_rc() {
        let (mut releases, _) = base_history();
        releases.push(candidate("v0.2.0-rc.2", date(2020, 2, 3)));
        releases.push(candidate("v0.2.0-rc.10", date(2020, 2, 9)));
        releases.push(candidate("v0.2.0-rc.3", date(2020, 2, 5)));
        releases.push(candidate("v0.2.0-rc.x", date(2020, 2, 5)));
        releases.push(candidate("v0.3.0-rc.20", date(2020, 2, 5)));

        let series = current_minor_series(&releases).unwrap();
        let rc = highest_rc(&releases, &series).unwrap();
        assert_eq!(rc.ordinal, 10);
        assert_eq!(rc.release.tag, "v0.2.0-rc.10");
    }

    #[test]
    fn equal_ordinals_prefer_later_entry() {
        let (mut releases, _) = base_history();
        releases.push(candidate("v0.2.0-rc.1", date(2020, 2, 1)));
        releases.push(candidate("v0.2.0-rc.1", date(2020, 2, 2)));

        let series = current_minor_series(&releases).unwrap();
        let rc = highest_rc(&releases, &series).unwrap();
        assert_eq!(rc.release.created_at, date(2020, 2, 2));
    }

    #[test]
    fn official_release_discards_candidates() {
        let (mut releases, _) = base_history();
        releases.push(candidate("v0.2.0-rc.1", date(2020, 2, 1)));
        releases.push(release("v0.2.0", date(2020, 2, 8)));
        releases.push(candidate("v0.2.0-rc.2", date(2020, 2, 9)));

        // v0.2.0 is now the current series, so look from v0.1.0's view
        let series = current_minor_series(&base_history().0).unwrap();
        assert!(highest_rc(&releases, &series).is_none());
    }
}
