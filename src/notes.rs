//! Release notes for a new tag.
//!
//! Notes are collected from the `release-note` blocks of the pull requests
//! merged since the previous release, summarised with git statistics and
//! rendered through a Tera template into `<repo dir>/<tag>-release-notes.txt`.
use log::*;
use regex::Regex;
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use crate::{
    config::NotesConfig,
    error::{ReleaseError, Result},
    forge::types::PullRequestDetails,
    git::Git,
    state::ReleaseState,
};

/// Label that opts a pull request out of the release notes.
pub const RELEASE_NOTE_NONE_LABEL: &str = "release-note-none";

const RELEASE_NOTE_FENCE: &str = "```release-note";

static MERGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Merge pull request #(\d+)").unwrap());

/// Default notes layout.
pub const DEFAULT_TEMPLATE: &str = r#"This release follows {{ previous_tag }} and consists of {{ change_count }} changes, contributed by {{ contributor_count }} people, leading to {{ diff_stat }}.
{% if promotion %}{{ tag }} is a promotion of release candidate {{ promotion.rc }} which was originally published {{ promotion.published }}{% endif %}
The source code and selected binaries are available for download at: {{ tag_url }}.

The primary release artifact of {{ project_name }} is the git tree. The release tag is
signed and can be verified using `git tag -v {{ tag }}`.

Pre-built containers are published on {{ registry_name }} and can be viewed at: <{{ container_url }}>.

{% if notes %}Notable changes
---------------

{% for note in notes %}- {{ note }}
{% endfor %}{% endif %}
Contributors
------------
{{ contributor_count }} people contributed to this release:

{% for contributor in contributors %}{{ contributor }}
{% endfor %}Additional Resources
--------------------
- Mailing list: <{{ resources.mailing_list }}>
- Slack: <{{ resources.slack }}>
- An easy to use demo: <{{ resources.demo }}>
- [How to contribute][contributing]
- [License][license]


[contributing]: {{ resources.contributing }}
[license]: {{ resources.license }}
---
"#;

/// Release candidate an official release was promoted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Promotion {
    pub rc: String,
    /// `YYYY-MM-DD`
    pub published: String,
}

/// Links in the notes footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resources {
    pub mailing_list: String,
    pub slack: String,
    pub demo: String,
    pub contributing: String,
    pub license: String,
}

/// Template context of a notes file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseNotes {
    pub org: String,
    pub repo: String,
    pub tag: String,
    pub previous_tag: String,
    pub change_count: usize,
    pub contributor_count: usize,
    pub diff_stat: String,
    pub promotion: Option<Promotion>,
    pub tag_url: String,
    pub project_name: String,
    pub registry_name: String,
    pub container_url: String,
    pub notes: Vec<String>,
    pub contributors: Vec<String>,
    pub resources: Resources,
}

/// Location of the notes file for `tag`.
pub fn notes_path(repo_dir: &Path, tag: &str) -> PathBuf {
    repo_dir.join(format!("{tag}-release-notes.txt"))
}

/// Extracts the release note of a merged pull request.
///
/// The note is the line following the first `release-note` fence, with
/// bullet markers and carriage returns removed. Opted out pull requests and
/// notes mentioning "none" in any case yield nothing.
pub fn release_note(pr: &PullRequestDetails) -> Option<String> {
    if pr.labels.iter().any(|l| l == RELEASE_NOTE_NONE_LABEL) {
        debug!("PR #{} is labeled {RELEASE_NOTE_NONE_LABEL}", pr.number);
        return None;
    }

    let body = pr.body.as_deref()?;
    let lines: Vec<&str> = body.split('\n').collect();
    let fence = lines.iter().position(|l| l.contains(RELEASE_NOTE_FENCE))?;
    let line = lines.get(fence + 1)?;

    let cleaned = line.trim().replace('\r', "");
    let note = cleaned
        .strip_prefix("- ")
        .or_else(|| cleaned.strip_prefix('-'))
        .unwrap_or(&cleaned)
        .to_string();

    if note.is_empty() || note.to_lowercase().contains("none") {
        return None;
    }

    Some(format!("[PR #{}][@{}] {}", pr.number, pr.author, note))
}

/// Pull request numbers referenced by merge commit subjects.
pub fn merged_pull_requests(log: &str) -> Vec<u64> {
    log.lines()
        .filter_map(|line| MERGE_REGEX.captures(line))
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<u64>().ok())
        .collect()
}

/// Renders `notes` with a Tera template.
pub fn render(template: &str, notes: &ReleaseNotes) -> Result<String> {
    let context = tera::Context::from_serialize(notes)?;
    Ok(tera::Tera::one_off(template, &context, false)?)
}

/// Collects everything the notes of the tag in `state` contain.
pub fn compose(
    state: &ReleaseState,
    git: &Git,
    config: &NotesConfig,
    previous_tag: &str,
) -> Result<ReleaseNotes> {
    let (Some(tag), Some(branch_ref)) =
        (state.tag.as_deref(), state.tag_branch_ref())
    else {
        return Err(ReleaseError::invalid_args(
            "release notes need a verified tag and branch",
        ));
    };

    let span = format!("{previous_tag}..{branch_ref}");

    let merges = git.run(&["log", "--merges", "--oneline", &span])?;
    let mut notes = vec![];
    for number in merged_pull_requests(&merges) {
        info!("Searching for release note for PR #{number}");
        match state.mirror.get_pull_request(number) {
            Ok(pr) => notes.extend(release_note(&pr)),
            Err(err) => warn!("skipping PR #{number}: {err}"),
        }
    }

    let full_log = git.run(&["log", "--oneline", &span])?;
    let change_count = full_log.lines().filter(|l| !l.is_empty()).count();

    let shortlog = git.run(&["shortlog", "-sne", &span])?;
    let contributors: Vec<String> = shortlog
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .filter(|l| {
            config.bot_account.is_empty() || !l.contains(&config.bot_account)
        })
        .map(|l| l.to_string())
        .collect();

    let diff_stat = git.run(&["diff", "--shortstat", &span])?;

    let promotion = match (state.promote_rc.as_ref(), state.promote_rc_time) {
        (Some(rc), Some(time)) => Some(Promotion {
            rc: rc.clone(),
            published: time.format("%Y-%m-%d").to_string(),
        }),
        _ => None,
    };

    let remote = state.mirror.remote_config();
    let repo_url = format!(
        "{}://{}/{}/{}",
        remote.scheme, remote.host, state.org, state.repo
    );

    Ok(ReleaseNotes {
        org: state.org.clone(),
        repo: state.repo.clone(),
        tag: tag.to_string(),
        previous_tag: previous_tag.to_string(),
        change_count,
        contributor_count: contributors.len(),
        diff_stat: diff_stat.trim().to_string(),
        promotion,
        tag_url: remote.release_link(tag),
        project_name: config.project_name.clone(),
        registry_name: config.registry_name.clone(),
        container_url: format!(
            "https://{}/{}/",
            config.container_registry, state.org
        ),
        notes,
        contributors,
        resources: Resources {
            mailing_list: config.mailing_list.clone(),
            slack: config.slack.clone(),
            demo: format!(
                "{}://{}/{}/{}",
                remote.scheme, remote.host, state.org, config.demo_repo
            ),
            contributing: format!("{repo_url}/blob/main/CONTRIBUTING.md"),
            license: format!("{repo_url}/blob/main/LICENSE"),
        },
    })
}

/// Writes the notes file for the tag in `state` and returns its path.
///
/// The file is always created. It stays empty when notes are skipped, or
/// when there is no previous release and `force` is set.
pub fn write_release_notes(
    state: &ReleaseState,
    git: &Git,
    config: &NotesConfig,
) -> Result<PathBuf> {
    let Some(tag) = state.tag.as_deref() else {
        return Err(ReleaseError::invalid_args("release notes need a tag"));
    };

    let path = notes_path(git.dir(), tag);
    fs::File::create(&path)?;

    if state.skip_release_notes {
        info!("skipping release notes for [{tag}]");
        return Ok(path);
    }

    let Some(previous_tag) = state.previous_tag.as_deref() else {
        if state.force {
            warn!(
                "Ignoring Release Notes - Unable to generate release notes because no previous tag detected"
            );
            return Ok(path);
        }
        return Err(ReleaseError::MissingPreviousTag(tag.to_string()));
    };

    let notes = compose(state, git, config, previous_tag)?;
    let content = render(&config.template, &notes)?;
    fs::write(&path, content)?;

    info!("release notes written to {}", path.display());
    Ok(path)
}
