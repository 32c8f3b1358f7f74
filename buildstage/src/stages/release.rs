//! `release`: package, changelog, commit, tag and publish.

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::context::StageContext;
use crate::ports::{CommandSpec, ReleaseRequest};
use crate::utils::{changelog_date, now_utc};

use super::project_info::ProjectInfo;
use super::{Stage, SubStage};

/// Sub-stages of [`ReleaseStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStep {
    /// Delegates to `package`.
    Package,
    /// Prepends the release entry to the changelog.
    Changelog,
    /// Commits the changelog.
    Commit,
    /// Tags the release commit.
    Tag,
    /// Creates the hosted release.
    Publish,
}

impl SubStage for ReleaseStep {
    fn name(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Changelog => "changelog",
            Self::Commit => "commit",
            Self::Tag => "tag",
            Self::Publish => "publish",
        }
    }
}

/// Arguments of [`ReleaseStage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseArgs {
    /// Release version; `package.json` when absent.
    pub version: Option<String>,
    /// Changelog file.
    pub changelog: PathBuf,
    /// Bullet points of the changelog entry and release notes.
    pub notes: Vec<String>,
    /// Commit and tag message; `{{name}}` and `{{version}}` are expanded.
    pub message: String,
    /// Prefix of the tag name.
    pub tag_prefix: String,
    /// `owner/name` on the hosting service; publishing fails without it.
    pub repository: Option<String>,
    /// Publish as draft.
    pub draft: bool,
    /// Publish as pre-release.
    pub prerelease: bool,
}

impl Default for ReleaseArgs {
    fn default() -> Self {
        Self {
            version: None,
            changelog: PathBuf::from("CHANGELOG.md"),
            notes: Vec::new(),
            message: "Release {{version}}".to_string(),
            tag_prefix: "v".to_string(),
            repository: None,
            draft: false,
            prerelease: false,
        }
    }
}

/// Cuts a release.
#[derive(Debug)]
pub struct ReleaseStage {
    args: ReleaseArgs,
}

const CHANGELOG_TITLE: &str = "# Changelog";

/// Inserts `entry` below the title of `existing` (or at the top).
#[must_use]
pub fn prepend_entry(existing: &str, entry: &str) -> String {
    match existing.strip_prefix(CHANGELOG_TITLE) {
        Some(rest) => format!(
            "{CHANGELOG_TITLE}\n\n{entry}\n{}",
            rest.trim_start_matches('\n')
        ),
        None if existing.trim().is_empty() => format!("{CHANGELOG_TITLE}\n\n{entry}"),
        None => format!("{entry}\n{existing}"),
    }
}

impl ReleaseStage {
    async fn info(&self, cx: &StageContext) -> anyhow::Result<ProjectInfo> {
        let mut info = ProjectInfo::load(cx).await?;
        if self.args.version.is_some() {
            info.version.clone_from(&self.args.version);
        }
        if info.version.is_none() {
            bail!("no release version: set `version` or add one to package.json");
        }
        Ok(info)
    }

    fn tag(&self, info: &ProjectInfo) -> String {
        format!(
            "{}{}",
            self.args.tag_prefix,
            info.version.as_deref().unwrap_or_default()
        )
    }

    fn notes(&self) -> String {
        self.args
            .notes
            .iter()
            .map(|n| format!("- {n}\n"))
            .collect()
    }

    fn git(cx: &StageContext) -> CommandSpec {
        CommandSpec::new(&cx.config().tools.git)
    }

    async fn changelog(&self, cx: &StageContext) -> anyhow::Result<()> {
        let info = self.info(cx).await?;
        let mut entry = format!("## {} - {}\n", self.tag(&info), changelog_date(&now_utc()));
        let notes = self.notes();
        if !notes.is_empty() {
            entry.push('\n');
            entry.push_str(&notes);
        }

        let path = &self.args.changelog;
        let existing = if cx.files().is_file(path).await {
            cx.files().read(path).await?
        } else {
            String::new()
        };
        if cx.dry_run() {
            cx.logger().log(
                &format!("[dry-run] would add to {}:\n{entry}", path.display()),
                1,
            );
            return Ok(());
        }
        cx.files().write(path, &prepend_entry(&existing, &entry)).await?;
        cx.logger().log(&format!("Updated {}", path.display()), 1);
        Ok(())
    }

    async fn commit(&self, cx: &StageContext) -> anyhow::Result<()> {
        let info = self.info(cx).await?;
        let changelog = self.args.changelog.to_string_lossy().into_owned();
        cx.exec(&Self::git(cx).arg("add").arg(changelog), 1).await?;
        cx.exec(
            &Self::git(cx)
                .arg("commit")
                .arg("-m")
                .arg(info.expand(&self.args.message)),
            1,
        )
        .await?;
        Ok(())
    }

    async fn tag_release(&self, cx: &StageContext) -> anyhow::Result<()> {
        let info = self.info(cx).await?;
        let tag = self.tag(&info);
        cx.exec(
            &Self::git(cx)
                .args(["tag", "-a"])
                .arg(&tag)
                .arg("-m")
                .arg(info.expand(&self.args.message)),
            1,
        )
        .await?;
        cx.logger().log(&format!("Tagged {tag}"), 1);
        Ok(())
    }

    async fn publish(&self, cx: &StageContext) -> anyhow::Result<()> {
        let info = self.info(cx).await?;
        let repository = self
            .args
            .repository
            .clone()
            .ok_or_else(|| anyhow!("no repository configured for publishing"))?;
        let request = ReleaseRequest {
            repository,
            tag: self.tag(&info),
            name: format!("{} {}", info.name_or_default(), self.tag(&info)),
            body: self.notes(),
            draft: self.args.draft,
            prerelease: self.args.prerelease,
        };
        if cx.dry_run() {
            cx.logger().log(
                &format!("[dry-run] would publish {} to {}", request.tag, request.repository),
                1,
            );
            return Ok(());
        }
        let published = cx.ports().publisher.publish(&request).await?;
        cx.logger().log(&format!("Published {}", published.url), 1);
        Ok(())
    }
}

#[async_trait]
impl Stage for ReleaseStage {
    const KIND: &'static str = "release";
    const COLOR: &'static str = "red";

    type Step = ReleaseStep;
    type Args = ReleaseArgs;

    fn steps() -> &'static [ReleaseStep] {
        &[
            ReleaseStep::Package,
            ReleaseStep::Changelog,
            ReleaseStep::Commit,
            ReleaseStep::Tag,
            ReleaseStep::Publish,
        ]
    }

    fn from_args(args: ReleaseArgs) -> Self {
        Self { args }
    }

    async fn run_sub_stage(&self, step: ReleaseStep, cx: &StageContext) -> anyhow::Result<()> {
        match step {
            ReleaseStep::Package => {
                cx.run_stage("package", 1).await?;
                Ok(())
            }
            ReleaseStep::Changelog => self.changelog(cx).await,
            ReleaseStep::Commit => self.commit(cx).await,
            ReleaseStep::Tag => self.tag_release(cx).await,
            ReleaseStep::Publish => self.publish(cx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{RunFlags, RunParameters};
    use crate::testing::TestHarness;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn harness() -> TestHarness {
        let harness = TestHarness::new().with_stage_args(
            "release",
            json!({
                "notes": ["Faster builds"],
                "repository": "acme/widgets",
            }),
        );
        harness
            .files
            .insert("package.json", r#"{"name": "widgets", "version": "1.4.0"}"#);
        harness
    }

    fn without_package() -> RunParameters {
        RunParameters::new().with_without("package")
    }

    #[test]
    fn test_prepend_entry_below_title() {
        let existing = "# Changelog\n\n## v1.0.0 - 2024-01-01\n";
        assert_eq!(
            prepend_entry(existing, "## v1.1.0 - 2024-02-01\n"),
            "# Changelog\n\n## v1.1.0 - 2024-02-01\n\n## v1.0.0 - 2024-01-01\n"
        );
        assert_eq!(prepend_entry("", "## v1\n"), "# Changelog\n\n## v1\n");
        assert_eq!(prepend_entry("old\n", "## v1\n"), "## v1\n\nold\n");
    }

    #[tokio::test]
    async fn test_release_steps_without_package() {
        let harness = harness();
        harness.files.insert("CHANGELOG.md", "# Changelog\n");

        harness.run("release", without_package()).await.unwrap();

        let changelog = harness.files.contents("CHANGELOG.md").unwrap();
        assert!(changelog.starts_with("# Changelog\n\n## v1.4.0 - "));
        assert!(changelog.contains("- Faster builds\n"));

        assert_eq!(
            harness.commands.displays(),
            vec![
                "git add CHANGELOG.md",
                "git commit -m \"Release 1.4.0\"",
                "git tag -a v1.4.0 -m \"Release 1.4.0\"",
            ]
        );
        let requests = harness.publisher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tag, "v1.4.0");
        assert_eq!(requests[0].name, "widgets v1.4.0");
        assert_eq!(requests[0].body, "- Faster builds\n");
    }

    #[tokio::test]
    async fn test_version_argument_wins() {
        let harness = harness();
        let args = json!({"version": "2.0.0-rc.1", "prerelease": true});

        harness
            .run_with_args("release", RunParameters::new().with_only("publish"), Some(&args))
            .await
            .unwrap();

        let requests = harness.publisher.requests();
        assert_eq!(requests[0].tag, "v2.0.0-rc.1");
        assert!(requests[0].prerelease);
    }

    #[tokio::test]
    async fn test_missing_version_fails() {
        let harness = TestHarness::new();
        let err = harness
            .run("release", RunParameters::new().with_only("changelog"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no release version"));
    }

    #[tokio::test]
    async fn test_publish_skipped_on_dry_run() {
        let harness = harness();
        let params = without_package().with_flags(RunFlags {
            dry_run: true,
            ..RunFlags::default()
        });

        harness.run("release", params).await.unwrap();

        assert!(harness.publisher.requests().is_empty());
        assert!(harness.commands.commands().is_empty());
        assert!(harness.files.contents("CHANGELOG.md").is_none());
    }

    #[tokio::test]
    async fn test_publish_needs_repository() {
        let harness = TestHarness::new();
        let args = json!({"version": "1.0.0"});
        let err = harness
            .run_with_args("release", RunParameters::new().with_only("publish"), Some(&args))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no repository configured"));
    }
}
