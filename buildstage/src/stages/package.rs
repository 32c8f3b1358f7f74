//! `package`: build, snapshot and archive.

use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::context::StageContext;
use crate::ports::CommandSpec;

use super::project_info::ProjectInfo;
use super::{Stage, SubStage};

/// Sub-stages of [`PackageStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStep {
    /// Delegates to `build`.
    Build,
    /// Delegates to `snapshot`.
    Snapshot,
    /// Zips the build output and writes its checksum.
    Archive,
}

impl SubStage for PackageStep {
    fn name(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Snapshot => "snapshot",
            Self::Archive => "archive",
        }
    }
}

/// Arguments of [`PackageStage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageArgs {
    /// Directory to archive.
    pub source: PathBuf,
    /// Directory the archive is written to.
    pub out_dir: PathBuf,
    /// Archive file name; `{{name}}` and `{{version}}` are expanded.
    pub archive_name: String,
}

impl Default for PackageArgs {
    fn default() -> Self {
        Self {
            source: PathBuf::from("dist"),
            out_dir: PathBuf::from("packages"),
            archive_name: "{{name}}-{{version}}.zip".to_string(),
        }
    }
}

/// Produces a distributable archive.
#[derive(Debug)]
pub struct PackageStage {
    args: PackageArgs,
}

/// `sha256sum`-style line for `bytes`.
#[must_use]
pub fn checksum_line(bytes: &[u8], file_name: &str) -> String {
    let digest = Sha256::digest(bytes);
    format!("{}  {file_name}\n", hex::encode(digest))
}

impl PackageStage {
    async fn archive(&self, cx: &StageContext) -> anyhow::Result<()> {
        let mut info = ProjectInfo::load(cx).await?;
        info.name = Some(info.name_or_default().to_string());
        info.version.get_or_insert_with(|| "0.0.0".to_string());

        let file_name = info.expand(&self.args.archive_name);
        let archive = self.args.out_dir.join(&file_name);
        let cmd = CommandSpec::new(&cx.config().tools.zip)
            .args(["-r", "-q"])
            .arg(cx.files().resolve(&archive).to_string_lossy())
            .arg(".")
            .current_dir(cx.files().resolve(&self.args.source));

        if cx.dry_run() {
            cx.exec(&cmd, 1).await?;
            cx.logger()
                .log(&format!("[dry-run] checksum {file_name}.sha256"), 1);
            return Ok(());
        }

        cx.files().create_dir_all(&self.args.out_dir).await?;
        cx.files().delete(&archive).await?;
        cx.exec(&cmd, 1).await?;

        let bytes = cx
            .files()
            .read_bytes(&archive)
            .await
            .with_context(|| format!("{} was not produced", archive.display()))?;
        let checksum = self.args.out_dir.join(format!("{file_name}.sha256"));
        cx.files()
            .write(&checksum, &checksum_line(&bytes, &file_name))
            .await?;
        cx.logger().log(
            &format!("Packaged {} ({} bytes)", archive.display(), bytes.len()),
            1,
        );
        Ok(())
    }
}

#[async_trait]
impl Stage for PackageStage {
    const KIND: &'static str = "package";
    const COLOR: &'static str = "yellow";

    type Step = PackageStep;
    type Args = PackageArgs;

    fn steps() -> &'static [PackageStep] {
        &[PackageStep::Build, PackageStep::Snapshot, PackageStep::Archive]
    }

    fn from_args(args: PackageArgs) -> Self {
        Self { args }
    }

    async fn run_sub_stage(&self, step: PackageStep, cx: &StageContext) -> anyhow::Result<()> {
        match step {
            PackageStep::Build => {
                cx.run_stage("build", 1).await?;
                Ok(())
            }
            PackageStep::Snapshot => {
                cx.run_stage("snapshot", 1).await?;
                Ok(())
            }
            PackageStep::Archive => self.archive(cx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{RunFlags, RunParameters};
    use crate::ports::{CommandOutput, CommandRunner};
    use crate::testing::{assert_ran, MemoryFileAccess, RecordingCommandRunner, TestHarness};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::Arc;

    /// Runner that "creates" the archive the zip command names.
    #[derive(Debug)]
    struct ZipWritingRunner {
        files: Arc<MemoryFileAccess>,
        inner: RecordingCommandRunner,
    }

    #[async_trait]
    impl CommandRunner for ZipWritingRunner {
        async fn run(&self, command: &CommandSpec) -> anyhow::Result<CommandOutput> {
            if command.program == "zip" {
                self.files.insert(Path::new(&command.args[2]), "PK-archive");
            }
            self.inner.run(command).await
        }
    }

    #[test]
    fn test_checksum_line() {
        assert_eq!(
            checksum_line(b"abc", "a.zip"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad  a.zip\n"
        );
    }

    #[tokio::test]
    async fn test_archive_writes_checksum() {
        let harness = TestHarness::new();
        harness
            .files
            .insert("package.json", r#"{"name": "widgets", "version": "1.0.0"}"#);
        harness.files.insert("dist/app.js", "x");
        let runner = ZipWritingRunner {
            files: Arc::clone(&harness.files),
            inner: RecordingCommandRunner::new(),
        };
        let ports = harness.ports().with_commands(Arc::new(runner));
        let session = crate::context::RunSession::new(harness.config.clone(), ports, harness.registry());

        session
            .instantiate("package", RunParameters::new().with_only("archive"), None)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(
            harness.files.contents("packages/widgets-1.0.0.zip.sha256"),
            Some(checksum_line(b"PK-archive", "widgets-1.0.0.zip"))
        );
    }

    #[tokio::test]
    async fn test_missing_archive_is_an_error() {
        let harness = TestHarness::new();
        let err = harness
            .run("package", RunParameters::new().with_only("archive"))
            .await
            .unwrap_err();
        assert!(format!("{:#}", anyhow::Error::new(err)).contains("was not produced"));
        assert_eq!(
            harness.commands.displays(),
            vec!["zip -r -q /project/packages/package-0.0.0.zip ."]
        );
    }

    #[tokio::test]
    async fn test_dry_run_package_delegates_and_logs() {
        let harness = TestHarness::new();
        harness.files.insert("dist/app.js", "x");
        let params = RunParameters::new().with_flags(RunFlags {
            dry_run: true,
            packaging: true,
            ..RunFlags::default()
        });

        let report = harness.run("package", params).await.unwrap();

        assert_ran(&report, &["build", "snapshot", "archive"]);
        assert!(harness.commands.commands().is_empty());
        assert!(harness
            .files
            .paths()
            .iter()
            .all(|p| !p.starts_with("snapshots") && !p.starts_with("packages")));
    }
}
