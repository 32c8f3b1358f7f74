//! Name and version of the project being built.

use anyhow::Context as _;
use serde::Deserialize;
use std::path::Path;

use crate::context::StageContext;

const PACKAGE_JSON: &str = "package.json";

/// Name and version, from configuration first and `package.json` second.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectInfo {
    /// Package name.
    pub name: Option<String>,
    /// Package version.
    pub version: Option<String>,
}

impl ProjectInfo {
    /// Loads the project info visible to `cx`.
    ///
    /// # Errors
    ///
    /// When `package.json` exists but cannot be read or parsed.
    pub async fn load(cx: &StageContext) -> anyhow::Result<Self> {
        let path = Path::new(PACKAGE_JSON);
        let mut info = if cx.files().is_file(path).await {
            let raw = cx.files().read(path).await?;
            serde_json::from_str::<Self>(&raw).context("parsing package.json")?
        } else {
            Self::default()
        };
        if let Some(name) = &cx.config().project.name {
            info.name = Some(name.clone());
        }
        Ok(info)
    }

    /// The name, or `package` when unknown.
    #[must_use]
    pub fn name_or_default(&self) -> &str {
        self.name.as_deref().unwrap_or("package")
    }

    /// Expands `{{name}}` and `{{version}}` in `template`.
    ///
    /// Unknown values expand to an empty string.
    #[must_use]
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{{name}}", self.name.as_deref().unwrap_or_default())
            .replace("{{version}}", self.version.as_deref().unwrap_or_default())
    }
}
