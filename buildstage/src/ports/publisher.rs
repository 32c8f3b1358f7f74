//! Release publishing port.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A release to create on the hosting service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRequest {
    /// `owner/name` of the repository.
    pub repository: String,
    /// Tag the release points at.
    pub tag: String,
    /// Release title.
    pub name: String,
    /// Release notes.
    pub body: String,
    /// Create as draft.
    pub draft: bool,
    /// Mark as pre-release.
    pub prerelease: bool,
}

/// A created release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRelease {
    /// Release id on the service.
    pub id: u64,
    /// Public URL.
    pub url: String,
}

/// Creates releases on a hosting service.
#[async_trait]
pub trait ReleasePublisher: Send + Sync {
    /// Publishes one release.
    async fn publish(&self, request: &ReleaseRequest) -> Result<PublishedRelease>;
}

/// Publisher used when no hosting integration is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPublisher;

#[async_trait]
impl ReleasePublisher for DisabledPublisher {
    async fn publish(&self, request: &ReleaseRequest) -> Result<PublishedRelease> {
        anyhow::bail!(
            "cannot publish {} {}: no release publisher is configured",
            request.repository,
            request.tag
        )
    }
}

#[cfg(feature = "github")]
pub use github::GithubPublisher;

#[cfg(feature = "github")]
mod github {
    use super::{PublishedRelease, ReleasePublisher, ReleaseRequest};
    use anyhow::{Context as _, Result};
    use async_trait::async_trait;
    use serde::Deserialize;

    const GITHUB_API_BASE: &str = "https://api.github.com";

    /// Environment variable holding the token unless configured otherwise.
    pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

    #[derive(Debug, Deserialize)]
    struct CreatedRelease {
        id: u64,
        html_url: String,
    }

    /// Creates GitHub releases through the REST API.
    ///
    /// The token is read from an environment variable at publish time so it
    /// never ends up in configuration files.
    #[derive(Debug, Clone)]
    pub struct GithubPublisher {
        http: reqwest::Client,
        api_base: String,
        token_env: String,
    }

    impl Default for GithubPublisher {
        fn default() -> Self {
            Self::new(DEFAULT_TOKEN_ENV)
        }
    }

    impl GithubPublisher {
        /// Creates a publisher reading its token from `token_env`.
        #[must_use]
        pub fn new(token_env: impl Into<String>) -> Self {
            Self {
                http: reqwest::Client::new(),
                api_base: GITHUB_API_BASE.to_string(),
                token_env: token_env.into(),
            }
        }

        /// Points the publisher at another API base (GitHub Enterprise).
        #[must_use]
        pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
            self.api_base = api_base.into();
            self
        }

        fn token(&self) -> Result<String> {
            std::env::var(&self.token_env)
                .with_context(|| format!("{} is not set", self.token_env))
        }
    }

    #[async_trait]
    impl ReleasePublisher for GithubPublisher {
        async fn publish(&self, request: &ReleaseRequest) -> Result<PublishedRelease> {
            let token = self.token()?;
            let url = format!("{}/repos/{}/releases", self.api_base, request.repository);
            let body = serde_json::json!({
                "tag_name": request.tag,
                "name": request.name,
                "body": request.body,
                "draft": request.draft,
                "prerelease": request.prerelease,
            });
            tracing::debug!(repository = %request.repository, tag = %request.tag, "Creating GitHub release");

            let resp = self
                .http
                .post(&url)
                .bearer_auth(token)
                .header(reqwest::header::USER_AGENT, "buildstage")
                .header(reqwest::header::ACCEPT, "application/vnd.github+json")
                .json(&body)
                .send()
                .await
                .with_context(|| format!("release request to {url} failed"))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                anyhow::bail!("GitHub rejected release {}: {status} {text}", request.tag);
            }

            let created: CreatedRelease = resp
                .json()
                .await
                .context("GitHub release response parse failed")?;
            Ok(PublishedRelease {
                id: created.id,
                url: created.html_url,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_missing_token_fails_before_request() {
            let publisher = GithubPublisher::new("BUILDSTAGE_TEST_TOKEN_THAT_IS_NOT_SET");
            let err = publisher
                .publish(&ReleaseRequest {
                    repository: "acme/lib".into(),
                    tag: "v1.0.0".into(),
                    ..ReleaseRequest::default()
                })
                .await
                .unwrap_err();
            assert!(err.to_string().contains("BUILDSTAGE_TEST_TOKEN_THAT_IS_NOT_SET"));
        }
    }
}
