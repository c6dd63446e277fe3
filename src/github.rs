use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use crate::error::ReportError;

static NEXT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).expect("valid Link header regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub archived: bool,
}

pub trait PipelineCatalog: Send + Sync {
    fn list_repositories(&self, organization: &str) -> Result<Vec<Repository>, ReportError>;
}

impl<T: PipelineCatalog + ?Sized> PipelineCatalog for &T {
    fn list_repositories(&self, organization: &str) -> Result<Vec<Repository>, ReportError> {
        (**self).list_repositories(organization)
    }
}

#[derive(Clone)]
pub struct GithubHttpClient {
    client: Client,
    api_url: String,
}

impl GithubHttpClient {
    pub fn new(api_url: &str) -> Result<Self, ReportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("obis-charts/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ReportError::GithubHttp(err.to_string()))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                        .map_err(|err| ReportError::GithubHttp(err.to_string()))?,
                );
            }
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ReportError::GithubHttp(err.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

impl PipelineCatalog for GithubHttpClient {
    fn list_repositories(&self, organization: &str) -> Result<Vec<Repository>, ReportError> {
        let mut repositories = Vec::new();
        let mut next = Some(format!(
            "{}/orgs/{organization}/repos?per_page=100",
            self.api_url
        ));

        while let Some(url) = next {
            debug!("GitHub request {url}");
            let response = self
                .client
                .get(&url)
                .send()
                .map_err(|err| ReportError::GithubHttp(err.to_string()))?;
            if !response.status().is_success() {
                let status = response.status().as_u16();
                let message = response
                    .text()
                    .unwrap_or_else(|_| "GitHub request failed".to_string());
                return Err(ReportError::GithubStatus { status, message });
            }
            next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_page_url);
            let page: Vec<Repository> = response
                .json()
                .map_err(|err| ReportError::GithubHttp(err.to_string()))?;
            repositories.extend(page);
        }

        Ok(repositories)
    }
}

fn next_page_url(link_header: &str) -> Option<String> {
    NEXT_LINK
        .captures(link_header)
        .and_then(|caps| caps.get(1))
        .map(|url| url.as_str().to_string())
}
