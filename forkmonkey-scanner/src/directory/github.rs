// Copyright 2025 ForkMonkey Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! GitHub REST adapter

use super::DirectoryClient;
use crate::config::DirectorySettings;
use crate::error::DirectoryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forkmonkey_core::RepositoryNode;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct ApiOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiParent {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepository {
    name: String,
    full_name: String,
    html_url: String,
    owner: ApiOwner,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    parent: Option<ApiParent>,
    #[serde(default)]
    default_branch: Option<String>,
}

impl ApiRepository {
    /// Convert to a node. `lister` is the repository whose fork listing
    /// reported this one and stands in for a parent the host left out.
    fn into_node(self, lister: Option<&str>) -> RepositoryNode {
        let parent = self
            .parent
            .map(|p| p.full_name)
            .or_else(|| lister.map(str::to_string));
        RepositoryNode {
            owner: self.owner.login,
            name: self.name,
            full_name: self.full_name,
            url: self.html_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
            fork: self.fork || parent.is_some(),
            parent,
            default_branch: self.default_branch.unwrap_or_else(|| "main".to_string()),
        }
    }
}

/// Map a non-success response to a directory error.
fn classify_failure(status: StatusCode, headers: &HeaderMap, message: String) -> DirectoryError {
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok());
    let exhausted = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && remaining == Some("0"));

    if exhausted {
        let reset = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return DirectoryError::RateLimited { reset };
    }

    DirectoryError::Api {
        status: status.as_u16(),
        message,
    }
}

pub struct GitHubDirectory {
    http_client: HttpClient,
    base_url: String,
    token: Option<String>,
    per_page: u32,
}

impl GitHubDirectory {
    pub fn new(settings: &DirectorySettings) -> Result<Self, DirectoryError> {
        let http_client = HttpClient::builder()
            .timeout(settings.request_timeout())
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            http_client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            per_page: settings.per_page,
        })
    }

    /// Send a GET. `Ok(None)` on 404.
    async fn get(
        &self,
        path: &str,
        accept: &str,
        params: &[(&str, String)],
    ) -> Result<Option<reqwest::Response>, DirectoryError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .http_client
            .get(&url)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(url = %url, status = status.as_u16(), "GitHub request");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let headers = response.headers().clone();
            let message = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &headers, message));
        }
        Ok(Some(response))
    }
}

#[async_trait]
impl DirectoryClient for GitHubDirectory {
    async fn get_node(&self, full_name: &str) -> Result<RepositoryNode, DirectoryError> {
        let response = self
            .get(&format!("/repos/{}", full_name), JSON_MEDIA_TYPE, &[])
            .await?
            .ok_or_else(|| DirectoryError::NotFound(full_name.to_string()))?;
        let repository: ApiRepository = response.json().await?;
        Ok(repository.into_node(None))
    }

    async fn get_forks_page(
        &self,
        full_name: &str,
        page: u32,
    ) -> Result<Vec<RepositoryNode>, DirectoryError> {
        let params = [
            ("sort", "oldest".to_string()),
            ("per_page", self.per_page.to_string()),
            ("page", page.to_string()),
        ];
        let response = self
            .get(&format!("/repos/{}/forks", full_name), JSON_MEDIA_TYPE, &params)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(full_name.to_string()))?;
        let forks: Vec<ApiRepository> = response.json().await?;
        Ok(forks
            .into_iter()
            .map(|fork| fork.into_node(Some(full_name)))
            .collect())
    }

    async fn get_file(
        &self,
        full_name: &str,
        path: &str,
    ) -> Result<Option<Vec<u8>>, DirectoryError> {
        let response = self
            .get(
                &format!("/repos/{}/contents/{}", full_name, path),
                RAW_MEDIA_TYPE,
                &[],
            )
            .await?;
        match response {
            Some(response) => Ok(Some(response.bytes().await?.to_vec())),
            None => Ok(None),
        }
    }

    fn fork_page_size(&self) -> Option<usize> {
        Some(self.per_page as usize)
    }
}
