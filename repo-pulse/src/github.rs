// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Repository statistics client for the GitHub REST API.
///
/// Requests are plain authenticated GETs against URLs assembled from the
/// configured endpoint, the repository path and a resource suffix. Anything
/// other than `200 OK` is reported as [`Error::Api`] and never retried.
use masterror::AppError;
use octocrab::{Octocrab, service::middleware::retry::RetryConfig};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    config::{GithubSettings, RepoRef},
    error::Error,
    punch_card::PunchCardEntry,
};

const STATUS_OK: u16 = 200;

/// Source of raw repository statistics.
#[allow(async_fn_in_trait)]
pub trait StatsSource
{
    /// Hourly `[day, hour, commits]` triples for the trailing week.
    async fn fetch_punch_card(&self, repo: &RepoRef,) -> Result<Vec<PunchCardEntry,>, Error,>;

    /// Raw per-contributor weekly statistics.
    ///
    /// Entries are returned unvalidated so that malformed contributors can be
    /// skipped individually.
    async fn fetch_contributors(&self, repo: &RepoRef,) -> Result<Vec<Value,>, Error,>;
}

/// Octocrab-backed [`StatsSource`].
#[derive(Debug, Clone,)]
pub struct GithubClient
{
    octocrab:        Octocrab,
    endpoint:        String,
    punch_card_rsrc: String,
    contrib_rsrc:    String,
}

impl GithubClient
{
    /// Builds a client sending the configured `Authorization` header with a
    /// bounded timeout and no automatic retries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Service`] when the HTTP client cannot be constructed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::path::Path;
    ///
    /// use repo_pulse::{GithubClient, Settings};
    ///
    /// # fn example() -> Result<(), repo_pulse::Error> {
    /// let settings = Settings::load(Path::new("config.yaml",),)?;
    /// let client = GithubClient::new(&settings.github,)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(settings: &GithubSettings,) -> Result<Self, Error,>
    {
        let octocrab = Octocrab::builder()
            .add_header(AUTHORIZATION, settings.api_key.clone(),)
            .add_header(CONTENT_TYPE, "application/json".to_owned(),)
            .add_retry_config(RetryConfig::None,)
            .set_connect_timeout(Some(settings.timeout,),)
            .set_read_timeout(Some(settings.timeout,),)
            .build()
            .map_err(|e| AppError::service(format!("failed to build GitHub client: {e}"),),)?;

        Ok(Self {
            octocrab,
            endpoint: settings.endpoint.clone(),
            punch_card_rsrc: settings.punch_card_rsrc.clone(),
            contrib_rsrc: settings.contrib_rsrc.clone(),
        },)
    }

    async fn get_json<T: DeserializeOwned,>(&self, url: String,) -> Result<T, Error,>
    {
        debug!("Firing the GET call - {url}");
        let response = self
            .octocrab
            ._get(url.as_str(),)
            .await
            .map_err(|e| Error::service(format!("GET {url} failed: {e}"),),)?;

        let status = response.status().as_u16();
        let body = self
            .octocrab
            .body_to_string(response,)
            .await
            .map_err(|e| Error::service(format!("failed to read body of {url}: {e}"),),)?;

        decode_response(status, &url, &body,)
    }
}

impl StatsSource for GithubClient
{
    async fn fetch_punch_card(&self, repo: &RepoRef,) -> Result<Vec<PunchCardEntry,>, Error,>
    {
        info!(repo = %repo.key, "Fetching punch card");
        self.get_json(resource_url(&self.endpoint, repo, &self.punch_card_rsrc,),).await
    }

    async fn fetch_contributors(&self, repo: &RepoRef,) -> Result<Vec<Value,>, Error,>
    {
        info!(repo = %repo.key, "Fetching contributor statistics");
        self.get_json(resource_url(&self.endpoint, repo, &self.contrib_rsrc,),).await
    }
}

/// Concatenates endpoint, repository path and resource suffix verbatim.
pub fn resource_url(endpoint: &str, repo: &RepoRef, suffix: &str,) -> String
{
    format!("{endpoint}{}{suffix}", repo.path)
}

/// Interprets a status code and body according to the API contract.
///
/// # Errors
///
/// Returns [`Error::Api`] for any status other than 200 and
/// [`Error::MalformedResponse`] when the body does not decode into `T`.
pub fn decode_response<T: DeserializeOwned,>(status: u16, url: &str, body: &str,) -> Result<T, Error,>
{
    if status != STATUS_OK {
        return Err(Error::Api {
            status, url: url.to_owned(),
        },);
    }

    serde_json::from_str(body,)
        .map_err(|e| Error::malformed(format!("unexpected body from {url}: {e}"),),)
}
