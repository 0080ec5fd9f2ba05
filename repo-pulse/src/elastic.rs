// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Elasticsearch REST implementation of [`DocumentStore`].

use std::time::Duration;

use reqwest::{Client, StatusCode, Url, header::CONTENT_TYPE};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::{
    config::ElasticSettings,
    error::Error,
    index::{DocumentStore, FieldType, IndexMapping},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30,);

/// Document store speaking the Elasticsearch REST API.
#[derive(Debug, Clone,)]
pub struct ElasticStore
{
    client: Client,
    base:   Url,
}

impl ElasticStore
{
    /// Builds a store for the configured host and port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when host and port do not form a URL and
    /// [`Error::Service`] when the HTTP client cannot be built.
    pub fn new(settings: &ElasticSettings,) -> Result<Self, Error,>
    {
        let raw = settings.base_url();
        let base = Url::parse(&raw,)
            .map_err(|e| Error::config(format!("invalid Elasticsearch address '{raw}': {e}"),),)?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT,)
            .build()
            .map_err(|e| Error::service(format!("failed to build Elasticsearch client: {e}"),),)?;

        Ok(Self {
            client, base,
        },)
    }

    fn url(&self, segments: &[&str],) -> Url
    {
        let mut url = self.base.clone();
        if let Ok(mut path,) = url.path_segments_mut() {
            path.clear().extend(segments,);
        }
        url
    }
}

impl DocumentStore for ElasticStore
{
    async fn ping(&self,) -> Result<(), Error,>
    {
        let response =
            self.client.head(self.url(&[],),).send().await.map_err(|e| Error::StoreUnavailable {
                message: format!("{}: {e}", self.base),
            },)?;

        if response.status().is_success() {
            Ok((),)
        } else {
            Err(Error::StoreUnavailable {
                message: format!("{} answered {}", self.base, response.status()),
            },)
        }
    }

    async fn index_exists(&self, index: &str,) -> Result<bool, Error,>
    {
        let response = self
            .client
            .head(self.url(&[index],),)
            .send()
            .await
            .map_err(|e| Error::service(format!("index check for {index} failed: {e}"),),)?;

        match response.status() {
            StatusCode::OK => Ok(true,),
            StatusCode::NOT_FOUND => Ok(false,),
            other => Err(Error::service(format!("index check for {index} answered {other}"),),),
        }
    }

    async fn create_index(&self, index: &str, mapping: &IndexMapping,) -> Result<(), Error,>
    {
        let response = self
            .client
            .put(self.url(&[index],),)
            .header(CONTENT_TYPE, "application/json",)
            .json(&mapping_body(mapping,),)
            .send()
            .await
            .map_err(|e| Error::service(format!("creating index {index} failed: {e}"),),)?;

        let status = response.status();
        if status.is_success() {
            return Ok((),);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::service(format!("creating index {index} answered {status}: {body}"),),)
    }

    async fn upsert(&self, index: &str, id: &str, document: &Value,) -> Result<(), Error,>
    {
        debug!(index, id, "Upserting document");
        let response = self
            .client
            .put(self.url(&[index, "_doc", id],),)
            .json(document,)
            .send()
            .await
            .map_err(|e| Error::service(format!("writing {index}/{id} failed: {e}"),),)?;

        let status = response.status();
        if status.is_success() {
            return Ok((),);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_write_failure(status, id, body,),)
    }
}

/// Request body creating an index with `mapping`.
pub fn mapping_body(mapping: &IndexMapping,) -> Value
{
    let properties: Map<String, Value,> = mapping
        .fields
        .iter()
        .map(|(name, field_type,)| ((*name).to_owned(), field_definition(*field_type,),),)
        .collect();

    json!({ "mappings": { "properties": properties } })
}

fn field_definition(field_type: FieldType,) -> Value
{
    match field_type {
        FieldType::Integer => json!({ "type": "integer" }),
        FieldType::Keyword => json!({ "type": "keyword" }),
        FieldType::EpochSeconds => json!({ "type": "date", "format": "epoch_second" }),
    }
}

/// Separates per-document rejections from store-wide failures.
fn classify_write_failure(status: StatusCode, id: &str, body: String,) -> Error
{
    match status {
        StatusCode::CONFLICT | StatusCode::BAD_REQUEST => Error::DocumentWriteConflict {
            id: id.to_owned(), message: format!("{status}: {body}"),
        },
        _ => Error::service(format!("writing {id} answered {status}: {body}"),),
    }
}
