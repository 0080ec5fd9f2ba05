//! Ingestion of GitHub repository statistics into Elasticsearch.
//!
//! The library fetches punch-card histograms and per-contributor weekly
//! statistics for every configured repository, flattens them into time-series
//! records and upserts them under deterministic document identifiers, so that
//! repeated runs overwrite rather than duplicate data. One repository's
//! failure never prevents the others from being processed.

mod error;

pub mod config;
pub mod contributors;
pub mod elastic;
pub mod github;
pub mod index;
pub mod pipeline;
pub mod punch_card;

#[cfg(test)]
mod testing;

pub use config::{ConfigFile, ElasticSettings, GithubSettings, RepoRef, Section, Settings};
pub use contributors::{ContributionBatch, ContributionRecord};
pub use elastic::ElasticStore;
pub use error::{Error, io_error};
pub use github::{GithubClient, StatsSource};
pub use index::{DocumentStore, FieldType, IndexDocument, IndexMapping, IndexWriter, WriteSummary};
pub use pipeline::{Pipeline, RepoReport, RunReport, StageReport, StatKind};
pub use punch_card::{PunchCardEntry, PunchCardSample};
