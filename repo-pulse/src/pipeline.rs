// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Per-repository fetch, transform and write loop.
//!
//! Repositories are processed one after another. A failure while handling
//! one repository is logged and recorded in its [`RepoReport`]; the loop
//! always moves on to the next repository. When the document store is
//! unreachable the statistics are still fetched and transformed so the run
//! log shows what would have been written.

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    config::{RepoRef, Settings},
    contributors,
    error::Error,
    github::StatsSource,
    index::{DocumentStore, IndexDocument, IndexMapping, IndexWriter},
    punch_card,
};

/// Statistics the pipeline can ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum,)]
#[serde(rename_all = "kebab-case")]
pub enum StatKind
{
    /// Hourly commit counts for the trailing week.
    PunchCard,
    /// Weekly additions, deletions and commits per author.
    Contributors,
}

impl StatKind
{
    /// Every supported statistic.
    pub const ALL: [StatKind; 2] = [StatKind::PunchCard, StatKind::Contributors];
}

/// Outcome of one statistic for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize,)]
pub struct StageReport
{
    /// Whether the statistic was requested this run.
    pub attempted: bool,
    /// Records produced by the transformer.
    pub fetched:   usize,
    /// Documents the store accepted.
    pub written:   usize,
    /// Records or documents dropped individually.
    pub skipped:   usize,
    /// Failure that stopped this statistic, if any.
    pub error:     Option<String,>,
}

impl StageReport
{
    fn failed(&mut self, error: &Error,)
    {
        self.error = Some(error.to_display_string(),);
    }
}

/// Outcome for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct RepoReport
{
    /// Repository key.
    pub key:          String,
    /// Repository path.
    pub path:         String,
    /// Punch-card ingestion outcome.
    pub punch_card:   StageReport,
    /// Contributor ingestion outcome.
    pub contributors: StageReport,
}

impl RepoReport
{
    /// Returns `true` when no requested statistic failed.
    pub fn succeeded(&self,) -> bool
    {
        self.punch_card.error.is_none() && self.contributors.error.is_none()
    }
}

/// Summary of a complete run.
#[derive(Debug, Clone, Serialize,)]
pub struct RunReport
{
    /// Wall-clock start of the run.
    pub started_at:      DateTime<Utc,>,
    /// First timestamp of the punch-card walk.
    pub window_start:    i64,
    /// Whether the document store answered its liveness probe.
    pub store_available: bool,
    /// Per-repository outcomes in configuration order.
    pub repositories:    Vec<RepoReport,>,
}

impl RunReport
{
    /// Number of repositories with at least one failed statistic.
    pub fn failed_repositories(&self,) -> usize
    {
        self.repositories.iter().filter(|report| !report.succeeded(),).count()
    }
}

/// Writer plus the indices that were bootstrapped successfully.
struct Sink<S,>
{
    writer:        IndexWriter<S,>,
    punch_ready:   bool,
    contrib_ready: bool,
}

/// Orchestrates ingestion for every configured repository.
pub struct Pipeline<'a, A, S,>
{
    source:   &'a A,
    settings: &'a Settings,
    stats:    Vec<StatKind,>,
    progress: ProgressBar,
    store:    Option<S,>,
}

impl<'a, A: StatsSource, S: DocumentStore,> Pipeline<'a, A, S,>
{
    /// Creates a pipeline ingesting every statistic.
    pub fn new(source: &'a A, store: S, settings: &'a Settings,) -> Self
    {
        Self {
            source,
            settings,
            stats: StatKind::ALL.to_vec(),
            progress: ProgressBar::hidden(),
            store: Some(store,),
        }
    }

    /// Restricts the run to `stats`.
    pub fn with_stats(mut self, stats: &[StatKind],) -> Self
    {
        self.stats = stats.to_vec();
        self
    }

    /// Reports progress on a spinner drawn to stderr.
    pub fn with_progress(mut self,) -> Self
    {
        let bar = ProgressBar::new(self.settings.repos.len() as u64,);
        if let Ok(style,) = ProgressStyle::default_bar()
            .template("{spinner:.yellow} [{elapsed_precise}] {pos}/{len} {msg}",)
        {
            bar.set_style(style,);
        }
        self.progress = bar;
        self
    }

    /// Runs the pipeline with `today` anchoring the punch-card walk.
    ///
    /// Never fails: every error is contained in the returned report.
    pub async fn run(mut self, today: NaiveDate,) -> RunReport
    {
        let started_at = Utc::now();
        let start = punch_card::window_start(today,);
        info!(repositories = self.settings.repos.len(), window_start = start, "Starting run");

        let sink = match self.store.take() {
            Some(store,) => self.open_sink(store,).await,
            None => None,
        };
        let store_available = sink.is_some();

        let mut repositories = Vec::with_capacity(self.settings.repos.len(),);
        for repo in &self.settings.repos {
            self.progress.set_message(format!("Processing {}", repo.key),);
            let report = self.process_repo(repo, start, sink.as_ref(),).await;
            if !report.succeeded() {
                warn!(repo = %repo.key, "Repository finished with errors");
            }
            repositories.push(report,);
            self.progress.inc(1,);
        }

        let report = RunReport {
            started_at, window_start: start, store_available, repositories,
        };
        self.progress.finish_with_message(format!(
            "Run complete: {} repositories, {} with errors",
            report.repositories.len(),
            report.failed_repositories()
        ),);
        info!(failed = report.failed_repositories(), "Run complete");
        report
    }

    async fn open_sink(&self, store: S,) -> Option<Sink<S,>,>
    {
        let writer = match IndexWriter::connect(store,).await {
            Ok(writer,) => writer,
            Err(e,) => {
                error!(error = %e, "Skipping writes for this run");
                return None;
            }
        };

        let elastic = &self.settings.elasticsearch;
        let punch_ready = !self.stats.contains(&StatKind::PunchCard,)
            || ensure(&writer, &elastic.main_index, &IndexMapping::punch_card(),).await;
        let contrib_ready = !self.stats.contains(&StatKind::Contributors,)
            || ensure(&writer, &elastic.contrib_index, &IndexMapping::contributions(),).await;

        Some(Sink {
            writer, punch_ready, contrib_ready,
        },)
    }

    async fn process_repo(&self, repo: &RepoRef, start: i64, sink: Option<&Sink<S,>,>,) -> RepoReport
    {
        info!("Fetching results for the repo : {}", repo.key);
        let mut report = RepoReport {
            key:          repo.key.clone(),
            path:         repo.path.clone(),
            punch_card:   StageReport::default(),
            contributors: StageReport::default(),
        };

        if self.stats.contains(&StatKind::PunchCard,) {
            report.punch_card.attempted = true;
            match self.source.fetch_punch_card(repo,).await {
                Ok(entries,) => {
                    let samples = punch_card::transform(repo, &entries, start,);
                    report.punch_card.fetched = samples.len();
                    let target = sink.filter(|sink| sink.punch_ready,);
                    let index = &self.settings.elasticsearch.main_index;
                    write_stage(target, index, &samples, &mut report.punch_card,).await;
                }
                Err(e,) => {
                    warn!(repo = %repo.key, error = %e, "Failed fetching punch card details");
                    report.punch_card.failed(&e,);
                }
            }
        }

        if self.stats.contains(&StatKind::Contributors,) {
            report.contributors.attempted = true;
            match self.source.fetch_contributors(repo,).await {
                Ok(raw,) => {
                    let batch = contributors::transform(repo, &raw,);
                    report.contributors.fetched = batch.records.len();
                    report.contributors.skipped = batch.skipped;
                    let target = sink.filter(|sink| sink.contrib_ready,);
                    let index = &self.settings.elasticsearch.contrib_index;
                    write_stage(target, index, &batch.records, &mut report.contributors,).await;
                }
                Err(e,) => {
                    warn!(repo = %repo.key, error = %e, "Failed fetching contributor statistics");
                    report.contributors.failed(&e,);
                }
            }
        }

        report
    }
}

async fn ensure<S: DocumentStore,>(writer: &IndexWriter<S,>, index: &str, mapping: &IndexMapping,) -> bool
{
    match writer.ensure_index(index, mapping,).await {
        Ok((),) => true,
        Err(e,) => {
            error!(index, error = %e, "Index bootstrap failed; skipping writes to it");
            false
        }
    }
}

async fn write_stage<S: DocumentStore, D: IndexDocument,>(
    sink: Option<&Sink<S,>,>,
    index: &str,
    records: &[D],
    stage: &mut StageReport,
)
{
    let Some(sink,) = sink else {
        info!(index, records = records.len(), "Store not ready; documents not written");
        return;
    };

    match sink.writer.write_all(index, records,).await {
        Ok(summary,) => {
            stage.written = summary.written;
            stage.skipped += summary.rejected;
        }
        Err(e,) => {
            error!(index, error = %e, "Writing documents failed");
            stage.failed(&e,);
        }
    }
}
