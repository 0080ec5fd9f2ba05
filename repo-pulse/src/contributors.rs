// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Contributor activity flattening for repository statistics.
///
/// The contributors endpoint nests weekly totals under each author. Every
/// `(author, week)` pair becomes one flat [`ContributionRecord`]. Entries with
/// missing or mistyped fields are skipped with a warning instead of failing
/// the whole repository.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{config::RepoRef, index::IndexDocument};

/// Weekly contribution statistics as delivered by the API.
#[derive(Debug, Clone, Copy, Deserialize,)]
struct WeeklyStats
{
    w: i64,
    a: u64,
    d: u64,
    c: u64,
}

/// One author-week observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct ContributionRecord
{
    /// Repository key.
    pub repo:      String,
    /// Author login.
    pub author:    String,
    /// Start of the week as a unix timestamp in seconds.
    pub timestamp: i64,
    /// Lines added during the week.
    pub additions: u64,
    /// Lines deleted during the week.
    pub deletions: u64,
    /// Commits made during the week.
    pub commits:   u64,
}

impl IndexDocument for ContributionRecord
{
    fn document_id(&self,) -> String
    {
        format!("{}_{}", self.author, self.timestamp)
    }
}

impl std::fmt::Display for ContributionRecord
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        write!(
            f,
            "{} @ {} ({} commits, +{} -{} lines)",
            self.author, self.timestamp, self.commits, self.additions, self.deletions
        )
    }
}

/// Flattened records plus the number of entries that had to be dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct ContributionBatch
{
    /// Records in contributor order, then week order.
    pub records: Vec<ContributionRecord,>,
    /// Contributors and weeks skipped because of missing or invalid fields.
    pub skipped: usize,
}

/// Flattens raw contributor statistics into per-week records.
///
/// # Example
///
/// ```
/// use repo_pulse::{RepoRef, contributors::transform};
///
/// let raw: Vec<serde_json::Value,> = serde_json::from_str(
///     r#"[{"author":{"login":"alice"},"weeks":[{"w":1700000000,"a":10,"d":2,"c":3}]}]"#,
/// )
/// .expect("valid payload",);
/// let batch = transform(&RepoRef::new("r1", "octocat/Hello-World",), &raw,);
/// assert_eq!(batch.records.len(), 1);
/// assert_eq!(batch.records[0].author, "alice");
/// ```
pub fn transform(repo: &RepoRef, raw: &[Value],) -> ContributionBatch
{
    let mut batch = ContributionBatch {
        records: Vec::with_capacity(raw.len() * 52,), skipped: 0,
    };

    for (position, contributor,) in raw.iter().enumerate() {
        let Some(login,) = contributor.pointer("/author/login",).and_then(Value::as_str,) else {
            warn!(repo = %repo.key, position, "Skipping contributor without author login");
            batch.skipped += 1;
            continue;
        };

        let Some(weeks,) = contributor.get("weeks",).and_then(Value::as_array,) else {
            warn!(repo = %repo.key, author = login, "Skipping contributor without weeks array");
            batch.skipped += 1;
            continue;
        };

        for week in weeks {
            match WeeklyStats::deserialize(week,) {
                Ok(stats,) => batch.records.push(ContributionRecord {
                    repo:      repo.key.clone(),
                    author:    login.to_owned(),
                    timestamp: stats.w,
                    additions: stats.a,
                    deletions: stats.d,
                    commits:   stats.c,
                },),
                Err(error,) => {
                    warn!(repo = %repo.key, author = login, %error, "Skipping malformed week entry");
                    batch.skipped += 1;
                }
            }
        }
    }

    debug!(
        repo = %repo.key,
        records = batch.records.len(),
        skipped = batch.skipped,
        "Flattened contributor statistics"
    );

    batch
}
