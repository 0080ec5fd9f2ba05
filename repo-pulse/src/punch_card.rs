// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Punch-card samples with reconstructed timestamps.
///
/// The punch-card endpoint reports hourly commit counts labelled only with a
/// day of week and an hour of day. Samples are placed on an absolute hourly
/// walk that starts eight days before today's UTC midnight, one step per
/// entry in response order.
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{config::RepoRef, index::IndexDocument};

const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;
const WINDOW_DAYS: i64 = 8;

/// Raw `[day_of_week, hour_of_day, commits]` triple returned by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize,)]
pub struct PunchCardEntry(pub u32, pub u32, pub u64,);

impl PunchCardEntry
{
    /// Commit count carried by the entry.
    pub fn commits(&self,) -> u64
    {
        self.2
    }
}

/// One hourly commit-count observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct PunchCardSample
{
    /// Repository key.
    pub repo:      String,
    /// Reconstructed unix timestamp in seconds.
    pub timestamp: i64,
    /// Commits recorded for the hour.
    pub commits:   u64,
}

impl IndexDocument for PunchCardSample
{
    fn document_id(&self,) -> String
    {
        format!("{}_{}", self.repo, self.timestamp)
    }
}

/// Returns the first timestamp of the walk: UTC midnight of `today` minus
/// eight days.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use repo_pulse::punch_card::window_start;
///
/// let today = NaiveDate::from_ymd_opt(2024, 1, 9,).expect("valid date",);
/// assert_eq!(window_start(today,), 1_704_067_200); // 2024-01-01T00:00:00Z
/// ```
pub fn window_start(today: NaiveDate,) -> i64
{
    today.and_time(NaiveTime::MIN,).and_utc().timestamp() - WINDOW_DAYS * SECONDS_PER_DAY
}

/// Maps raw entries onto the hourly walk beginning at `start`.
///
/// The entry at index `i` lands on `start + (i + 1) * 3600`. Day and hour
/// labels of the entries are ignored.
pub fn transform(repo: &RepoRef, entries: &[PunchCardEntry], start: i64,) -> Vec<PunchCardSample,>
{
    entries
        .iter()
        .zip(1_i64..,)
        .map(|(entry, step,)| PunchCardSample {
            repo:      repo.key.clone(),
            timestamp: start + step * SECONDS_PER_HOUR,
            commits:   entry.commits(),
        },)
        .collect()
}
