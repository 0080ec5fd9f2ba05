// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! In-memory doubles for the stats API and the document store.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Mutex,
};

use serde_json::Value;

use crate::{
    Error,
    config::RepoRef,
    github::StatsSource,
    index::{DocumentStore, IndexMapping},
    punch_card::{PunchCardEntry, PunchCardSample},
};

#[derive(Debug, Default,)]
struct StoreState
{
    mappings:     HashMap<String, IndexMapping,>,
    documents:    HashMap<String, BTreeMap<String, Value,>,>,
    create_calls: usize,
    upserts:      usize,
}

/// Store keeping indices and documents in memory.
#[derive(Debug, Default,)]
pub struct MemoryStore
{
    state:       Mutex<StoreState,>,
    unreachable: bool,
    rejected:    Mutex<HashSet<String,>,>,
    failing:     Mutex<HashSet<String,>,>,
}

impl MemoryStore
{
    pub fn unreachable() -> Self
    {
        Self {
            unreachable: true, ..Self::default()
        }
    }

    pub fn seed_index(&self, index: &str, mapping: IndexMapping,)
    {
        self.state.lock().unwrap().mappings.insert(index.to_owned(), mapping,);
    }

    /// Makes the store reject the document with `id` as a conflict.
    pub fn reject_id(&self, id: &str,)
    {
        self.rejected.lock().unwrap().insert(id.to_owned(),);
    }

    /// Makes every call touching `index` fail with a transport error.
    pub fn fail_index(&self, index: &str,)
    {
        self.failing.lock().unwrap().insert(index.to_owned(),);
    }

    pub fn create_calls(&self,) -> usize
    {
        self.state.lock().unwrap().create_calls
    }

    pub fn upserts(&self,) -> usize
    {
        self.state.lock().unwrap().upserts
    }

    pub fn mapping(&self, index: &str,) -> Option<IndexMapping,>
    {
        self.state.lock().unwrap().mappings.get(index,).cloned()
    }

    pub fn documents(&self, index: &str,) -> BTreeMap<String, Value,>
    {
        self.state.lock().unwrap().documents.get(index,).cloned().unwrap_or_default()
    }

    fn check_index(&self, index: &str,) -> Result<(), Error,>
    {
        if self.failing.lock().unwrap().contains(index,) {
            return Err(Error::service(format!("index {index} unreachable"),),);
        }
        Ok((),)
    }
}

impl DocumentStore for MemoryStore
{
    async fn ping(&self,) -> Result<(), Error,>
    {
        if self.unreachable {
            return Err(Error::service("connection refused",),);
        }
        Ok((),)
    }

    async fn index_exists(&self, index: &str,) -> Result<bool, Error,>
    {
        self.check_index(index,)?;
        Ok(self.state.lock().unwrap().mappings.contains_key(index,),)
    }

    async fn create_index(&self, index: &str, mapping: &IndexMapping,) -> Result<(), Error,>
    {
        self.check_index(index,)?;
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        state.mappings.insert(index.to_owned(), mapping.clone(),);
        Ok((),)
    }

    async fn upsert(&self, index: &str, id: &str, document: &Value,) -> Result<(), Error,>
    {
        self.check_index(index,)?;
        if self.rejected.lock().unwrap().contains(id,) {
            return Err(Error::DocumentWriteConflict {
                id:      id.to_owned(),
                message: "version conflict".to_owned(),
            },);
        }
        let mut state = self.state.lock().unwrap();
        state.upserts += 1;
        state.documents.entry(index.to_owned(),).or_default().insert(id.to_owned(), document.clone(),);
        Ok((),)
    }
}

/// Stats source answering from canned per-repository responses.
///
/// Repositories without a canned response answer with status 404.
#[derive(Debug, Default,)]
pub struct ScriptedSource
{
    punch_cards:  HashMap<String, Result<Vec<PunchCardEntry,>, u16,>,>,
    contributors: HashMap<String, Result<Vec<Value,>, u16,>,>,
    calls:        Mutex<Vec<String,>,>,
}

impl ScriptedSource
{
    pub fn with_punch_card(mut self, path: &str, entries: Vec<PunchCardEntry,>,) -> Self
    {
        self.punch_cards.insert(path.to_owned(), Ok(entries,),);
        self
    }

    pub fn with_contributors(mut self, path: &str, body: Vec<Value,>,) -> Self
    {
        self.contributors.insert(path.to_owned(), Ok(body,),);
        self
    }

    pub fn with_status(mut self, path: &str, status: u16,) -> Self
    {
        self.punch_cards.insert(path.to_owned(), Err(status,),);
        self.contributors.insert(path.to_owned(), Err(status,),);
        self
    }

    /// Endpoints requested so far, as `kind:path`.
    pub fn calls(&self,) -> Vec<String,>
    {
        self.calls.lock().unwrap().clone()
    }

    fn answer<T: Clone,>(
        &self,
        kind: &str,
        table: &HashMap<String, Result<T, u16,>,>,
        repo: &RepoRef,
    ) -> Result<T, Error,>
    {
        self.calls.lock().unwrap().push(format!("{kind}:{}", repo.path),);
        match table.get(&repo.path,) {
            Some(Ok(body,),) => Ok(body.clone(),),
            Some(Err(status,),) => Err(Error::Api {
                status: *status, url: format!("scripted/{}/{kind}", repo.path),
            },),
            None => Err(Error::Api {
                status: 404, url: format!("scripted/{}/{kind}", repo.path),
            },),
        }
    }
}

impl StatsSource for ScriptedSource
{
    async fn fetch_punch_card(&self, repo: &RepoRef,) -> Result<Vec<PunchCardEntry,>, Error,>
    {
        self.answer("punch_card", &self.punch_cards, repo,)
    }

    async fn fetch_contributors(&self, repo: &RepoRef,) -> Result<Vec<Value,>, Error,>
    {
        self.answer("contributors", &self.contributors, repo,)
    }
}

pub fn sample(repo: &str, timestamp: i64, commits: u64,) -> PunchCardSample
{
    PunchCardSample {
        repo: repo.to_owned(), timestamp, commits,
    }
}
