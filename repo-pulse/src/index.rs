// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Index bootstrap and idempotent document writes.
//!
//! [`DocumentStore`] is the narrow capability the pipeline needs from a
//! search backend. [`IndexWriter`] wraps a store that answered its liveness
//! probe and adds the containment rules of the pipeline: rejected documents
//! are logged and skipped, never fatal to the batch.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Error;

/// Record that can be persisted under a deterministic identifier.
///
/// Writing two records with the same identifier leaves a single document
/// holding the values of the later write.
pub trait IndexDocument: Serialize
{
    /// Identifier under which the record is stored.
    fn document_id(&self,) -> String;
}

/// Semantic field type independent of store syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize,)]
#[serde(rename_all = "snake_case")]
pub enum FieldType
{
    /// Whole number.
    Integer,
    /// Exact-match string.
    Keyword,
    /// Date stored as seconds since the unix epoch.
    EpochSeconds,
}

/// Field-to-type mapping an index is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct IndexMapping
{
    /// Fields in declaration order.
    pub fields: Vec<(&'static str, FieldType,),>,
}

impl IndexMapping
{
    /// Mapping for punch-card samples.
    pub fn punch_card() -> Self
    {
        Self {
            fields: vec![
                ("commits", FieldType::Integer,),
                ("repo", FieldType::Keyword,),
                ("timestamp", FieldType::EpochSeconds,),
            ],
        }
    }

    /// Mapping for contribution records.
    pub fn contributions() -> Self
    {
        Self {
            fields: vec![
                ("repo", FieldType::Keyword,),
                ("author", FieldType::Keyword,),
                ("timestamp", FieldType::EpochSeconds,),
                ("additions", FieldType::Integer,),
                ("deletions", FieldType::Integer,),
                ("commits", FieldType::Integer,),
            ],
        }
    }
}

/// Operations the pipeline needs from a document store.
#[allow(async_fn_in_trait)]
pub trait DocumentStore
{
    /// Liveness probe.
    async fn ping(&self,) -> Result<(), Error,>;

    /// Reports whether `index` exists.
    async fn index_exists(&self, index: &str,) -> Result<bool, Error,>;

    /// Creates `index` with the given field mapping.
    async fn create_index(&self, index: &str, mapping: &IndexMapping,) -> Result<(), Error,>;

    /// Writes `document` under `id`, replacing any previous version.
    ///
    /// Rejections of this single document are reported as
    /// [`Error::DocumentWriteConflict`].
    async fn upsert(&self, index: &str, id: &str, document: &Value,) -> Result<(), Error,>;
}

impl<T: DocumentStore,> DocumentStore for &T
{
    async fn ping(&self,) -> Result<(), Error,>
    {
        (**self).ping().await
    }

    async fn index_exists(&self, index: &str,) -> Result<bool, Error,>
    {
        (**self).index_exists(index,).await
    }

    async fn create_index(&self, index: &str, mapping: &IndexMapping,) -> Result<(), Error,>
    {
        (**self).create_index(index, mapping,).await
    }

    async fn upsert(&self, index: &str, id: &str, document: &Value,) -> Result<(), Error,>
    {
        (**self).upsert(index, id, document,).await
    }
}

/// Outcome of writing a batch of documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize,)]
pub struct WriteSummary
{
    /// Documents the store accepted.
    pub written:  usize,
    /// Documents the store rejected individually.
    pub rejected: usize,
}

/// Writer over a store that answered its liveness probe.
#[derive(Debug,)]
pub struct IndexWriter<S,>
{
    store: S,
}

impl<S: DocumentStore,> IndexWriter<S,>
{
    /// Probes the store and wraps it on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] when the probe fails.
    pub async fn connect(store: S,) -> Result<Self, Error,>
    {
        match store.ping().await {
            Ok((),) => {
                debug!("Document store answered liveness probe");
                Ok(Self {
                    store,
                },)
            }
            Err(Error::StoreUnavailable {
                message,
            },) => Err(Error::StoreUnavailable {
                message,
            },),
            Err(error,) => Err(Error::StoreUnavailable {
                message: error.to_string(),
            },),
        }
    }

    /// Underlying store.
    pub fn store(&self,) -> &S
    {
        &self.store
    }

    /// Creates `index` with `mapping` unless it already exists.
    ///
    /// An existing index is left untouched, so calling this on every run is
    /// safe.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the existence check or creation.
    pub async fn ensure_index(&self, index: &str, mapping: &IndexMapping,) -> Result<(), Error,>
    {
        if self.store.index_exists(index,).await? {
            debug!(index, "Index already exists");
            return Ok((),);
        }

        self.store.create_index(index, mapping,).await?;
        info!(index, fields = mapping.fields.len(), "Created index");
        Ok((),)
    }

    /// Writes a single document under `id`.
    ///
    /// # Errors
    ///
    /// Propagates the store's error, including
    /// [`Error::DocumentWriteConflict`].
    pub async fn upsert(&self, index: &str, id: &str, document: &Value,) -> Result<(), Error,>
    {
        self.store.upsert(index, id, document,).await
    }

    /// Upserts every record, skipping the ones the store rejects.
    ///
    /// # Errors
    ///
    /// Returns the first error that is not a per-document rejection; records
    /// after it are not attempted.
    pub async fn write_all<D: IndexDocument,>(
        &self,
        index: &str,
        records: &[D],
    ) -> Result<WriteSummary, Error,>
    {
        let mut summary = WriteSummary::default();

        for record in records {
            let id = record.document_id();
            let document = serde_json::to_value(record,)?;
            match self.upsert(index, &id, &document,).await {
                Ok((),) => summary.written += 1,
                Err(error @ Error::DocumentWriteConflict { .. },) => {
                    warn!(index, %error, "Skipping rejected document");
                    summary.rejected += 1;
                }
                Err(error,) => return Err(error,),
            }
        }

        debug!(index, written = summary.written, rejected = summary.rejected, "Batch written");
        Ok(summary,)
    }
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::{FieldType, IndexMapping, IndexWriter};
    use crate::{
        Error,
        punch_card::PunchCardSample,
        testing::{MemoryStore, sample},
    };

    #[tokio::test]
    async fn connect_fails_fast_when_probe_fails()
    {
        let store = MemoryStore::unreachable();
        let error = IndexWriter::connect(store,).await.expect_err("probe should fail",);
        assert!(matches!(error, Error::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn ensure_index_is_idempotent()
    {
        let writer = IndexWriter::connect(MemoryStore::default(),).await.expect("store reachable",);
        let mapping = IndexMapping::punch_card();

        writer.ensure_index("punch", &mapping,).await.expect("first call succeeds",);
        writer.ensure_index("punch", &mapping,).await.expect("second call succeeds",);

        assert_eq!(writer.store().create_calls(), 1);
        assert_eq!(writer.store().mapping("punch"), Some(mapping));
    }

    #[tokio::test]
    async fn ensure_index_leaves_existing_mapping_untouched()
    {
        let store = MemoryStore::default();
        let existing = IndexMapping {
            fields: vec![("commits", FieldType::Integer,)],
        };
        store.seed_index("punch", existing.clone(),);
        let writer = IndexWriter::connect(store,).await.expect("store reachable",);

        writer.ensure_index("punch", &IndexMapping::punch_card(),).await.expect("exists",);

        assert_eq!(writer.store().create_calls(), 0);
        assert_eq!(writer.store().mapping("punch"), Some(existing));
    }

    #[tokio::test]
    async fn writing_same_record_twice_keeps_latest_values()
    {
        let writer = IndexWriter::connect(MemoryStore::default(),).await.expect("store reachable",);

        writer.write_all("punch", &[sample("r1", 3_600, 5,)],).await.expect("first write",);
        writer.write_all("punch", &[sample("r1", 3_600, 9,)],).await.expect("second write",);

        let documents = writer.store().documents("punch",);
        assert_eq!(documents.len(), 1);
        assert_eq!(documents["r1_3600"], json!({"repo": "r1", "timestamp": 3600, "commits": 9}));
    }

    #[tokio::test]
    async fn rejected_documents_do_not_stop_the_batch()
    {
        let store = MemoryStore::default();
        store.reject_id("r1_7200",);
        let writer = IndexWriter::connect(store,).await.expect("store reachable",);
        let records: Vec<PunchCardSample,> =
            vec![sample("r1", 3_600, 1,), sample("r1", 7_200, 2,), sample("r1", 10_800, 3,)];

        let summary = writer.write_all("punch", &records,).await.expect("batch completes",);

        assert_eq!(summary.written, 2);
        assert_eq!(summary.rejected, 1);
        assert!(writer.store().documents("punch").contains_key("r1_10800"));
    }

    #[test]
    fn mappings_cover_every_document_field()
    {
        let punch: Vec<&str,> = IndexMapping::punch_card().fields.iter().map(|f| f.0,).collect();
        assert_eq!(punch, ["commits", "repo", "timestamp"]);

        let contributions = IndexMapping::contributions();
        assert!(contributions.fields.contains(&("author", FieldType::Keyword,)));
        assert!(contributions.fields.contains(&("timestamp", FieldType::EpochSeconds,)));
        assert_eq!(contributions.fields.len(), 6);
    }
}
