//! Upload of a table to Tana: schema creation, then paced batch sends.

use crate::batch::{BatchChunker, BatchEstimate, BatchLimits, Chunk, Envelope, OversizedNode, Target, estimate_batches};
use crate::error::SyncError;
use crate::nodes::{ApiNode, FIELD_DEFINITION_TAG, FieldMap, SUPERTAG_DEFINITION_TAG, build_nodes};
use crate::tana::TanaApi;
use crate::table::Table;
use anyhow::Result;
use serde::Serialize;
use std::time::Duration;

/// Lower bound on the spacing between requests.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Rate limiting applied around API calls.
#[async_trait::async_trait]
pub trait Pacer: Send + Sync {
    /// Waits before every request.
    async fn before_request(&self);
    /// Extra wait after each schema creation step.
    async fn after_schema_step(&self);
    /// Expected wall time for `requests` calls and `schema_steps` schema steps.
    fn estimate(&self, requests: usize, schema_steps: usize) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    per_request: Duration,
    after_schema: Duration,
}

impl FixedDelay {
    pub fn new(per_request: Duration, after_schema: Duration) -> Self {
        Self { per_request: per_request.max(MIN_REQUEST_INTERVAL), after_schema }
    }

    #[cfg(test)]
    pub fn immediate() -> Self {
        Self { per_request: Duration::ZERO, after_schema: Duration::ZERO }
    }
}

#[async_trait::async_trait]
impl Pacer for FixedDelay {
    async fn before_request(&self) {
        tokio::time::sleep(self.per_request).await;
    }

    async fn after_schema_step(&self) {
        tokio::time::sleep(self.after_schema).await;
    }

    fn estimate(&self, requests: usize, schema_steps: usize) -> Duration {
        self.per_request * requests as u32 + self.after_schema * schema_steps as u32
    }
}

/// Progress notifications emitted while a run advances.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    FieldsCreated { count: usize },
    SupertagCreated { name: String, id: String },
    Planned { nodes: usize, batches: usize, oversized: usize, eta_secs: u64 },
    NodeDropped(OversizedNode),
    BatchSent { batch: usize, planned: usize, nodes: usize, nodes_sent: usize },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub supertag_id: String,
    pub fields: usize,
    pub batches_sent: usize,
    pub nodes_sent: usize,
    pub dropped: Vec<OversizedNode>,
}

/// Requests the run will make, including schema calls.
pub fn request_count(table: &Table, estimate: &BatchEstimate) -> usize {
    let field_request = usize::from(table.columns().len() > 1);
    field_request + 1 + estimate.batches
}

pub struct SyncDriver<'a> {
    api: &'a dyn TanaApi,
    pacer: &'a dyn Pacer,
    limits: BatchLimits,
}

impl<'a> SyncDriver<'a> {
    pub fn new(api: &'a dyn TanaApi, pacer: &'a dyn Pacer, limits: BatchLimits) -> Self {
        Self { api, pacer, limits }
    }

    async fn create_schema(&self, what: &'static str, names: &[ApiNode]) -> Result<Vec<String>> {
        self.pacer.before_request().await;
        let resp = self.api.post(&Envelope::new(Target::Schema, names)).await?;
        if !resp.is_ok() {
            return Err(SyncError::SchemaRejected { what, status: resp.status, body: resp.body }.into());
        }
        let ids = resp.node_ids()?;
        if ids.len() < names.len() {
            return Err(SyncError::SchemaIncomplete { what, expected: names.len(), got: ids.len() }.into());
        }
        self.pacer.after_schema_step().await;
        Ok(ids)
    }

    /// Creates one field per non-tag column, ids matched to columns by position.
    pub async fn create_fields(&self, table: &Table) -> Result<FieldMap> {
        let (positions, defs): (Vec<usize>, Vec<ApiNode>) = table
            .field_columns()
            .map(|(idx, c)| (idx, ApiNode::tagged(c, FIELD_DEFINITION_TAG)))
            .unzip();
        if defs.is_empty() {
            return Ok(FieldMap::new());
        }
        let ids = self.create_schema("field", &defs).await?;
        log::info!("created {} field(s)", defs.len());
        Ok(positions.into_iter().zip(ids).collect())
    }

    /// Creates the supertag named after the tag column and returns its id.
    pub async fn create_supertag(&self, table: &Table) -> Result<String> {
        let def = [ApiNode::tagged(table.tag_column(), SUPERTAG_DEFINITION_TAG)];
        let ids = self.create_schema("supertag", &def).await?;
        let id = ids.into_iter().next().ok_or(SyncError::SchemaIncomplete { what: "supertag", expected: 1, got: 0 })?;
        log::info!("created supertag {} ({})", table.tag_column(), id);
        Ok(id)
    }

    pub async fn run(&self, table: &Table, delimiter: Option<&str>, on_event: &mut dyn FnMut(&SyncEvent)) -> Result<SyncReport> {
        let fields = self.create_fields(table).await?;
        on_event(&SyncEvent::FieldsCreated { count: fields.len() });
        let supertag_id = self.create_supertag(table).await?;
        on_event(&SyncEvent::SupertagCreated { name: table.tag_column().to_string(), id: supertag_id.clone() });

        let nodes = build_nodes(table, &supertag_id, &fields, delimiter);
        let est = estimate_batches(&nodes, self.limits);
        let eta = self.pacer.estimate(est.batches, 0);
        on_event(&SyncEvent::Planned { nodes: est.nodes, batches: est.batches, oversized: est.oversized, eta_secs: eta.as_secs() });

        let mut report = SyncReport { supertag_id, fields: fields.len(), ..Default::default() };
        for chunk in BatchChunker::new(nodes, self.limits) {
            match chunk {
                Chunk::Oversized(dropped) => {
                    log::warn!("dropping node {} ({:?}): {} chars exceeds {}", dropped.index, dropped.name, dropped.envelope_chars, dropped.max_chars);
                    on_event(&SyncEvent::NodeDropped(dropped.clone()));
                    report.dropped.push(dropped);
                }
                Chunk::Batch(batch) => {
                    let number = report.batches_sent + 1;
                    self.pacer.before_request().await;
                    let resp = self.api.post(&batch.envelope()).await?;
                    if !resp.is_ok() {
                        return Err(SyncError::BatchRejected {
                            batch: number,
                            planned: est.batches,
                            nodes_sent: report.nodes_sent,
                            status: resp.status,
                            body: resp.body,
                        }
                        .into());
                    }
                    report.batches_sent = number;
                    report.nodes_sent += batch.nodes.len();
                    log::info!("batch {}/{} sent ({} nodes)", number, est.batches, batch.nodes.len());
                    on_event(&SyncEvent::BatchSent {
                        batch: number,
                        planned: est.batches,
                        nodes: batch.nodes.len(),
                        nodes_sent: report.nodes_sent,
                    });
                }
            }
        }
        Ok(report)
    }
}
