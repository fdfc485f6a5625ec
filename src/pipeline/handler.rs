use futures::future::join_all;
use serde::Deserialize;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span};

use super::client::{ClientServer, FetchError, FetchSpec};
use super::validator::{StructureSpec, Validator};
use crate::engine::core::reduce::{ReductionEngine, ReductionOutput, ReductionRequest};
use crate::engine::errors::ReduceError;
use crate::engine::types::Record;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Validation failed: {0} records do not match the declared structure")]
    Validation(usize),

    #[error("Reduction failed: {0}")]
    Reduce(#[from] ReduceError),
}

impl PipelineError {
    pub fn log_error(&self) {
        match self {
            PipelineError::Fetch(e) => {
                error!("Fetch failed: {}", e);
                debug!("Fetch error details: {:?}", e);
            }
            PipelineError::Validation(n) => {
                error!("Validation failed for a batch of {} records", n);
            }
            PipelineError::Reduce(e) => e.log_error(),
        }
    }
}

/// Everything needed for one fetch → validate → reduce run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineJob {
    pub fetch: FetchSpec,
    #[serde(default)]
    pub structure: StructureSpec,
    pub request: ReductionRequest,
}

/// Fetch → validate → reduce over injected collaborators. Nothing is retried.
pub struct Pipeline<C, V> {
    client: C,
    validator: V,
    engine: ReductionEngine,
}

impl<C, V> Pipeline<C, V>
where
    C: ClientServer,
    V: Validator,
{
    pub fn new(client: C, validator: V, engine: ReductionEngine) -> Self {
        Self {
            client,
            validator,
            engine,
        }
    }

    pub fn engine(&self) -> &ReductionEngine {
        &self.engine
    }

    pub async fn fetch(&self, spec: &FetchSpec) -> Result<Vec<Record>, PipelineError> {
        Ok(self.client.fetch(spec).await?)
    }

    pub async fn validate(
        &self,
        records: &[Record],
        structure: &StructureSpec,
    ) -> Result<(), PipelineError> {
        if self.validator.validate(records, structure).await {
            Ok(())
        } else {
            Err(PipelineError::Validation(records.len()))
        }
    }

    pub fn refine(
        &self,
        records: &[Record],
        request: &ReductionRequest,
    ) -> Result<ReductionOutput, PipelineError> {
        Ok(self.engine.apply(records, request)?)
    }

    pub async fn run(
        &self,
        fetch: &FetchSpec,
        structure: &StructureSpec,
        request: &ReductionRequest,
    ) -> Result<ReductionOutput, PipelineError> {
        let records = self.fetch(fetch).await?;
        self.validate(&records, structure).await?;
        let output = self.refine(&records, request)?;
        info!(
            operation = request.op.name(),
            fetched = records.len(),
            rows = output.len(),
            skipped = output.skipped_total(),
            "pipeline run complete"
        );
        Ok(output)
    }

    pub async fn run_job(&self, job: &PipelineJob) -> Result<ReductionOutput, PipelineError> {
        self.run(&job.fetch, &job.structure, &job.request).await
    }
}

/// Pipeline bound to the machine whose telemetry it refines.
pub struct MachineDataHandler<C, V> {
    machine_id: String,
    pipeline: Pipeline<C, V>,
}

impl<C, V> MachineDataHandler<C, V>
where
    C: ClientServer,
    V: Validator,
{
    pub fn new(machine_id: impl Into<String>, pipeline: Pipeline<C, V>) -> Self {
        Self {
            machine_id: machine_id.into(),
            pipeline,
        }
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    pub fn pipeline(&self) -> &Pipeline<C, V> {
        &self.pipeline
    }

    pub async fn run_job(&self, job: &PipelineJob) -> Result<ReductionOutput, PipelineError> {
        let span = info_span!("machine", machine_id = %self.machine_id, operation = job.request.op.name());
        self.pipeline.run_job(job).instrument(span).await
    }

    /// Runs independent jobs concurrently; results keep the order of `jobs`.
    pub async fn run_batch(
        &self,
        jobs: &[PipelineJob],
    ) -> Vec<Result<ReductionOutput, PipelineError>> {
        join_all(jobs.iter().map(|job| self.run_job(job))).await
    }
}
