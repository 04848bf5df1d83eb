use super::models::{RunContext, RunState};
use crate::{
    models::{Distribution, Environment, FitnessModel, RunRequest, SnapshotSink},
    services::{lock, optimization::Service},
};
use std::sync::Arc;
use tracing::instrument;

pub struct ServiceBuilder {
    pub(super) request: RunRequest,
    pub(super) environment: Arc<Environment>,
    pub(super) snapshots: Option<Box<dyn SnapshotSink>>,
}

impl ServiceBuilder {
    pub fn new(request: RunRequest, environment: Environment) -> Self {
        Self {
            request,
            environment: Arc::new(environment),
            snapshots: None,
        }
    }

    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Receives a snapshot every `snapshot_interval` generations and once at the end.
    pub fn with_snapshot_sink(mut self, sink: impl SnapshotSink + 'static) -> Self {
        self.snapshots = Some(Box::new(sink));
        self
    }

    /// Resolves the start cells and assembles the run context.
    #[instrument(level = "debug", skip(self), fields(run_id = %self.request.id, has_snapshot_sink = self.snapshots.is_some()))]
    pub fn build(self) -> Result<Service, super::Error> {
        let distribution = Distribution::new(
            self.request.start_policy,
            &self.environment,
            self.request.max_path_length,
        )?;
        let model = FitnessModel::new(self.environment, self.request.weights.clone());
        let state = RunState::new(self.request.workers);

        Ok(Service {
            context: Arc::new(RunContext {
                request: self.request,
                model,
                distribution,
            }),
            state: Arc::new(lock::Service::new(state)),
            snapshots: self.snapshots,
            snapshot_sequence: 0,
        })
    }
}
