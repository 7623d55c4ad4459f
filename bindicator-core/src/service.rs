//! Aggregation of a property's bins into next-collection dates.
//!
//! One call to [`CollectionService::aggregate`] is one run. A run lists the
//! property's bins, then looks up every bin's type and workflow concurrently.
//! The first bin to surface a workflow id claims it and fetches its schedule;
//! later bins on the same workflow reuse that schedule once every task has
//! finished. The first failure aborts the run.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::model::{AggregatedResult, BinCollection, BinId, BinType, PropertyId, Schedule, WorkflowId};
use crate::ports::{BinsGateway, PortError};

/// Resolves the next collection of every bin at a property.
pub struct CollectionService {
    gateway: Arc<dyn BinsGateway>,
    concurrency_limit: Option<usize>,
}

impl CollectionService {
    /// Create a service that talks to the provider through `gateway`.
    #[must_use]
    pub fn new(gateway: Arc<dyn BinsGateway>) -> Self {
        Self {
            gateway,
            concurrency_limit: None,
        }
    }

    /// Cap the number of provider calls a single run keeps in flight.
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit.max(1));
        self
    }

    /// Aggregate the next collection date of every bin at `property`.
    ///
    /// Bins are reported in the order the provider lists them. Bins without
    /// an upcoming collection are left out.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::InvalidPropertyId`] for a blank id, and otherwise the
    /// first error any provider lookup produced. No partial result is returned.
    pub async fn aggregate(&self, property: &PropertyId) -> Result<AggregatedResult, PortError> {
        if property.0.trim().is_empty() {
            return Err(PortError::InvalidPropertyId);
        }

        let listing = self.gateway.bins_for_property(property).await?;
        let bin_ids = unique_in_order(listing.bin_ids);
        debug!(%property, bins = bin_ids.len(), "resolving bins");

        let run = Arc::new(Run::new(Arc::clone(&self.gateway), self.concurrency_limit));
        let mut tasks = JoinSet::new();
        for (index, bin) in bin_ids.iter().enumerate() {
            tasks.spawn(resolve_type(Arc::clone(&run), index, bin.clone()));
            tasks.spawn(resolve_workflow(Arc::clone(&run), index, bin.clone()));
        }

        let mut types: Vec<Option<BinType>> = vec![None; bin_ids.len()];
        let mut workflows: Vec<Option<WorkflowId>> = vec![None; bin_ids.len()];
        let mut schedules: HashMap<WorkflowId, Schedule> = HashMap::new();

        while let Some(joined) = tasks.join_next().await {
            let resolved = match joined {
                Ok(Ok(resolved)) => resolved,
                Ok(Err(err)) => {
                    tasks.abort_all();
                    return Err(err);
                }
                Err(join_err) => {
                    tasks.abort_all();
                    return Err(PortError::Internal(format!(
                        "bin lookup task failed: {join_err}"
                    )));
                }
            };

            match resolved {
                Resolved::Type { index, bin_type } => {
                    if let Some(slot) = types.get_mut(index) {
                        *slot = Some(bin_type);
                    }
                }
                Resolved::Workflow {
                    index,
                    workflow,
                    schedule,
                } => {
                    if let Some(schedule) = schedule {
                        schedules.insert(workflow.clone(), schedule);
                    }
                    if let Some(slot) = workflows.get_mut(index) {
                        *slot = Some(workflow);
                    }
                }
            }
        }

        let mut bins = Vec::with_capacity(bin_ids.len());
        for ((bin, bin_type), workflow) in bin_ids.iter().zip(types).zip(workflows) {
            let (Some(bin_type), Some(workflow)) = (bin_type, workflow) else {
                continue;
            };
            let Some(next_collection) = schedules.get(&workflow).and_then(Schedule::next) else {
                debug!(%bin, %workflow, "no upcoming collection, skipping bin");
                continue;
            };
            bins.push(BinCollection {
                name: bin_type.name,
                refuse_type: bin_type.refuse_type,
                next_collection,
            });
        }

        info!(
            %property,
            bins = bins.len(),
            workflows = schedules.len(),
            "aggregated collections"
        );

        Ok(AggregatedResult {
            property_id: property.clone(),
            property_name: listing.name,
            bins,
        })
    }
}

/// State owned by a single aggregation run.
struct Run {
    gateway: Arc<dyn BinsGateway>,
    claimed: Mutex<HashSet<WorkflowId>>,
    permits: Option<Semaphore>,
}

impl Run {
    fn new(gateway: Arc<dyn BinsGateway>, concurrency_limit: Option<usize>) -> Self {
        Self {
            gateway,
            claimed: Mutex::new(HashSet::new()),
            permits: concurrency_limit.map(Semaphore::new),
        }
    }

    /// Returns true for exactly one caller per workflow id.
    fn claim(&self, workflow: &WorkflowId) -> bool {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(workflow.clone())
    }

    async fn permit(&self) -> Result<Option<SemaphorePermit<'_>>, PortError> {
        match &self.permits {
            Some(permits) => permits
                .acquire()
                .await
                .map(Some)
                .map_err(|_err| PortError::Internal("concurrency limiter closed".into())),
            None => Ok(None),
        }
    }
}

enum Resolved {
    Type {
        index: usize,
        bin_type: BinType,
    },
    Workflow {
        index: usize,
        workflow: WorkflowId,
        schedule: Option<Schedule>,
    },
}

async fn resolve_type(run: Arc<Run>, index: usize, bin: BinId) -> Result<Resolved, PortError> {
    let _permit = run.permit().await?;
    let bin_type = run.gateway.bin_type(&bin).await?;
    Ok(Resolved::Type { index, bin_type })
}

async fn resolve_workflow(run: Arc<Run>, index: usize, bin: BinId) -> Result<Resolved, PortError> {
    let workflow = {
        let _permit = run.permit().await?;
        run.gateway.workflow_id(&bin).await?
    };

    // Losers of the claim read the winner's schedule after the join.
    let schedule = if run.claim(&workflow) {
        let _permit = run.permit().await?;
        debug!(%bin, %workflow, "fetching schedule");
        Some(run.gateway.schedule(&workflow).await?)
    } else {
        None
    };

    Ok(Resolved::Workflow {
        index,
        workflow,
        schedule,
    })
}

fn unique_in_order(bin_ids: Vec<BinId>) -> Vec<BinId> {
    let mut seen = HashSet::with_capacity(bin_ids.len());
    bin_ids
        .into_iter()
        .filter(|bin| seen.insert(bin.clone()))
        .collect()
}
