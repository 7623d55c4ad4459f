//! In-memory gateway for exercising the engine and caches.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::{BinId, BinType, PropertyBins, PropertyId, RefuseType, Schedule, WorkflowId};
use crate::ports::{BinsGateway, PortError};

#[derive(Default)]
pub(crate) struct FakeGateway {
    properties: HashMap<PropertyId, PropertyBins>,
    types: HashMap<BinId, BinType>,
    workflows: HashMap<BinId, WorkflowId>,
    schedules: HashMap<WorkflowId, Schedule>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    delays: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_property(mut self, id: &str, name: &str, bins: &[&str]) -> Self {
        self.properties.insert(
            PropertyId::from(id),
            PropertyBins {
                name: name.to_owned(),
                bin_ids: bins.iter().copied().map(BinId::from).collect(),
            },
        );
        self
    }

    pub(crate) fn with_bin(
        mut self,
        id: &str,
        name: &str,
        refuse_type: RefuseType,
        workflow: &str,
    ) -> Self {
        self.types.insert(
            BinId::from(id),
            BinType {
                name: name.to_owned(),
                refuse_type,
            },
        );
        self.workflows
            .insert(BinId::from(id), WorkflowId::from(workflow));
        self
    }

    /// Dates are `YYYY-MM-DD`, already filtered and ascending.
    pub(crate) fn with_schedule(mut self, workflow: &str, dates: &[&str]) -> Self {
        let dates = dates
            .iter()
            .map(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("test date"))
            .collect();
        self.schedules
            .insert(WorkflowId::from(workflow), Schedule::new(dates));
        self
    }

    /// Make the lookup identified by `call` (e.g. `"type:b1"`) fail.
    pub(crate) fn failing(mut self, call: &str) -> Self {
        self.failing.insert(call.to_owned());
        self
    }

    /// Delay every lookup, so that concurrent tasks overlap.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only the lookup identified by `call`, overriding [`Self::with_delay`].
    pub(crate) fn with_delay_for(mut self, call: &str, delay: Duration) -> Self {
        self.delays.insert(call.to_owned(), delay);
        self
    }

    pub(crate) fn calls(&self, call: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(call)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").values().sum()
    }

    async fn record(&self, call: String) -> Result<(), PortError> {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(call.clone())
            .or_insert(0) += 1;

        if let Some(delay) = self.delays.get(&call).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&call) {
            return Err(PortError::Status {
                status: 500,
                what: "fake lookup",
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BinsGateway for FakeGateway {
    async fn bins_for_property(&self, property: &PropertyId) -> Result<PropertyBins, PortError> {
        self.record(format!("property:{property}")).await?;
        self.properties
            .get(property)
            .cloned()
            .ok_or_else(|| PortError::PropertyNotFound(property.clone()))
    }

    async fn bin_type(&self, bin: &BinId) -> Result<BinType, PortError> {
        self.record(format!("type:{bin}")).await?;
        self.types
            .get(bin)
            .cloned()
            .ok_or_else(|| PortError::BinNotFound(bin.clone()))
    }

    async fn workflow_id(&self, bin: &BinId) -> Result<WorkflowId, PortError> {
        self.record(format!("workflow:{bin}")).await?;
        self.workflows
            .get(bin)
            .cloned()
            .ok_or_else(|| PortError::WorkflowNotFound(bin.clone()))
    }

    async fn schedule(&self, workflow: &WorkflowId) -> Result<Schedule, PortError> {
        self.record(format!("schedule:{workflow}")).await?;
        Ok(self.schedules.get(workflow).cloned().unwrap_or_default())
    }
}
