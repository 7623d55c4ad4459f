//! Traits describing the upstream provider and shared error types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;

use crate::model::{Address, BinId, BinType, PropertyBins, PropertyId, Schedule, WorkflowId};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while resolving collections.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Provider answered with a non-success status.
    #[error("Status code {status} fetching {what}")]
    Status {
        /// HTTP status returned by the provider.
        status: u16,
        /// Short description of the lookup that failed.
        what: &'static str,
    },
    /// Provider response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] JsonError),
    /// The provider does not know the property.
    #[error("Property not found: {0}")]
    PropertyNotFound(PropertyId),
    /// The provider returned no type for a bin.
    #[error("Bin type not found for bin {0}")]
    BinNotFound(BinId),
    /// The provider returned no workflow for a bin.
    #[error("Workflow ID not found for bin {0}")]
    WorkflowNotFound(BinId),
    /// Property identifier is empty or malformed.
    #[error("Invalid property id")]
    InvalidPropertyId,
    /// Input is not a postcode.
    #[error("Not a valid postcode")]
    InvalidPostcode,
    /// Postcode is valid but outside the served area.
    #[error("Postcodes must begin with one of {0}")]
    UnsupportedArea(String),
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Coarse classification of a [`PortError`], used at the HTTP boundary.
pub enum ErrorKind {
    /// An identifier did not resolve upstream.
    NotFound,
    /// The provider failed or answered with something unusable.
    Upstream,
    /// Input was rejected before talking to the provider.
    Validation,
}

impl PortError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortError::PropertyNotFound(_)
            | PortError::BinNotFound(_)
            | PortError::WorkflowNotFound(_) => ErrorKind::NotFound,
            PortError::InvalidPropertyId
            | PortError::InvalidPostcode
            | PortError::UnsupportedArea(_) => ErrorKind::Validation,
            PortError::Network(_)
            | PortError::Status { .. }
            | PortError::Decode(_)
            | PortError::Internal(_) => ErrorKind::Upstream,
        }
    }
}

#[async_trait]
/// The four lookups the aggregation engine needs from a waste provider.
pub trait BinsGateway: Send + Sync {
    /// List the bins of a property together with its display name.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::PropertyNotFound`] when the provider rejects the id,
    /// or an upstream error when the request fails.
    async fn bins_for_property(&self, property: &PropertyId) -> Result<PropertyBins, PortError>;

    /// Resolve the display name and refuse type of a bin.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::BinNotFound`] when the provider has nothing for the bin,
    /// or an upstream error when the request fails.
    async fn bin_type(&self, bin: &BinId) -> Result<BinType, PortError>;

    /// Resolve the workflow a bin is collected on.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::WorkflowNotFound`] when the response has no workflow id,
    /// or an upstream error when the request fails.
    async fn workflow_id(&self, bin: &BinId) -> Result<WorkflowId, PortError>;

    /// Fetch the upcoming collection dates of a workflow, ascending.
    ///
    /// # Errors
    ///
    /// Returns an upstream error when the request fails.
    async fn schedule(&self, workflow: &WorkflowId) -> Result<Schedule, PortError>;
}

#[async_trait]
/// Trait for provider-specific address search backends.
pub trait AddressPort: Send + Sync {
    /// Find the addresses within a postcode.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed or unsupported postcodes, or an
    /// upstream error when the request fails.
    async fn search(&self, postcode: &str) -> Result<Vec<Address>, PortError>;
}

/// Source of the current instant, injectable for tests.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
/// Clock frozen at a given instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
