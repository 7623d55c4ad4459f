//! Domain data structures for properties, bins, workflows and collection schedules.

use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a property (a location holding one or more bins).
pub struct PropertyId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a single physical bin.
pub struct BinId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for an upstream collection round.
pub struct WorkflowId(pub String);

impl fmt::Display for PropertyId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl fmt::Display for BinId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for PropertyId {
    fn from(raw: &str) -> Self {
        PropertyId(raw.to_owned())
    }
}

impl From<&str> for BinId {
    fn from(raw: &str) -> Self {
        BinId(raw.to_owned())
    }
}

impl From<&str> for WorkflowId {
    fn from(raw: &str) -> Self {
        WorkflowId(raw.to_owned())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Category of waste handled by a bin.
pub enum RefuseType {
    /// Food caddy.
    Food,
    /// Mixed recycling.
    Recycling,
    /// Garden waste.
    Garden,
    /// General waste.
    Rubbish,
    /// The provider returned no type, or one we do not recognise.
    #[default]
    #[serde(rename = "unknown")]
    Undefined,
}

impl fmt::Display for RefuseType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            RefuseType::Food => "food",
            RefuseType::Recycling => "recycling",
            RefuseType::Garden => "garden",
            RefuseType::Rubbish => "rubbish",
            RefuseType::Undefined => "unknown",
        };
        write!(formatter, "{slug}")
    }
}

impl RefuseType {
    /// Parse a slug such as `"food"`; anything unrecognised yields [`RefuseType::Undefined`].
    #[must_use]
    pub fn from_slug(slug: &str) -> Self {
        match slug.trim().to_lowercase().as_str() {
            "food" => RefuseType::Food,
            "recycling" => RefuseType::Recycling,
            "garden" => RefuseType::Garden,
            "rubbish" => RefuseType::Rubbish,
            _ => RefuseType::Undefined,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Bin list for a property as returned by the provider.
pub struct PropertyBins {
    /// Human-friendly address of the property; empty when the provider has none.
    pub name: String,
    /// Bins assigned to the property, in provider order.
    pub bin_ids: Vec<BinId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Display name and refuse category of a bin.
pub struct BinType {
    /// Display name, e.g. "Garbage sack". Empty when the provider has none.
    pub name: String,
    /// Category of waste collected from this bin.
    pub refuse_type: RefuseType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Upcoming collection dates of a workflow, ascending, with no past entries.
pub struct Schedule {
    dates: Vec<NaiveDate>,
}

impl Schedule {
    /// Wrap dates that are already filtered and ascending.
    #[must_use]
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self { dates }
    }

    /// Build a schedule from raw provider timestamps.
    ///
    /// Timestamps before `now` are dropped and the remaining ones are reduced to
    /// their calendar date in `tz`. Input order is preserved; providers hand us
    /// ascending lists.
    #[must_use]
    pub fn upcoming<Tz, I>(timestamps: I, now: DateTime<Utc>, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let dates = timestamps
            .into_iter()
            .filter(|timestamp| *timestamp >= now)
            .map(|timestamp| timestamp.with_timezone(tz).date_naive())
            .collect();
        Self { dates }
    }

    /// Earliest upcoming date, if any.
    #[must_use]
    pub fn next(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// All upcoming dates.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Whether no collection is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Next collection for one bin of a property.
pub struct BinCollection {
    /// Bin display name.
    pub name: String,
    /// Category of waste.
    pub refuse_type: RefuseType,
    /// Date of the next collection.
    pub next_collection: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Result of aggregating all bins of a property.
pub struct AggregatedResult {
    /// The property that was looked up.
    pub property_id: PropertyId,
    /// Display name of the property.
    pub property_name: String,
    /// Bins with an upcoming collection, in provider order.
    pub bins: Vec<BinCollection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
/// Address returned from a postcode search.
pub struct Address {
    /// Property identifier to pass to the collection lookup.
    pub id: PropertyId,
    /// Tidied single-line address.
    pub name: String,
}
