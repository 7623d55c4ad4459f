//! Public JSON shape of an aggregated property.

use chrono::{Duration, NaiveDate, NaiveTime, SecondsFormat, TimeZone};
use serde::{Deserialize, Serialize};

use crate::model::{AggregatedResult, RefuseType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
/// Response body of `GET /property/{id}`.
pub struct PropertyCollections {
    /// The requested property id.
    pub property_id: String,
    /// Display name of the property.
    pub name: String,
    /// Bins with an upcoming collection.
    pub bins: Vec<BinSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
/// One bin in [`PropertyCollections`].
pub struct BinSummary {
    /// Bin display name.
    pub name: String,
    /// Refuse category slug.
    #[serde(rename = "Type")]
    pub refuse_type: RefuseType,
    /// RFC 3339 timestamp of local midnight on the collection day.
    pub next_collection: String,
}

impl PropertyCollections {
    /// Build the response for `result`, placing collection days at midnight in `tz`.
    #[must_use]
    pub fn assemble<Tz>(result: AggregatedResult, tz: &Tz) -> Self
    where
        Tz: TimeZone,
    {
        let bins = result
            .bins
            .into_iter()
            .map(|bin| BinSummary {
                name: bin.name,
                refuse_type: bin.refuse_type,
                next_collection: local_midnight(bin.next_collection, tz),
            })
            .collect();

        Self {
            property_id: result.property_id.0,
            name: result.property_name,
            bins,
        }
    }
}

/// Render midnight of `date` in `tz` as RFC 3339, using `Z` for a zero offset.
///
/// Where midnight does not exist in `tz` (a DST gap), the first instant of
/// the day after the gap is used.
#[must_use]
pub fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> String {
    let midnight = date.and_time(NaiveTime::MIN);
    let local = tz.from_local_datetime(&midnight).earliest().or_else(|| {
        (1..=3)
            .map(|hours| midnight + Duration::hours(hours))
            .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
    });

    match local {
        Some(local) => local.fixed_offset().to_rfc3339_opts(SecondsFormat::Secs, true),
        None => midnight.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}
