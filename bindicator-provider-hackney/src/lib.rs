//! Hackney waste API client: bin lookups and postcode address search.

/// Postcode canonicalization.
pub mod postcode;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use bindicator_core::{
    model::{Address, BinId, BinType, PropertyBins, PropertyId, RefuseType, Schedule, WorkflowId},
    ports::{AddressPort, BinsGateway, Clock, PortError, SystemClock},
};

/// Production API root.
pub const DEFAULT_BASE_URL: &str =
    "https://waste-api-hackney-live.ieg4.net/f806d91c-e133-43a6-ba9a-c0ae4f4cccf6";

const USER_AGENT_VALUE: &str = concat!("bindicator/", env!("CARGO_PKG_VERSION"));

const PROPERTY_PATH: &[&str] = &["alloywastepages", "getproperty"];
const BIN_PATH: &[&str] = &["alloywastepages", "getbin"];
const COLLECTION_PATH: &[&str] = &["alloywastepages", "getcollection"];
const WORKFLOW_PATH: &[&str] = &["alloywastepages", "getworkflow"];
const ADDRESS_PATH: &[&str] = &["property", "opensearch"];

const NAME_ATTRIBUTE: &str = "attributes_itemsSubtitle";
const TYPE_ATTRIBUTE: &str = "attributes_wasteContainersType";
const TITLE_ATTRIBUTE: &str = "attributes_itemsTitle";

/// Response from `getproperty/{propertyId}`.
#[derive(Debug, Deserialize)]
struct PropertyResponse {
    #[serde(rename = "addressSummary", default)]
    address_summary: String,
    #[serde(rename = "providerSpecificFields", default)]
    fields: Option<PropertyFields>,
}

#[derive(Debug, Deserialize)]
struct PropertyFields {
    /// Comma separated bin ids. Absent for unknown properties, empty for
    /// properties without bins.
    #[serde(
        rename = "attributes_wasteContainersAssignableWasteContainers",
        default
    )]
    containers: Option<String>,
}

/// Response from `getbin/{binId}`.
#[derive(Debug, Deserialize)]
struct BinResponse {
    #[serde(default)]
    item: Item,
}

#[derive(Debug, Default, Deserialize)]
struct Item {
    #[serde(default)]
    attributes: Vec<Attribute>,
}

/// Attribute values are either a string or a list of strings.
#[derive(Debug, Deserialize)]
struct Attribute {
    #[serde(rename = "attributeCode")]
    code: String,
    #[serde(default)]
    value: Value,
}

impl Attribute {
    fn first_value(&self) -> Option<&str> {
        match &self.value {
            Value::String(value) => Some(value.as_str()),
            Value::Array(values) => values.iter().find_map(Value::as_str),
            _ => None,
        }
    }
}

/// Response from `getcollection/{binId}`.
#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(rename = "scheduleCodeWorkflowID", default)]
    workflow_id: String,
}

/// Response from `getworkflow/{workflowId}`; the interesting part is nested twice.
#[derive(Debug, Deserialize)]
struct WorkflowResponse {
    #[serde(default)]
    workflow: WorkflowEnvelope,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowEnvelope {
    #[serde(default)]
    workflow: Workflow,
}

#[derive(Debug, Default, Deserialize)]
struct Workflow {
    #[serde(default)]
    trigger: Trigger,
}

#[derive(Debug, Default, Deserialize)]
struct Trigger {
    #[serde(default)]
    dates: Vec<DateTime<Utc>>,
}

/// Response from the address search.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "itemId", default)]
    item_id: String,
    #[serde(default)]
    attributes: Vec<Attribute>,
}

/// Maps the provider's container type ids to refuse categories.
#[derive(Debug, Clone)]
pub struct RefuseTypeTable {
    by_id: HashMap<String, RefuseType>,
}

impl Default for RefuseTypeTable {
    fn default() -> Self {
        Self::empty()
            .with("5f96b455e36673006420c529", RefuseType::Food)
            .with("5f96b6f8d1f4f500660f3058", RefuseType::Garden)
    }
}

impl RefuseTypeTable {
    /// Table without any known ids.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_id: HashMap::new(),
        }
    }

    /// Add or replace a mapping.
    #[must_use]
    pub fn with(mut self, id: &str, refuse_type: RefuseType) -> Self {
        self.by_id.insert(id.trim().to_owned(), refuse_type);
        self
    }

    /// Category for `id`; unknown ids are [`RefuseType::Undefined`].
    #[must_use]
    pub fn lookup(&self, id: &str) -> RefuseType {
        self.by_id.get(id.trim()).copied().unwrap_or_default()
    }
}

/// Gateway and address search backed by the Hackney waste API.
pub struct HackneyGateway {
    client: Client,
    base_url: Url,
    token: Option<String>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    refuse_types: RefuseTypeTable,
}

impl HackneyGateway {
    /// Create a gateway for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Internal`] when `base_url` is not an absolute http(s) URL.
    pub fn new(client: Client, base_url: &str) -> Result<Self, PortError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| PortError::Internal(format!("invalid API base URL: {err}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(PortError::Internal(format!(
                "invalid API base URL: {base_url}"
            )));
        }

        Ok(Self {
            client,
            base_url,
            token: None,
            clock: Arc::new(SystemClock),
            timezone: Tz::Europe__London,
            refuse_types: RefuseTypeTable::default(),
        })
    }

    /// Send `token` as a bearer credential on every request.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.trim().is_empty());
        self
    }

    /// Use `clock` to decide which collection dates are still upcoming.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Time zone whose calendar days collection dates fall on.
    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Replace the container type table.
    #[must_use]
    pub fn with_refuse_types(mut self, refuse_types: RefuseTypeTable) -> Self {
        self.refuse_types = refuse_types;
        self
    }

    fn url(&self, path: &[&str], id: Option<&str>) -> Result<Url, PortError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| PortError::Internal("API base URL cannot take a path".into()))?;
            segments.pop_if_empty().extend(path);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn decorate(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, "application/json");
        match &self.token {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {token}")),
            None => req,
        }
    }

    fn get(&self, path: &[&str], id: &str) -> Result<RequestBuilder, PortError> {
        let url = self.url(path, Some(id))?;
        debug!(%url, "fetching");
        Ok(self.decorate(self.client.get(url)))
    }
}

#[async_trait]
impl BinsGateway for HackneyGateway {
    async fn bins_for_property(&self, property: &PropertyId) -> Result<PropertyBins, PortError> {
        let req = self.get(PROPERTY_PATH, &property.0)?;
        let resp = match fetch_json::<PropertyResponse>(req, "list of bins").await {
            Err(PortError::Status { status: 400, .. }) => {
                return Err(PortError::PropertyNotFound(property.clone()));
            }
            other => other?,
        };

        let Some(containers) = resp.fields.and_then(|fields| fields.containers) else {
            return Err(PortError::PropertyNotFound(property.clone()));
        };

        let bin_ids = containers
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(BinId::from)
            .collect();

        Ok(PropertyBins {
            name: postcode::tidy(&resp.address_summary),
            bin_ids,
        })
    }

    async fn bin_type(&self, bin: &BinId) -> Result<BinType, PortError> {
        let req = self.get(BIN_PATH, &bin.0)?;
        let resp = fetch_json::<BinResponse>(req, "types of bins").await?;

        let attribute = |code: &str| {
            resp.item
                .attributes
                .iter()
                .find(|attribute| attribute.code == code)
                .and_then(Attribute::first_value)
                .filter(|value| !value.trim().is_empty())
        };
        let name = attribute(NAME_ATTRIBUTE);
        let type_id = attribute(TYPE_ATTRIBUTE);

        if name.is_none() && type_id.is_none() {
            return Err(PortError::BinNotFound(bin.clone()));
        }

        Ok(BinType {
            name: name.map(postcode::tidy).unwrap_or_default(),
            refuse_type: type_id.map_or(RefuseType::Undefined, |id| self.refuse_types.lookup(id)),
        })
    }

    async fn workflow_id(&self, bin: &BinId) -> Result<WorkflowId, PortError> {
        let req = self.get(COLLECTION_PATH, &bin.0)?;
        let resp = fetch_json::<CollectionResponse>(req, "workflows of bins").await?;

        let workflow_id = resp.workflow_id.trim();
        if workflow_id.is_empty() {
            return Err(PortError::WorkflowNotFound(bin.clone()));
        }
        Ok(WorkflowId::from(workflow_id))
    }

    async fn schedule(&self, workflow: &WorkflowId) -> Result<Schedule, PortError> {
        let req = self.get(WORKFLOW_PATH, &workflow.0)?;
        let resp = fetch_json::<WorkflowResponse>(req, "workflow schedule").await?;

        Ok(Schedule::upcoming(
            resp.workflow.workflow.trigger.dates,
            self.clock.now(),
            &self.timezone,
        ))
    }
}

#[async_trait]
impl AddressPort for HackneyGateway {
    async fn search(&self, postcode: &str) -> Result<Vec<Address>, PortError> {
        let canonical = postcode::canonicalize(postcode)?;

        let mut url = self.url(ADDRESS_PATH, None)?;
        url.query_pairs_mut()
            .append_pair("pageSize", "100")
            .append_pair("page", "1");
        debug!(%url, postcode = %canonical, "searching addresses");

        let body = json!({
            "type": "Query",
            "aqs": {
                "properties": {
                    "dodiCode": "designs_nlpgPremises",
                    "collectionCode": "Live",
                    "attributes": [TITLE_ATTRIBUTE],
                },
                "children": [{
                    "type": "Equals",
                    "properties": {"__dataExplorerFilter": "attributes_premisesPostcode"},
                    "children": [
                        {
                            "type": "Attribute",
                            "properties": {
                                "attributeCode": "attributes_premisesPostcode",
                                "value": [],
                            },
                            "children": [],
                        },
                        {
                            "type": "String",
                            "properties": {"attributeCode": "", "value": [canonical]},
                            "children": [],
                        },
                    ],
                }],
            },
        });

        let req = self.decorate(self.client.post(url)).json(&body);
        let resp = fetch_json::<SearchResponse>(req, "addresses for postcode").await?;

        let mut addresses: Vec<Address> = resp
            .results
            .into_iter()
            .filter_map(|result| {
                let name = result
                    .attributes
                    .iter()
                    .find(|attribute| attribute.code == TITLE_ATTRIBUTE)
                    .and_then(Attribute::first_value)
                    .map(postcode::tidy)
                    .filter(|name| !name.is_empty())?;
                let id = result.item_id.trim();
                (!id.is_empty()).then(|| Address {
                    id: PropertyId::from(id),
                    name,
                })
            })
            .collect();

        addresses.sort_by(|left, right| natord::compare(&left.name, &right.name));
        Ok(addresses)
    }
}

// Non-success statuses become `PortError::Status` so callers can match on them.
async fn fetch_json<T: DeserializeOwned>(
    req: RequestBuilder,
    what: &'static str,
) -> Result<T, PortError> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(PortError::Status {
            status: status.as_u16(),
            what,
        });
    }
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use bindicator_core::ports::{ErrorKind, FixedClock};

    use super::*;

    const TOKEN: &str = "opaque-token";

    async fn setup() -> (MockServer, HackneyGateway) {
        let server = MockServer::start().await;
        let gateway = HackneyGateway::new(Client::new(), &server.uri()).expect("valid base URL");
        (server, gateway)
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn at(raw: &str) -> Arc<dyn Clock> {
        let now = DateTime::parse_from_rfc3339(raw)
            .expect("valid timestamp")
            .with_timezone(&Utc);
        Arc::new(FixedClock(now))
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HackneyGateway::new(Client::new(), "ftp://foo.bar").is_err());
        assert!(HackneyGateway::new(Client::new(), "not a url").is_err());
    }

    #[test]
    fn refuse_type_table_maps_known_ids() {
        let table = RefuseTypeTable::default().with("abc", RefuseType::Recycling);
        assert_eq!(table.lookup("5f96b455e36673006420c529"), RefuseType::Food);
        assert_eq!(table.lookup("5f96b6f8d1f4f500660f3058"), RefuseType::Garden);
        assert_eq!(table.lookup("abc"), RefuseType::Recycling);
        assert_eq!(table.lookup("zzz"), RefuseType::Undefined);
    }

    #[tokio::test]
    async fn lists_bins_for_property() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getproperty/p1"))
            .and(header_exists("user-agent"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "addressSummary": "  1 Mare   Street, London ",
                "providerSpecificFields": {
                    "attributes_wasteContainersAssignableWasteContainers": "foo,bar, baz"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let bins = gateway
            .bins_for_property(&PropertyId::from("p1"))
            .await
            .expect("bins");

        assert_eq!(bins.name, "1 Mare Street, London");
        assert_eq!(
            bins.bin_ids,
            vec![BinId::from("foo"), BinId::from("bar"), BinId::from("baz")]
        );
    }

    #[tokio::test]
    async fn property_without_bins_is_empty() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getproperty/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "addressSummary": "2 Mare Street",
                "providerSpecificFields": {
                    "attributes_wasteContainersAssignableWasteContainers": ""
                }
            })))
            .mount(&server)
            .await;

        let bins = gateway
            .bins_for_property(&PropertyId::from("p1"))
            .await
            .expect("bins");

        assert!(bins.bin_ids.is_empty());
        assert_eq!(bins.name, "2 Mare Street");
    }

    #[tokio::test]
    async fn property_without_bin_list_is_not_found() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getproperty/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getproperty/p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "addressSummary": "3 Mare Street",
                "providerSpecificFields": {}
            })))
            .mount(&server)
            .await;

        for id in ["p1", "p2"] {
            let err = gateway
                .bins_for_property(&PropertyId::from(id))
                .await
                .expect_err("no bin list");

            assert!(matches!(err, PortError::PropertyNotFound(_)), "{id}");
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn bad_request_means_unknown_property() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let err = gateway
            .bins_for_property(&PropertyId::from("p1"))
            .await
            .expect_err("fails");

        assert!(matches!(err, PortError::PropertyNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn other_statuses_are_upstream_failures() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(418))
            .mount(&server)
            .await;

        let err = gateway
            .bins_for_property(&PropertyId::from("p1"))
            .await
            .expect_err("fails");

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.to_string().contains("Status code 418"));
    }

    #[tokio::test]
    async fn unparsable_body_is_an_upstream_failure() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = gateway
            .workflow_id(&BinId::from("b1"))
            .await
            .expect_err("fails");

        assert!(matches!(err, PortError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_network_error() {
        let gateway =
            HackneyGateway::new(Client::new(), "http://127.0.0.1:9").expect("valid base URL");

        let err = gateway
            .schedule(&WorkflowId::from("w1"))
            .await
            .expect_err("fails");

        assert!(matches!(err, PortError::Network(_)));
    }

    #[tokio::test]
    async fn passes_token_through() {
        let (server, gateway) = setup().await;
        let gateway = gateway.with_token(Some(TOKEN.to_owned()));
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getbin/b1"))
            .and(header("authorization", "Bearer opaque-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "item": {"attributes": [
                    {"attributeCode": "attributes_itemsSubtitle", "value": "Garbage sack"}
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        gateway.bin_type(&BinId::from("b1")).await.expect("bin type");
    }

    #[tokio::test]
    async fn resolves_bin_type_name_and_category() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getbin/b1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "item": {"attributes": [
                    {"attributeCode": "attributes_itemsSubtitle", "value": "Garbage sack"},
                    {"attributeCode": "attributes_wasteContainersType", "value": ["5f96b455e36673006420c529"]}
                ]}
            })))
            .mount(&server)
            .await;

        let bin_type = gateway.bin_type(&BinId::from("b1")).await.expect("bin type");

        assert_eq!(
            bin_type,
            BinType {
                name: "Garbage sack".into(),
                refuse_type: RefuseType::Food,
            }
        );
    }

    #[tokio::test]
    async fn bin_type_tolerates_missing_fields() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getbin/named"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "item": {"attributes": [
                    {"attributeCode": "attributes_itemsSubtitle", "value": "Dumpster"},
                    {"attributeCode": "attributes_wasteContainersType", "value": "no-such-type"}
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getbin/typed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "item": {"attributes": [
                    {"attributeCode": "attributes_wasteContainersType", "value": "5f96b6f8d1f4f500660f3058"}
                ]}
            })))
            .mount(&server)
            .await;

        let named = gateway.bin_type(&BinId::from("named")).await.expect("named");
        let typed = gateway.bin_type(&BinId::from("typed")).await.expect("typed");

        assert_eq!(named.refuse_type, RefuseType::Undefined);
        assert_eq!(typed.name, "");
        assert_eq!(typed.refuse_type, RefuseType::Garden);
    }

    #[tokio::test]
    async fn bin_without_attributes_is_not_found() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "item": {"attributes": [
                    {"attributeCode": "attributes_itemsSubtitle", "value": ""}
                ]}
            })))
            .mount(&server)
            .await;

        let err = gateway.bin_type(&BinId::from("b1")).await.expect_err("fails");

        assert!(err.to_string().contains("Bin type not found"));
    }

    #[tokio::test]
    async fn resolves_workflow_id() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getcollection/b1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"scheduleCodeWorkflowID": "foo"})),
            )
            .mount(&server)
            .await;

        let workflow = gateway.workflow_id(&BinId::from("b1")).await.expect("workflow");

        assert_eq!(workflow, WorkflowId::from("foo"));
    }

    #[tokio::test]
    async fn empty_workflow_id_is_not_found() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"scheduleCodeWorkflowID": ""})),
            )
            .mount(&server)
            .await;

        let err = gateway
            .workflow_id(&BinId::from("b1"))
            .await
            .expect_err("fails");

        assert!(matches!(err, PortError::WorkflowNotFound(_)));
        assert!(err.to_string().contains("Workflow ID not found"));
    }

    #[tokio::test]
    async fn schedule_keeps_upcoming_local_days() {
        let (server, gateway) = setup().await;
        let gateway = gateway.with_clock(at("2024-01-01T03:19:46Z"));
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getworkflow/w1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workflow": {"workflow": {"trigger": {"dates": [
                    "2023-12-22T13:55:42.123Z",
                    "2024-01-05T09:22:31.000Z",
                    "2025-07-06T12:00:00.002Z"
                ]}}}
            })))
            .mount(&server)
            .await;

        let schedule = gateway
            .schedule(&WorkflowId::from("w1"))
            .await
            .expect("schedule");

        assert_eq!(schedule.dates(), &[date(2024, 1, 5), date(2025, 7, 6)]);
    }

    #[tokio::test]
    async fn schedule_without_dates_is_empty() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workflow": {"workflow": {"trigger": {"dates": []}}}
            })))
            .mount(&server)
            .await;

        let schedule = gateway
            .schedule(&WorkflowId::from("w1"))
            .await
            .expect("schedule");

        assert!(schedule.is_empty());
    }

    #[tokio::test]
    async fn ids_are_path_encoded() {
        let (server, gateway) = setup().await;
        Mock::given(method("GET"))
            .and(path("/alloywastepages/getcollection/a%2Fb"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"scheduleCodeWorkflowID": "w"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        gateway
            .workflow_id(&BinId::from("a/b"))
            .await
            .expect("workflow");
    }

    #[tokio::test]
    async fn searches_addresses_in_natural_order() {
        let (server, gateway) = setup().await;
        Mock::given(method("POST"))
            .and(path("/property/opensearch"))
            .and(query_param("pageSize", "100"))
            .and(body_string_contains("E8 3QQ"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"itemId": "id10", "attributes": [
                        {"attributeCode": "attributes_itemsTitle", "value": "Flat 10,  Mare Street"}
                    ]},
                    {"itemId": "id2", "attributes": [
                        {"attributeCode": "attributes_itemsTitle", "value": "Flat 2, Mare Street"}
                    ]},
                    {"itemId": "", "attributes": [
                        {"attributeCode": "attributes_itemsTitle", "value": "No id"}
                    ]},
                    {"itemId": "untitled", "attributes": []}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let addresses = gateway.search("e83qq").await.expect("addresses");

        assert_eq!(
            addresses,
            vec![
                Address {
                    id: PropertyId::from("id2"),
                    name: "Flat 2, Mare Street".into(),
                },
                Address {
                    id: PropertyId::from("id10"),
                    name: "Flat 10, Mare Street".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn invalid_postcode_is_rejected_without_a_request() {
        let (server, gateway) = setup().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = gateway.search("Susan").await.expect_err("fails");

        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
