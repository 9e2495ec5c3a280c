use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// The only jurisdiction this server answers for.
pub const JURISDICTION: &str = "example.org";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub service_code: String,
    pub service_name: String,
    pub description: String,
    pub metadata: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub keywords: String,
    pub group: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    pub code: String,
    pub datatype: String,
    pub required: bool,
    pub description: String,
    pub order: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ServiceDefinition {
    pub service_code: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ServiceRequest {
    pub service_request_id: String,
    pub status: String,
    pub service_code: String,
    pub service_name: String,
    pub address: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryEndpoint {
    pub specification: String,
    pub url: String,
    pub changeset: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub formats: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Discovery {
    pub changeset: String,
    pub contact: String,
    pub key_service: String,
    pub endpoints: Vec<DiscoveryEndpoint>,
}

/// GeoReport v2 error body. Errors are always sent as a list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: u16,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct Params {
    pub jurisdiction_id: Option<String>,
    pub status: Option<String>,
    pub service_code: Option<String>,
}

/// Read-only fixture data served by every route.
#[derive(Debug)]
pub struct Catalog {
    pub services: Vec<Service>,
    pub definitions: HashMap<String, ServiceDefinition>,
    pub requests: Vec<ServiceRequest>,
}

impl Catalog {
    pub fn sample() -> Self {
        let services = vec![
            Service {
                service_code: "001".to_string(),
                service_name: "Cans left out 24x7".to_string(),
                description: "Garbage or recycling cans left at the curb".to_string(),
                metadata: false,
                kind: "realtime".to_string(),
                keywords: "lorem, ipsum".to_string(),
                group: "sanitation".to_string(),
            },
            Service {
                service_code: "033".to_string(),
                service_name: "Abandoned vehicle".to_string(),
                description: "A vehicle parked in the same spot for days".to_string(),
                metadata: true,
                kind: "batch".to_string(),
                keywords: "car, parking".to_string(),
                group: "street".to_string(),
            },
        ];
        let definitions = HashMap::from([(
            "033".to_string(),
            ServiceDefinition {
                service_code: "033".to_string(),
                attributes: vec![Attribute {
                    code: "PLATE".to_string(),
                    datatype: "string".to_string(),
                    required: false,
                    description: "License plate, if visible".to_string(),
                    order: 1,
                }],
            },
        )]);
        let requests = vec![
            ServiceRequest {
                service_request_id: "638344".to_string(),
                status: "open".to_string(),
                service_code: "001".to_string(),
                service_name: "Cans left out 24x7".to_string(),
                address: "8TH AVE and JUDAH ST".to_string(),
            },
            ServiceRequest {
                service_request_id: "638349".to_string(),
                status: "closed".to_string(),
                service_code: "033".to_string(),
                service_name: "Abandoned vehicle".to_string(),
                address: "1 MAIN ST".to_string(),
            },
        ];
        Self {
            services,
            definitions,
            requests,
        }
    }
}

pub type Db = Arc<Catalog>;

type Failure = (StatusCode, Json<Vec<ErrorBody>>);

pub fn app() -> Router {
    let db: Db = Arc::new(Catalog::sample());
    Router::new()
        .route("/discovery.json", get(discovery))
        .route("/services.json", get(list_services))
        .route("/services.xml", get(list_services_xml))
        .route("/services/{file}", get(service_definition))
        .route("/requests.json", get(list_requests))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn failure(status: StatusCode, description: &str) -> Failure {
    (
        status,
        Json(vec![ErrorBody {
            code: status.as_u16(),
            description: description.to_string(),
        }]),
    )
}

fn check_jurisdiction(params: &Params) -> Result<(), Failure> {
    match params.jurisdiction_id.as_deref() {
        None => Ok(()),
        Some(JURISDICTION) => Ok(()),
        Some(_) => Err(failure(StatusCode::NOT_FOUND, "jurisdiction_id not found")),
    }
}

async fn discovery() -> Json<Discovery> {
    Json(Discovery {
        changeset: "2011-04-05T17:48:34Z".to_string(),
        contact: "311@example.org".to_string(),
        key_service: "https://example.org/api-keys".to_string(),
        endpoints: vec![DiscoveryEndpoint {
            specification: "http://wiki.open311.org/GeoReport_v2".to_string(),
            url: "https://open311.example.org/v2".to_string(),
            changeset: "2011-04-05T17:48:34Z".to_string(),
            kind: "production".to_string(),
            formats: vec!["application/json".to_string(), "text/xml".to_string()],
        }],
    })
}

async fn list_services(
    State(db): State<Db>,
    Query(params): Query<Params>,
) -> Result<Json<Vec<Service>>, Failure> {
    check_jurisdiction(&params)?;
    Ok(Json(db.services.clone()))
}

async fn list_services_xml(
    State(db): State<Db>,
    Query(params): Query<Params>,
) -> Result<impl IntoResponse, Failure> {
    check_jurisdiction(&params)?;
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?><services>");
    for service in &db.services {
        xml.push_str(&format!(
            "<service><service_code>{}</service_code><service_name>{}</service_name></service>",
            service.service_code, service.service_name
        ));
    }
    xml.push_str("</services>");
    Ok(([(header::CONTENT_TYPE, "text/xml")], xml))
}

async fn service_definition(
    State(db): State<Db>,
    Path(file): Path<String>,
    Query(params): Query<Params>,
) -> Result<Json<ServiceDefinition>, Failure> {
    check_jurisdiction(&params)?;
    file.strip_suffix(".json")
        .and_then(|code| db.definitions.get(code))
        .cloned()
        .map(Json)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "service_code not found"))
}

async fn list_requests(
    State(db): State<Db>,
    Query(params): Query<Params>,
) -> Result<Json<Vec<ServiceRequest>>, Failure> {
    check_jurisdiction(&params)?;
    let matches = |request: &&ServiceRequest| {
        params.status.as_deref().is_none_or(|s| request.status == s)
            && params
                .service_code
                .as_deref()
                .is_none_or(|c| request.service_code == c)
    };
    Ok(Json(db.requests.iter().filter(matches).cloned().collect()))
}
