use axum::{extract::State, Json};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, info, trace, warn};

use super::extract::{QueryParams, SessionPath};
use crate::{
    entity::Role,
    error::RelayError,
    store::{Store, ANSWER, OFFER},
};

/// `sdp` from the query string or a JSON body.
#[derive(Deserialize, Debug, Default)]
pub struct SdpParams {
    pub sdp: Option<String>,
}

/// `candidate` and `mid` from the query string or a JSON body.
#[derive(Deserialize, Debug, Default)]
pub struct CandidateParams {
    pub candidate: Option<String>,
    pub mid: Option<String>,
}

impl From<QueryParams> for SdpParams {
    fn from(query: QueryParams) -> Self {
        Self {
            sdp: query.first("sdp"),
        }
    }
}

impl From<QueryParams> for CandidateParams {
    fn from(query: QueryParams) -> Self {
        Self {
            candidate: query.first("candidate"),
            mid: query.first("mid"),
        }
    }
}

impl SdpParams {
    /// Body values take precedence over query values.
    fn merge(self, body: SdpParams) -> Self {
        Self {
            sdp: non_empty(body.sdp).or(non_empty(self.sdp)),
        }
    }

    fn sdp(self) -> crate::Result<String> {
        non_empty(self.sdp).ok_or(RelayError::InvalidInput("sdp"))
    }
}

impl CandidateParams {
    fn merge(self, body: CandidateParams) -> Self {
        Self {
            candidate: non_empty(body.candidate).or(non_empty(self.candidate)),
            mid: non_empty(body.mid).or(non_empty(self.mid)),
        }
    }

    fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);
        blank(&self.candidate) && blank(&self.mid)
    }

    fn fields(self) -> crate::Result<(String, String)> {
        match (non_empty(self.candidate), non_empty(self.mid)) {
            (Some(candidate), Some(mid)) => Ok((candidate, mid)),
            _ => Err(RelayError::InvalidInput("candidate or mid")),
        }
    }
}

/// Which session description a request addresses.
#[derive(Debug, Clone, Copy)]
enum Description {
    Offer,
    Answer,
}

impl Description {
    fn name(&self) -> &'static str {
        match self {
            Description::Offer => OFFER,
            Description::Answer => ANSWER,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// An empty body means "no fields", anything else must be a JSON object.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> crate::Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

fn status_ok() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn set_description(store: &Store, id: &str, kind: Description, sdp: String) -> Json<Value> {
    match kind {
        Description::Offer => store.set_offer(id, sdp),
        Description::Answer => store.set_answer(id, sdp),
    }
    info!(session = %id, "{} set", kind.name());
    status_ok()
}

fn fetch_description(store: &Store, id: &str, kind: Description) -> crate::Result<Json<Value>> {
    let sdp = match kind {
        Description::Offer => store.get_offer(id),
        Description::Answer => store.get_answer(id),
    }
    .map_err(|err| {
        debug!(session = %id, "{}", err);
        err
    })?;
    info!(session = %id, "{} fetched", kind.name());
    Ok(Json(json!({ "sdp": sdp })))
}

fn reject(id: &str, err: RelayError) -> RelayError {
    warn!(session = %id, "rejected request: {}", err);
    err
}

pub(crate) async fn health() -> Json<Value> {
    debug!("GET health");
    status_ok()
}

fn post_description(
    store: Store,
    id: String,
    kind: Description,
    query: SdpParams,
    body: Bytes,
) -> crate::Result<Json<Value>> {
    debug!(session = %id, ?query, "POST {}", kind.name());
    let params = query.merge(parse_body(&body).map_err(|err| reject(&id, err))?);
    let sdp = params.sdp().map_err(|err| reject(&id, err))?;
    Ok(set_description(&store, &id, kind, sdp))
}

/// A non-empty `sdp` query parameter publishes, otherwise the stored
/// description is returned.
fn get_description(
    store: Store,
    id: String,
    kind: Description,
    query: SdpParams,
) -> crate::Result<Json<Value>> {
    debug!(session = %id, ?query, "GET {}", kind.name());
    match non_empty(query.sdp) {
        Some(sdp) => Ok(set_description(&store, &id, kind, sdp)),
        None => fetch_description(&store, &id, kind),
    }
}

pub(crate) async fn post_offer(
    State(store): State<Store>,
    SessionPath(id): SessionPath<String>,
    query: QueryParams,
    body: Bytes,
) -> crate::Result<Json<Value>> {
    post_description(store, id, Description::Offer, query.into(), body)
}

pub(crate) async fn get_offer(
    State(store): State<Store>,
    SessionPath(id): SessionPath<String>,
    query: QueryParams,
) -> crate::Result<Json<Value>> {
    get_description(store, id, Description::Offer, query.into())
}

pub(crate) async fn post_answer(
    State(store): State<Store>,
    SessionPath(id): SessionPath<String>,
    query: QueryParams,
    body: Bytes,
) -> crate::Result<Json<Value>> {
    post_description(store, id, Description::Answer, query.into(), body)
}

pub(crate) async fn get_answer(
    State(store): State<Store>,
    SessionPath(id): SessionPath<String>,
    query: QueryParams,
) -> crate::Result<Json<Value>> {
    get_description(store, id, Description::Answer, query.into())
}

fn add_candidate(
    store: &Store,
    id: &str,
    role: Role,
    params: CandidateParams,
) -> crate::Result<Json<Value>> {
    let (candidate, mid) = params.fields().map_err(|err| reject(id, err))?;
    store.add_candidate(id, role, &candidate, &mid)?;
    trace!(session = %id, %role, %candidate, %mid, "candidate added");
    Ok(status_ok())
}

fn list_candidates(store: &Store, id: &str, role: Role) -> Json<Value> {
    let candidates = store.list_candidates(id, role);
    trace!(session = %id, %role, count = candidates.len(), "candidates listed");
    Json(json!({ "candidates": candidates }))
}

pub(crate) async fn post_candidate(
    State(store): State<Store>,
    SessionPath((id, role)): SessionPath<(String, String)>,
    query: QueryParams,
    body: Bytes,
) -> crate::Result<Json<Value>> {
    let query = CandidateParams::from(query);
    debug!(session = %id, %role, ?query, "POST candidate");
    let role: Role = role.parse().map_err(|err| reject(&id, err))?;
    let params = query.merge(parse_body(&body).map_err(|err| reject(&id, err))?);
    add_candidate(&store, &id, role, params)
}

/// Both `candidate` and `mid` append, neither lists, one alone is rejected.
pub(crate) async fn get_candidates(
    State(store): State<Store>,
    SessionPath((id, role)): SessionPath<(String, String)>,
    query: QueryParams,
) -> crate::Result<Json<Value>> {
    let query = CandidateParams::from(query);
    debug!(session = %id, %role, ?query, "GET candidate");
    let role: Role = role.parse().map_err(|err| reject(&id, err))?;
    if query.is_empty() {
        return Ok(list_candidates(&store, &id, role));
    }
    add_candidate(&store, &id, role, query)
}

pub(crate) async fn delete_session(
    State(store): State<Store>,
    SessionPath(id): SessionPath<String>,
) -> Json<Value> {
    debug!(session = %id, "DELETE session");
    store.delete_session(&id);
    info!(session = %id, "session deleted");
    status_ok()
}
