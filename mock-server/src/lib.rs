use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const APPLICATION: &str = "mock-app";
pub const SECRET: &str = "mock-secret";
pub const BASE_PATH: &str = "/api/v1/";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CreateItem {
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub quantity: Option<u32>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub name: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Item>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/api/v1/items", get(list_items).post(create_item))
        .route(
            "/api/v1/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/api/v1/echo", get(echo).put(echo).post(echo))
        .route("/api/v1/quota", get(quota))
        .layer(middleware::from_fn(require_credentials))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// `{"error": {...}}` response with the given status.
pub fn envelope(status: StatusCode, kind: &str, message: &str, code: i64) -> Response {
    let body = json!({"error": {"type": kind, "message": message, "code": code}});
    (status, Json(body)).into_response()
}

async fn require_credentials(request: Request, next: Next) -> Response {
    let headers = request.headers();
    let matches = |name: &str, expected: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    };
    if !matches("x-api-application", APPLICATION) || !matches("x-api-secret", SECRET) {
        return envelope(
            StatusCode::UNAUTHORIZED,
            "authentication",
            "invalid application or secret",
            401,
        );
    }
    next.run(request).await
}

fn parse_id(raw: &str) -> Result<Uuid, Response> {
    raw.parse().map_err(|_| {
        envelope(StatusCode::BAD_REQUEST, "validation", "invalid item id", 400)
    })
}

fn not_found(id: Uuid) -> Response {
    envelope(
        StatusCode::NOT_FOUND,
        "not_found",
        &format!("item {id} does not exist"),
        404,
    )
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, Response> {
    serde_json::from_str(body).map_err(|e| {
        envelope(StatusCode::BAD_REQUEST, "request", &format!("malformed JSON: {e}"), 400)
    })
}

async fn list_items(State(db): State<Db>, Query(params): Query<ListParams>) -> Json<Vec<Item>> {
    let items = db.read().await;
    let mut items: Vec<Item> = items
        .values()
        .filter(|item| params.name.as_ref().map_or(true, |name| &item.name == name))
        .cloned()
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));
    Json(items)
}

async fn create_item(State(db): State<Db>, headers: HeaderMap, body: String) -> Response {
    let input: CreateItem = match parse_body(&body) {
        Ok(input) => input,
        Err(response) => return response,
    };
    let name = match input.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            return envelope(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation",
                "name is required",
                42,
            )
        }
    };

    let item = Item {
        id: Uuid::new_v4(),
        name,
        quantity: input.quantity,
    };
    let location = match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{host}{BASE_PATH}items/{}", item.id),
        None => format!("items/{}", item.id),
    };
    db.write().await.insert(item.id, item);

    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({"status": "created"})),
    )
        .into_response()
}

async fn get_item(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match db.read().await.get(&id) {
        Some(item) => Json(item.clone()).into_response(),
        None => not_found(id),
    }
}

async fn update_item(State(db): State<Db>, Path(id): Path<String>, body: String) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let input: UpdateItem = match parse_body(&body) {
        Ok(input) => input,
        Err(response) => return response,
    };

    let mut items = db.write().await;
    let Some(item) = items.get_mut(&id) else {
        return not_found(id);
    };
    if let Some(name) = input.name {
        item.name = name;
    }
    if let Some(quantity) = input.quantity {
        item.quantity = quantity;
    }
    Json(item.clone()).into_response()
}

async fn delete_item(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match db.write().await.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(id),
    }
}

/// Reflect what the server received.
async fn echo(
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: String,
) -> Json<Value> {
    let value_of = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "query": query,
        "user_agent": value_of(header::USER_AGENT),
        "content_type": value_of(header::CONTENT_TYPE),
        "content_length": value_of(header::CONTENT_LENGTH),
        "body_bytes": body.len(),
        "body": body,
    }))
}

/// Always answers 200 with an error envelope.
async fn quota() -> Response {
    let body = json!({"error": {"type": "quota", "message": "daily limit reached", "code": 429}});
    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_to_json() {
        let item = Item {
            id: Uuid::nil(),
            name: "Lamp".to_string(),
            quantity: 2,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["name"], "Lamp");
        assert_eq!(json["quantity"], 2);
    }

    #[test]
    fn create_item_defaults_quantity_to_zero() {
        let input: CreateItem = serde_json::from_str(r#"{"name":"Lamp"}"#).unwrap();
        assert_eq!(input.name.as_deref(), Some("Lamp"));
        assert_eq!(input.quantity, 0);
    }

    #[test]
    fn create_item_allows_missing_name_for_validation() {
        let input: CreateItem = serde_json::from_str(r#"{"quantity":3}"#).unwrap();
        assert!(input.name.is_none());
    }

    #[test]
    fn update_item_all_fields_optional() {
        let input: UpdateItem = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.name.is_none());
        assert!(input.quantity.is_none());
    }

    #[test]
    fn invalid_id_is_rejected() {
        let response = parse_id("not-a-uuid").unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
