//! Cloud Firestore over its REST API.
//!
//! Reads use `GET .../documents/{collection}/{key}`; writes go through
//! `documents:commit` so the stamp field can use the `REQUEST_TIME` transform
//! and be set by the server clock.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::store::{Collection, DocumentStore, Fields, Stamp, StoreError};

const FIRESTORE_URL: &str = "https://firestore.googleapis.com";
/// The emulator treats this bearer token as an admin and skips security rules.
const EMULATOR_OWNER_TOKEN: &str = "owner";

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    api_key: String,
    access_token: Option<String>,
}

impl FirestoreStore {
    pub fn new(
        base_url: impl Into<String>,
        project_id: String,
        api_key: String,
        access_token: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id,
            api_key,
            access_token,
        }
    }

    /// Production endpoint, or the local emulator when a host is given.
    pub fn for_project(
        project_id: String,
        api_key: String,
        access_token: Option<String>,
        emulator_host: Option<&str>,
    ) -> Self {
        match emulator_host {
            Some(host) => Self::new(
                format!("http://{host}"),
                project_id,
                api_key,
                access_token.or_else(|| Some(EMULATOR_OWNER_TOKEN.to_string())),
            ),
            None => Self::new(FIRESTORE_URL, project_id, api_key, access_token),
        }
    }

    fn documents_root(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_name(&self, collection: Collection, key: &str) -> String {
        format!("{}/{}/{}", self.documents_root(), collection.as_str(), key)
    }

    fn document_url(&self, collection: Collection, key: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StoreError::Malformed(format!("bad Firestore URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Malformed("Firestore URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                collection.as_str(),
                key,
            ]);
        Ok(url)
    }

    fn commit_url(&self) -> String {
        format!("{}/v1/{}:commit", self.base_url, self.documents_root())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.query(&[("key", self.api_key.as_str())]);
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn commit(&self, collection: Collection, key: &str, write: Value) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.post(self.commit_url()))
            .json(&json!({ "writes": [write] }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                collection: collection.as_str(),
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }
        debug!("Committed {}/{key}", collection.as_str());
        Ok(())
    }

    fn write_for(&self, collection: Collection, key: &str, fields: &Fields, stamp: Stamp) -> Value {
        json!({
            "update": {
                "name": self.document_name(collection, key),
                "fields": encode_fields(fields),
            },
            "updateTransforms": [{
                "fieldPath": stamp.field(),
                "setToServerValue": "REQUEST_TIME",
            }],
        })
    }
}

fn api_error(status: StatusCode, body: String) -> StoreError {
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    StoreError::Api {
        status: status.as_u16(),
        message,
    }
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains('/') {
        return Err(StoreError::Malformed(format!("invalid document key '{key}'")));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Fields>, StoreError> {
        check_key(key)?;
        let response = self
            .authorize(self.client.get(self.document_url(collection, key)?))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(status, response.text().await.unwrap_or_default()));
        }

        let document: FirestoreDocument = response.json().await?;
        decode_fields(&document.fields).map(Some)
    }

    async fn set(
        &self,
        collection: Collection,
        key: &str,
        fields: Fields,
        stamp: Stamp,
    ) -> Result<(), StoreError> {
        check_key(key)?;
        let write = self.write_for(collection, key, &fields, stamp);
        self.commit(collection, key, write).await
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        fields: Fields,
        stamp: Stamp,
    ) -> Result<(), StoreError> {
        check_key(key)?;
        let mut write = self.write_for(collection, key, &fields, stamp);
        write["updateMask"] = json!({
            "fieldPaths": fields.keys().map(|k| field_path(k)).collect::<Vec<_>>(),
        });
        write["currentDocument"] = json!({ "exists": true });
        self.commit(collection, key, write).await
    }
}

/// Simple names pass through; anything else is backtick-quoted.
fn field_path(name: &str) -> String {
    let mut chars = name.chars();
    let simple = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// JSON to Firestore typed value.
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Result<Fields, StoreError> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

/// Firestore typed value to JSON. Timestamps, references and bytes become strings.
fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let (kind, inner) = value
        .as_object()
        .and_then(|o| o.iter().next())
        .ok_or_else(|| StoreError::Malformed(format!("untyped Firestore value: {value}")))?;

    match (kind.as_str(), inner) {
        ("nullValue", _) => Ok(Value::Null),
        ("booleanValue", b) => Ok(b.clone()),
        ("integerValue", Value::String(s)) => s
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| StoreError::Malformed(format!("integerValue '{s}': {e}"))),
        ("integerValue", n @ Value::Number(_)) => Ok(n.clone()),
        ("doubleValue", Value::Number(n)) => Ok(Value::Number(n.clone())),
        ("doubleValue", _) => Ok(Value::Null),
        ("stringValue" | "timestampValue" | "referenceValue" | "bytesValue", s) => Ok(s.clone()),
        ("geoPointValue", point) => Ok(point.clone()),
        ("arrayValue", array) => {
            let values = array
                .get("values")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            values
                .iter()
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        ("mapValue", map) => match map.get("fields").and_then(Value::as_object) {
            Some(fields) => decode_fields(fields).map(Value::Object),
            None => Ok(Value::Object(Map::new())),
        },
        (kind, _) => Err(StoreError::Malformed(format!("unsupported Firestore value '{kind}'"))),
    }
}
