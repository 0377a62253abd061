use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{GUIDES_COLLECTION, GuideStore};
use crate::{config::Config, http::success_body, model::GuideRecord};

const FIRESTORE_URL: &str = "https://firestore.googleapis.com";

/// Guide store backed by the Firestore REST API.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    project_id: String,
    api_key: String,
    id_token: Option<String>,
    base_url: String,
    http: Client,
}

impl FirestoreStore {
    pub fn new(project_id: String, api_key: String) -> Self {
        Self {
            project_id,
            api_key,
            id_token: None,
            base_url: FIRESTORE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = config.backend()?;
        Ok(Self::new(backend.project_id.clone(), backend.api_key.clone()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send requests on behalf of a signed-in user.
    pub fn with_id_token(mut self, id_token: Option<String>) -> Self {
        self.id_token = id_token;
        self
    }

    fn run_query_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents:runQuery",
            self.base_url.trim_end_matches('/'),
            self.project_id
        )
    }
}

#[async_trait]
impl GuideStore for FirestoreStore {
    async fn query_guides(&self, location: Option<&str>) -> Result<Vec<GuideRecord>> {
        let body = json!({ "structuredQuery": structured_query(location) });

        let mut req = self
            .http
            .post(self.run_query_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body);

        if let Some(token) = &self.id_token {
            req = req.bearer_auth(token);
        }

        let res = req.send().await.context("Failed to send request to Firestore (runQuery)")?;
        let body = success_body(res, "Firestore runQuery").await?;

        let rows: Vec<RunQueryRow> =
            serde_json::from_str(&body).context("Failed to parse Firestore runQuery JSON")?;

        // One bad document must not cost the caller the rest of the result.
        let guides = rows
            .into_iter()
            .filter_map(|row| row.document)
            .filter_map(|doc| {
                doc.into_guide()
                    .map_err(|err| tracing::warn!("skipping guide document: {err:#}"))
                    .ok()
            })
            .collect();

        Ok(guides)
    }
}

fn structured_query(location: Option<&str>) -> Value {
    let mut query = json!({ "from": [{ "collectionId": GUIDES_COLLECTION }] });

    if let Some(location) = location {
        query["where"] = json!({
            "fieldFilter": {
                "field": { "fieldPath": "location" },
                "op": "EQUAL",
                "value": { "stringValue": location },
            }
        });
    }

    query
}

#[derive(Debug, Deserialize)]
struct RunQueryRow {
    document: Option<FsDocument>,
}

#[derive(Debug, Deserialize)]
struct FsDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FsDocument {
    fn into_guide(self) -> Result<GuideRecord> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("Firestore document has no id: {}", self.name))?
            .to_string();

        let mut plain = decode_fields(&self.fields);
        plain.insert("id".to_string(), Value::String(id));

        serde_json::from_value(Value::Object(plain))
            .with_context(|| format!("Firestore document {} is not a guide", self.name))
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect()
}

/// Turn a typed Firestore value (`{"stringValue": "..."}` etc.) into plain JSON.
fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "mapValue" => match inner.get("fields").and_then(Value::as_object) {
            Some(fields) => Value::Object(decode_fields(fields)),
            None => Value::Object(Map::new()),
        },
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        // stringValue, doubleValue, booleanValue, timestampValue, geoPointValue, ...
        _ => inner.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_query_has_no_where_clause() {
        let q = structured_query(None);
        assert_eq!(q["from"][0]["collectionId"], "guides");
        assert!(q.get("where").is_none());
    }

    #[test]
    fn filtered_query_uses_equality_on_location() {
        let q = structured_query(Some("Bohol"));
        let filter = &q["where"]["fieldFilter"];
        assert_eq!(filter["field"]["fieldPath"], "location");
        assert_eq!(filter["op"], "EQUAL");
        assert_eq!(filter["value"]["stringValue"], "Bohol");
    }

    #[test]
    fn typed_values_decode_to_plain_json() {
        let typed = json!({
            "mapValue": { "fields": {
                "n": { "integerValue": "5" },
                "d": { "doubleValue": 4.5 },
                "s": { "stringValue": "x" },
                "b": { "booleanValue": true },
                "z": { "nullValue": null },
                "a": { "arrayValue": { "values": [{ "stringValue": "p" }, { "integerValue": "2" }] } },
                "e": { "arrayValue": {} }
            }}
        });

        assert_eq!(
            decode_value(&typed),
            json!({ "n": 5, "d": 4.5, "s": "x", "b": true, "z": null, "a": ["p", 2], "e": [] })
        );
    }

    #[test]
    fn document_name_supplies_the_id() {
        let doc: FsDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/guides/abc123",
            "fields": {
                "id": { "stringValue": "spoofed" },
                "title": { "stringValue": "Chocolate Hills" },
                "location": { "stringValue": "Bohol" },
                "rating": { "integerValue": "5" },
                "latitude": { "doubleValue": 9.8297 }
            }
        }))
        .expect("valid document");

        let guide = doc.into_guide().expect("valid guide");
        assert_eq!(guide.id, "abc123");
        assert_eq!(guide.rating, Some(5.0));
        assert_eq!(guide.latitude, Some(9.8297));
        assert_eq!(guide.longitude, None);
    }

    #[test]
    fn string_typed_numbers_decode() {
        let doc: FsDocument = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/guides/odd",
            "fields": {
                "title": { "stringValue": "Panglao Beach" },
                "location": { "stringValue": "Bohol" },
                "rating": { "stringValue": "4.8" },
                "latitude": { "stringValue": "9.6268" },
                "longitude": { "stringValue": "not a number" }
            }
        }))
        .expect("valid document");

        let guide = doc.into_guide().expect("lenient guide");
        assert_eq!(guide.rating, Some(4.8));
        assert_eq!(guide.latitude, Some(9.6268));
        assert_eq!(guide.longitude, None);
    }

    #[test]
    fn nameless_document_is_rejected() {
        let doc = FsDocument { name: "guides/".to_string(), fields: Map::new() };
        assert!(doc.into_guide().is_err());
    }
}
