use super::rows::{CustomerInsert, CustomerRow, CustomerUpdate};
use crate::application::ports::remote_store::RemoteStore;
use crate::domain::entities::{Record, RecordPatch};
use crate::domain::value_objects::{Collection, RecordId};
use crate::shared::config::RemoteConfig;
use crate::shared::error::{AppError, RemoteError};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use std::time::Duration;

const REPRESENTATION: &str = "return=representation";
// A replayed create whose row already exists comes back as an empty array.
const CREATE_PREFERENCE: &str = "return=representation,resolution=ignore-duplicates";

/// [`RemoteStore`] over a PostgREST endpoint (`{base}/rest/v1/{table}`).
pub struct PostgrestRemoteStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestRemoteStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|err| AppError::Configuration(format!("http client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.table_name())
    }

    fn request(&self, method: Method, collection: Collection) -> RequestBuilder {
        let builder = self.client.request(method, self.table_url(collection));
        if self.api_key.is_empty() {
            builder
        } else {
            builder
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
        }
    }

    fn by_id(&self, method: Method, collection: Collection, id: &RecordId) -> RequestBuilder {
        self.request(method, collection)
            .query(&[("id", format!("eq.{id}"))])
    }
}

#[async_trait]
impl RemoteStore for PostgrestRemoteStore {
    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Record>, RemoteError> {
        let response = self
            .request(Method::GET, collection)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;
        let rows: Vec<CustomerRow> = decode(ensure_success(response).await?).await?;

        tracing::debug!(
            target: "sync::remote",
            collection = %collection,
            rows = rows.len(),
            "fetched remote rows"
        );
        rows.into_iter()
            .map(|row| row.into_customer().map(Record::Customer))
            .collect()
    }

    async fn create(&self, record: &Record) -> Result<Record, RemoteError> {
        let collection = record.collection();
        let builder = self
            .request(Method::POST, collection)
            .query(&[("on_conflict", "id")])
            .header("Prefer", CREATE_PREFERENCE);
        let builder = match record {
            Record::Customer(customer) => builder.json(&[CustomerInsert::from(customer)]),
        };

        let response = ensure_success(builder.send().await?).await?;
        let rows: Vec<CustomerRow> = decode(response).await?;
        match rows.into_iter().next() {
            Some(row) => row.into_customer().map(Record::Customer),
            None => {
                tracing::debug!(
                    target: "sync::remote",
                    record_id = %record.id(),
                    "create replayed against an existing row"
                );
                Ok(record.clone())
            }
        }
    }

    async fn update(&self, id: &RecordId, patch: &RecordPatch) -> Result<Record, RemoteError> {
        let collection = patch.collection();
        let builder = self
            .by_id(Method::PATCH, collection, id)
            .header("Prefer", REPRESENTATION);
        let builder = match patch {
            RecordPatch::Customer(patch) => builder.json(&CustomerUpdate::from(patch)),
        };

        let response = ensure_success(builder.send().await?).await?;
        let rows: Vec<CustomerRow> = decode(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::MissingRow(format!("{collection}/{id}")))?
            .into_customer()
            .map(Record::Customer)
    }

    async fn remove(&self, collection: Collection, id: &RecordId) -> Result<(), RemoteError> {
        let response = self.by_id(Method::DELETE, collection, id).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| RemoteError::Decode(err.to_string()))
}
