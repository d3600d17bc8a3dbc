use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use super::value::{fields_from_firestore, fields_to_firestore};
use super::{CollectionPath, Document, DocumentPath, DocumentStore, FieldValue, Fields, StoreError};
use crate::credentials::ServiceAccount;

const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1/";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const LIST_PAGE_SIZE: &str = "300";

/// Refresh the access token this long before it actually expires
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Firestore REST v1 client authenticated as a service account
#[derive(Clone)]
pub struct FirestoreStore {
    http: Client,
    project_id: String,
    documents_url: Url,
    account: Arc<ServiceAccount>,
    token: Arc<RwLock<Option<AccessToken>>>,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<RawDocument>,
}

impl RawDocument {
    fn into_document(self) -> Result<Document, StoreError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Decode(format!("document name without id: {}", self.name)))?
            .to_string();
        let fields = match &self.fields {
            Some(raw) => fields_from_firestore(raw)?,
            None => Fields::new(),
        };
        Ok(Document { id, fields })
    }
}

impl FirestoreStore {
    pub fn new(account: ServiceAccount, project_id: &str) -> Result<Self, StoreError> {
        let http = Client::builder().build()?;
        let endpoint = Url::parse(FIRESTORE_API)
            .map_err(|e| StoreError::Credentials(format!("invalid Firestore endpoint: {}", e)))?;
        let documents_url = documents_root(&endpoint, project_id)?;

        info!("Firestore client ready for project {}", project_id);
        Ok(Self {
            http,
            project_id: project_id.to_string(),
            documents_url,
            account: Arc::new(account),
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// Point at a different API root (emulators, tests), e.g. `http://localhost:8080/v1/`
    pub fn with_endpoint(mut self, endpoint: Url) -> Result<Self, StoreError> {
        self.documents_url = documents_root(&endpoint, &self.project_id)?;
        Ok(self)
    }

    fn url_for(&self, segments: &[String]) -> Url {
        let mut url = self.documents_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    /// `…/documents:runQuery` for top-level collections, `…/{parent}:runQuery` otherwise
    fn run_query_url(&self, collection: &CollectionPath) -> Url {
        let mut url = match collection.parent() {
            Some(parent) => self.url_for(parent.segments()),
            None => self.documents_url.clone(),
        };
        let last = url
            .path_segments()
            .and_then(|mut s| s.next_back().map(str::to_string))
            .unwrap_or_default();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop().push(&format!("{}:runQuery", last));
        }
        url
    }

    async fn access_token(&self) -> Result<String, StoreError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut cached = self.token.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.exchange_assertion().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn exchange_assertion(&self) -> Result<AccessToken, StoreError> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + 3600,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.account.private_key_id.clone();
        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())
            .map_err(|e| StoreError::Credentials(format!("invalid service account private key: {}", e)))?;
        let assertion = encode(&header, &claims, &key)
            .map_err(|e| StoreError::Credentials(format!("failed to sign token assertion: {}", e)))?;

        let started = Instant::now();
        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let response = check_status(response).await?;
        let token: TokenResponse = response.json().await?;

        debug!("Obtained Firestore access token, valid for {}s", token.expires_in);
        Ok(AccessToken {
            value: token.access_token,
            expires_at: started + Duration::from_secs(token.expires_in),
        })
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, StoreError> {
        let token = self.access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }
}

/// `{endpoint}projects/{project}/databases/(default)/documents`
fn documents_root(endpoint: &Url, project_id: &str) -> Result<Url, StoreError> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| StoreError::Credentials(format!("Firestore endpoint cannot be a base: {}", endpoint)))?
        .pop_if_empty()
        .extend(["projects", project_id, "databases", "(default)", "documents"]);
    Ok(url)
}

/// Turn non-2xx responses into `StoreError::Status`, keeping Google's error message
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error_description"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(body);
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn insert(&self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        let url = self.url_for(collection.segments());
        let response = self
            .request(Method::POST, url)
            .await?
            .json(&json!({ "fields": fields_to_firestore(&fields) }))
            .send()
            .await?;
        let raw: RawDocument = check_status(response).await?.json().await?;
        Ok(raw.into_document()?.id)
    }

    async fn fetch(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        let url = self.url_for(path.segments());
        let response = self.request(Method::GET, url).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let raw: RawDocument = check_status(response).await?.json().await?;
        raw.into_document().map(Some)
    }

    async fn patch(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError> {
        let url = self.url_for(path.segments());
        let mut query: Vec<(&str, &str)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let response = self
            .request(Method::PATCH, url)
            .await?
            .query(&query)
            .json(&json!({ "fields": fields_to_firestore(&fields) }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(path.to_string()));
        }
        check_status(response).await?;
        Ok(())
    }

    async fn remove(&self, path: &DocumentPath) -> Result<(), StoreError> {
        let url = self.url_for(path.segments());
        let response = self.request(Method::DELETE, url).await?.send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let url = self.url_for(collection.segments());
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", LIST_PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let response = self
                .request(Method::GET, url.clone())
                .await?
                .query(&query)
                .send()
                .await?;
            let page: ListResponse = check_status(response).await?.json().await?;
            for raw in page.documents {
                documents.push(raw.into_document()?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(documents)
    }

    async fn list_where(
        &self,
        collection: &CollectionPath,
        field: &str,
        value: FieldValue,
    ) -> Result<Vec<Document>, StoreError> {
        let url = self.run_query_url(collection);
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection.collection_id() }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": value.to_firestore()
                    }
                }
            }
        });

        let response = self.request(Method::POST, url).await?.json(&body).send().await?;
        let items: Vec<RunQueryItem> = check_status(response).await?.json().await?;
        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(RawDocument::into_document)
            .collect()
    }
}
