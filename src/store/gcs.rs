//! Google Cloud Storage through its JSON API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};

use super::auth::ServiceAccount;
use super::{ObjectStore, StoreError, StoreResult};
use crate::config::GcsConfig;

pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
const CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

#[derive(Debug)]
enum Authorizer {
    ServiceAccount(ServiceAccount),
    /// Emulators accept unauthenticated requests.
    Anonymous,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectResource>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ObjectResource {
    name: String,
}

#[derive(Debug)]
pub struct GcsStore {
    http: Client,
    endpoint: Url,
    bucket: String,
    auth: Authorizer,
}

impl GcsStore {
    pub fn new(config: &GcsConfig) -> StoreResult<Self> {
        let endpoint_str = match config.endpoint.as_deref() {
            // STORAGE_EMULATOR_HOST is usually a bare host:port.
            Some(host) if !host.contains("://") => format!("http://{host}"),
            Some(url) => url.to_string(),
            None => DEFAULT_ENDPOINT.to_string(),
        };
        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| StoreError::Config(format!("endpoint {endpoint_str:?}: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "endpoint {endpoint_str:?} cannot carry a path"
            )));
        }

        let auth = match (&config.client_email, config.private_key_pem()) {
            (Some(email), Some(key)) => Authorizer::ServiceAccount(ServiceAccount::new(email, &key)?),
            _ if config.endpoint.is_some() => Authorizer::Anonymous,
            _ => {
                return Err(StoreError::Config(
                    "GCP_CLIENT_EMAIL and GCP_PRIVATE_KEY are required".to_string(),
                ))
            }
        };

        info!(
            bucket = %config.bucket,
            project_id = config.project_id.as_deref().unwrap_or("-"),
            endpoint = %endpoint,
            anonymous = matches!(auth, Authorizer::Anonymous),
            "Cloud Storage client initialized"
        );

        Ok(Self {
            http: Client::new(),
            endpoint,
            bucket: config.bucket.clone(),
            auth,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        // cannot_be_a_base was ruled out in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn objects_url(&self) -> Url {
        self.url(&["storage", "v1", "b", self.bucket.as_str(), "o"])
    }

    fn object_url(&self, name: &str) -> Url {
        let mut url = self.url(&["storage", "v1", "b", self.bucket.as_str(), "o", name]);
        url.query_pairs_mut().append_pair("alt", "media");
        url
    }

    fn upload_url(&self, name: &str) -> Url {
        let mut url = self.url(&["upload", "storage", "v1", "b", self.bucket.as_str(), "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", name);
        url
    }

    async fn authorize(&self, request: RequestBuilder) -> StoreResult<RequestBuilder> {
        match &self.auth {
            Authorizer::ServiceAccount(account) => {
                let token = account.token(&self.http).await?;
                Ok(request.bearer_auth(token))
            }
            Authorizer::Anonymous => Ok(request),
        }
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> StoreResult<Response> {
        let response = self.authorize(request).await?.send().await?;
        check_status(response, path).await
    }
}

async fn check_status(response: Response, path: &str) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound(path.to_string()));
    }

    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        path: path.to_string(),
        message,
    })
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn list(&self, prefix: &str, delimiter: &str) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.objects_url();
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                if !delimiter.is_empty() {
                    query.append_pair("delimiter", delimiter);
                }
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            // A 404 here means the bucket itself is missing.
            let response = self
                .send(self.http.get(url), prefix)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound(path) => StoreError::Status {
                        status: StatusCode::NOT_FOUND.as_u16(),
                        path,
                        message: format!("bucket {} not found", self.bucket),
                    },
                    other => other,
                })?;
            let page: ListResponse = response.json().await?;
            names.extend(page.items.into_iter().map(|item| item.name));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(bucket = %self.bucket, prefix, count = names.len(), "Listed objects");
        Ok(names)
    }

    async fn download(&self, path: &str) -> StoreResult<Vec<u8>> {
        debug!(bucket = %self.bucket, path, "Downloading object");
        let response = self.send(self.http.get(self.object_url(path)), path).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(&self, path: &str, data: Vec<u8>) -> StoreResult<()> {
        debug!(bucket = %self.bucket, path, size = data.len(), "Uploading object");
        let request = self
            .http
            .post(self.upload_url(path))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(data);
        self.send(request, path).await?;
        Ok(())
    }
}
