//! Google Cloud Storage uploads via the JSON API.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::Url;
use tokio::sync::OnceCell;

use super::send;
use crate::config::ObjectStoreConfig;
use crate::error::{RouterError, RouterResult};
use crate::pipeline::ObjectStore;

const SERVICE: &str = "gcs";

/// OAuth scope for object uploads.
pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";

/// Where upload bearer tokens come from.
#[derive(Clone)]
enum TokenSource {
    /// Fixed token from configuration.
    Static(String),
    /// Tokens minted (and refreshed) from a service-account key, or from
    /// application default credentials when no key is configured.
    Minted {
        credentials_json: Option<String>,
        provider: Arc<OnceCell<Arc<dyn TokenProvider>>>,
    },
}

impl TokenSource {
    fn from_config(config: &ObjectStoreConfig) -> Self {
        if !config.access_token.is_empty() {
            return Self::Static(config.access_token.clone());
        }
        let credentials_json = Some(config.credentials_json.trim())
            .filter(|json| !json.is_empty())
            .map(str::to_string);
        Self::Minted {
            credentials_json,
            provider: Arc::new(OnceCell::new()),
        }
    }

    async fn bearer(&self) -> RouterResult<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Minted {
                credentials_json,
                provider,
            } => {
                let provider = provider
                    .get_or_try_init(|| load_provider(credentials_json.as_deref()))
                    .await?;
                let token = provider.token(&[STORAGE_SCOPE]).await.map_err(auth_error)?;
                Ok(token.as_str().to_string())
            }
        }
    }
}

fn auth_error(e: gcp_auth::Error) -> RouterError {
    RouterError::Auth {
        service: SERVICE,
        reason: e.to_string(),
    }
}

/// Service-account key when given, application default credentials otherwise.
async fn load_provider(credentials_json: Option<&str>) -> RouterResult<Arc<dyn TokenProvider>> {
    match credentials_json {
        Some(json) => {
            let account = CustomServiceAccount::from_json(json).map_err(auth_error)?;
            crate::log_event!("gcs", "credentials", "using service-account key");
            Ok(Arc::new(account))
        }
        None => {
            let provider = gcp_auth::provider().await.map_err(auth_error)?;
            crate::log_event!("gcs", "credentials", "using application default credentials");
            Ok(provider)
        }
    }
}

#[derive(Clone)]
pub struct GcsObjectStore {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    tokens: TokenSource,
}

impl GcsObjectStore {
    pub fn new(http: reqwest::Client, config: &ObjectStoreConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            tokens: TokenSource::from_config(config),
        }
    }

    /// Build `<base>/<segments...>` with each segment percent-encoded.
    fn url_with_segments<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> RouterResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| RouterError::Config(format!("invalid object_store.base_url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| RouterError::Config("object_store.base_url cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Public URL of an object.
    pub fn object_url(&self, path: &str) -> RouterResult<String> {
        let segments = std::iter::once(self.bucket.as_str()).chain(path.split('/'));
        Ok(self.url_with_segments(segments)?.to_string())
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> RouterResult<String> {
        if self.bucket.is_empty() {
            return Err(RouterError::Config(
                "object store bucket is not configured".to_string(),
            ));
        }

        let upload_url =
            self.url_with_segments(["upload", "storage", "v1", "b", self.bucket.as_str(), "o"])?;
        let token = self.tokens.bearer().await?;
        let request = self
            .http
            .post(upload_url)
            .query(&[("uploadType", "media"), ("name", path)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .bearer_auth(token)
            .body(bytes);

        send(SERVICE, request).await?;
        self.object_url(path)
    }
}
