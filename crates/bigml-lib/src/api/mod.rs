//! REST client for the prediction service
//!
//! `BigML` authenticates every call with `username` and `api_key` query
//! parameters and addresses resources as `<base>/<kind>/<hex>`. Finished
//! resources are kept in an in-memory cache and, when a storage directory is
//! configured, on disk.

mod storage;

pub use storage::ResourceStore;

use crate::anomaly::LocalAnomaly;
use crate::cluster::LocalCluster;
use crate::ensemble::LocalEnsemble;
use crate::error::{Error, Result};
use crate::input::InputData;
use crate::model::LocalModel;
use crate::observability::SdkMetrics;
use crate::resource::{Resource, ResourceId, ResourceKind, ResourceList};
use dashmap::DashMap;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Production domain of the service
pub const DEFAULT_DOMAIN: &str = "https://bigml.io";

/// Configuration for the REST client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub username: Option<String>,
    pub api_key: Option<String>,
    /// Use the free development (sandbox) environment
    pub dev_mode: bool,
    /// Service domain including scheme, e.g. "https://bigml.io"
    pub domain: String,
    /// Directory where fetched resources are stored
    pub storage: Option<PathBuf>,
    /// Request timeout
    pub timeout: Duration,
    /// Wait between status polls of an unfinished resource
    pub ready_poll_interval: Duration,
    /// Status polls before giving up on an unfinished resource
    pub ready_max_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            username: None,
            api_key: None,
            dev_mode: false,
            domain: DEFAULT_DOMAIN.to_string(),
            storage: None,
            timeout: Duration::from_secs(30),
            ready_poll_interval: Duration::from_secs(3),
            ready_max_attempts: 20,
        }
    }
}

impl ApiConfig {
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_storage(mut self, storage: impl Into<PathBuf>) -> Self {
        self.storage = Some(storage.into());
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.ready_poll_interval = interval;
        self.ready_max_attempts = max_attempts;
        self
    }

    /// REST root: `{domain}/andromeda/` or `{domain}/dev/andromeda/`
    pub fn base_url(&self) -> Result<Url> {
        let domain = self.domain.trim_end_matches('/');
        let root = if self.dev_mode {
            format!("{}/dev/andromeda/", domain)
        } else {
            format!("{}/andromeda/", domain)
        };
        Ok(Url::parse(&root)?)
    }
}

/// Filters of a resource listing
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Only resources whose name contains this text
    pub name: Option<String>,
    pub offset: u64,
    /// Page size; the service default applies when `None`
    pub limit: Option<u64>,
}

/// Client for the prediction service
pub struct BigML {
    client: Client,
    base_url: Url,
    username: String,
    api_key: String,
    dev_mode: bool,
    config: ApiConfig,
    store: Option<ResourceStore>,
    cache: DashMap<ResourceId, Resource>,
    metrics: SdkMetrics,
}

impl BigML {
    /// Create a client; fails without credentials
    pub async fn new(config: ApiConfig) -> Result<Self> {
        let (username, api_key) = match (&config.username, &config.api_key) {
            (Some(u), Some(k)) if !u.is_empty() && !k.is_empty() => (u.clone(), k.clone()),
            _ => return Err(Error::MissingCredentials),
        };

        let client = Client::builder().timeout(config.timeout).build()?;
        let base_url = config.base_url()?;

        let store = match &config.storage {
            Some(dir) => Some(ResourceStore::open(dir).await?),
            None => None,
        };

        info!(
            base_url = %base_url,
            dev_mode = config.dev_mode,
            storage = ?config.storage,
            "Created prediction service client"
        );

        Ok(Self {
            client,
            base_url,
            username,
            api_key,
            dev_mode: config.dev_mode,
            config,
            store,
            cache: DashMap::new(),
            metrics: SdkMetrics::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub fn store(&self) -> Option<&ResourceStore> {
        self.store.as_ref()
    }

    /// Number of resources held in memory
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.join(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("username", &self.username);
            pairs.append_pair("api_key", &self.api_key);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(path, query)?;
        debug!(method = %method, path = %path, "Sending request");

        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let start = Instant::now();
        let result = Self::execute(request, path).await;
        self.metrics
            .observe_remote_request(method.as_str(), result.is_ok(), start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            debug!(method = %method, path = %path, error = %e, "Request failed");
        }
        result
    }

    async fn execute(request: RequestBuilder, path: &str) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: api_message(&body, status),
            });
        }

        let bytes = response.bytes().await?;
        if status == StatusCode::NO_CONTENT || bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn remember(&self, resource: &Resource) {
        if resource.is_finished() {
            self.cache.insert(resource.id().clone(), resource.clone());
            self.metrics.set_resources_cached(self.cache.len());
        }
    }

    /// Fetch the current document of any resource
    pub async fn get(&self, id: &ResourceId) -> Result<Resource> {
        let document = self.request(Method::GET, &id.to_string(), &[], None).await?;
        let resource = Resource::from_json(document)?;
        self.remember(&resource);
        Ok(resource)
    }

    /// Fetch a model by id string
    pub async fn get_model(&self, id: &str) -> Result<Resource> {
        let id = ResourceId::parse_kind(id, ResourceKind::Model)?;
        self.get(&id).await
    }

    pub async fn list(&self, kind: ResourceKind, query: &ListQuery) -> Result<ResourceList> {
        let mut params = vec![("offset", query.offset.to_string())];
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(name) = &query.name {
            params.push(("name__contains", name.clone()));
        }

        let document = self.request(Method::GET, kind.as_str(), &params, None).await?;
        Ok(serde_json::from_value(document)?)
    }

    /// Rename a resource
    pub async fn update_name(&self, id: &ResourceId, name: &str) -> Result<Resource> {
        let body = json!({ "name": name });
        let document = self
            .request(Method::PUT, &id.to_string(), &[], Some(&body))
            .await?;
        let resource = Resource::from_json(document)?;
        self.remember(&resource);
        info!(resource = %id, name = %name, "Renamed resource");
        Ok(resource)
    }

    /// Delete a resource and forget any cached copy
    pub async fn delete(&self, id: &ResourceId) -> Result<()> {
        self.request(Method::DELETE, &id.to_string(), &[], None).await?;
        self.cache.remove(id);
        self.metrics.set_resources_cached(self.cache.len());
        if let Some(store) = &self.store {
            store.remove(id).await?;
        }
        info!(resource = %id, "Deleted resource");
        Ok(())
    }

    async fn create(&self, kind: ResourceKind, body: Value) -> Result<Resource> {
        let document = self.request(Method::POST, kind.as_str(), &[], Some(&body)).await?;
        let resource = Resource::from_json(document)?;
        debug!(resource = %resource.id(), "Created resource");
        Ok(resource)
    }

    /// Remote prediction from a model or ensemble
    pub async fn create_prediction(&self, model: &Resource, input: &InputData) -> Result<Resource> {
        let key = match model.kind() {
            ResourceKind::Model | ResourceKind::Ensemble => model.kind().as_str(),
            _ => {
                return Err(Error::WrongKind {
                    expected: "model or ensemble".to_string(),
                    id: model.id().to_string(),
                })
            }
        };
        let mut body = json!({ "input_data": input });
        body[key] = Value::String(model.id().to_string());
        self.create(ResourceKind::Prediction, body).await
    }

    /// Remote anomaly score from an anomaly detector
    pub async fn create_anomaly_score(
        &self,
        anomaly: &Resource,
        input: &InputData,
    ) -> Result<Resource> {
        expect_kind(anomaly, ResourceKind::Anomaly)?;
        let body = json!({ "anomaly": anomaly.id().to_string(), "input_data": input });
        self.create(ResourceKind::AnomalyScore, body).await
    }

    /// Remote centroid from a cluster
    pub async fn create_centroid(&self, cluster: &Resource, input: &InputData) -> Result<Resource> {
        expect_kind(cluster, ResourceKind::Cluster)?;
        let body = json!({ "cluster": cluster.id().to_string(), "input_data": input });
        self.create(ResourceKind::Centroid, body).await
    }

    /// Whether the resource has finished building
    ///
    /// # Returns
    /// * `Err(Error::Faulty)` if the service reports a failed build
    pub async fn is_ready(&self, id: &ResourceId) -> Result<bool> {
        let resource = self.get(id).await?;
        check_faulty(&resource)?;
        Ok(resource.is_finished())
    }

    /// Poll the resource until it is finished
    pub async fn wait_until_ready(&self, id: &ResourceId) -> Result<Resource> {
        let mut code = crate::resource::status_code::UNKNOWN;
        for attempt in 1..=self.config.ready_max_attempts {
            let resource = self.get(id).await?;
            check_faulty(&resource)?;
            if resource.is_finished() {
                return Ok(resource);
            }

            code = resource.status().code;
            debug!(resource = %id, attempt, code, "Resource not ready yet");
            if attempt < self.config.ready_max_attempts {
                tokio::time::sleep(self.config.ready_poll_interval).await;
            }
        }

        Err(Error::NotReady {
            id: id.to_string(),
            code,
        })
    }

    /// Finished resource from memory, disk or the service, in that order
    pub async fn fetch_finished(&self, id: &ResourceId) -> Result<Resource> {
        if let Some(resource) = self.cache.get(id) {
            self.metrics.inc_cache_hit("memory");
            return Ok(resource.clone());
        }

        if let Some(store) = &self.store {
            if let Some(resource) = store.load(id).await? {
                if resource.is_finished() {
                    self.metrics.inc_cache_hit("disk");
                    self.remember(&resource);
                    return Ok(resource);
                }
            }
        }

        let resource = self.wait_until_ready(id).await?;
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&resource).await {
                warn!(resource = %id, error = %e, "Failed to store resource");
            }
        }
        Ok(resource)
    }

    pub async fn local_model(&self, id: &str) -> Result<LocalModel> {
        let id = ResourceId::parse_kind(id, ResourceKind::Model)?;
        LocalModel::from_resource(&self.fetch_finished(&id).await?)
    }

    /// Fetch an ensemble and every component model
    pub async fn local_ensemble(&self, id: &str) -> Result<LocalEnsemble> {
        let id = ResourceId::parse_kind(id, ResourceKind::Ensemble)?;
        let ensemble = self.fetch_finished(&id).await?;

        let mut models = Vec::new();
        for model_id in LocalEnsemble::model_ids(&ensemble)? {
            models.push(self.fetch_finished(&model_id).await?);
        }
        LocalEnsemble::from_resources(&ensemble, &models)
    }

    pub async fn local_anomaly(&self, id: &str) -> Result<LocalAnomaly> {
        let id = ResourceId::parse_kind(id, ResourceKind::Anomaly)?;
        LocalAnomaly::from_resource(&self.fetch_finished(&id).await?)
    }

    pub async fn local_cluster(&self, id: &str) -> Result<LocalCluster> {
        let id = ResourceId::parse_kind(id, ResourceKind::Cluster)?;
        LocalCluster::from_resource(&self.fetch_finished(&id).await?)
    }
}

fn expect_kind(resource: &Resource, kind: ResourceKind) -> Result<()> {
    if resource.kind() == kind {
        Ok(())
    } else {
        Err(Error::WrongKind {
            expected: kind.to_string(),
            id: resource.id().to_string(),
        })
    }
}

fn check_faulty(resource: &Resource) -> Result<()> {
    let status = resource.status();
    if status.is_faulty() {
        return Err(Error::Faulty {
            id: resource.id().to_string(),
            message: status.message,
        });
    }
    Ok(())
}

/// `status.message` of an error document, the raw body otherwise
fn api_message(body: &str, status: StatusCode) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    if let Some(message) = parsed
        .as_ref()
        .and_then(|v| v.pointer("/status/message"))
        .and_then(Value::as_str)
    {
        return message.to_string();
    }

    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        body.to_string()
    }
}
