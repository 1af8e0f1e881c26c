use crate::classify::{classify_status, extract_detail, Operation};
use async_trait::async_trait;
use fncore::{
    ConsoleError, ExecutionResult, FunctionDraft, FunctionId, FunctionPatch, FunctionRecord,
    MetricSample, Result,
};
use fnruntime::FunctionBackend;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Connection settings for the backend
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Function backend reached over HTTP/JSON
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConsoleError::Connectivity(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/functions/", self.base_url)
    }

    fn function_url(&self, id: FunctionId) -> String {
        format!("{}/functions/{}", self.base_url, id)
    }

    /// Send a request; non-success statuses come back classified.
    async fn send(
        &self,
        operation: Operation,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("{} failed before a response: {}", operation, e);
            connectivity(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.map_err(connectivity)?;
        let detail = extract_detail(&body);
        tracing::debug!("{} returned HTTP {}: {}", operation, status.as_u16(), detail);

        Err(classify_status(operation, status.as_u16(), detail))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = self.send(operation, request).await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(connectivity)?;

        serde_json::from_str(&body).map_err(|e| ConsoleError::Backend {
            status,
            detail: format!("Malformed response to {}: {}", operation, e),
        })
    }
}

fn connectivity(e: reqwest::Error) -> ConsoleError {
    if e.is_timeout() {
        ConsoleError::Connectivity(format!("Request timed out: {}", e))
    } else {
        ConsoleError::Connectivity(e.to_string())
    }
}

#[async_trait]
impl FunctionBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn list_functions(&self) -> Result<Vec<FunctionRecord>> {
        let request = self.client.get(self.collection_url());
        self.send_json(Operation::List, request).await
    }

    async fn get_function(&self, id: FunctionId) -> Result<FunctionRecord> {
        let request = self.client.get(self.function_url(id));
        self.send_json(Operation::Get, request).await
    }

    async fn create_function(&self, draft: &FunctionDraft) -> Result<FunctionRecord> {
        let request = self.client.post(self.collection_url()).json(draft);
        self.send_json(Operation::Create, request).await
    }

    async fn update_function(&self, id: FunctionId, patch: &FunctionPatch) -> Result<FunctionRecord> {
        let request = self.client.put(self.function_url(id)).json(patch);
        self.send_json(Operation::Update, request).await
    }

    async fn delete_function(&self, id: FunctionId) -> Result<()> {
        let request = self.client.delete(self.function_url(id));
        self.send(Operation::Delete, request).await?;
        Ok(())
    }

    async fn execute_function(
        &self,
        id: FunctionId,
        input: &serde_json::Value,
    ) -> Result<ExecutionResult> {
        let url = format!("{}/execute", self.function_url(id));
        let request = self.client.post(url).json(input);
        self.send_json(Operation::Execute, request).await
    }

    async fn function_metrics(&self, id: FunctionId) -> Result<Vec<MetricSample>> {
        let url = format!("{}/metrics", self.function_url(id));
        let request = self.client.get(url);
        self.send_json(Operation::Metrics, request).await
    }
}
