use crate::domain::error::IqmsError;
use crate::domain::model::{BatchRequest, Page, PageRequest, QueryItem};
use crate::domain::traits::QuerySource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

// Batch listing response
#[derive(Deserialize, Debug)]
struct BatchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CountResponse {
    #[serde(default)]
    count: Option<u64>,
}

/// REST client for the IQMS endpoints
pub struct HttpQuerySource {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpQuerySource {
    pub fn new(client: Client, base_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a JSON document. Non-2xx is an error, an unparseable body is `None`.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Option<Value>, IqmsError> {
        let mut request = self.client.get(url).query(query);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let body = request.send().await?.error_for_status()?.text().await?;
        Ok(parse_lenient(url, &body))
    }
}

fn parse_lenient(url: &str, body: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("malformed payload from {}: {}", url, e);
            None
        }
    }
}

#[async_trait]
impl QuerySource for HttpQuerySource {
    async fn fetch_page(&self, request: &PageRequest, offset: usize) -> Result<Page, IqmsError> {
        let url = self.url(&format!("{}/{}", request.resource, request.key));
        debug!("GET {} offset={}", url, offset);

        let page = self
            .get_json(&url, &[("offset", offset.to_string())])
            .await?
            .map(|value| Page::from_value(&value))
            .unwrap_or_default();
        Ok(page)
    }

    async fn fetch_batch(&self, request: &BatchRequest) -> Result<Vec<QueryItem>, IqmsError> {
        let url = format!("{}?{}", self.base_url, request.query_name);
        debug!("POST {} {}={}", url, request.routing_field, request.routing_code);

        let mut body = json!({
            "queryType": request.query_type,
            "MODULE_CAT": request.module_cat,
            "CELL": request.cell,
            "api_token": self.api_token.clone().unwrap_or_default(),
        });
        body[request.routing_field.as_str()] = Value::String(request.routing_code.clone());

        let text = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let Some(value) = parse_lenient(&url, &text) else {
            return Ok(Vec::new());
        };
        let response: BatchResponse = match serde_json::from_value(value) {
            Ok(response) => response,
            Err(e) => {
                warn!("unexpected batch payload from {}: {}", url, e);
                return Ok(Vec::new());
            }
        };

        if !response.success {
            return Err(IqmsError::Api(format!(
                "{} failed: {}",
                request.query_name,
                response.message.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        Ok(response.data.unwrap_or_default())
    }

    async fn fetch_faq(&self) -> Result<Vec<QueryItem>, IqmsError> {
        let url = self.url("faq");
        let items = match self.get_json(&url, &[]).await? {
            Some(Value::Array(items)) => items,
            Some(value) => value
                .get("data")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(items)
    }

    async fn fetch_frequency_count(&self, key: &str) -> Result<u64, IqmsError> {
        let url = self.url(&format!("frequency-count/{}", key));
        let count = self
            .get_json(&url, &[])
            .await?
            .and_then(|value| serde_json::from_value::<CountResponse>(value).ok())
            .and_then(|response| response.count)
            .unwrap_or(0);
        Ok(count)
    }
}
