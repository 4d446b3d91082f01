//! Request stage: one named retrieval against the remote API
//!
//! Renders the endpoint, query and body, authenticates, walks pagination,
//! retries transient failures with exponential backoff and writes the
//! combined result under the request's name.

use super::context::StageContext;
use crate::adapters::api::{ApiRequest, ApiTransport};
use crate::auth::TokenProvider;
use crate::config::RetryConfig;
use crate::core::extensions::metrics::safe_number_opt;
use crate::domain::{DataBag, Pagination, RequestDef, RequestError, Result};
use crate::log_retry_attempt;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Shared collaborators of every request stage in a process
#[derive(Clone)]
pub struct RequestStage {
    transport: Arc<dyn ApiTransport>,
    tokens: Arc<dyn TokenProvider>,
    api_base_url: String,
    retry: RetryConfig,
}

impl RequestStage {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        tokens: Arc<dyn TokenProvider>,
        api_base_url: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            transport,
            tokens,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Runs the request and stores its result in `bag[def.name]`
    pub async fn execute(&self, def: &RequestDef, bag: &mut DataBag, ctx: &StageContext) -> Result<()> {
        let variables = ctx.variables(bag);

        let endpoint = ctx
            .render(&def.endpoint, &variables)
            .map_err(|e| RequestError::InvalidDefinition(format!("endpoint: {e}")))?;
        let url = self.resolve_url(&endpoint);

        let mut query = Vec::with_capacity(def.query.len());
        for (key, value) in &def.query {
            let value = ctx
                .render(value, &variables)
                .map_err(|e| RequestError::InvalidDefinition(format!("query {key}: {e}")))?;
            query.push((key.clone(), value));
        }

        let body = match &def.body {
            Some(body) => Some(
                ctx.render_value(body, &variables)
                    .map_err(|e| RequestError::InvalidDefinition(format!("body: {e}")))?,
            ),
            None => None,
        };

        let base = ApiRequest::new(def.method, url)
            .with_query(query)
            .with_body(body);

        let result = match &def.pagination {
            Pagination::None => self.send(def, base).await?,
            Pagination::PageNumber {
                page_size,
                items_field,
                max_pages,
            } => {
                self.page_by_query(def, base, *page_size, items_field, *max_pages)
                    .await?
            }
            Pagination::BodyPaging {
                page_size,
                items_field,
                max_pages,
            } => {
                self.page_by_body(def, base, *page_size, items_field, *max_pages)
                    .await?
            }
        };

        if bag.insert(def.name.clone(), result).is_some() {
            tracing::debug!(stage = %def.name, "Request result replaced an existing value");
        }
        Ok(())
    }

    fn resolve_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.api_base_url, endpoint)
        } else {
            format!("{}/{}", self.api_base_url, endpoint)
        }
    }

    /// `pageNumber`/`pageSize` query parameters until `pageCount` or an empty page
    async fn page_by_query(
        &self,
        def: &RequestDef,
        base: ApiRequest,
        page_size: u32,
        items_field: &str,
        max_pages: u32,
    ) -> std::result::Result<Value, RequestError> {
        let mut pages = PageAccumulator::new(items_field);

        for page_number in 1..=max_pages.max(1) {
            let mut request = base.clone();
            request.query.retain(|(k, _)| k != "pageNumber" && k != "pageSize");
            request.query.push(("pageNumber".to_string(), page_number.to_string()));
            request.query.push(("pageSize".to_string(), page_size.to_string()));

            let page = self.send(def, request).await?;
            let fetched = pages.push(page);

            let page_count = pages.last_number("pageCount");
            if fetched == 0 || (page_count > 0.0 && f64::from(page_number) >= page_count) {
                break;
            }
        }

        Ok(pages.finish())
    }

    /// `paging: {pageSize, pageNumber}` in the body until a short page or `totalHits`
    async fn page_by_body(
        &self,
        def: &RequestDef,
        base: ApiRequest,
        page_size: u32,
        items_field: &str,
        max_pages: u32,
    ) -> std::result::Result<Value, RequestError> {
        let mut pages = PageAccumulator::new(items_field);

        for page_number in 1..=max_pages.max(1) {
            let mut request = base.clone();
            let mut body = match request.body.take() {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            body.insert(
                "paging".to_string(),
                json!({ "pageSize": page_size, "pageNumber": page_number }),
            );
            request.body = Some(Value::Object(body));

            let page = self.send(def, request).await?;
            let fetched = pages.push(page);

            let total_hits = pages.last_number("totalHits");
            if fetched < page_size as usize
                || (total_hits > 0.0 && pages.item_count() as f64 >= total_hits)
            {
                break;
            }
        }

        Ok(pages.finish())
    }

    /// One call with credential check and the retry policy
    async fn send(
        &self,
        def: &RequestDef,
        mut request: ApiRequest,
    ) -> std::result::Result<Value, RequestError> {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0usize;

        loop {
            let credential = self
                .tokens
                .credential()
                .await
                .map_err(|e| RequestError::AuthenticationFailed(e.to_string()))?;
            if let Some(scope) = &def.required_scope {
                if !credential.has_scope(scope) {
                    return Err(RequestError::MissingScope(scope.clone()));
                }
            }
            request.authorization = Some(credential.authorization_header());

            match self.transport.send(&request).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt, &e);
                    log_retry_attempt!(attempt, max_retries, delay.as_millis() as u64, e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        stage = %def.name,
                        url = %request.url,
                        attempts = attempt + 1,
                        error = %e,
                        "Request failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    fn delay_for(&self, attempt: usize, error: &RequestError) -> Duration {
        let backoff = self.retry.delay_for(attempt);
        match error {
            RequestError::RateLimited {
                retry_after: Some(after),
            } => (*after).max(backoff).min(Duration::from_millis(self.retry.max_delay_ms)),
            _ => backoff,
        }
    }
}

/// Concatenates the items of successive pages
struct PageAccumulator {
    items_field: String,
    first: Option<Value>,
    last: Value,
    items: Vec<Value>,
    pages: usize,
}

impl PageAccumulator {
    fn new(items_field: &str) -> Self {
        Self {
            items_field: items_field.to_string(),
            first: None,
            last: Value::Null,
            items: Vec::new(),
            pages: 0,
        }
    }

    /// Adds a page and returns how many items it carried
    fn push(&mut self, page: Value) -> usize {
        let page_items = page
            .get(&self.items_field)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let fetched = page_items.len();

        self.items.extend(page_items);
        self.pages += 1;
        if self.first.is_none() {
            self.first = Some(page.clone());
        }
        self.last = page;
        fetched
    }

    fn last_number(&self, field: &str) -> f64 {
        safe_number_opt(self.last.get(field), 0.0)
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }

    /// First page with its items replaced by all items and `pageCount` = pages fetched
    fn finish(self) -> Value {
        let mut result = match self.first {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        result.insert(self.items_field, Value::Array(self.items));
        result.insert("pageCount".to_string(), json!(self.pages));
        Value::Object(result)
    }
}
