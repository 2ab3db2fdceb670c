//! PostgREST-compatible implementation of [`RemoteStore`]

use super::{require_owner_column, require_owner_filter, Filter, Order, RemoteStore, Row, StoreError, Table};
use crate::utils::http::{
    execute_with_retry, extract_retry_after, HeaderBuilder, HttpClient, HttpClientConfig,
    ProviderHeaders, RetryConfig, StoreHeaders,
};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use url::Url;

/// Client for a hosted relational backend exposing tables under `/rest/v1/`
pub struct RestStore {
    http: HttpClient,
    base_url: Url,
    headers: HeaderMap,
    insert_headers: HeaderMap,
}

impl RestStore {
    /// Create a store client for `base_url` authenticated with `api_key`
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        Self::with_config(base_url, api_key, HttpClientConfig::for_store())
    }

    pub fn with_config(
        base_url: &str,
        api_key: &str,
        client_config: HttpClientConfig,
    ) -> Result<Self, StoreError> {
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)?;

        let headers = StoreHeaders.create_headers(api_key)?;
        let mut insert_headers = HeaderBuilder::new().prefer_representation().build();
        insert_headers.extend(headers.clone());

        Ok(Self {
            http: HttpClient::new(client_config)?,
            base_url,
            headers,
            insert_headers,
        })
    }

    fn table_url(&self, table: Table) -> Result<Url, StoreError> {
        Ok(self.base_url.join(&format!("rest/v1/{}", table.name()))?)
    }

    /// `GET /rest/v1/<table>?select=*&<col>=<op>.<value>&order=<col>.<dir>`
    pub(crate) fn select_url(
        &self,
        table: Table,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Url, StoreError> {
        let mut url = self.table_url(table)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            for filter in filters {
                query.append_pair(
                    &filter.column,
                    &format!("{}.{}", filter.op.keyword(), filter.value_text()),
                );
            }
            if let Some(order) = order {
                let direction = if order.ascending { "asc" } else { "desc" };
                query.append_pair("order", &format!("{}.{}", order.column, direction));
            }
        }
        Ok(url)
    }

    /// Row-targeted URL: `id=eq.<id>` plus the scoping filters
    pub(crate) fn row_url(&self, table: Table, id: &str, filters: &[Filter]) -> Result<Url, StoreError> {
        let mut url = self.table_url(table)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("id", &format!("eq.{}", id));
            for filter in filters {
                query.append_pair(
                    &filter.column,
                    &format!("{}.{}", filter.op.keyword(), filter.value_text()),
                );
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: &HeaderMap,
        body: Option<Value>,
        retry: &RetryConfig,
    ) -> Result<Value, StoreError> {
        let client = self.http.client();
        let method = &method;
        let url = &url;
        let body = body.as_ref();

        execute_with_retry(
            move || async move {
                let mut request = client
                    .request(method.clone(), url.clone())
                    .headers(headers.clone());
                if let Some(body) = body {
                    request = request.json(body);
                }
                let response = request.send().await?;
                read_response(response).await
            },
            retry,
        )
        .await
    }
}

async fn read_response(response: Response) -> Result<Value, StoreError> {
    let status = response.status();
    let retry_header = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let body = response.text().await?;

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(StoreError::RateLimit {
            retry_after: retry_header.or_else(|| extract_retry_after(&body)),
        });
    }
    if !status.is_success() {
        return Err(StoreError::RequestFailed {
            status: status.as_u16(),
            message: body,
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl RemoteStore for RestStore {
    fn backend_name(&self) -> &str {
        "rest"
    }

    async fn select(
        &self,
        table: Table,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Row>, StoreError> {
        require_owner_filter(table, filters)?;
        let url = self.select_url(table, filters, order)?;
        tracing::debug!("store select {}", table);

        let value = self
            .send(Method::GET, url, &self.headers, None, &self.http.retry_config())
            .await?;
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    _ => Err(StoreError::invalid_response("expected an array of rows")),
                })
                .collect(),
            Value::Null => Ok(Vec::new()),
            _ => Err(StoreError::invalid_response("expected an array of rows")),
        }
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
        require_owner_column(table, &row)?;
        let url = self.table_url(table)?;
        tracing::debug!("store insert {}", table);

        // inserts are not idempotent; never retried
        let value = self
            .send(
                Method::POST,
                url,
                &self.insert_headers,
                Some(Value::Object(row)),
                &RetryConfig::none(),
            )
            .await?;
        let stored = match value {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        };
        match stored {
            Value::Object(row) => Ok(row),
            _ => Err(StoreError::invalid_response("insert did not echo the stored row")),
        }
    }

    async fn update(
        &self,
        table: Table,
        id: &str,
        patch: Row,
        filters: &[Filter],
    ) -> Result<(), StoreError> {
        require_owner_filter(table, filters)?;
        let url = self.row_url(table, id, filters)?;
        tracing::debug!("store update {} {}", table, id);

        self.send(
            Method::PATCH,
            url,
            &self.headers,
            Some(Value::Object(patch)),
            &self.http.retry_config(),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str, filters: &[Filter]) -> Result<(), StoreError> {
        require_owner_filter(table, filters)?;
        let url = self.row_url(table, id, filters)?;
        tracing::debug!("store delete {} {}", table, id);

        self.send(Method::DELETE, url, &self.headers, None, &self.http.retry_config())
            .await?;
        Ok(())
    }
}
