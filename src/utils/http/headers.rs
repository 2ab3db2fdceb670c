//! HTTP header utilities for the remote store and completion providers

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};

/// Default user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "ASTRA/1.0";

/// Common HTTP headers used across backends
pub struct CommonHeaders;

impl CommonHeaders {
    /// Content-Type: application/json
    pub fn json_content_type() -> (HeaderName, HeaderValue) {
        (CONTENT_TYPE, HeaderValue::from_static("application/json"))
    }

    /// User-Agent header with application name
    pub fn user_agent(app_name: &str) -> (HeaderName, HeaderValue) {
        let value = HeaderValue::from_str(app_name)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
        (USER_AGENT, value)
    }

    /// Authorization header with Bearer token
    pub fn bearer_auth(token: &str) -> Result<(HeaderName, HeaderValue), InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        value.set_sensitive(true);
        Ok((AUTHORIZATION, value))
    }
}

/// Builder for HTTP headers with backend-specific customizations
pub struct HeaderBuilder {
    headers: HeaderMap,
}

impl HeaderBuilder {
    /// Create a new header builder
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
        }
    }

    /// Add content type JSON
    pub fn json_content_type(mut self) -> Self {
        let (name, value) = CommonHeaders::json_content_type();
        self.headers.insert(name, value);
        self
    }

    /// Add user agent header
    pub fn user_agent(mut self, app_name: &str) -> Self {
        let (name, value) = CommonHeaders::user_agent(app_name);
        self.headers.insert(name, value);
        self
    }

    /// Add Bearer authorization
    pub fn bearer_auth(mut self, token: &str) -> Result<Self, InvalidHeaderValue> {
        let (name, value) = CommonHeaders::bearer_auth(token)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Ask a PostgREST backend to echo written rows back
    pub fn prefer_representation(mut self) -> Self {
        self.headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("return=representation"),
        );
        self
    }

    /// Add a custom header with a fixed name
    pub fn header(mut self, name: &'static str, value: &str) -> Result<Self, InvalidHeaderValue> {
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(HeaderName::from_static(name), value);
        Ok(self)
    }

    /// Build the header map
    pub fn build(self) -> HeaderMap {
        self.headers
    }
}

impl Default for HeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend-specific header builders
pub trait ProviderHeaders {
    /// Create headers for this backend
    fn create_headers(&self, api_key: &str) -> Result<HeaderMap, InvalidHeaderValue>;
}

/// Headers for OpenAI-compatible chat completion endpoints
pub struct CompletionHeaders {
    /// Extra attribution headers (OpenRouter asks for these)
    pub referer: Option<String>,
    pub title: Option<String>,
}

impl CompletionHeaders {
    pub fn new() -> Self {
        Self {
            referer: None,
            title: None,
        }
    }

    pub fn with_attribution(referer: &str, title: &str) -> Self {
        Self {
            referer: Some(referer.to_string()),
            title: Some(title.to_string()),
        }
    }
}

impl Default for CompletionHeaders {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderHeaders for CompletionHeaders {
    fn create_headers(&self, api_key: &str) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut builder = HeaderBuilder::new()
            .json_content_type()
            .user_agent(DEFAULT_USER_AGENT)
            .bearer_auth(api_key)?;

        if let Some(referer) = &self.referer {
            builder = builder.header("http-referer", referer)?;
        }
        if let Some(title) = &self.title {
            builder = builder.header("x-title", title)?;
        }

        Ok(builder.build())
    }
}

/// Headers for a PostgREST-style store: the key goes in both `apikey` and `Authorization`
pub struct StoreHeaders;

impl ProviderHeaders for StoreHeaders {
    fn create_headers(&self, api_key: &str) -> Result<HeaderMap, InvalidHeaderValue> {
        Ok(HeaderBuilder::new()
            .json_content_type()
            .user_agent(DEFAULT_USER_AGENT)
            .header("apikey", api_key)?
            .bearer_auth(api_key)?
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_headers() {
        let (name, value) = CommonHeaders::json_content_type();
        assert_eq!(name, CONTENT_TYPE);
        assert_eq!(value, "application/json");

        let (name, value) = CommonHeaders::user_agent("TestApp/1.0");
        assert_eq!(name, USER_AGENT);
        assert_eq!(value, "TestApp/1.0");

        let (name, value) = CommonHeaders::bearer_auth("test-token").unwrap();
        assert_eq!(name, AUTHORIZATION);
        assert_eq!(value, "Bearer test-token");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_header_builder() {
        let headers = HeaderBuilder::new()
            .json_content_type()
            .prefer_representation()
            .header("x-custom", "custom-value")
            .unwrap()
            .build();

        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get("prefer").unwrap(), "return=representation");
        assert_eq!(headers.get("x-custom").unwrap(), "custom-value");
    }

    #[test]
    fn test_completion_headers() {
        let headers = CompletionHeaders::with_attribution("https://example.com", "MyApp")
            .create_headers("test-api-key")
            .unwrap();

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer test-api-key");
        assert_eq!(headers.get("http-referer").unwrap(), "https://example.com");
        assert_eq!(headers.get("x-title").unwrap(), "MyApp");

        let plain = CompletionHeaders::new().create_headers("k").unwrap();
        assert!(plain.get("x-title").is_none());
    }

    #[test]
    fn test_store_headers() {
        let headers = StoreHeaders.create_headers("anon-key").unwrap();
        assert_eq!(headers.get("apikey").unwrap(), "anon-key");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer anon-key");
        assert_eq!(headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_invalid_header_value_is_reported() {
        assert!(StoreHeaders.create_headers("bad\nkey").is_err());
    }
}
