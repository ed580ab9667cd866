//! Redmine API key authentication

use reqwest::RequestBuilder;
use std::fmt;

/// Header carrying the API key on every request
pub const API_KEY_HEADER: &str = "X-Redmine-API-Key";

#[derive(Clone)]
pub struct ApiKeyAuth {
    key: String,
}

impl ApiKeyAuth {
    pub fn new(key: String) -> Self {
        Self { key }
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.key)
    }
}

impl fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuth").field("key", &"***").finish()
    }
}
