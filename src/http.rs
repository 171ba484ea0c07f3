//! HTTP client construction shared by the chat transport.

use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;

use crate::config::ChatConfig;

/// Build a configured HTTP client from chat configuration.
///
/// This applies common configuration like timeouts and proxies.
///
/// # Example
/// ```ignore
/// let client = build_http_client(&config)?;
/// ```
pub fn build_http_client(config: &ChatConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &config.proxy {
        if let Ok(proxy) = reqwest::Proxy::all(proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    builder.build()
}

/// Add extra headers to a request if configured.
///
/// # Example
/// ```ignore
/// let mut req = client.post(url);
/// req = add_extra_headers(req, &config.extra_headers);
/// ```
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}
