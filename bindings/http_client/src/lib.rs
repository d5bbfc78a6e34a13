use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use stampede_core::prelude::{HttpClient, HttpMethod, HttpRequest, HttpResponse, TransportError};

/// An [HttpClient] backed by a shared [reqwest::Client].
///
/// The underlying connection pool is shared by every virtual user in the run.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client. When a timeout is given, any request that has not completed within that
    /// time fails with a [TransportError].
    pub fn new(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

impl HttpClient for ReqwestHttpClient {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        async move {
            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::new(e.to_string()))?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| match value.to_str() {
                    Ok(value) => Some((name.as_str().to_string(), value.to_string())),
                    Err(_) => {
                        log::trace!("Dropping non-text value for header {name}");
                        None
                    }
                })
                .collect();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::new(e.to_string()))?;

            Ok(HttpResponse {
                status,
                headers,
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_report_transport_error_for_refused_connection() {
        let client = ReqwestHttpClient::new(Some(Duration::from_secs(2))).unwrap();

        let result = client
            .send(HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:1/summary"))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_should_report_transport_error_for_invalid_url() {
        let client = ReqwestHttpClient::new(None).unwrap();

        let result = client
            .send(HttpRequest::new(HttpMethod::Post, "not a url"))
            .await;

        assert!(result.is_err());
    }
}
