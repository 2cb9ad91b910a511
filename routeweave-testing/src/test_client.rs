// Test client over the in-process router

use routeweave_core::{Error, HttpRequest, HttpResponse, Router};
use serde::Serialize;
use std::sync::Arc;

/// Sends requests straight into a [`Router`], no transport involved.
#[derive(Clone)]
pub struct TestClient {
    router: Arc<Router>,
}

impl TestClient {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn from_router(router: Router) -> Self {
        Self::new(Arc::new(router))
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Vec<u8>) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// POST a JSON body.
    pub async fn post_json<T: Serialize>(&self, path: &str, data: &T) -> TestResponse {
        match TestRequestBuilder::new("POST", path).json(data) {
            Ok(builder) => self.send(builder.build()).await,
            Err(error) => TestResponse::Error(error),
        }
    }

    pub async fn request(&self, method: &str, path: &str, body: Option<Vec<u8>>) -> TestResponse {
        let request = HttpRequest::new(method, path).with_body(body.unwrap_or_default());
        self.send(request).await
    }

    pub async fn send(&self, request: HttpRequest) -> TestResponse {
        match self.router.dispatch(request).await {
            Ok(response) => TestResponse::Success(response),
            Err(error) => TestResponse::Error(error),
        }
    }
}

/// Builder for test requests
pub struct TestRequestBuilder {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    query: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
}

impl TestRequestBuilder {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            query: Vec::new(),
            cookies: Vec::new(),
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and content type.
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        Ok(self)
    }

    /// Add a query parameter. Repeating a key sends it several times.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> HttpRequest {
        let mut target = self.path;
        if !self.query.is_empty() {
            let params: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            target.push('?');
            target.push_str(&params.join("&"));
        }

        let mut request = HttpRequest::new(self.method, target).with_body(self.body);
        for (key, value) in self.headers {
            request = request.with_header(key, value);
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.with_header("Cookie", cookie);
        }
        request
    }

    pub async fn send(self, client: &TestClient) -> TestResponse {
        client.send(self.build()).await
    }
}

/// Response from a test request
#[derive(Debug)]
pub enum TestResponse {
    Success(HttpResponse),
    Error(Error),
}

impl TestResponse {
    /// Assert the response is successful
    pub fn assert_success(&self) -> &HttpResponse {
        match self {
            TestResponse::Success(response) => response,
            TestResponse::Error(error) => {
                panic!("Expected success response, got error: {:?}", error)
            }
        }
    }

    /// Assert the router returned an error instead of a response
    pub fn assert_error(&self) -> &Error {
        match self {
            TestResponse::Error(error) => error,
            TestResponse::Success(response) => {
                panic!("Expected error, got response with status {}", response.status)
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TestResponse::Success(response) => Some(response.status),
            TestResponse::Error(_) => None,
        }
    }

    pub fn body_string(&self) -> Option<String> {
        match self {
            TestResponse::Success(response) => String::from_utf8(response.body.clone()).ok(),
            TestResponse::Error(_) => None,
        }
    }

    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, String> {
        match self {
            TestResponse::Success(response) => serde_json::from_slice(&response.body)
                .map_err(|e| format!("Deserialization error: {}", e)),
            TestResponse::Error(error) => Err(format!("{:?}", error)),
        }
    }

    /// Header lookup, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&String> {
        match self {
            TestResponse::Success(response) => response
                .headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, value)| value),
            TestResponse::Error(_) => None,
        }
    }
}
