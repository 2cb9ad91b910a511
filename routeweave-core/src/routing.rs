// Route table: registration entry points and request dispatch

use crate::{Chain, Error, HttpRequest, HttpResponse, RequestContext, RouteMethod};
use routeweave_log::{debug, error};
use std::collections::HashMap;

/// Method-specific registration entry points of a router.
///
/// Implementations own path matching and chain execution; callers only hand
/// over `(path, chain)` pairs.
pub trait RouteTable {
    fn get(&mut self, path: &str, chain: Chain) -> Result<(), Error>;
    fn post(&mut self, path: &str, chain: Chain) -> Result<(), Error>;
    fn put(&mut self, path: &str, chain: Chain) -> Result<(), Error>;
    fn delete(&mut self, path: &str, chain: Chain) -> Result<(), Error>;
    fn options(&mut self, path: &str, chain: Chain) -> Result<(), Error>;
    fn trace(&mut self, path: &str, chain: Chain) -> Result<(), Error>;
    /// Register for every request method.
    fn all(&mut self, path: &str, chain: Chain) -> Result<(), Error>;
}

/// In-process router backed by `matchit`.
///
/// Path patterns use matchit syntax (`/users/{id}`, `/files/{*rest}`).
/// Several chains may share a pattern; the first registered one whose method
/// matches the request wins.
pub struct Router {
    matcher: matchit::Router<usize>,
    patterns: HashMap<String, usize>,
    entries: Vec<Vec<(RouteMethod, Chain)>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            matcher: matchit::Router::new(),
            patterns: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Number of registered `(method, path)` entries.
    pub fn len(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, method: RouteMethod, path: &str, chain: Chain) -> Result<(), Error> {
        let slot = match self.patterns.get(path) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.matcher
                    .insert(path, slot)
                    .map_err(|e| Error::InvalidRoute {
                        path: path.to_string(),
                        reason: e.to_string(),
                    })?;
                self.patterns.insert(path.to_string(), slot);
                self.entries.push(Vec::new());
                slot
            }
        };

        debug!("route table: {} {} ({} stages)", method, path, chain.len());
        self.entries[slot].push((method, chain));
        Ok(())
    }

    /// Match the request and run its chain.
    pub async fn dispatch(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let (slot, params) = {
            let matched = self
                .matcher
                .at(&request.path)
                .map_err(|_| Error::RouteNotFound(format!("{} {}", request.method, request.path)))?;
            let params: HashMap<String, String> = matched
                .params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            (*matched.value, params)
        };

        let chain = self.entries[slot]
            .iter()
            .find(|(method, _)| method.matches(&request.method))
            .map(|(_, chain)| chain.clone())
            .ok_or_else(|| {
                Error::MethodNotAllowed(format!("{} {}", request.method, request.path))
            })?;

        request.path_params = params;
        let head = request.method.eq_ignore_ascii_case("HEAD");

        let mut response = chain.run(RequestContext::new(request)).await?;
        if head {
            response.body.clear();
        }
        Ok(response)
    }

    /// Like [`dispatch`](Self::dispatch) but always yields a response; errors
    /// are rendered as failure payloads.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let target = format!("{} {}", request.method, request.path);
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_server_error() {
                    error!("{} failed: {}", target, err);
                } else {
                    debug!("{} rejected: {}", target, err);
                }
                let output = err.into_failure().output();
                let mut response = HttpResponse::new(output.status_code);
                response.headers = output.headers;
                response
                    .headers
                    .insert("Content-Type".to_string(), "application/json".to_string());
                response.body = output.payload.to_string().into_bytes();
                response
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable for Router {
    fn get(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.insert(RouteMethod::Get, path, chain)
    }

    fn post(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.insert(RouteMethod::Post, path, chain)
    }

    fn put(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.insert(RouteMethod::Put, path, chain)
    }

    fn delete(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.insert(RouteMethod::Delete, path, chain)
    }

    fn options(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.insert(RouteMethod::Options, path, chain)
    }

    fn trace(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.insert(RouteMethod::Trace, path, chain)
    }

    fn all(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.insert(RouteMethod::All, path, chain)
    }
}
