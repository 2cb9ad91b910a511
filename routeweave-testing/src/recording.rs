// Route table spy

use routeweave_core::{Chain, Error, RouteMethod, RouteTable};
use std::sync::{Arc, Mutex};

/// One registration call seen by a [`RecordingRouteTable`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub method: RouteMethod,
    pub path: String,
    pub chain: Chain,
}

impl Registration {
    /// Stage names in chain order.
    pub fn stage_names(&self) -> Vec<String> {
        self.chain.names()
    }
}

/// [`RouteTable`] that records registrations instead of routing.
///
/// Clones share the record. Paths listed with [`reject`](Self::reject) fail
/// registration with [`Error::InvalidRoute`], like a router refusing a
/// conflicting pattern.
#[derive(Clone, Default)]
pub struct RecordingRouteTable {
    registrations: Arc<Mutex<Vec<Registration>>>,
    rejected: Arc<Mutex<Vec<String>>>,
}

impl RecordingRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(self, path: &str) -> Self {
        self.rejected.lock().unwrap().push(path.to_string());
        self
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// `(method, path)` pairs in registration order.
    pub fn calls(&self) -> Vec<(RouteMethod, String)> {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .map(|r| (r.method, r.path.clone()))
            .collect()
    }

    pub fn was_registered(&self, method: RouteMethod, path: &str) -> bool {
        self.find(method, path).is_some()
    }

    pub fn find(&self, method: RouteMethod, path: &str) -> Option<Registration> {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.method == method && r.path == path)
            .cloned()
    }

    pub fn clear(&self) {
        self.registrations.lock().unwrap().clear();
    }

    fn record(&mut self, method: RouteMethod, path: &str, chain: Chain) -> Result<(), Error> {
        if self.rejected.lock().unwrap().iter().any(|p| p == path) {
            return Err(Error::InvalidRoute {
                path: path.to_string(),
                reason: "rejected by test table".to_string(),
            });
        }
        self.registrations.lock().unwrap().push(Registration {
            method,
            path: path.to_string(),
            chain,
        });
        Ok(())
    }
}

impl RouteTable for RecordingRouteTable {
    fn get(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.record(RouteMethod::Get, path, chain)
    }

    fn post(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.record(RouteMethod::Post, path, chain)
    }

    fn put(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.record(RouteMethod::Put, path, chain)
    }

    fn delete(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.record(RouteMethod::Delete, path, chain)
    }

    fn options(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.record(RouteMethod::Options, path, chain)
    }

    fn trace(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.record(RouteMethod::Trace, path, chain)
    }

    fn all(&mut self, path: &str, chain: Chain) -> Result<(), Error> {
        self.record(RouteMethod::All, path, chain)
    }
}
