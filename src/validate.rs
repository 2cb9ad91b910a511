// Request validation stage

use crate::capability::RespondWithFailure;
use crate::{RegistrationError, RouteValue};
use async_trait::async_trait;
use routeweave_core::{Error, Facet, Failure, HttpResponse, Middleware, Next, RequestContext};
use routeweave_log::{debug, warn};
use routeweave_validation::{Schema, ValidationOptions};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Checks request facets against their schemas before the rest of the chain
/// runs.
///
/// Facets are checked in [`Facet::ALL`] order: headers, body, query, params,
/// cookies. The first mismatch ends the request with a 400 failure through
/// the request's [`FailureResponder`](crate::FailureResponder).
pub struct ValidationStage {
    schemas: Vec<(Facet, Schema)>,
    options: Arc<ValidationOptions>,
}

impl ValidationStage {
    /// Build the stage from a route's `validate` map.
    ///
    /// Values may be schemas or literals (see [`Schema::from_literal`]). Keys
    /// that name no facet are ignored with a warning; a map naming no facet at
    /// all is a [`RegistrationError::MissingSchema`].
    pub fn build(
        schemas: &BTreeMap<String, RouteValue>,
        options: Arc<ValidationOptions>,
    ) -> Result<Self, RegistrationError> {
        let descriptor = || RouteValue::Object(schemas.clone()).serialize();

        let mut facets = Vec::new();
        for (key, value) in schemas {
            let Some(facet) = Facet::from_name(key) else {
                warn!("ignoring unknown validation facet '{}'", key);
                continue;
            };
            let schema = match value {
                RouteValue::Schema(schema) => schema.clone(),
                RouteValue::Stage(_) => {
                    return Err(RegistrationError::InvalidSchema {
                        facet: key.clone(),
                        reason: "a stage is not a schema".to_string(),
                        descriptor: descriptor(),
                    });
                }
                literal => Schema::from_literal(&literal.to_json()).map_err(|e| {
                    RegistrationError::InvalidSchema {
                        facet: key.clone(),
                        reason: e.to_string(),
                        descriptor: descriptor(),
                    }
                })?,
            };
            if facets.iter().any(|(seen, _)| *seen == facet) {
                warn!("validation facet '{}' given twice, keeping '{}'", facet, key);
                facets.retain(|(seen, _)| *seen != facet);
            }
            facets.push((facet, schema));
        }

        if facets.is_empty() {
            return Err(RegistrationError::MissingSchema {
                descriptor: descriptor(),
            });
        }

        facets.sort_by_key(|(facet, _)| *facet);
        Ok(Self {
            schemas: facets,
            options,
        })
    }

    /// Facets checked, in order.
    pub fn facets(&self) -> Vec<Facet> {
        self.schemas.iter().map(|(facet, _)| *facet).collect()
    }
}

#[async_trait]
impl Middleware for ValidationStage {
    async fn handle(&self, ctx: RequestContext, next: Next) -> Result<HttpResponse, Error> {
        for (facet, schema) in &self.schemas {
            let value = ctx.facet(*facet);
            if let Err(errors) = schema.validate(Some(&value), &self.options) {
                debug!(
                    "{} {} rejected, {} invalid: {}",
                    ctx.request.method, ctx.request.path, facet, errors
                );
                let details = json!({
                    "facet": facet.as_str(),
                    "details": errors.to_json()["errors"].clone(),
                });
                let failure = Failure::wrap(errors, 400).with_data(details);
                return ctx.respond_with_failure(failure);
            }
        }

        next(ctx).await
    }

    fn name(&self) -> &str {
        "validate"
    }
}

/// Facet data attached to a validation failure, if `failure` is one.
pub fn validation_details(failure: &Failure) -> Option<&Value> {
    failure.data().filter(|data| data.get("facet").is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FailureCapability, FailureOptions};
    use routeweave_core::{Chain, HttpRequest, Stage, named_handler_fn};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn map(entries: Vec<(&str, RouteValue)>) -> BTreeMap<String, RouteValue> {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    fn options() -> Arc<ValidationOptions> {
        Arc::new(ValidationOptions::default())
    }

    fn guarded(stage: ValidationStage, calls: Arc<AtomicUsize>) -> Chain {
        let handler: Stage = named_handler_fn("handler", move |_ctx| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(HttpResponse::ok())
            }
        });
        Chain::new(vec![
            Arc::new(FailureCapability::new(Arc::new(FailureOptions::new()))),
            Arc::new(stage),
            handler,
        ])
    }

    #[test]
    fn test_build_requires_a_facet() {
        assert!(matches!(
            ValidationStage::build(&BTreeMap::new(), options()),
            Err(RegistrationError::MissingSchema { .. })
        ));
        assert!(matches!(
            ValidationStage::build(&map(vec![("session", Schema::any().into())]), options()),
            Err(RegistrationError::MissingSchema { .. })
        ));
    }

    #[test]
    fn test_build_orders_facets() {
        let stage = ValidationStage::build(
            &map(vec![
                ("cookies", Schema::object().into()),
                ("query", Schema::object().into()),
                ("body", Schema::object().into()),
                ("headers", Schema::object().into()),
                ("params", Schema::object().into()),
            ]),
            options(),
        )
        .unwrap();
        assert_eq!(stage.facets(), Facet::ALL.to_vec());
    }

    #[test]
    fn test_build_rejects_stage_schema() {
        let handler: Stage = named_handler_fn("h", |_ctx| async { Ok(HttpResponse::ok()) });
        assert!(matches!(
            ValidationStage::build(&map(vec![("body", handler.into())]), options()),
            Err(RegistrationError::InvalidSchema { ref facet, .. }) if facet == "body"
        ));
    }

    #[tokio::test]
    async fn test_passes_valid_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stage = ValidationStage::build(
            &map(vec![(
                "query",
                Schema::object().key("page", Schema::number().min(1.0)).into(),
            )]),
            options(),
        )
        .unwrap();
        let chain = guarded(stage, calls.clone());

        let response = chain
            .run(RequestContext::new(HttpRequest::new("GET", "/items?page=2")))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejects_with_400_and_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stage = ValidationStage::build(
            &map(vec![(
                "params",
                Schema::object().key("id", Schema::number().integer()).into(),
            )]),
            options(),
        )
        .unwrap();
        let chain = guarded(stage, calls.clone());

        let mut request = HttpRequest::new("GET", "/items/abc");
        request.path_params.insert("id".into(), "abc".into());
        let response = chain.run(RequestContext::new(request)).await.unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(
            response.body_json().unwrap(),
            json!({"statusCode": 400, "error": "Bad Request", "message": "\"id\" must be a number"})
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_failing_facet_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stage = ValidationStage::build(
            &map(vec![
                ("query", Schema::object().key("q", Schema::string().required()).into()),
                ("body", Schema::object().key("name", Schema::string().required()).into()),
            ]),
            options(),
        )
        .unwrap();
        let chain = guarded(stage, calls.clone());

        let request = HttpRequest::new("POST", "/search")
            .with_json(&json!({}))
            .unwrap();
        let response = chain.run(RequestContext::new(request)).await.unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(response.body_json().unwrap()["message"], "\"name\" is required");
    }

    #[tokio::test]
    async fn test_literal_schema() {
        let calls = Arc::new(AtomicUsize::new(0));
        let stage = ValidationStage::build(
            &map(vec![("headers", RouteValue::from(json!({"x-version": "2"})))]),
            Arc::new(ValidationOptions::default().allow_unknown(true)),
        )
        .unwrap();
        let chain = guarded(stage, calls.clone());

        let ok = HttpRequest::new("GET", "/").with_header("X-Version", "2");
        let bad = HttpRequest::new("GET", "/").with_header("X-Version", "1");
        assert_eq!(chain.run(RequestContext::new(ok)).await.unwrap().status, 200);
        assert_eq!(chain.run(RequestContext::new(bad)).await.unwrap().status, 400);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validation_details() {
        let failure = Failure::bad_request("x").with_data(json!({"facet": "body"}));
        assert_eq!(validation_details(&failure).unwrap()["facet"], "body");
        assert!(validation_details(&Failure::bad_request("x")).is_none());
    }
}
