// Named parts of a request that can be validated independently

use crate::http::string_map_value;
use crate::HttpRequest;
use serde_json::Value;

/// A request facet. The declaration order is the evaluation order used by
/// request validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Facet {
    Headers,
    Body,
    Query,
    Params,
    Cookies,
}

impl Facet {
    /// Every facet, in evaluation order.
    pub const ALL: [Facet; 5] = [
        Facet::Headers,
        Facet::Body,
        Facet::Query,
        Facet::Params,
        Facet::Cookies,
    ];

    /// Parse a facet key as written in a route's `validate` map.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "headers" => Some(Facet::Headers),
            "body" => Some(Facet::Body),
            "query" => Some(Facet::Query),
            "params" | "path_params" | "path-parameters" => Some(Facet::Params),
            "cookies" => Some(Facet::Cookies),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Headers => "headers",
            Facet::Body => "body",
            Facet::Query => "query",
            Facet::Params => "params",
            Facet::Cookies => "cookies",
        }
    }
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HttpRequest {
    /// The value of `facet` as JSON.
    pub fn facet(&self, facet: Facet) -> Value {
        match facet {
            Facet::Headers => string_map_value(&self.headers),
            Facet::Body => self.body_value(),
            Facet::Query => self.query_value(),
            Facet::Params => string_map_value(&self.path_params),
            Facet::Cookies => string_map_value(&self.cookies()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_is_declaration_order() {
        let mut sorted = Facet::ALL;
        sorted.sort();
        assert_eq!(sorted, Facet::ALL);
        assert_eq!(Facet::ALL[0], Facet::Headers);
        assert_eq!(Facet::ALL[4], Facet::Cookies);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Facet::from_name("params"), Some(Facet::Params));
        assert_eq!(Facet::from_name("path-parameters"), Some(Facet::Params));
        assert_eq!(Facet::from_name("Body"), None);
        assert_eq!(Facet::from_name("session"), None);
    }

    #[test]
    fn test_request_facets() {
        let mut req = HttpRequest::new("GET", "/users/7?active=true")
            .with_header("Cookie", "sid=xyz");
        req.path_params.insert("id".to_string(), "7".to_string());

        assert_eq!(req.facet(Facet::Query), json!({"active": "true"}));
        assert_eq!(req.facet(Facet::Params), json!({"id": "7"}));
        assert_eq!(req.facet(Facet::Cookies), json!({"sid": "xyz"}));
        assert_eq!(req.facet(Facet::Body), json!({}));
        assert_eq!(req.facet(Facet::Headers), json!({"cookie": "sid=xyz"}));
    }
}
