// Methods a route can be registered under

/// Registration method. `All` matches every request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Delete,
    Options,
    Trace,
    All,
}

impl RouteMethod {
    pub const VARIANTS: [RouteMethod; 7] = [
        RouteMethod::Get,
        RouteMethod::Post,
        RouteMethod::Put,
        RouteMethod::Delete,
        RouteMethod::Options,
        RouteMethod::Trace,
        RouteMethod::All,
    ];

    /// Case-insensitive parse; surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Some(RouteMethod::Get),
            "post" => Some(RouteMethod::Post),
            "put" => Some(RouteMethod::Put),
            "delete" => Some(RouteMethod::Delete),
            "options" => Some(RouteMethod::Options),
            "trace" => Some(RouteMethod::Trace),
            "all" => Some(RouteMethod::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Delete => "DELETE",
            RouteMethod::Options => "OPTIONS",
            RouteMethod::Trace => "TRACE",
            RouteMethod::All => "ALL",
        }
    }

    /// Whether a route registered under `self` answers `request_method`.
    /// GET routes also answer HEAD.
    pub fn matches(&self, request_method: &str) -> bool {
        match self {
            RouteMethod::All => true,
            RouteMethod::Get => {
                request_method.eq_ignore_ascii_case("GET")
                    || request_method.eq_ignore_ascii_case("HEAD")
            }
            other => request_method.eq_ignore_ascii_case(other.as_str()),
        }
    }
}

impl std::fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
