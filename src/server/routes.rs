use crate::http::headers::Headers;
use crate::http::request::Method;
use crate::http::resolver::{Handler, Resolver};

struct Route {
    method: Method,
    path: String,
    handler: Box<dyn Handler>,
}

/// Exact-match resolver over method and path.
///
/// The query string is not part of the match. `HEAD` falls back to the
/// `GET` route for the same path; the connection drops the body.
#[derive(Default)]
pub struct Routes {
    routes: Vec<Route>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(
        mut self,
        method: Method,
        path: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Self {
        self.routes.push(Route {
            method,
            path: path.into(),
            handler: Box::new(handler),
        });
        self
    }

    pub fn get(self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.route(Method::GET, path, handler)
    }

    pub fn post(self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.route(Method::POST, path, handler)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn find(&self, method: Method, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|r| r.method == method && r.path == path)
    }
}

impl Resolver for Routes {
    fn resolve(&self, method: Method, path: &str, _headers: &Headers) -> Option<&dyn Handler> {
        let route = match self.find(method, path) {
            Some(route) => Some(route),
            None if method == Method::HEAD => self.find(Method::GET, path),
            None => None,
        };
        route.map(|r| r.handler.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Request;
    use crate::http::response::Response;

    fn hello(_req: &Request<'_>) -> Response {
        Response::ok("hello")
    }

    #[test]
    fn exact_match_only() {
        let routes = Routes::new().get("/a", hello);
        let headers = Headers::new();

        assert!(routes.resolve(Method::GET, "/a", &headers).is_some());
        assert!(routes.resolve(Method::GET, "/a/", &headers).is_none());
        assert!(routes.resolve(Method::POST, "/a", &headers).is_none());
    }

    #[test]
    fn head_falls_back_to_get() {
        let routes = Routes::new().get("/a", hello);

        assert!(routes.resolve(Method::HEAD, "/a", &Headers::new()).is_some());
    }
}
