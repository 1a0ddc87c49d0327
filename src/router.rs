//! Route table and navigation guard.
//!
//! Paths follow the web client's URL layout so that links can be shared
//! between the CLI and the browser. Every navigation sets the document title
//! of the target route and then runs [`guard`], which only looks at the
//! route metadata and whether a session exists.

use std::collections::HashMap;

use url::form_urlencoded;

pub const HOME: &str = "home";
pub const LOGIN: &str = "login";
pub const LOGIN_PATH: &str = "/auth/login";
/// Query key carrying the originally requested path on a login redirect.
pub const REDIRECT_QUERY_KEY: &str = "redirect";

const CATCH_ALL: &str = "*";
const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub guest_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub path: &'static str,
    pub title: Option<&'static str>,
    pub meta: RouteMeta,
    pub redirect: Option<&'static str>,
}

impl Route {
    fn new(name: &'static str, path: &'static str, title: &'static str) -> Self {
        Self {
            name,
            path,
            title: Some(title),
            meta: RouteMeta::default(),
            redirect: None,
        }
    }

    fn redirecting(name: &'static str, path: &'static str, to: &'static str) -> Self {
        Self {
            name,
            path,
            title: None,
            meta: RouteMeta::default(),
            redirect: Some(to),
        }
    }

    fn requires_auth(mut self) -> Self {
        self.meta.requires_auth = true;
        self
    }

    fn guest_only(mut self) -> Self {
        self.meta.guest_only = true;
        self
    }
}

/// The application's route table. The catch-all route is last.
pub fn routes() -> Vec<Route> {
    vec![
        Route::new(HOME, "/", "MyChordHub - Guitar Chord Sheets"),
        Route::new("browse", "/browse", "Browse Songs"),
        Route::new("song", "/song/:id", "Song Details"),
        Route::new("edit", "/edit/:id?", "Edit Song").requires_auth(),
        Route::redirecting("auth", "/auth", LOGIN_PATH),
        Route::new(LOGIN, LOGIN_PATH, "Log In").guest_only(),
        Route::new("register", "/auth/register", "Register").guest_only(),
        Route::new("forgot-password", "/auth/forgot-password", "Forgot Password").guest_only(),
        Route::new("reset-password", "/auth/reset-password", "Reset Password").guest_only(),
        Route::new("verify-email", "/auth/verify-email", "Verify Email"),
        Route::redirecting("profile", "/profile", "/profile/overview").requires_auth(),
        Route::new("profile-overview", "/profile/overview", "Profile").requires_auth(),
        Route::new("profile-songs", "/profile/songs", "My Songs").requires_auth(),
        Route::new("profile-collections", "/profile/collections", "My Collections")
            .requires_auth(),
        Route::new("profile-settings", "/profile/settings", "Settings").requires_auth(),
        Route::new("about", "/about", "About"),
        Route::new("not-found", CATCH_ALL, "Page Not Found"),
    ]
}

/// A concrete location matched against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub name: &'static str,
    pub path: String,
    pub params: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub title: Option<&'static str>,
    pub meta: RouteMeta,
}

impl ResolvedRoute {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Path plus query string.
    pub fn full_path(&self) -> String {
        with_query(&self.path, &self.query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect {
        name: &'static str,
        query: Vec<(String, String)>,
    },
}

/// Decides whether navigation to `to` may proceed.
///
/// Protected routes send anonymous users to the login page, keeping the
/// requested path in the `redirect` query parameter. Guest-only routes send
/// signed-in users home.
pub fn guard(to: &ResolvedRoute, is_authenticated: bool) -> GuardDecision {
    if to.meta.requires_auth && !is_authenticated {
        return GuardDecision::Redirect {
            name: LOGIN,
            query: vec![(REDIRECT_QUERY_KEY.to_string(), to.full_path())],
        };
    }

    if to.meta.guest_only && is_authenticated {
        return GuardDecision::Redirect {
            name: HOME,
            query: Vec::new(),
        };
    }

    GuardDecision::Allow
}

/// Outcome of [`Router::navigate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Where navigation ended up after guards and redirects.
    pub route: ResolvedRoute,
    /// The originally requested location, when the guard redirected.
    pub redirected_from: Option<String>,
}

impl Navigation {
    pub fn was_redirected(&self) -> bool {
        self.redirected_from.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
    document_title: String,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::with_routes(routes())
    }

    pub fn with_routes(routes: Vec<Route>) -> Self {
        Self {
            routes,
            document_title: String::new(),
        }
    }

    pub fn document_title(&self) -> &str {
        &self.document_title
    }

    pub fn route(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// Builds the path of a named route, filling in `:param` segments.
    /// Optional parameters without a value are dropped.
    pub fn href(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        let route = self.route(name)?;
        if route.path == CATCH_ALL {
            return None;
        }

        let mut segments = Vec::new();
        for segment in split_segments(route.path) {
            match segment.strip_prefix(':') {
                Some(param) => {
                    let (key, optional) = match param.strip_suffix('?') {
                        Some(key) => (key, true),
                        None => (param, false),
                    };
                    match params.iter().find(|(k, _)| *k == key) {
                        Some((_, value)) => segments.push((*value).to_string()),
                        None if optional => {}
                        None => return None,
                    }
                }
                None => segments.push(segment.to_string()),
            }
        }
        Some(format!("/{}", segments.join("/")))
    }

    /// Matches a location (path with optional query string) against the
    /// table, following route-level redirects.
    pub fn resolve(&self, location: &str) -> ResolvedRoute {
        let (path, query) = split_location(location);
        let mut path = normalize(path);

        for _ in 0..MAX_REDIRECTS {
            let Some((route, params)) = self.match_route(&path) else {
                break;
            };
            if let Some(target) = route.redirect {
                path = normalize(target);
                continue;
            }
            return ResolvedRoute {
                name: route.name,
                path,
                params,
                query,
                title: route.title,
                meta: route.meta,
            };
        }

        ResolvedRoute {
            name: "not-found",
            path,
            params: HashMap::new(),
            query,
            title: self.route("not-found").and_then(|r| r.title),
            meta: RouteMeta::default(),
        }
    }

    /// Resolves `location`, updates the document title and applies the guard,
    /// following guard redirects until a route is allowed.
    pub fn navigate(&mut self, location: &str, is_authenticated: bool) -> Navigation {
        let mut target = self.resolve(location);
        let mut redirected_from = None;

        for _ in 0..MAX_REDIRECTS {
            if let Some(title) = target.title {
                self.document_title = title.to_string();
            }

            match guard(&target, is_authenticated) {
                GuardDecision::Allow => break,
                GuardDecision::Redirect { name, query } => {
                    tracing::debug!(from = %target.full_path(), to = name, "navigation redirected");
                    redirected_from.get_or_insert_with(|| target.full_path());
                    let path = self.href(name, &[]).unwrap_or_else(|| "/".to_string());
                    target = self.resolve(&with_query(&path, &query));
                }
            }
        }

        Navigation {
            route: target,
            redirected_from,
        }
    }

    fn match_route(&self, path: &str) -> Option<(&Route, HashMap<String, String>)> {
        self.routes
            .iter()
            .find_map(|route| match_path(route.path, path).map(|params| (route, params)))
    }
}

fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let mut params = HashMap::new();
    if pattern == CATCH_ALL {
        params.insert(
            "pathMatch".to_string(),
            path.trim_start_matches('/').to_string(),
        );
        return Some(params);
    }

    let expected = split_segments(pattern);
    let actual = split_segments(path);
    if actual.len() > expected.len() {
        return None;
    }

    for (idx, segment) in expected.iter().enumerate() {
        match segment.strip_prefix(':') {
            Some(param) => match param.strip_suffix('?') {
                Some(key) => {
                    if let Some(value) = actual.get(idx) {
                        params.insert(key.to_string(), (*value).to_string());
                    }
                }
                None => {
                    let value = actual.get(idx)?;
                    params.insert(param.to_string(), (*value).to_string());
                }
            },
            None => {
                if actual.get(idx) != Some(segment) {
                    return None;
                }
            }
        }
    }

    Some(params)
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn normalize(path: &str) -> String {
    format!("/{}", split_segments(path).join("/"))
}

fn split_location(location: &str) -> (&str, Vec<(String, String)>) {
    match location.split_once('?') {
        Some((path, query)) => (
            path,
            form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        ),
        None => (location, Vec::new()),
    }
}

/// Appends `query` to `path` as an encoded query string.
pub fn with_query(path: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query.iter())
        .finish();
    format!("{path}?{encoded}")
}
