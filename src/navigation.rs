//! Route gating: which page a route shows for the current identity.

use std::fmt;

use crate::identity::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    TopRated,
    Movie(i64),
    Favorites,
    Profile,
    Login,
    About,
}

impl Route {
    /// Routes whose content belongs to a user.
    pub fn requires_identity(self) -> bool {
        matches!(self, Route::Favorites | Route::Profile)
    }

    pub fn path(self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::TopRated => "/top-rated".to_string(),
            Route::Movie(id) => format!("/movie/{id}"),
            Route::Favorites => "/favorites".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Login => "/login".to_string(),
            Route::About => "/about".to_string(),
        }
    }

    /// Parses a path. Unknown paths are `None`.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(Route::Home),
            "/top-rated" => Some(Route::TopRated),
            "/favorites" => Some(Route::Favorites),
            "/profile" => Some(Route::Profile),
            "/login" => Some(Route::Login),
            "/about" => Some(Route::About),
            other => other
                .strip_prefix("/movie/")
                .and_then(|id| id.parse().ok())
                .map(Route::Movie),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// What to do with a requested route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Show(Route),
    /// The route needs a signed-in user; show the inline login prompt.
    LoginPrompt,
    Redirect(Route),
}

pub fn resolve(route: Route, identity: Option<&Identity>) -> Navigation {
    match (route, identity) {
        (route, None) if route.requires_identity() => Navigation::LoginPrompt,
        (Route::Login, Some(_)) => Navigation::Redirect(Route::Profile),
        (route, _) => Navigation::Show(route),
    }
}

/// Where to go after a successful login or sign-up.
pub fn after_login() -> Route {
    Route::Home
}

pub fn after_logout() -> Route {
    Route::Login
}
