//! Redirect decisions for the web client
//!
//! Signed-out users are sent to the login page; signed-in users visiting
//! the login or signup page are sent home.

use serde::Serialize;

/// Pages that only make sense without a session
pub const AUTH_ROUTES: [&str; 2] = ["/login", "/signup"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationAction {
    Stay,
    RedirectToLogin,
    RedirectToHome,
}

impl NavigationAction {
    /// Target path, if the action redirects
    pub fn location(self) -> Option<&'static str> {
        match self {
            NavigationAction::Stay => None,
            NavigationAction::RedirectToLogin => Some("/login"),
            NavigationAction::RedirectToHome => Some("/"),
        }
    }
}

pub fn is_auth_route(path: &str) -> bool {
    AUTH_ROUTES.contains(&path)
}

pub fn decide(has_session: bool, is_auth_route: bool) -> NavigationAction {
    match (has_session, is_auth_route) {
        (false, false) => NavigationAction::RedirectToLogin,
        (true, true) => NavigationAction::RedirectToHome,
        _ => NavigationAction::Stay,
    }
}
