//! Route table and the session guard evaluated before entering a view.

use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Articles,
    NewArticle,
    Article(i64),
    Topics,
    Profile,
}

impl Route {
    /// Parse a path such as `/articles/42`. Trailing slashes are ignored.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        match segments.as_slice() {
            [] => Some(Self::Home),
            ["login"] => Some(Self::Login),
            ["register"] => Some(Self::Register),
            ["articles"] => Some(Self::Articles),
            ["articles", "new"] => Some(Self::NewArticle),
            ["articles", id] => id.parse().ok().map(Self::Article),
            ["topics"] => Some(Self::Topics),
            ["profile"] => Some(Self::Profile),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Register => "/register".to_string(),
            Self::Articles => "/articles".to_string(),
            Self::NewArticle => "/articles/new".to_string(),
            Self::Article(id) => format!("/articles/{}", id),
            Self::Topics => "/topics".to_string(),
            Self::Profile => "/profile".to_string(),
        }
    }

    pub fn requires_session(&self) -> bool {
        !matches!(self, Self::Home | Self::Login | Self::Register)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Guard decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(Route),
}

/// Pure guard: protected routes need a session, everything else is open.
pub fn decide(authenticated: bool, route: &Route) -> Access {
    if route.requires_session() && !authenticated {
        Access::Redirect(Route::Login)
    } else {
        Access::Allow
    }
}

/// Guard against the live session. Synchronous, never touches the network.
pub fn check(session: &SessionStore, route: &Route) -> Access {
    decide(session.is_authenticated(), route)
}
