//! Route access control and navigation.
//!
//! [`guard`] decides whether a route may render for the current
//! [`AuthState`]. [`Router`] keeps the navigation history and runs the guard
//! on every navigation, so a session that expires mid-use redirects on the
//! next move without any cached decision.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::auth::AuthState;

/// Oldest entries are dropped past this many.
const HISTORY_LIMIT: usize = 50;

/// Every page the client can show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Post { id: i64 },
    Categories { category: Option<i64> },
    Login,
    Create,
    Edit { id: i64 },
    MyPosts,
}

impl Route {
    /// Routes that require a signed-in user.
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Create | Route::Edit { .. } | Route::MyPosts)
    }
}

/// Outcome of [`guard`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Render(Route),
    Redirect(Route),
}

impl Access {
    /// The route that actually ends up on screen.
    pub fn route(&self) -> &Route {
        match self {
            Access::Render(route) | Access::Redirect(route) => route,
        }
    }
}

/// Protected routes render only for an authenticated user; everyone else is
/// sent to the login page.
pub fn guard(route: Route, auth: &AuthState) -> Access {
    if route.is_protected() && !auth.is_authenticated() {
        Access::Redirect(Route::Login)
    } else {
        Access::Render(route)
    }
}

/// Navigation history gated by [`guard`]. Clones share state.
#[derive(Clone, Debug)]
pub struct Router {
    auth: Rc<RefCell<AuthState>>,
    history: Rc<RefCell<Vec<Route>>>,
}

impl Router {
    pub(crate) fn new(auth: Rc<RefCell<AuthState>>) -> Self {
        Self {
            auth,
            history: Rc::new(RefCell::new(vec![Route::Home])),
        }
    }

    /// Push a route, redirecting if the guard refuses it. Returns the route
    /// landed on. Landing on the current route adds no entry.
    pub fn navigate(&self, route: Route) -> Route {
        let access = guard(route, &self.auth.borrow());
        if let Access::Redirect(to) = &access {
            debug!(to = ?to, "navigation redirected");
        }
        let landed = access.route().clone();
        let mut history = self.history.borrow_mut();
        if history.last() != Some(&landed) {
            history.push(landed.clone());
            if history.len() > HISTORY_LIMIT {
                let excess = history.len() - HISTORY_LIMIT;
                history.drain(..excess);
            }
        }
        landed
    }

    /// Replace the current entry without guarding. Used for redirects the
    /// session store forces, which always target public routes.
    pub fn replace(&self, route: Route) {
        let mut history = self.history.borrow_mut();
        match history.last_mut() {
            Some(current) => *current = route,
            None => history.push(route),
        }
    }

    /// Go back one entry. The destination is guarded again; a protected page
    /// left behind by a sign-out resolves to the login page.
    pub fn back(&self) -> Route {
        let previous = {
            let mut history = self.history.borrow_mut();
            if history.len() > 1 {
                history.pop();
            }
            history.last().cloned().unwrap_or(Route::Home)
        };
        let access = guard(previous, &self.auth.borrow());
        let landed = access.route().clone();
        self.replace(landed.clone());
        landed
    }

    pub fn current(&self) -> Route {
        self.history.borrow().last().cloned().unwrap_or(Route::Home)
    }

    pub fn history(&self) -> Vec<Route> {
        self.history.borrow().clone()
    }
}
