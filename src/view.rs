//! Navigation state and stale-result suppression.
//!
//! Every navigation bumps a generation counter. Loads carry the
//! [`ViewToken`] of the view that started them and drop their result if the
//! generation moved on while the request was in flight.

use crate::error::Result;
use crate::guard::{self, Access, Route};
use crate::session::SessionStore;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Outcome of a load that was bound to a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    /// The view was left before the response arrived; nothing changed
    Discarded,
}

#[derive(Debug, Clone)]
pub struct ViewToken {
    generation: u64,
    counter: Rc<Cell<u64>>,
}

impl ViewToken {
    pub fn is_current(&self) -> bool {
        self.counter.get() == self.generation
    }

    /// Hand a finished load to `apply` if this view is still shown. For an
    /// abandoned view both success and failure are dropped silently.
    pub fn deliver<T>(&self, result: Result<T>, apply: impl FnOnce(T)) -> Result<Delivery> {
        if !self.is_current() {
            match &result {
                Ok(_) => tracing::debug!("dropping response for abandoned view"),
                Err(err) => tracing::debug!(%err, "dropping error for abandoned view"),
            }
            return Ok(Delivery::Discarded);
        }
        apply(result?);
        Ok(Delivery::Applied)
    }
}

#[derive(Clone)]
pub struct Navigator {
    session: Rc<SessionStore>,
    generation: Rc<Cell<u64>>,
    current: Rc<RefCell<Route>>,
}

impl Navigator {
    pub fn new(session: Rc<SessionStore>) -> Self {
        Self {
            session,
            generation: Rc::new(Cell::new(0)),
            current: Rc::new(RefCell::new(Route::Home)),
        }
    }

    pub fn current(&self) -> Route {
        self.current.borrow().clone()
    }

    /// Token for the view currently shown
    pub fn token(&self) -> ViewToken {
        ViewToken {
            generation: self.generation.get(),
            counter: self.generation.clone(),
        }
    }

    /// Run the guard and enter `route`, or the route it redirects to.
    /// Returns the route actually entered.
    pub fn navigate(&self, route: Route) -> Route {
        let target = match guard::check(&self.session, &route) {
            Access::Allow => route,
            Access::Redirect(to) => {
                tracing::debug!(from = %route, to = %to, "guard redirect");
                to
            }
        };
        self.generation.set(self.generation.get() + 1);
        *self.current.borrow_mut() = target.clone();
        tracing::debug!(route = %target, "entered view");
        target
    }
}
