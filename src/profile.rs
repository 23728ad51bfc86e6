//! The current user's profile form.

use crate::api::ApiClient;
use crate::error::Result;
use crate::models::{ProfileUpdate, UserSummary};
use crate::validation;
use crate::view::{Delivery, ViewToken};
use std::rc::Rc;

/// Editable profile fields. `password` is write-only and starts empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct ProfileManager {
    client: Rc<ApiClient>,
    form: ProfileForm,
}

impl ProfileManager {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self {
            client,
            form: ProfileForm::default(),
        }
    }

    pub fn get_current_user(&mut self, view: &ViewToken) -> Result<Delivery> {
        let result = self.client.get::<UserSummary>("/users/me");
        view.deliver(result, |user| {
            self.form = ProfileForm {
                username: user.username,
                email: user.email,
                password: String::new(),
            };
        })
    }

    pub fn form(&self) -> &ProfileForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProfileForm {
        &mut self.form
    }

    /// Save the form. An empty password leaves the current one unchanged and
    /// is not sent. On failure the form keeps what the user typed.
    pub fn update_profile(&mut self) -> Result<UserSummary> {
        validation::required("username", &self.form.username)?;
        validation::email("email", &self.form.email)?;
        if !self.form.password.is_empty() {
            validation::password_strength("password", &self.form.password)?;
        }

        let payload = ProfileUpdate::new(
            &self.form.username,
            &self.form.email,
            Some(&self.form.password),
        );
        let user: UserSummary = self.client.put("/users/me", &payload)?;
        tracing::info!(user = %user.username, password_changed = payload.password.is_some(), "profile updated");

        self.form = ProfileForm {
            username: user.username.clone(),
            email: user.email.clone(),
            password: String::new(),
        };
        // The backend already holds the change; a local write failure only
        // leaves the cached user stale until the next login.
        if let Err(err) = self.client.session().update_user(user.clone()) {
            tracing::warn!(%err, "profile saved but session user not persisted");
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::error::ClientError;
    use crate::guard::Route;
    use crate::session::SessionStore;
    use crate::testing::{authenticated_store, sample_session, MockTransport, ReadOnlyStore};
    use crate::view::Navigator;
    use serde_json::json;

    fn setup(mock: &MockTransport) -> (ProfileManager, Rc<SessionStore>, Navigator) {
        let session = authenticated_store();
        let client = Rc::new(ApiClient::new(Box::new(mock.clone()), session.clone()));
        let nav = Navigator::new(session.clone());
        nav.navigate(Route::Profile);
        (ProfileManager::new(client), session, nav)
    }

    #[test]
    fn test_get_current_user_fills_form() {
        let mock = MockTransport::new();
        mock.respond(200, json!({ "username": "ada", "email": "ada@example.com" }));
        let (mut profile, _session, nav) = setup(&mock);

        assert_eq!(profile.get_current_user(&nav.token()).unwrap(), Delivery::Applied);
        assert_eq!(profile.form().username, "ada");
        assert_eq!(profile.form().password, "");
        assert_eq!(mock.requests()[0].path, "/users/me");
    }

    #[test]
    fn test_empty_password_is_not_sent() {
        let mock = MockTransport::new();
        mock.respond(200, json!({ "username": "a", "email": "a@b.c" }));
        let (mut profile, _session, _nav) = setup(&mock);
        *profile.form_mut() = ProfileForm {
            username: "a".into(),
            email: "a@b.c".into(),
            password: String::new(),
        };

        profile.update_profile().unwrap();

        let sent = &mock.requests()[0];
        assert_eq!(sent.method, Method::Put);
        let body = sent.body.clone().unwrap();
        assert_eq!(body, json!({ "username": "a", "email": "a@b.c" }));
        assert!(body.get("password").is_none());
    }

    #[test]
    fn test_success_clears_password_and_updates_session() {
        let mock = MockTransport::new();
        mock.respond(200, json!({ "username": "ada2", "email": "ada2@example.com" }));
        let (mut profile, session, _nav) = setup(&mock);
        *profile.form_mut() = ProfileForm {
            username: "ada2".into(),
            email: "ada2@example.com".into(),
            password: "N3w-Secret".into(),
        };

        let user = profile.update_profile().unwrap();
        assert_eq!(user.username, "ada2");
        assert_eq!(profile.form().password, "");
        assert_eq!(mock.last_body().unwrap()["password"], "N3w-Secret");

        let cached = session.current_user().unwrap();
        assert_eq!(cached.username, "ada2");
        assert_eq!(cached.id, Some(1));
    }

    #[test]
    fn test_failure_keeps_fields() {
        let mock = MockTransport::new();
        mock.respond(500, json!({ "message": "Email already used" }));
        let (mut profile, session, _nav) = setup(&mock);
        let typed = ProfileForm {
            username: "ada2".into(),
            email: "taken@example.com".into(),
            password: "N3w-Secret".into(),
        };
        *profile.form_mut() = typed.clone();

        assert!(profile.update_profile().is_err());
        assert_eq!(profile.form(), &typed);
        assert_eq!(session.current_user().unwrap().username, "ada");
    }

    #[test]
    fn test_saved_profile_survives_session_write_failure() {
        let mock = MockTransport::new();
        mock.respond(200, json!({ "username": "ada2", "email": "ada2@example.com" }));
        let session = Rc::new(SessionStore::open(Box::new(ReadOnlyStore::with_session(
            &sample_session(),
        ))));
        assert!(session.is_authenticated());
        let client = Rc::new(ApiClient::new(Box::new(mock.clone()), session.clone()));
        let mut profile = ProfileManager::new(client);
        *profile.form_mut() = ProfileForm {
            username: "ada2".into(),
            email: "ada2@example.com".into(),
            password: "N3w-Secret".into(),
        };

        let user = profile.update_profile().unwrap();
        assert_eq!(user.username, "ada2");
        assert_eq!(profile.form().username, "ada2");
        assert_eq!(profile.form().password, "");
        // memory is only mirrored after a durable write
        assert_eq!(session.current_user().unwrap().username, "ada");
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_local_validation() {
        let mock = MockTransport::new();
        let (mut profile, _session, _nav) = setup(&mock);

        *profile.form_mut() = ProfileForm {
            username: "".into(),
            email: "a@b.c".into(),
            password: String::new(),
        };
        assert!(matches!(profile.update_profile(), Err(ClientError::Validation(_))));

        *profile.form_mut() = ProfileForm {
            username: "a".into(),
            email: "nope".into(),
            password: String::new(),
        };
        assert!(matches!(profile.update_profile(), Err(ClientError::Validation(_))));

        *profile.form_mut() = ProfileForm {
            username: "a".into(),
            email: "a@b.c".into(),
            password: "weak".into(),
        };
        assert!(matches!(profile.update_profile(), Err(ClientError::Validation(_))));
        assert_eq!(profile.form().password, "weak");
        assert!(mock.requests().is_empty());
    }
}
