//! Login, registration and logout.

use crate::api::ApiClient;
use crate::error::Result;
use crate::models::{Credentials, Registration, Session};
use crate::session::SessionStore;
use crate::validation;
use std::rc::Rc;

pub struct AuthGateway {
    client: Rc<ApiClient>,
    session: Rc<SessionStore>,
}

impl AuthGateway {
    pub fn new(client: Rc<ApiClient>) -> Self {
        let session = client.session().clone();
        Self { client, session }
    }

    pub fn login(&self, credentials: &Credentials) -> Result<Session> {
        validation::required("email", &credentials.email)?;
        validation::required("password", &credentials.password)?;

        let payload = Credentials {
            email: credentials.email.trim().to_string(),
            password: credentials.password.clone(),
        };
        let session: Session = self.client.post_public("/auth/login", &payload)?;
        self.session.set(session.clone())?;
        tracing::info!(user = %session.user.username, "logged in");
        Ok(session)
    }

    /// Register and log in. Weak passwords are rejected before anything is sent.
    pub fn register(&self, registration: &Registration) -> Result<Session> {
        validation::required("username", &registration.username)?;
        validation::email("email", &registration.email)?;
        validation::password_strength("password", &registration.password)?;

        let payload = Registration {
            username: registration.username.trim().to_string(),
            email: registration.email.trim().to_string(),
            password: registration.password.clone(),
        };
        let session: Session = self.client.post_public("/auth/register", &payload)?;
        self.session.set(session.clone())?;
        tracing::info!(user = %session.user.username, "registered");
        Ok(session)
    }

    /// Local teardown only; the token scheme is stateless.
    pub fn logout(&self) {
        self.session.clear();
        tracing::info!("logged out");
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::error::ClientError;
    use crate::storage::MemoryStore;
    use crate::testing::{anonymous_store, MockTransport};
    use serde_json::json;

    fn gateway(mock: &MockTransport, session: Rc<SessionStore>) -> AuthGateway {
        AuthGateway::new(Rc::new(ApiClient::new(Box::new(mock.clone()), session)))
    }

    fn auth_response() -> serde_json::Value {
        json!({
            "token": "jwt-abc",
            "user": { "id": 5, "username": "grace", "email": "grace@example.com" }
        })
    }

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_login_success_sets_session() {
        let mock = MockTransport::new();
        mock.respond(200, auth_response());
        let session = anonymous_store();
        let auth = gateway(&mock, session.clone());

        let result = auth.login(&creds("grace@example.com", "hunter2")).unwrap();
        assert_eq!(result.token, "jwt-abc");
        assert!(session.is_authenticated());
        assert_eq!(session.current_user().unwrap().id, Some(5));

        let sent = &mock.requests()[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.path, "/auth/login");
        assert!(sent.bearer.is_none());
        assert_eq!(
            sent.body,
            Some(json!({ "email": "grace@example.com", "password": "hunter2" }))
        );
    }

    #[test]
    fn test_login_rejected_leaves_session_cleared() {
        for (email, password) in [("a@b.c", "wrong"), ("nobody@x.io", "Passw0rd!"), ("x@y", "z")] {
            let mock = MockTransport::new();
            mock.respond(401, json!({ "message": "Invalid credentials" }));
            let session = anonymous_store();
            let auth = gateway(&mock, session.clone());

            let err = auth.login(&creds(email, password)).unwrap_err();
            assert!(matches!(err, ClientError::InvalidCredentials));
            assert!(!session.is_authenticated());
            assert_eq!(session.current_token(), None);
        }
    }

    #[test]
    fn test_login_server_error_carries_status() {
        let mock = MockTransport::new();
        mock.respond(503, json!({ "message": "maintenance" }));
        let auth = gateway(&mock, anonymous_store());

        let err = auth.login(&creds("a@b.c", "pw")).unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_login_requires_fields() {
        let mock = MockTransport::new();
        let auth = gateway(&mock, anonymous_store());
        assert!(matches!(
            auth.login(&creds("", "pw")),
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            auth.login(&creds("a@b.c", "")),
            Err(ClientError::Validation(_))
        ));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_login_survives_restart() {
        let mock = MockTransport::new();
        mock.respond(200, auth_response());
        let backing = MemoryStore::new();
        let session = Rc::new(SessionStore::open(Box::new(backing.clone())));
        gateway(&mock, session)
            .login(&creds("grace@example.com", "pw"))
            .unwrap();

        let restarted = SessionStore::open(Box::new(backing));
        assert!(restarted.is_authenticated());
        assert_eq!(restarted.current_token().as_deref(), Some("jwt-abc"));
    }

    #[test]
    fn test_register_weak_password_never_sent() {
        let mock = MockTransport::new();
        let auth = gateway(&mock, anonymous_store());

        let err = auth
            .register(&Registration {
                username: "grace".into(),
                email: "grace@example.com".into(),
                password: "password".into(),
            })
            .unwrap_err();
        match err {
            ClientError::Validation(v) => assert_eq!(v.field, "password"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_register_invalid_email_never_sent() {
        let mock = MockTransport::new();
        let auth = gateway(&mock, anonymous_store());
        let err = auth
            .register(&Registration {
                username: "grace".into(),
                email: "not-an-email".into(),
                password: "Str0ng!pass".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(ref v) if v.field == "email"));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_register_success_logs_in() {
        let mock = MockTransport::new();
        mock.respond(200, auth_response());
        let session = anonymous_store();
        let auth = gateway(&mock, session.clone());

        auth.register(&Registration {
            username: " grace ".into(),
            email: "grace@example.com".into(),
            password: "Str0ng!pass".into(),
        })
        .unwrap();

        assert!(session.is_authenticated());
        let sent = &mock.requests()[0];
        assert_eq!(sent.path, "/auth/register");
        assert_eq!(sent.body.as_ref().unwrap()["username"], "grace");
    }

    #[test]
    fn test_logout_is_local() {
        let mock = MockTransport::new();
        mock.respond(200, auth_response());
        let session = anonymous_store();
        let auth = gateway(&mock, session.clone());
        auth.login(&creds("grace@example.com", "pw")).unwrap();

        auth.logout();
        assert!(!session.is_authenticated());
        assert_eq!(mock.requests().len(), 1);
    }
}
