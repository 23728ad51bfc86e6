//! Wire and domain types exchanged with the backend.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The identity part of a user profile
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserSummary {
    /// Absent from `GET /users/me`; known from the login response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
}

/// An authenticated session: bearer token plus the user it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Session {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default, alias = "authorName")]
    pub author: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
}

impl Article {
    pub fn created(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    #[serde(default, alias = "author")]
    pub author_name: String,
    pub created_at: String,
}

impl Comment {
    pub fn created(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.created_at)
    }
}

/// `GET /articles/:id` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArticleDetail {
    pub article: Article,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Topic {
    pub id: i64,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Projection for the requesting user, not a property of the topic
    #[serde(default)]
    pub subscribed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub topic_id: i64,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub content: String,
}

/// `PUT /users/me` body; `password` is omitted when unchanged
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    /// Build an update from form values; an empty password means "keep the current one"
    pub fn new(username: &str, email: &str, password: Option<&str>) -> Self {
        Self {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password: password.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }
}

/// Parse the timestamp formats the backend and its fixtures produce.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
