//! Topics and the current user's subscriptions.
//!
//! The held topic list is the only record of subscriptions: "my
//! subscriptions" is derived from the `subscribed` flags, and a flag only
//! changes after the backend confirms the call.

use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::models::Topic;
use crate::view::{Delivery, ViewToken};
use std::rc::Rc;

pub struct TopicSubscriptionManager {
    client: Rc<ApiClient>,
    topics: Vec<Topic>,
}

impl TopicSubscriptionManager {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self {
            client,
            topics: Vec::new(),
        }
    }

    pub fn list_topics(&mut self, view: &ViewToken) -> Result<Delivery> {
        let result = self.client.get::<Vec<Topic>>("/topics");
        view.deliver(result, |topics| {
            tracing::debug!(count = topics.len(), "topics loaded");
            self.topics = topics;
        })
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn find(&self, topic_id: i64) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == topic_id)
    }

    /// Topics the user follows, in list order
    pub fn subscribed_topics(&self) -> Vec<&Topic> {
        self.topics.iter().filter(|t| t.subscribed).collect()
    }

    /// Follow a topic. A topic already marked subscribed is not re-sent,
    /// since the backend rejects duplicate subscriptions.
    pub fn subscribe(&mut self, topic_id: i64) -> Result<()> {
        if self.find(topic_id).is_some_and(|t| t.subscribed) {
            tracing::debug!(topic_id, "already subscribed");
            return Ok(());
        }
        let result = self
            .client
            .post_empty(&format!("/subscriptions/{}", topic_id));
        self.confirm(topic_id, true, result)
    }

    pub fn unsubscribe(&mut self, topic_id: i64) -> Result<()> {
        let result = self.client.delete(&format!("/subscriptions/{}", topic_id));
        self.confirm(topic_id, false, result)
    }

    /// Apply a subscription change only once the backend accepted it.
    /// A 409 means the server already holds that state.
    fn confirm(&mut self, topic_id: i64, subscribed: bool, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {}
            Err(ClientError::Server {
                status: Some(409), ..
            }) => {
                tracing::debug!(topic_id, "subscription already in requested state");
            }
            Err(err) => {
                tracing::debug!(topic_id, subscribed, %err, "subscription change rejected");
                return Err(err);
            }
        }
        if let Some(topic) = self.topics.iter_mut().find(|t| t.id == topic_id) {
            topic.subscribed = subscribed;
        }
        tracing::info!(topic_id, subscribed, "subscription updated");
        Ok(())
    }
}
