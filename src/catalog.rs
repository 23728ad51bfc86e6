//! Article feed, article detail and article creation.

use crate::api::ApiClient;
use crate::error::{Result, ValidationError};
use crate::models::{Article, ArticleDetail, NewArticle, Topic};
use crate::validation;
use crate::view::{Delivery, ViewToken};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "desc" | "newest" => Some(Self::Desc),
            "asc" | "oldest" => Some(Self::Asc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desc => "desc",
            Self::Asc => "asc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Desc => Self::Asc,
            Self::Asc => Self::Desc,
        }
    }
}

pub struct ContentCatalog {
    client: Rc<ApiClient>,
    articles: Vec<Article>,
    loaded: bool,
    order: SortOrder,
}

impl ContentCatalog {
    pub fn new(client: Rc<ApiClient>, order: SortOrder) -> Self {
        Self {
            client,
            articles: Vec::new(),
            loaded: false,
            order,
        }
    }

    /// Fetch the feed into the held collection, unless `view` was left meanwhile.
    pub fn list_articles(&mut self, view: &ViewToken) -> Result<Delivery> {
        let result = self.client.get::<Vec<Article>>("/articles");
        view.deliver(result, |articles| {
            tracing::debug!(count = articles.len(), "articles loaded");
            self.articles = articles;
            self.loaded = true;
        })
    }

    pub fn get_article(&self, id: i64) -> Result<ArticleDetail> {
        self.client.get(&format!("/articles/{}", id))
    }

    #[cfg(test)]
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn set_order(&mut self, order: SortOrder) {
        self.order = order;
    }

    /// Flip the order; the held collection is reused as-is.
    pub fn toggle_order(&mut self) -> SortOrder {
        self.order = self.order.toggled();
        self.order
    }

    /// Articles in the current order
    pub fn sorted(&self) -> Vec<&Article> {
        self.sorted_view(self.order)
    }

    /// Order the last-fetched articles by creation date. Ties keep their
    /// fetched order in both directions; undated articles go last.
    pub fn sorted_view(&self, order: SortOrder) -> Vec<&Article> {
        let mut view: Vec<&Article> = self.articles.iter().collect();
        view.sort_by(|a, b| match (a.created(), b.created()) {
            (Some(x), Some(y)) => match order {
                SortOrder::Asc => x.cmp(&y),
                SortOrder::Desc => y.cmp(&x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        view
    }

    /// Create an article. The server's copy is added to the feed only once
    /// the backend has accepted it, and only when its topic is one the feed
    /// is built from.
    pub fn create_article(
        &mut self,
        composer: &ArticleComposer,
        topic_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Article> {
        let payload = composer.build(topic_id, title, content)?;
        let article: Article = self.client.post("/articles", &payload)?;
        tracing::info!(id = article.id, topic_id, "article created");
        if self.loaded && composer.is_subscribed(topic_id) {
            self.articles.push(article.clone());
        }
        Ok(article)
    }
}

/// The article form. It can only exist once a non-empty topic list is loaded.
#[derive(Debug, Clone)]
pub struct ArticleComposer {
    topics: Vec<(i64, String)>,
    subscribed: Vec<i64>,
}

impl ArticleComposer {
    pub fn new(topics: &[Topic]) -> Result<Self, ValidationError> {
        if topics.is_empty() {
            return Err(ValidationError::new(
                "topicId",
                "No topics loaded yet; open /topics first",
            ));
        }
        Ok(Self {
            topics: topics.iter().map(|t| (t.id, t.title.clone())).collect(),
            subscribed: topics.iter().filter(|t| t.subscribed).map(|t| t.id).collect(),
        })
    }

    pub fn topics(&self) -> &[(i64, String)] {
        &self.topics
    }

    /// Whether articles in `topic_id` show up in the user's feed
    pub fn is_subscribed(&self, topic_id: i64) -> bool {
        self.subscribed.contains(&topic_id)
    }

    pub fn build(&self, topic_id: i64, title: &str, content: &str) -> Result<NewArticle, ValidationError> {
        if !self.topics.iter().any(|(id, _)| *id == topic_id) {
            return Err(ValidationError::new(
                "topicId",
                format!("Unknown topic {}", topic_id),
            ));
        }
        validation::required("title", title)?;
        validation::required("content", content)?;
        Ok(NewArticle {
            topic_id,
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        })
    }
}
