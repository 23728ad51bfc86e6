//! Comment thread of the open article.

use crate::api::ApiClient;
use crate::error::Result;
use crate::models::{ArticleDetail, Comment, NewComment};
use crate::validation;
use crate::view::{Delivery, ViewToken};
use std::rc::Rc;

pub struct CommentThread {
    client: Rc<ApiClient>,
    article_id: Option<i64>,
    comments: Vec<Comment>,
    draft: String,
}

impl CommentThread {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self {
            client,
            article_id: None,
            comments: Vec::new(),
            draft: String::new(),
        }
    }

    /// Take the comments delivered with an article detail
    pub fn load(&mut self, detail: &ArticleDetail) {
        if self.article_id != Some(detail.article.id) {
            self.draft.clear();
        }
        self.article_id = Some(detail.article.id);
        self.comments = newest_first(detail.comments.clone());
    }

    /// Re-fetch the thread for `article_id`
    pub fn refresh(&mut self, article_id: i64, view: &ViewToken) -> Result<Delivery> {
        let result = self
            .client
            .get::<Vec<Comment>>(&format!("/articles/{}/comments", article_id));
        view.deliver(result, |comments| {
            if self.article_id != Some(article_id) {
                self.draft.clear();
            }
            self.article_id = Some(article_id);
            self.comments = newest_first(comments);
        })
    }

    #[cfg(test)]
    pub fn article_id(&self) -> Option<i64> {
        self.article_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Post a comment. On success the server's copy goes to the head of the
    /// thread and the draft is cleared; on failure the draft is kept for a retry.
    pub fn submit(&mut self, article_id: i64, content: &str) -> Result<&Comment> {
        self.draft = content.to_string();
        validation::required("content", content)?;

        let comment: Comment = self.client.post(
            &format!("/articles/{}/comments", article_id),
            &NewComment {
                content: content.trim().to_string(),
            },
        )?;
        tracing::info!(article_id, comment_id = comment.id, "comment posted");

        if self.article_id != Some(article_id) {
            self.article_id = Some(article_id);
            self.comments.clear();
        }
        self.draft.clear();
        self.comments.insert(0, comment);
        Ok(&self.comments[0])
    }
}

fn newest_first(mut comments: Vec<Comment>) -> Vec<Comment> {
    // Stable, so equal or unparseable timestamps keep the server's order.
    comments.sort_by(|a, b| b.created().cmp(&a.created()));
    comments
}
