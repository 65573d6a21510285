use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::forms::{CommentForm, FormErrors};
use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};
use crate::domain::access::{AccessDenied, Action, Actor, authorize_comment, can_view_post};
use crate::domain::entities::{CommentId, CommentRecord, PostEntry, PostId};
use crate::infra::telemetry;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("post {0} not found")]
    PostNotFound(PostId),
    #[error("comment {comment} not found on post {post}")]
    NotFound { post: PostId, comment: CommentId },
    #[error(transparent)]
    Denied(#[from] AccessDenied),
    #[error("invalid comment: {0}")]
    Invalid(FormErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self { posts, comments }
    }

    /// Comment on a post the actor can see.
    pub async fn add(
        &self,
        actor: &Actor,
        post_id: PostId,
        form: &CommentForm,
    ) -> Result<CommentRecord, CommentError> {
        let now = OffsetDateTime::now_utc();
        let visible = self
            .posts
            .find_post(post_id)
            .await?
            .is_some_and(|entry| can_view_post(Some(actor), &entry, now));
        if !visible {
            return Err(CommentError::PostNotFound(post_id));
        }

        let text = form.validate().map_err(CommentError::Invalid)?;
        let record = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: actor.id,
                text,
            })
            .await?;

        telemetry::record_comment_created();
        info!(
            target = "blogicum::comments",
            comment_id = record.id,
            post_id = post_id,
            author_id = actor.id,
            "comment created"
        );
        Ok(record)
    }

    pub async fn edit_target(
        &self,
        actor: &Actor,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<CommentRecord, CommentError> {
        self.authorized(actor, Action::EditComment, post_id, comment_id)
            .await
    }

    pub async fn update(
        &self,
        actor: &Actor,
        post_id: PostId,
        comment_id: CommentId,
        form: &CommentForm,
    ) -> Result<CommentRecord, CommentError> {
        self.authorized(actor, Action::EditComment, post_id, comment_id)
            .await?;
        let text = form.validate().map_err(CommentError::Invalid)?;
        let record = self.comments.update_comment(comment_id, &text).await?;
        info!(
            target = "blogicum::comments",
            comment_id = comment_id,
            post_id = post_id,
            "comment updated"
        );
        Ok(record)
    }

    pub async fn delete_target(
        &self,
        actor: &Actor,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<CommentRecord, CommentError> {
        self.authorized(actor, Action::DeleteComment, post_id, comment_id)
            .await
    }

    pub async fn delete(
        &self,
        actor: &Actor,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<(), CommentError> {
        self.authorized(actor, Action::DeleteComment, post_id, comment_id)
            .await?;
        self.comments.delete_comment(comment_id).await?;
        info!(
            target = "blogicum::comments",
            comment_id = comment_id,
            post_id = post_id,
            actor_id = actor.id,
            "comment deleted"
        );
        Ok(())
    }

    /// The post a comment form is rendered under.
    pub async fn parent_post(&self, post_id: PostId) -> Result<PostEntry, CommentError> {
        self.posts
            .find_post(post_id)
            .await?
            .ok_or(CommentError::PostNotFound(post_id))
    }

    async fn authorized(
        &self,
        actor: &Actor,
        action: Action,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<CommentRecord, CommentError> {
        let comment = self
            .comments
            .find_comment(comment_id)
            .await?
            .filter(|comment| comment.post_id == post_id)
            .ok_or(CommentError::NotFound {
                post: post_id,
                comment: comment_id,
            })?;
        authorize_comment(actor, action, &comment)?;
        Ok(comment)
    }
}
