use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{CommentsRepo, CreateCommentParams, RepoError};
use crate::domain::entities::{AuthorRef, CommentEntry, CommentId, CommentRecord, PostId};

use super::PostgresRepositories;
use super::util::map_sqlx_error;

const COMMENT_RETURNING: &str = "RETURNING id, text, post_id, author_id, created_at";

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    text: String,
    post_id: i64,
    author_id: i64,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            post_id: row.post_id,
            author_id: row.author_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentEntryRow {
    #[sqlx(flatten)]
    comment: CommentRow,
    username: String,
    first_name: String,
    last_name: String,
}

impl From<CommentEntryRow> for CommentEntry {
    fn from(row: CommentEntryRow) -> Self {
        let comment = CommentRecord::from(row.comment);
        let author = AuthorRef {
            id: comment.author_id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
        };
        Self { comment, author }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_for_post(&self, post_id: PostId) -> Result<Vec<CommentEntry>, RepoError> {
        let rows = sqlx::query_as::<_, CommentEntryRow>(
            "SELECT cm.id, cm.text, cm.post_id, cm.author_id, cm.created_at, \
             u.username, u.first_name, u.last_name \
             FROM comments cm INNER JOIN users u ON u.id = cm.author_id \
             WHERE cm.post_id = $1 ORDER BY cm.created_at ASC, cm.id ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentEntry::from).collect())
    }

    async fn find_comment(&self, id: CommentId) -> Result<Option<CommentRecord>, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "SELECT id, text, post_id, author_id, created_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CommentRecord::from))
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "INSERT INTO comments (text, post_id, author_id) VALUES ($1, $2, $3) {COMMENT_RETURNING}"
        ))
        .bind(params.text)
        .bind(params.post_id)
        .bind(params.author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_comment(
        &self,
        id: CommentId,
        text: &str,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "UPDATE comments SET text = $2 WHERE id = $1 {COMMENT_RETURNING}"
        ))
        .bind(id)
        .bind(text)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(CommentRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_comment(&self, id: CommentId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
