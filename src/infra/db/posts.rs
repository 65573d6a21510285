use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::query::PostQuery;
use crate::application::repos::{
    CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{
    AuthorRef, CategoryRef, LocationRef, PostEntry, PostId, PostRecord,
};

use super::PostgresRepositories;
use super::util::{convert_count, convert_page_bound, map_sqlx_error};

const POST_COLUMNS: &str = "p.id, p.title, p.text, p.pub_date, p.is_published, p.author_id, \
     p.category_id, p.location_id, p.created_at";

const ENTRY_COLUMNS: &str = "u.username AS author_username, u.first_name AS author_first_name, \
     u.last_name AS author_last_name, c.title AS category_title, c.slug AS category_slug, \
     c.is_published AS category_is_published, l.name AS location_name, \
     l.is_published AS location_is_published";

const ENTRY_JOINS: &str = " FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     INNER JOIN categories c ON c.id = p.category_id \
     LEFT JOIN locations l ON l.id = p.location_id ";

const COMMENT_COUNT_EXPR: &str =
    "(SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    text: String,
    pub_date: OffsetDateTime,
    is_published: bool,
    author_id: i64,
    category_id: i64,
    location_id: Option<i64>,
    created_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            text: row.text,
            pub_date: row.pub_date,
            is_published: row.is_published,
            author_id: row.author_id,
            category_id: row.category_id,
            location_id: row.location_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostEntryRow {
    #[sqlx(flatten)]
    post: PostRow,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
    category_title: String,
    category_slug: String,
    category_is_published: bool,
    location_name: Option<String>,
    location_is_published: Option<bool>,
    comment_count: Option<i64>,
}

impl TryFrom<PostEntryRow> for PostEntry {
    type Error = RepoError;

    fn try_from(row: PostEntryRow) -> Result<Self, Self::Error> {
        let post = PostRecord::from(row.post);
        let author = AuthorRef {
            id: post.author_id,
            username: row.author_username,
            first_name: row.author_first_name,
            last_name: row.author_last_name,
        };
        let category = CategoryRef {
            id: post.category_id,
            title: row.category_title,
            slug: row.category_slug,
            is_published: row.category_is_published,
        };
        let location = match (post.location_id, row.location_name) {
            (Some(id), Some(name)) => Some(LocationRef {
                id,
                name,
                is_published: row.location_is_published.unwrap_or(false),
            }),
            _ => None,
        };
        let comment_count = row.comment_count.map(convert_count).transpose()?;

        Ok(Self {
            post,
            author,
            category,
            location,
            comment_count,
        })
    }
}

/// Append the `WHERE` conditions a query describes. Expects the `p` and `c`
/// aliases to be in scope.
fn push_query_filters(qb: &mut QueryBuilder<'static, Postgres>, query: &PostQuery) {
    qb.push(" WHERE 1=1 ");
    if !query.include_unpublished {
        qb.push(" AND p.is_published AND c.is_published AND p.pub_date <= ");
        qb.push_bind(query.as_of);
    }
    if let Some(author) = query.exclude_author {
        qb.push(" AND p.author_id <> ");
        qb.push_bind(author);
    }
    if let Some(author) = query.author {
        qb.push(" AND p.author_id = ");
        qb.push_bind(author);
    }
    if let Some(category) = query.category {
        qb.push(" AND p.category_id = ");
        qb.push_bind(category);
    }
}

fn entry_select() -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(POST_COLUMNS);
    qb.push(", ");
    qb.push(ENTRY_COLUMNS);
    qb
}

fn list_query(query: &PostQuery, limit: i64, offset: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = entry_select();
    if query.with_comment_count {
        qb.push(", ");
        qb.push(COMMENT_COUNT_EXPR);
    } else {
        qb.push(", NULL::BIGINT AS comment_count");
    }
    qb.push(ENTRY_JOINS);
    push_query_filters(&mut qb, query);
    qb.push(" ORDER BY ");
    qb.push(query.sort.order_by_sql());
    qb.push(" LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    qb
}

fn count_query(query: &PostQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT COUNT(*) FROM posts p INNER JOIN categories c ON c.id = p.category_id",
    );
    push_query_filters(&mut qb, query);
    qb
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, query: &PostQuery) -> Result<u64, RepoError> {
        let count: i64 = count_query(query)
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn list_posts(
        &self,
        query: &PostQuery,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let limit = convert_page_bound(limit)?;
        let offset = convert_page_bound(offset)?;

        let rows: Vec<PostEntryRow> = list_query(query, limit, offset)
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(PostEntry::try_from).collect()
    }

    async fn find_post(&self, id: PostId) -> Result<Option<PostEntry>, RepoError> {
        let mut qb = entry_select();
        qb.push(", ");
        qb.push(COMMENT_COUNT_EXPR);
        qb.push(ENTRY_JOINS);
        qb.push(" WHERE p.id = ");
        qb.push_bind(id);

        let row: Option<PostEntryRow> = qb
            .build_query_as()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PostEntry::try_from).transpose()
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "INSERT INTO posts (title, text, pub_date, is_published, author_id, category_id, location_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, title, text, pub_date, is_published, author_id, category_id, location_id, created_at",
        )
        .bind(params.title)
        .bind(params.text)
        .bind(params.pub_date)
        .bind(params.is_published)
        .bind(params.author_id)
        .bind(params.category_id)
        .bind(params.location_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "UPDATE posts SET title = $2, text = $3, pub_date = $4, is_published = $5, \
             category_id = $6, location_id = $7 WHERE id = $1 \
             RETURNING id, title, text, pub_date, is_published, author_id, category_id, location_id, created_at",
        )
        .bind(params.id)
        .bind(params.title)
        .bind(params.text)
        .bind(params.pub_date)
        .bind(params.is_published)
        .bind(params.category_id)
        .bind(params.location_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(PostRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
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
