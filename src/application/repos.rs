//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::query::PostQuery;
use crate::domain::entities::{
    CategoryId, CategoryRecord, CommentEntry, CommentId, CommentRecord, LocationId,
    LocationRecord, PostEntry, PostId, PostRecord, SessionId, SessionRecord, UserId, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
    pub author_id: UserId,
    pub category_id: CategoryId,
    pub location_id: Option<LocationId>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: PostId,
    pub title: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
    pub category_id: CategoryId,
    pub location_id: Option<LocationId>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct CreateLocationParams {
    pub name: String,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileParams {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub user_id: UserId,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, query: &PostQuery) -> Result<u64, RepoError>;

    async fn list_posts(
        &self,
        query: &PostQuery,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostEntry>, RepoError>;

    /// Load one post with its relations, regardless of visibility.
    async fn find_post(&self, id: PostId) -> Result<Option<PostEntry>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments of a post, oldest first.
    async fn list_for_post(&self, post_id: PostId) -> Result<Vec<CommentEntry>, RepoError>;

    async fn find_comment(&self, id: CommentId) -> Result<Option<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;

    async fn update_comment(&self, id: CommentId, text: &str)
    -> Result<CommentRecord, RepoError>;

    async fn delete_comment(&self, id: CommentId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category(&self, id: CategoryId) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_category_by_slug(&self, slug: &str)
    -> Result<Option<CategoryRecord>, RepoError>;

    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;
}

#[async_trait]
pub trait LocationsRepo: Send + Sync {
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError>;

    async fn find_location(&self, id: LocationId) -> Result<Option<LocationRecord>, RepoError>;

    async fn create_location(
        &self,
        params: CreateLocationParams,
    ) -> Result<LocationRecord, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError>;

    async fn set_privileges(
        &self,
        username: &str,
        is_staff: bool,
        is_superuser: bool,
    ) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, params: CreateSessionParams)
    -> Result<SessionRecord, RepoError>;

    async fn find_session_by_prefix(&self, prefix: &str)
    -> Result<Option<SessionRecord>, RepoError>;

    async fn delete_session(&self, id: SessionId) -> Result<(), RepoError>;

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn check(&self) -> Result<(), RepoError>;
}
