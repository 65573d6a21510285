//! Public read side: listings and the post detail page.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::{Page, Paginator};
use crate::application::query::PostQuery;
use crate::application::repos::{
    CategoriesRepo, CommentsRepo, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::access::{Actor, can_view_post};
use crate::domain::entities::{CategoryRecord, CommentEntry, PostEntry, PostId, UserRecord};

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("category `{0}` not found")]
    UnknownCategory(String),
    #[error("user `{0}` not found")]
    UnknownUser(String),
    #[error("post {0} not found")]
    UnknownPost(PostId),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CategoryListing {
    pub category: CategoryRecord,
    pub posts: Page<PostEntry>,
}

#[derive(Debug, Clone)]
pub struct ProfileListing {
    pub profile: UserRecord,
    pub is_owner: bool,
    pub posts: Page<PostEntry>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub entry: PostEntry,
    pub comments: Vec<CommentEntry>,
}

#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    categories: Arc<dyn CategoriesRepo>,
    users: Arc<dyn UsersRepo>,
    paginator: Paginator,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        categories: Arc<dyn CategoriesRepo>,
        users: Arc<dyn UsersRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            comments,
            categories,
            users,
            paginator,
        }
    }

    /// Public posts across all authors, newest first.
    pub async fn index(&self, page: u64) -> Result<Page<PostEntry>, BlogError> {
        let query = PostQuery::published(OffsetDateTime::now_utc()).with_comment_count();
        self.page_of(&query, page).await
    }

    /// Public posts of a published category. Unpublished categories are
    /// reported as unknown.
    pub async fn category_posts(
        &self,
        slug: &str,
        page: u64,
    ) -> Result<CategoryListing, BlogError> {
        let category = self
            .categories
            .find_category_by_slug(slug)
            .await?
            .filter(|category| category.is_published)
            .ok_or_else(|| BlogError::UnknownCategory(slug.to_string()))?;

        let query = PostQuery::published(OffsetDateTime::now_utc())
            .in_category(category.id)
            .with_comment_count();
        let posts = self.page_of(&query, page).await?;

        Ok(CategoryListing { category, posts })
    }

    /// Posts of one author. The owner sees drafts and scheduled posts too.
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<&Actor>,
        page: u64,
    ) -> Result<ProfileListing, BlogError> {
        let profile = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| BlogError::UnknownUser(username.to_string()))?;

        let is_owner = viewer.is_some_and(|actor| actor.id == profile.id);
        let query = PostQuery::published(OffsetDateTime::now_utc())
            .including_unpublished(is_owner)
            .by_author(profile.id)
            .with_comment_count();
        let posts = self.page_of(&query, page).await?;

        Ok(ProfileListing {
            profile,
            is_owner,
            posts,
        })
    }

    pub async fn post_detail(
        &self,
        id: PostId,
        viewer: Option<&Actor>,
    ) -> Result<PostDetail, BlogError> {
        let entry = self.visible_post(id, viewer).await?;
        let comments = self.comments.list_for_post(id).await?;
        Ok(PostDetail { entry, comments })
    }

    /// A post the viewer is allowed to open, or `UnknownPost`.
    pub async fn visible_post(
        &self,
        id: PostId,
        viewer: Option<&Actor>,
    ) -> Result<PostEntry, BlogError> {
        let now = OffsetDateTime::now_utc();
        self.posts
            .find_post(id)
            .await?
            .filter(|entry| can_view_post(viewer, entry, now))
            .ok_or(BlogError::UnknownPost(id))
    }

    async fn page_of(&self, query: &PostQuery, page: u64) -> Result<Page<PostEntry>, BlogError> {
        let total = self.posts.count_posts(query).await?;
        let window = self.paginator.window(total, page);
        let items = self
            .posts
            .list_posts(query, window.limit(), window.offset())
            .await?;
        Ok(Page::new(items, window))
    }
}
