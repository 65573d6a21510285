//! In-memory repositories and request helpers shared by the route tests.
#![allow(dead_code)]

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tower::ServiceExt;

use blogicum::application::accounts::{AccountService, PasswordError, PasswordService};
use blogicum::application::blog::BlogService;
use blogicum::application::comments::CommentService;
use blogicum::application::pagination::Paginator;
use blogicum::application::posts::PostService;
use blogicum::application::query::PostQuery;
use blogicum::application::repos::{
    CategoriesRepo, CommentsRepo, CreateCategoryParams, CreateCommentParams,
    CreateLocationParams, CreatePostParams, CreateSessionParams, CreateUserParams, HealthRepo,
    LocationsRepo, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo, UpdatePostParams,
    UpdateProfileParams, UsersRepo,
};
use blogicum::application::sessions::SessionService;
use blogicum::domain::entities::{
    AuthorRef, CategoryId, CategoryRecord, CategoryRef, CommentEntry, CommentId, CommentRecord,
    LocationId, LocationRecord, LocationRef, PostEntry, PostId, PostRecord, SessionId,
    SessionRecord, UserId, UserRecord,
};
use blogicum::infra::http::{self, HttpState, SESSION_COOKIE};

#[derive(Default)]
struct State {
    next_id: i64,
    users: Vec<UserRecord>,
    categories: Vec<CategoryRecord>,
    locations: Vec<LocationRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    sessions: Vec<SessionRecord>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn entry(&self, post: &PostRecord) -> Option<PostEntry> {
        let author = self.users.iter().find(|user| user.id == post.author_id)?;
        let category = self
            .categories
            .iter()
            .find(|category| category.id == post.category_id)?;
        let location = post.location_id.and_then(|id| {
            self.locations
                .iter()
                .find(|location| location.id == id)
                .map(LocationRef::from)
        });
        let comment_count = self
            .comments
            .iter()
            .filter(|comment| comment.post_id == post.id)
            .count() as u64;
        Some(PostEntry {
            post: post.clone(),
            author: AuthorRef::from(author),
            category: CategoryRef::from(category),
            location,
            comment_count: Some(comment_count),
        })
    }

    fn matching(&self, query: &PostQuery) -> Vec<PostEntry> {
        let mut entries: Vec<PostEntry> = self
            .posts
            .iter()
            .filter_map(|post| self.entry(post))
            .filter(|entry| query.admits(entry))
            .map(|mut entry| {
                if !query.with_comment_count {
                    entry.comment_count = None;
                }
                entry
            })
            .collect();
        entries.sort_by(|left, right| query.compare(left, right));
        entries
    }
}

/// Every repository trait over one mutex-guarded state.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn add_user(&self, username: &str) -> UserRecord {
        self.add_user_with(username, false, false).await
    }

    pub async fn add_user_with(
        &self,
        username: &str,
        is_staff: bool,
        is_superuser: bool,
    ) -> UserRecord {
        let mut state = self.state.lock().await;
        let user = UserRecord {
            id: state.next_id(),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: format!("{username}@example.com"),
            password_hash: PlainPasswords::encode("correct horse"),
            is_staff,
            is_superuser,
            date_joined: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        user
    }

    pub async fn add_category(&self, title: &str, slug: &str, is_published: bool) -> CategoryRecord {
        let mut state = self.state.lock().await;
        let category = CategoryRecord {
            id: state.next_id(),
            title: title.to_string(),
            description: format!("About {title}"),
            slug: slug.to_string(),
            is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        state.categories.push(category.clone());
        category
    }

    pub async fn add_location(&self, name: &str, is_published: bool) -> LocationRecord {
        let mut state = self.state.lock().await;
        let location = LocationRecord {
            id: state.next_id(),
            name: name.to_string(),
            is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        state.locations.push(location.clone());
        location
    }

    /// A post dated `offset` from now.
    pub async fn add_post(
        &self,
        author: &UserRecord,
        category: &CategoryRecord,
        title: &str,
        offset: Duration,
        is_published: bool,
    ) -> PostRecord {
        let mut state = self.state.lock().await;
        let now = OffsetDateTime::now_utc();
        let post = PostRecord {
            id: state.next_id(),
            title: title.to_string(),
            text: format!("Body of {title}"),
            pub_date: now + offset,
            is_published,
            author_id: author.id,
            category_id: category.id,
            location_id: None,
            created_at: now,
        };
        state.posts.push(post.clone());
        post
    }

    pub async fn add_comment(&self, post: &PostRecord, author: &UserRecord, text: &str) -> CommentRecord {
        let mut state = self.state.lock().await;
        let comment = CommentRecord {
            id: state.next_id(),
            text: text.to_string(),
            post_id: post.id,
            author_id: author.id,
            created_at: OffsetDateTime::now_utc() + Duration::milliseconds(state.next_id),
        };
        state.comments.push(comment.clone());
        comment
    }

    pub async fn post(&self, id: PostId) -> Option<PostRecord> {
        let state = self.state.lock().await;
        state.posts.iter().find(|post| post.id == id).cloned()
    }

    pub async fn posts_by(&self, author: UserId) -> Vec<PostRecord> {
        let state = self.state.lock().await;
        state
            .posts
            .iter()
            .filter(|post| post.author_id == author)
            .cloned()
            .collect()
    }

    pub async fn comment(&self, id: CommentId) -> Option<CommentRecord> {
        let state = self.state.lock().await;
        state.comments.iter().find(|comment| comment.id == id).cloned()
    }

    pub async fn comments_on(&self, post: PostId) -> Vec<CommentRecord> {
        let state = self.state.lock().await;
        state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post)
            .cloned()
            .collect()
    }

    pub async fn user_named(&self, username: &str) -> Option<UserRecord> {
        let state = self.state.lock().await;
        state.users.iter().find(|user| user.username == username).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn count_posts(&self, query: &PostQuery) -> Result<u64, RepoError> {
        Ok(self.state.lock().await.matching(query).len() as u64)
    }

    async fn list_posts(
        &self,
        query: &PostQuery,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let entries = self.state.lock().await.matching(query);
        Ok(entries
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_post(&self, id: PostId) -> Result<Option<PostEntry>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .and_then(|post| state.entry(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let post = PostRecord {
            id: state.next_id(),
            title: params.title,
            text: params.text,
            pub_date: params.pub_date,
            is_published: params.is_published,
            author_id: params.author_id,
            category_id: params.category_id,
            location_id: params.location_id,
            created_at: OffsetDateTime::now_utc(),
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.text = params.text;
        post.pub_date = params.pub_date;
        post.is_published = params.is_published;
        post.category_id = params.category_id;
        post.location_id = params.location_id;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        state.posts.retain(|post| post.id != id);
        state.comments.retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post_id: PostId) -> Result<Vec<CommentEntry>, RepoError> {
        let state = self.state.lock().await;
        let mut comments: Vec<CommentEntry> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .filter_map(|comment| {
                let author = state.users.iter().find(|user| user.id == comment.author_id)?;
                Some(CommentEntry {
                    comment: comment.clone(),
                    author: AuthorRef::from(author),
                })
            })
            .collect();
        comments.sort_by(|left, right| {
            left.comment
                .created_at
                .cmp(&right.comment.created_at)
                .then(left.comment.id.cmp(&right.comment.id))
        });
        Ok(comments)
    }

    async fn find_comment(&self, id: CommentId) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self.comment(id).await)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let comment = CommentRecord {
            id: state.next_id(),
            text: params.text,
            post_id: params.post_id,
            author_id: params.author_id,
            created_at: OffsetDateTime::now_utc(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: CommentId, text: &str) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().await;
        let comment = state
            .comments
            .iter_mut()
            .find(|comment| comment.id == id)
            .ok_or(RepoError::NotFound)?;
        comment.text = text.to_string();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: CommentId) -> Result<(), RepoError> {
        self.state
            .lock()
            .await
            .comments
            .retain(|comment| comment.id != id);
        Ok(())
    }
}

#[async_trait]
impl CategoriesRepo for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        Ok(self.state.lock().await.categories.clone())
    }

    async fn find_category(&self, id: CategoryId) -> Result<Option<CategoryRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        if self.find_category_by_slug(&params.slug).await?.is_some() {
            return Err(RepoError::Duplicate {
                constraint: "categories_slug_key".into(),
            });
        }
        let mut state = self.state.lock().await;
        let category = CategoryRecord {
            id: state.next_id(),
            title: params.title,
            description: params.description,
            slug: params.slug,
            is_published: params.is_published,
            created_at: OffsetDateTime::now_utc(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }
}

#[async_trait]
impl LocationsRepo for MemoryStore {
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError> {
        Ok(self.state.lock().await.locations.clone())
    }

    async fn find_location(&self, id: LocationId) -> Result<Option<LocationRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.locations.iter().find(|l| l.id == id).cloned())
    }

    async fn create_location(
        &self,
        params: CreateLocationParams,
    ) -> Result<LocationRecord, RepoError> {
        Ok(self.add_location(&params.name, params.is_published).await)
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.user_named(username).await)
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".into(),
            });
        }
        let user = UserRecord {
            id: state.next_id(),
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            password_hash: params.password_hash,
            is_staff: false,
            is_superuser: false,
            date_joined: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == params.id)
            .ok_or(RepoError::NotFound)?;
        user.username = params.username;
        user.first_name = params.first_name;
        user.last_name = params.last_name;
        user.email = params.email;
        Ok(user.clone())
    }

    async fn set_privileges(
        &self,
        username: &str,
        is_staff: bool,
        is_superuser: bool,
    ) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .iter_mut()
            .find(|user| user.username == username)
            .ok_or(RepoError::NotFound)?;
        user.is_staff = is_staff;
        user.is_superuser = is_superuser;
        Ok(user.clone())
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut state = self.state.lock().await;
        let record = SessionRecord {
            id: state.next_id(),
            user_id: params.user_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
        };
        state.sessions.push(record.clone());
        Ok(record)
    }

    async fn find_session_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<SessionRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.sessions.iter().find(|s| s.prefix == prefix).cloned())
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), RepoError> {
        self.state.lock().await.sessions.retain(|s| s.id != id);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|s| s.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Reversible "hashing" so tests do not pay for Argon2.
pub struct PlainPasswords;

impl PlainPasswords {
    pub fn encode(password: &str) -> String {
        format!("plain${password}")
    }
}

#[async_trait]
impl PasswordService for PlainPasswords {
    async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        Ok(Self::encode(password))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        Ok(Self::encode(password) == hash)
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<SessionService>,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    /// `name=value` of the session cookie the response sets, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with(&format!("{SESSION_COOKIE}=")))
            .and_then(|value| value.split(';').next())
            .map(str::to_string)
    }
}

impl TestApp {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self::with_page_size(store, 10)
    }

    pub fn with_page_size(store: Arc<MemoryStore>, per_page: u32) -> Self {
        let per_page = NonZeroU32::new(per_page).expect("page size must be positive");
        let sessions = Arc::new(SessionService::new(
            store.clone(),
            store.clone(),
            Duration::hours(1),
        ));
        let state = HttpState {
            blog: Arc::new(BlogService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                Paginator::new(per_page),
            )),
            posts: Arc::new(PostService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
            )),
            comments: Arc::new(CommentService::new(store.clone(), store.clone())),
            accounts: Arc::new(AccountService::new(store.clone(), Arc::new(PlainPasswords))),
            sessions: sessions.clone(),
            health: store.clone(),
            secure_cookie: false,
        };
        Self {
            store,
            sessions,
            router: http::build_router(state),
        }
    }

    /// A `Cookie` header value carrying a fresh session for `user`.
    pub async fn sign_in(&self, user: &UserRecord) -> String {
        let issued = self
            .sessions
            .start(user.id)
            .await
            .expect("session should start");
        format!("{SESSION_COOKIE}={}", issued.token)
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> TestResponse {
        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).expect("request")).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
