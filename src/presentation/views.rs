//! Askama view models and rendering helpers.
//!
//! Views hold display-ready strings and flags only, so templates never have
//! to destructure domain options or format timestamps.

use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{
    OffsetDateTime,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::application::error::HttpError;
use crate::application::forms::{
    CommentForm, FormErrors, LoginForm, PostForm, ProfileForm, RegistrationForm,
    format_datetime_local,
};
use crate::application::pagination::{Page, PageSlot};
use crate::application::posts::PostFormChoices;
use crate::domain::access::Actor;
use crate::domain::entities::{
    CategoryRecord, CommentEntry, CommentRecord, PostEntry, UserRecord,
};

const DISPLAY_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none] [month repr:short] [year], [hour]:[minute]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Error pages are rendered without a viewer so they never depend on the
/// session lookup that may have failed.
pub fn render_error_page(status: StatusCode, message: &str) -> Response {
    let view = LayoutContext::new(
        ViewerView::anonymous(),
        status.canonical_reason().unwrap_or("Error"),
        ErrorPageView {
            status: status.as_u16(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.to_string(),
        },
    );
    match (ErrorTemplate { view }).render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, message.to_string()).into_response(),
    }
}

pub fn format_display_date(value: OffsetDateTime) -> String {
    value.format(DISPLAY_DATE).unwrap_or_default()
}

#[derive(Clone, Debug)]
pub struct ViewerView {
    pub signed_in: bool,
    pub username: String,
}

impl ViewerView {
    pub fn anonymous() -> Self {
        Self {
            signed_in: false,
            username: String::new(),
        }
    }

    pub fn from_user(user: Option<&UserRecord>) -> Self {
        match user {
            Some(user) => Self {
                signed_in: true,
                username: user.username.clone(),
            },
            None => Self::anonymous(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LayoutContext<T> {
    pub viewer: ViewerView,
    pub title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(viewer: ViewerView, title: impl Into<String>, content: T) -> Self {
        Self {
            viewer,
            title: title.into(),
            content,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostCardView {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub author_username: String,
    pub author_name: String,
    pub category_title: String,
    pub category_slug: String,
    pub category_is_published: bool,
    pub has_location: bool,
    pub location_name: String,
    pub pub_date: String,
    pub iso_date: String,
    pub show_comment_count: bool,
    pub comment_count: u64,
    pub is_public: bool,
    pub is_published: bool,
}

impl PostCardView {
    pub fn from_entry(entry: &PostEntry, now: OffsetDateTime) -> Self {
        let location = entry
            .location
            .as_ref()
            .filter(|location| location.is_published);
        Self {
            id: entry.post.id,
            title: entry.post.title.clone(),
            text: entry.post.text.clone(),
            author_username: entry.author.username.clone(),
            author_name: entry.author.display_name(),
            category_title: entry.category.title.clone(),
            category_slug: entry.category.slug.clone(),
            category_is_published: entry.category.is_published,
            has_location: location.is_some(),
            location_name: location
                .map(|location| location.name.clone())
                .unwrap_or_default(),
            pub_date: format_display_date(entry.post.pub_date),
            iso_date: entry.post.pub_date.format(&Rfc3339).unwrap_or_default(),
            show_comment_count: entry.comment_count.is_some(),
            comment_count: entry.comment_count.unwrap_or(0),
            is_public: entry.is_public_at(now),
            is_published: entry.post.is_published,
        }
    }

    pub fn excerpt(&self) -> String {
        const LIMIT: usize = 280;
        if self.text.chars().count() <= LIMIT {
            return self.text.clone();
        }
        let cut: String = self.text.chars().take(LIMIT).collect();
        format!("{}…", cut.trim_end())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSlotView {
    pub number: u64,
    pub is_current: bool,
    pub is_gap: bool,
}

#[derive(Clone, Debug)]
pub struct PaginatorView {
    pub base_path: String,
    pub number: u64,
    pub num_pages: u64,
    pub has_previous: bool,
    pub previous_number: u64,
    pub has_next: bool,
    pub next_number: u64,
    pub slots: Vec<PageSlotView>,
}

impl PaginatorView {
    pub fn from_page<T>(page: &Page<T>, base_path: impl Into<String>) -> Self {
        let slots = page
            .slots()
            .into_iter()
            .map(|slot| match slot {
                PageSlot::Number { number, current } => PageSlotView {
                    number,
                    is_current: current,
                    is_gap: false,
                },
                PageSlot::Gap => PageSlotView {
                    number: 0,
                    is_current: false,
                    is_gap: true,
                },
            })
            .collect();
        Self {
            base_path: base_path.into(),
            number: page.number(),
            num_pages: page.num_pages(),
            has_previous: page.has_previous(),
            previous_number: page.previous_number().unwrap_or(1),
            has_next: page.has_next(),
            next_number: page.next_number().unwrap_or(page.number()),
            slots,
        }
    }

    pub fn is_multi_page(&self) -> bool {
        self.num_pages > 1
    }
}

#[derive(Clone, Debug)]
pub struct PostListView {
    pub posts: Vec<PostCardView>,
    pub total: u64,
    pub paginator: PaginatorView,
}

impl PostListView {
    pub fn from_page(page: &Page<PostEntry>, base_path: &str, now: OffsetDateTime) -> Self {
        Self {
            posts: page
                .items
                .iter()
                .map(|entry| PostCardView::from_entry(entry, now))
                .collect(),
            total: page.total(),
            paginator: PaginatorView::from_page(page, base_path),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<PostListView>,
}

pub struct CategoryPageView {
    pub title: String,
    pub description: String,
    pub listing: PostListView,
}

impl CategoryPageView {
    pub fn new(category: &CategoryRecord, listing: PostListView) -> Self {
        Self {
            title: category.title.clone(),
            description: category.description.clone(),
            listing,
        }
    }
}

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryTemplate {
    pub view: LayoutContext<CategoryPageView>,
}

pub struct ProfilePageView {
    pub username: String,
    pub full_name: String,
    pub date_joined: String,
    pub is_owner: bool,
    pub listing: PostListView,
}

impl ProfilePageView {
    pub fn new(profile: &UserRecord, is_owner: bool, listing: PostListView) -> Self {
        Self {
            username: profile.username.clone(),
            full_name: profile.display_name(),
            date_joined: format_display_date(profile.date_joined),
            is_owner,
            listing,
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfilePageView>,
}

#[derive(Clone, Debug)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub author_username: String,
    pub author_name: String,
    pub created_at: String,
    pub can_edit: bool,
    pub can_delete: bool,
}

pub struct PostDetailView {
    pub post: PostCardView,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_comment: bool,
    pub comment_form: CommentForm,
    pub comment_errors: FormErrors,
}

impl PostDetailView {
    pub fn new(
        entry: &PostEntry,
        comments: &[CommentEntry],
        viewer: Option<&Actor>,
        now: OffsetDateTime,
    ) -> Self {
        let is_author = |author_id: i64| viewer.is_some_and(|actor| actor.id == author_id);
        let is_staff = viewer.is_some_and(|actor| actor.is_staff);
        let is_superuser = viewer.is_some_and(|actor| actor.is_superuser);

        let comments = comments
            .iter()
            .map(|entry| CommentView {
                id: entry.comment.id,
                post_id: entry.comment.post_id,
                text: entry.comment.text.clone(),
                author_username: entry.author.username.clone(),
                author_name: entry.author.display_name(),
                created_at: format_display_date(entry.comment.created_at),
                can_edit: is_author(entry.comment.author_id),
                can_delete: is_author(entry.comment.author_id) || is_staff,
            })
            .collect();

        Self {
            post: PostCardView::from_entry(entry, now),
            comments,
            can_edit: is_author(entry.post.author_id),
            can_delete: is_author(entry.post.author_id) || is_superuser,
            can_comment: viewer.is_some(),
            comment_form: CommentForm::default(),
            comment_errors: FormErrors::default(),
        }
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

#[derive(Template)]
#[template(path = "detail.html")]
pub struct DetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Clone, Debug)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub struct PostFormView {
    pub heading: String,
    pub action: String,
    pub submit_label: String,
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub is_published: bool,
    pub categories: Vec<OptionView>,
    pub locations: Vec<OptionView>,
    pub errors: FormErrors,
}

impl PostFormView {
    pub fn blank(action: &str, choices: &PostFormChoices) -> Self {
        let form = PostForm {
            pub_date: format_datetime_local(OffsetDateTime::now_utc()),
            is_published: Some("on".to_string()),
            ..PostForm::default()
        };
        Self::from_form("New post", action, "Publish", &form, choices, FormErrors::default())
    }

    pub fn from_post(entry: &PostEntry, action: &str, choices: &PostFormChoices) -> Self {
        let form = PostForm {
            title: entry.post.title.clone(),
            text: entry.post.text.clone(),
            pub_date: format_datetime_local(entry.post.pub_date),
            category: entry.post.category_id.to_string(),
            location: entry
                .post
                .location_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            is_published: entry.post.is_published.then(|| "on".to_string()),
        };
        Self::from_form("Edit post", action, "Save", &form, choices, FormErrors::default())
    }

    pub fn from_form(
        heading: &str,
        action: &str,
        submit_label: &str,
        form: &PostForm,
        choices: &PostFormChoices,
        errors: FormErrors,
    ) -> Self {
        let categories = choices
            .categories
            .iter()
            .map(|category| OptionView {
                value: category.id.to_string(),
                label: category.title.clone(),
                selected: category.id.to_string() == form.category.trim(),
            })
            .collect();
        let locations = choices
            .locations
            .iter()
            .map(|location| OptionView {
                value: location.id.to_string(),
                label: location.name.clone(),
                selected: location.id.to_string() == form.location.trim(),
            })
            .collect();

        Self {
            heading: heading.to_string(),
            action: action.to_string(),
            submit_label: submit_label.to_string(),
            title: form.title.clone(),
            text: form.text.clone(),
            pub_date: form.pub_date.clone(),
            is_published: form.published_checked(),
            categories,
            locations,
            errors,
        }
    }

    pub fn no_location_selected(&self) -> bool {
        !self.locations.iter().any(|option| option.selected)
    }
}

#[derive(Template)]
#[template(path = "create.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct PostDeleteView {
    pub post: PostCardView,
    pub action: String,
}

#[derive(Template)]
#[template(path = "post_delete.html")]
pub struct PostDeleteTemplate {
    pub view: LayoutContext<PostDeleteView>,
}

pub struct CommentFormView {
    pub post_id: i64,
    pub post_title: String,
    pub action: String,
    pub is_delete: bool,
    pub text: String,
    pub errors: FormErrors,
}

impl CommentFormView {
    pub fn edit(
        post_title: &str,
        comment: &CommentRecord,
        form: Option<&CommentForm>,
        errors: FormErrors,
    ) -> Self {
        Self {
            post_id: comment.post_id,
            post_title: post_title.to_string(),
            action: format!(
                "/posts/{}/edit_comment/{}/",
                comment.post_id, comment.id
            ),
            is_delete: false,
            text: form
                .map(|form| form.text.clone())
                .unwrap_or_else(|| comment.text.clone()),
            errors,
        }
    }

    pub fn delete(post_title: &str, comment: &CommentRecord) -> Self {
        Self {
            post_id: comment.post_id,
            post_title: post_title.to_string(),
            action: format!(
                "/posts/{}/delete_comment/{}/",
                comment.post_id, comment.id
            ),
            is_delete: true,
            text: comment.text.clone(),
            errors: FormErrors::default(),
        }
    }
}

#[derive(Template)]
#[template(path = "comment.html")]
pub struct CommentTemplate {
    pub view: LayoutContext<CommentFormView>,
}

pub struct ProfileFormView {
    pub form: ProfileForm,
    pub errors: FormErrors,
}

impl ProfileFormView {
    pub fn from_user(user: &UserRecord) -> Self {
        Self {
            form: ProfileForm {
                username: user.username.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                email: user.email.clone(),
            },
            errors: FormErrors::default(),
        }
    }
}

#[derive(Template)]
#[template(path = "user.html")]
pub struct ProfileFormTemplate {
    pub view: LayoutContext<ProfileFormView>,
}

pub struct RegistrationView {
    pub username: String,
    pub email: String,
    pub errors: FormErrors,
}

impl RegistrationView {
    pub fn new(form: &RegistrationForm, errors: FormErrors) -> Self {
        Self {
            username: form.username.clone(),
            email: form.email.clone(),
            errors,
        }
    }
}

#[derive(Template)]
#[template(path = "registration.html")]
pub struct RegistrationTemplate {
    pub view: LayoutContext<RegistrationView>,
}

pub struct LoginView {
    pub username: String,
    pub next: String,
    pub failed: bool,
}

impl LoginView {
    pub fn new(form: &LoginForm, failed: bool) -> Self {
        Self {
            username: form.username.clone(),
            next: form.next.clone(),
            failed,
        }
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

pub struct ErrorPageView {
    pub status: u16,
    pub title: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
