//! Post listing queries.
//!
//! A [`PostQuery`] is an explicit description of which posts a listing shows
//! and in which order. Repositories render it to SQL; [`PostQuery::admits`]
//! and [`PostQuery::compare`] give the same semantics over loaded entries.
//! Each query captures its own `as_of` instant, so two listings built in
//! different requests never share a stale notion of "now".

use std::cmp::Ordering;

use time::OffsetDateTime;

use crate::domain::entities::{CategoryId, PostEntry, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    #[default]
    PubDateDesc,
    PubDateAsc,
    TitleAsc,
}

impl PostSort {
    /// `ORDER BY` clause body; always ends with an id tiebreaker.
    pub fn order_by_sql(self) -> &'static str {
        match self {
            PostSort::PubDateDesc => "p.pub_date DESC, p.id DESC",
            PostSort::PubDateAsc => "p.pub_date ASC, p.id ASC",
            PostSort::TitleAsc => "LOWER(p.title) ASC, p.id ASC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub as_of: OffsetDateTime,
    pub include_unpublished: bool,
    pub exclude_author: Option<UserId>,
    pub author: Option<UserId>,
    pub category: Option<CategoryId>,
    pub with_comment_count: bool,
    pub sort: PostSort,
}

impl PostQuery {
    /// Every post, regardless of publication state.
    pub fn all(as_of: OffsetDateTime) -> Self {
        Self {
            as_of,
            include_unpublished: true,
            exclude_author: None,
            author: None,
            category: None,
            with_comment_count: false,
            sort: PostSort::default(),
        }
    }

    /// Posts visible to the public at `as_of`.
    pub fn published(as_of: OffsetDateTime) -> Self {
        Self {
            include_unpublished: false,
            ..Self::all(as_of)
        }
    }

    pub fn including_unpublished(mut self, include: bool) -> Self {
        self.include_unpublished = include;
        self
    }

    pub fn by_author(mut self, author: UserId) -> Self {
        self.author = Some(author);
        self
    }

    pub fn excluding_author(mut self, author: UserId) -> Self {
        self.exclude_author = Some(author);
        self
    }

    pub fn in_category(mut self, category: CategoryId) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_comment_count(mut self) -> Self {
        self.with_comment_count = true;
        self
    }

    pub fn sorted_by(mut self, sort: PostSort) -> Self {
        self.sort = sort;
        self
    }

    /// Whether a loaded entry belongs to the result set.
    pub fn admits(&self, entry: &PostEntry) -> bool {
        if !self.include_unpublished && !entry.is_public_at(self.as_of) {
            return false;
        }
        if self.exclude_author == Some(entry.post.author_id) {
            return false;
        }
        if self.author.is_some_and(|author| author != entry.post.author_id) {
            return false;
        }
        if self
            .category
            .is_some_and(|category| category != entry.post.category_id)
        {
            return false;
        }
        true
    }

    /// Result ordering between two admitted entries.
    pub fn compare(&self, left: &PostEntry, right: &PostEntry) -> Ordering {
        match self.sort {
            PostSort::PubDateDesc => right
                .post
                .pub_date
                .cmp(&left.post.pub_date)
                .then_with(|| right.post.id.cmp(&left.post.id)),
            PostSort::PubDateAsc => left
                .post
                .pub_date
                .cmp(&right.post.pub_date)
                .then_with(|| left.post.id.cmp(&right.post.id)),
            PostSort::TitleAsc => left
                .post
                .title
                .to_lowercase()
                .cmp(&right.post.title.to_lowercase())
                .then_with(|| left.post.id.cmp(&right.post.id)),
        }
    }
}
