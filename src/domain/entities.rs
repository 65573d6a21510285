//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

pub type UserId = i64;
pub type PostId = i64;
pub type CategoryId = i64;
pub type LocationId = i64;
pub type CommentId = i64;
pub type SessionId = i64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: OffsetDateTime,
}

impl UserRecord {
    /// Full name when one is set, otherwise the username.
    pub fn display_name(&self) -> String {
        display_name(&self.username, &self.first_name, &self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRecord {
    pub id: LocationId,
    pub name: String,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub is_published: bool,
    pub author_id: UserId,
    pub category_id: CategoryId,
    pub location_id: Option<LocationId>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub text: String,
    pub post_id: PostId,
    pub author_id: UserId,
    pub created_at: OffsetDateTime,
}

/// Author columns loaded alongside posts and comments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRef {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl AuthorRef {
    pub fn display_name(&self) -> String {
        display_name(&self.username, &self.first_name, &self.last_name)
    }
}

impl From<&UserRecord> for AuthorRef {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
}

impl From<&CategoryRecord> for CategoryRef {
    fn from(category: &CategoryRecord) -> Self {
        Self {
            id: category.id,
            title: category.title.clone(),
            slug: category.slug.clone(),
            is_published: category.is_published,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRef {
    pub id: LocationId,
    pub name: String,
    pub is_published: bool,
}

impl From<&LocationRecord> for LocationRef {
    fn from(location: &LocationRecord) -> Self {
        Self {
            id: location.id,
            name: location.name.clone(),
            is_published: location.is_published,
        }
    }
}

/// A post together with its eagerly loaded relations.
///
/// `comment_count` is only populated when the producing query asked for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostEntry {
    pub post: PostRecord,
    pub author: AuthorRef,
    pub category: CategoryRef,
    pub location: Option<LocationRef>,
    pub comment_count: Option<u64>,
}

impl PostEntry {
    /// A post is public once it is published, its category is published and
    /// its publication date has been reached.
    pub fn is_public_at(&self, now: OffsetDateTime) -> bool {
        self.post.is_published && self.category.is_published && self.post.pub_date <= now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentEntry {
    pub comment: CommentRecord,
    pub author: AuthorRef,
}

/// A signed-in browser session. Only the digest of the secret is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

fn display_name(username: &str, first_name: &str, last_name: &str) -> String {
    let full = format!("{} {}", first_name.trim(), last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn entry(is_published: bool, category_published: bool, offset: Duration) -> PostEntry {
        let now = OffsetDateTime::now_utc();
        PostEntry {
            post: PostRecord {
                id: 1,
                title: "Title".into(),
                text: "Text".into(),
                pub_date: now + offset,
                is_published,
                author_id: 7,
                category_id: 3,
                location_id: None,
                created_at: now,
            },
            author: AuthorRef {
                id: 7,
                username: "writer".into(),
                first_name: String::new(),
                last_name: String::new(),
            },
            category: CategoryRef {
                id: 3,
                title: "Travel".into(),
                slug: "travel".into(),
                is_published: category_published,
            },
            location: None,
            comment_count: None,
        }
    }

    #[test]
    fn public_requires_all_three_conditions() {
        let now = OffsetDateTime::now_utc() + Duration::seconds(1);
        assert!(entry(true, true, Duration::hours(-1)).is_public_at(now));
        assert!(!entry(false, true, Duration::hours(-1)).is_public_at(now));
        assert!(!entry(true, false, Duration::hours(-1)).is_public_at(now));
        assert!(!entry(true, true, Duration::days(2)).is_public_at(now));
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let author = AuthorRef {
            id: 1,
            username: "anna".into(),
            first_name: "  ".into(),
            last_name: String::new(),
        };
        assert_eq!(author.display_name(), "anna");

        let named = AuthorRef {
            first_name: "Anna".into(),
            last_name: "Karenina".into(),
            ..author
        };
        assert_eq!(named.display_name(), "Anna Karenina");
    }
}
