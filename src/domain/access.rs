//! Ownership and privilege rules for posts and comments.
//!
//! Edits belong to the author alone. Deletion has an override: superusers may
//! remove any post, staff may remove any comment. Callers map a denial to a
//! response through [`Action::class`] so every edit is refused the same way
//! and every delete is refused the same way.

use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{CommentRecord, PostEntry, PostRecord, UserId, UserRecord};

/// The signed-in user an operation is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<&UserRecord> for Actor {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    EditPost,
    DeletePost,
    EditComment,
    DeleteComment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    Edit,
    Delete,
}

impl Action {
    pub fn class(self) -> ActionClass {
        match self {
            Action::EditPost | Action::EditComment => ActionClass::Edit,
            Action::DeletePost | Action::DeleteComment => ActionClass::Delete,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::EditPost => "edit_post",
            Action::DeletePost => "delete_post",
            Action::EditComment => "edit_comment",
            Action::DeleteComment => "delete_comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("user {actor} is not allowed to {}", .action.as_str())]
pub struct AccessDenied {
    pub actor: UserId,
    pub action: Action,
}

/// Check a post-level action for `actor`. Comment actions are always denied.
pub fn authorize_post(
    actor: &Actor,
    action: Action,
    post: &PostRecord,
) -> Result<(), AccessDenied> {
    let is_author = actor.id == post.author_id;
    let allowed = match action {
        Action::EditPost => is_author,
        Action::DeletePost => is_author || actor.is_superuser,
        Action::EditComment | Action::DeleteComment => false,
    };
    verdict(actor, action, allowed)
}

/// Check a comment-level action for `actor`.
pub fn authorize_comment(
    actor: &Actor,
    action: Action,
    comment: &CommentRecord,
) -> Result<(), AccessDenied> {
    let is_author = actor.id == comment.author_id;
    let allowed = match action {
        Action::EditComment => is_author,
        Action::DeleteComment => is_author || actor.is_staff,
        Action::EditPost | Action::DeletePost => false,
    };
    verdict(actor, action, allowed)
}

/// Whether `viewer` may open the detail page of `entry`.
///
/// Public posts are visible to everyone; anything else only to its author.
pub fn can_view_post(viewer: Option<&Actor>, entry: &PostEntry, now: OffsetDateTime) -> bool {
    entry.is_public_at(now) || viewer.is_some_and(|actor| actor.id == entry.post.author_id)
}

fn verdict(actor: &Actor, action: Action, allowed: bool) -> Result<(), AccessDenied> {
    if allowed {
        Ok(())
    } else {
        Err(AccessDenied {
            actor: actor.id,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{AuthorRef, CategoryRef};
    use time::Duration;

    const AUTHOR: UserId = 1;
    const STRANGER: UserId = 2;

    fn actor(id: UserId, is_staff: bool, is_superuser: bool) -> Actor {
        Actor {
            id,
            is_staff,
            is_superuser,
        }
    }

    fn post(pub_date: OffsetDateTime, is_published: bool) -> PostRecord {
        PostRecord {
            id: 10,
            title: "Post".into(),
            text: "Body".into(),
            pub_date,
            is_published,
            author_id: AUTHOR,
            category_id: 1,
            location_id: None,
            created_at: pub_date,
        }
    }

    fn comment() -> CommentRecord {
        CommentRecord {
            id: 5,
            text: "Nice".into(),
            post_id: 10,
            author_id: AUTHOR,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn entry(post: PostRecord) -> PostEntry {
        PostEntry {
            post,
            author: AuthorRef {
                id: AUTHOR,
                username: "author".into(),
                first_name: String::new(),
                last_name: String::new(),
            },
            category: CategoryRef {
                id: 1,
                title: "General".into(),
                slug: "general".into(),
                is_published: true,
            },
            location: None,
            comment_count: None,
        }
    }

    #[test]
    fn only_author_edits_post() {
        let record = post(OffsetDateTime::now_utc(), true);
        assert!(authorize_post(&actor(AUTHOR, false, false), Action::EditPost, &record).is_ok());
        assert!(authorize_post(&actor(STRANGER, true, true), Action::EditPost, &record).is_err());
    }

    #[test]
    fn superuser_may_delete_any_post_but_staff_may_not() {
        let record = post(OffsetDateTime::now_utc(), true);
        assert!(authorize_post(&actor(STRANGER, false, true), Action::DeletePost, &record).is_ok());
        let denied = authorize_post(&actor(STRANGER, true, false), Action::DeletePost, &record)
            .expect_err("staff cannot delete foreign posts");
        assert_eq!(denied.action.class(), ActionClass::Delete);
    }

    #[test]
    fn only_author_edits_comment() {
        let record = comment();
        assert!(
            authorize_comment(&actor(AUTHOR, false, false), Action::EditComment, &record).is_ok()
        );
        let denied = authorize_comment(&actor(STRANGER, true, true), Action::EditComment, &record)
            .expect_err("edit denied");
        assert_eq!(denied.action.class(), ActionClass::Edit);
    }

    #[test]
    fn staff_may_delete_any_comment() {
        let record = comment();
        assert!(
            authorize_comment(&actor(STRANGER, true, false), Action::DeleteComment, &record)
                .is_ok()
        );
        assert!(
            authorize_comment(&actor(STRANGER, false, false), Action::DeleteComment, &record)
                .is_err()
        );
    }

    #[test]
    fn mismatched_action_kinds_are_denied() {
        let record = post(OffsetDateTime::now_utc(), true);
        assert!(authorize_post(&actor(AUTHOR, true, true), Action::EditComment, &record).is_err());
    }

    #[test]
    fn unpublished_post_visible_only_to_author() {
        let now = OffsetDateTime::now_utc();
        let draft = entry(post(now - Duration::hours(1), false));
        assert!(can_view_post(Some(&actor(AUTHOR, false, false)), &draft, now));
        assert!(!can_view_post(Some(&actor(STRANGER, true, true)), &draft, now));
        assert!(!can_view_post(None, &draft, now));

        let scheduled = entry(post(now + Duration::days(1), true));
        assert!(!can_view_post(None, &scheduled, now));

        let public = entry(post(now - Duration::hours(1), true));
        assert!(can_view_post(None, &public, now));
    }
}
