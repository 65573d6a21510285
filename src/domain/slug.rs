//! Category slug helpers.
//!
//! Slugs appear in public URLs (`/category/{slug}/`), so they are restricted
//! to ASCII letters, digits, hyphens and underscores. Titles in any script are
//! transliterated by the `slug` crate before being lowered and hyphenated.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;
pub const MAX_SLUG_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` may only contain latin letters, digits, hyphens and underscores")]
    InvalidCharacters { slug: String },
    #[error("slug must be at most 64 characters")]
    TooLong,
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

/// Errors raised while generating a slug through an async uniqueness check.
#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from a human-readable title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    truncate_slug(&mut candidate, MAX_SLUG_LEN);
    Ok(candidate)
}

/// Cut a slugified string to at most `max` bytes without leaving a trailing hyphen.
fn truncate_slug(slug: &mut String, max: usize) {
    if slug.len() > max {
        slug.truncate(max);
        let trimmed = slug.trim_end_matches('-').len();
        slug.truncate(trimmed);
    }
}

fn suffixed(base: &str, attempt: usize) -> String {
    let suffix = format!("-{attempt}");
    let mut stem = base.to_string();
    truncate_slug(&mut stem, MAX_SLUG_LEN - suffix.len());
    stem.push_str(&suffix);
    stem
}

/// Check a slug supplied verbatim by an operator.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(SlugError::TooLong);
    }
    let valid = slug
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !valid {
        return Err(SlugError::InvalidCharacters {
            slug: slug.to_string(),
        });
    }
    Ok(())
}

/// Produce a slug from `input` that the async predicate reports as unused,
/// suffixing `-2`, `-3`, … on collisions.
pub async fn generate_unique_slug<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = suffixed(&base, attempt);
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}
