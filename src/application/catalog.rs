//! Operator-side management of categories and locations.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CategoriesRepo, CreateCategoryParams, CreateLocationParams, LocationsRepo, RepoError,
};
use crate::domain::entities::{CategoryRecord, LocationRecord};
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugAsyncError, generate_unique_slug, validate_slug};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("category slug `{0}` is already taken")]
    SlugTaken(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub description: String,
    pub is_published: bool,
}

#[derive(Clone)]
pub struct CatalogService {
    categories: Arc<dyn CategoriesRepo>,
    locations: Arc<dyn LocationsRepo>,
}

impl CatalogService {
    pub fn new(categories: Arc<dyn CategoriesRepo>, locations: Arc<dyn LocationsRepo>) -> Self {
        Self {
            categories,
            locations,
        }
    }

    pub async fn create_category(&self, input: NewCategory) -> Result<CategoryRecord, CatalogError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("title", "title must not be empty").into());
        }

        let slug = match input.slug.as_deref().map(str::trim) {
            Some(slug) => {
                validate_slug(slug).map_err(DomainError::from)?;
                if self.categories.find_category_by_slug(slug).await?.is_some() {
                    return Err(CatalogError::SlugTaken(slug.to_string()));
                }
                slug.to_string()
            }
            None => self.unique_slug(title).await?,
        };

        let record = self
            .categories
            .create_category(CreateCategoryParams {
                title: title.to_string(),
                description: input.description.trim().to_string(),
                slug,
                is_published: input.is_published,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { constraint } => CatalogError::SlugTaken(constraint),
                other => CatalogError::Repo(other),
            })?;

        info!(
            target = "blogicum::catalog",
            category_id = record.id,
            slug = %record.slug,
            is_published = record.is_published,
            "category created"
        );
        Ok(record)
    }

    pub async fn create_location(
        &self,
        name: &str,
        is_published: bool,
    ) -> Result<LocationRecord, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name", "name must not be empty").into());
        }

        let record = self
            .locations
            .create_location(CreateLocationParams {
                name: name.to_string(),
                is_published,
            })
            .await?;

        info!(
            target = "blogicum::catalog",
            location_id = record.id,
            is_published = record.is_published,
            "location created"
        );
        Ok(record)
    }

    async fn unique_slug(&self, title: &str) -> Result<String, CatalogError> {
        let categories = self.categories.clone();
        generate_unique_slug(title, |candidate| {
            let categories = categories.clone();
            let candidate = candidate.to_string();
            async move {
                categories
                    .find_category_by_slug(&candidate)
                    .await
                    .map(|found| found.is_none())
            }
        })
        .await
        .map_err(|err| match err {
            SlugAsyncError::Slug(err) => CatalogError::Domain(err.into()),
            SlugAsyncError::Predicate(err) => CatalogError::Repo(err),
        })
    }
}
