//! Post authoring: create, edit and delete.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::forms::{FormErrors, PostDraft, PostForm};
use crate::application::repos::{
    CategoriesRepo, CreatePostParams, LocationsRepo, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams,
};
use crate::domain::access::{AccessDenied, Action, Actor, authorize_post};
use crate::domain::entities::{CategoryRecord, LocationRecord, PostEntry, PostId, PostRecord};
use crate::infra::telemetry;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post {0} not found")]
    NotFound(PostId),
    #[error(transparent)]
    Denied(#[from] AccessDenied),
    #[error("invalid post: {0}")]
    Invalid(FormErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Category and location options offered by the post form.
#[derive(Debug, Clone, Default)]
pub struct PostFormChoices {
    pub categories: Vec<CategoryRecord>,
    pub locations: Vec<LocationRecord>,
}

#[derive(Clone)]
pub struct PostService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    locations: Arc<dyn LocationsRepo>,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        locations: Arc<dyn LocationsRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            locations,
        }
    }

    /// Only published categories and locations are offered.
    pub async fn form_choices(&self) -> Result<PostFormChoices, PostError> {
        let mut categories = self.categories.list_categories().await?;
        categories.retain(|category| category.is_published);
        let mut locations = self.locations.list_locations().await?;
        locations.retain(|location| location.is_published);
        Ok(PostFormChoices {
            categories,
            locations,
        })
    }

    pub async fn create(&self, actor: &Actor, form: &PostForm) -> Result<PostRecord, PostError> {
        let draft = self.validate(form).await?;
        let record = self
            .writer
            .create_post(CreatePostParams {
                title: draft.title,
                text: draft.text,
                pub_date: draft.pub_date,
                is_published: draft.is_published,
                author_id: actor.id,
                category_id: draft.category_id,
                location_id: draft.location_id,
            })
            .await?;

        telemetry::record_post_created();
        info!(
            target = "blogicum::posts",
            post_id = record.id,
            author_id = actor.id,
            "post created"
        );
        Ok(record)
    }

    /// The post to prefill the edit form with, if `actor` may edit it.
    pub async fn edit_target(&self, actor: &Actor, id: PostId) -> Result<PostEntry, PostError> {
        self.authorized(actor, Action::EditPost, id).await
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: PostId,
        form: &PostForm,
    ) -> Result<PostRecord, PostError> {
        self.authorized(actor, Action::EditPost, id).await?;
        let draft = self.validate(form).await?;
        let record = self
            .writer
            .update_post(UpdatePostParams {
                id,
                title: draft.title,
                text: draft.text,
                pub_date: draft.pub_date,
                is_published: draft.is_published,
                category_id: draft.category_id,
                location_id: draft.location_id,
            })
            .await?;

        info!(
            target = "blogicum::posts",
            post_id = id,
            author_id = actor.id,
            "post updated"
        );
        Ok(record)
    }

    pub async fn delete_target(&self, actor: &Actor, id: PostId) -> Result<PostEntry, PostError> {
        self.authorized(actor, Action::DeletePost, id).await
    }

    pub async fn delete(&self, actor: &Actor, id: PostId) -> Result<(), PostError> {
        self.authorized(actor, Action::DeletePost, id).await?;
        self.writer.delete_post(id).await?;
        info!(
            target = "blogicum::posts",
            post_id = id,
            actor_id = actor.id,
            "post deleted"
        );
        Ok(())
    }

    async fn authorized(
        &self,
        actor: &Actor,
        action: Action,
        id: PostId,
    ) -> Result<PostEntry, PostError> {
        let entry = self
            .reader
            .find_post(id)
            .await?
            .ok_or(PostError::NotFound(id))?;
        authorize_post(actor, action, &entry.post)?;
        Ok(entry)
    }

    /// Field validation followed by reference checks; nothing is written
    /// unless both pass.
    async fn validate(&self, form: &PostForm) -> Result<PostDraft, PostError> {
        let draft = form.validate().map_err(PostError::Invalid)?;

        let mut errors = FormErrors::default();
        let category = self.categories.find_category(draft.category_id).await?;
        if !category.is_some_and(|category| category.is_published) {
            errors.add("category", "Select a category.");
        }
        if let Some(location_id) = draft.location_id
            && !self
                .locations
                .find_location(location_id)
                .await?
                .is_some_and(|location| location.is_published)
        {
            errors.add("location", "Select a valid location.");
        }

        if errors.is_empty() {
            Ok(draft)
        } else {
            Err(PostError::Invalid(errors))
        }
    }
}
