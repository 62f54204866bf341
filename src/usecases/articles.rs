//! Article workflow: browse, draft, submit, review.

use serde_json::json;

use super::{rejected, Backend};
use crate::auth::Capability;
use crate::client::operations::{self, extract, ArticleMutationPayload};
use crate::error::{AppError, ValidationErrorBuilder};
use crate::listing::{shape, ArticleFilter, ShapedPage};
use crate::models::{ArticleInput, ArticleStatus, ArticleSummary, Id};
use crate::validation;

pub struct ArticleService {
    backend: Backend,
}

impl ArticleService {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Published articles, shaped client-side. No session needed.
    pub async fn list(
        &self,
        filter: &ArticleFilter,
        page: usize,
        page_size: usize,
    ) -> Result<ShapedPage<ArticleSummary>, AppError> {
        let mut items = self
            .fetch(json!({ "status": ArticleStatus::Published.to_string() }))
            .await?;
        items.retain(|a| a.status == ArticleStatus::Published);
        Ok(shape(&items, filter, page, page_size).map(Clone::clone))
    }

    /// The signed-in writer's own articles in any status
    pub async fn list_mine(
        &self,
        filter: &ArticleFilter,
        page: usize,
        page_size: usize,
    ) -> Result<ShapedPage<ArticleSummary>, AppError> {
        let user = self.backend.require(Capability::Write).await?;
        let items = self
            .fetch(json!({ "authorId": user.id.as_key() }))
            .await?;
        Ok(shape(&items, filter, page, page_size).map(Clone::clone))
    }

    /// Articles waiting for review
    pub async fn review_queue(
        &self,
        filter: &ArticleFilter,
        page: usize,
        page_size: usize,
    ) -> Result<ShapedPage<ArticleSummary>, AppError> {
        self.backend.require(Capability::Manage).await?;
        let mut items = self
            .fetch(json!({ "status": ArticleStatus::Pending.to_string() }))
            .await?;
        items.retain(|a| a.status == ArticleStatus::Pending);
        Ok(shape(&items, filter, page, page_size).map(Clone::clone))
    }

    pub async fn create_draft(&self, input: &ArticleInput) -> Result<ArticleSummary, AppError> {
        let user = self.backend.require(Capability::Write).await?;

        let mut errors = ValidationErrorBuilder::new();
        errors
            .check("title", validation::validate_title(&input.title))
            .check("content", validation::validate_content(&input.content))
            .check("excerpt", validation::validate_excerpt(&input.excerpt));
        if let Some(category_id) = &input.category_id {
            errors.check("categoryId", validation::validate_id(category_id));
        }
        for tag_id in &input.tag_ids {
            errors.check("tagIds", validation::validate_id(tag_id));
        }
        errors.finish()?;

        let mut normalized = input.clone();
        normalized.title = input.title.trim().to_string();

        let article = self
            .run_mutation(
                &operations::CREATE_ARTICLE,
                json!({ "input": normalized }),
                "createArticle",
                "The draft could not be saved",
            )
            .await?;
        tracing::info!(article_id = %article.id, user_id = %user.id, "Draft created");
        Ok(article)
    }

    pub async fn submit_for_review(&self, id: &Id) -> Result<ArticleSummary, AppError> {
        let user = self.backend.require(Capability::Write).await?;
        validation::validate_id(id).map_err(|e| AppError::validation_field("id", e))?;

        let article = self
            .run_mutation(
                &operations::SUBMIT_ARTICLE,
                json!({ "id": id.as_key() }),
                "submitArticle",
                "The article could not be submitted",
            )
            .await?;
        tracing::info!(article_id = %id, user_id = %user.id, "Article submitted for review");
        Ok(article)
    }

    pub async fn publish(&self, id: &Id) -> Result<ArticleSummary, AppError> {
        let user = self.backend.require(Capability::Manage).await?;
        validation::validate_id(id).map_err(|e| AppError::validation_field("id", e))?;

        let article = self
            .run_mutation(
                &operations::PUBLISH_ARTICLE,
                json!({ "id": id.as_key() }),
                "publishArticle",
                "The article could not be published",
            )
            .await?;
        tracing::info!(article_id = %id, user_id = %user.id, "Article published");
        Ok(article)
    }

    pub async fn reject(&self, id: &Id, reason: &str) -> Result<ArticleSummary, AppError> {
        let user = self.backend.require(Capability::Manage).await?;

        let mut errors = ValidationErrorBuilder::new();
        errors
            .check("id", validation::validate_id(id))
            .check("reason", validation::validate_reason(reason));
        errors.finish()?;

        let article = self
            .run_mutation(
                &operations::REJECT_ARTICLE,
                json!({ "id": id.as_key(), "reason": reason.trim() }),
                "rejectArticle",
                "The article could not be rejected",
            )
            .await?;
        tracing::info!(article_id = %id, user_id = %user.id, "Article rejected");
        Ok(article)
    }

    async fn fetch(&self, variables: serde_json::Value) -> Result<Vec<ArticleSummary>, AppError> {
        let data = self.backend.query(&operations::ARTICLES, variables).await?;
        let items: Option<Vec<ArticleSummary>> = extract(data, "articles")?;
        let items = items.unwrap_or_default();
        tracing::debug!(count = items.len(), "Fetched articles");
        Ok(items)
    }

    async fn run_mutation(
        &self,
        operation: &operations::Operation,
        variables: serde_json::Value,
        field: &str,
        fallback: &str,
    ) -> Result<ArticleSummary, AppError> {
        let data = self.backend.mutate(operation, variables).await?;
        let payload: ArticleMutationPayload = extract(data, field)?;
        match (payload.success, payload.article) {
            (Some(false), _) | (_, None) => Err(rejected(payload.errors.as_ref(), fallback)),
            (_, Some(article)) => Ok(article),
        }
    }
}
