//! Knowledge bases and categories.

use super::{Catalog, CatalogError, UNKNOWN_CHOICE};
use crate::auth::{AuthorizationContext, Resource};
use crate::db::{
    ArticleFilter, CategoryFilter, DeleteOutcome, EmployeeFilter, EmployeeOrder,
    KnowledgeBaseFilter, PaginatedResult, Pagination, Visibility,
};
use crate::forms::{normalize_search, CategoryFields, CategoryInput, KnowledgeBaseInput};
use crate::models::{
    ArticleSummary, Category, CategoryOverview, CategoryUpdate, EmployeeSummary, KnowledgeBase,
    KnowledgeBaseSummary,
};
use crate::validation::{FormErrors, NON_FIELD_ERRORS};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const TITLE_TAKEN: &str = "Knowledge base with this Title already exists.";
const TOPIC_TAKEN: &str = "Category with this Topic and Knowledge base already exists.";

/// A knowledge base with every category and its counts.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeBaseDetail {
    pub knowledge_base: KnowledgeBase,
    pub categories: Vec<CategoryOverview>,
}

impl KnowledgeBaseDetail {
    pub fn articles_count(&self) -> u64 {
        self.categories.iter().map(|c| c.articles_count).sum()
    }

    pub fn published_articles_count(&self) -> u64 {
        self.categories
            .iter()
            .map(|c| c.published_articles_count)
            .sum()
    }
}

impl Catalog {
    #[instrument(skip(self))]
    pub async fn list_knowledge_bases(
        &self,
        search: Option<&str>,
        pagination: Pagination,
    ) -> Result<PaginatedResult<KnowledgeBaseSummary>, CatalogError> {
        let filter = KnowledgeBaseFilter {
            title: normalize_search(search),
        };
        Ok(self.knowledge_bases.list(&filter, &pagination).await?)
    }

    /// All knowledge bases by title, for select inputs.
    pub async fn knowledge_base_choices(&self) -> Result<Vec<KnowledgeBase>, CatalogError> {
        Ok(self.knowledge_bases.list_all().await?)
    }

    pub async fn knowledge_base(&self, id: Uuid) -> Result<KnowledgeBase, CatalogError> {
        self.knowledge_bases
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Knowledge base", id))
    }

    #[instrument(skip(self))]
    pub async fn knowledge_base_detail(
        &self,
        id: Uuid,
    ) -> Result<KnowledgeBaseDetail, CatalogError> {
        let knowledge_base = self.knowledge_base(id).await?;
        let filter = CategoryFilter {
            topic: None,
            knowledge_base_id: Some(id),
        };
        let categories = self.categories.list_all(&filter).await?;
        Ok(KnowledgeBaseDetail {
            knowledge_base,
            categories,
        })
    }

    pub async fn knowledge_base_categories(
        &self,
        id: Uuid,
        pagination: Pagination,
    ) -> Result<(KnowledgeBase, PaginatedResult<CategoryOverview>), CatalogError> {
        let knowledge_base = self.knowledge_base(id).await?;
        let filter = CategoryFilter {
            topic: None,
            knowledge_base_id: Some(id),
        };
        let categories = self.categories.list(&filter, &pagination).await?;
        Ok((knowledge_base, categories))
    }

    /// Loads a knowledge base the caller may edit or delete.
    pub async fn editable_knowledge_base(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<KnowledgeBase, CatalogError> {
        let knowledge_base = self.knowledge_base(id).await?;
        if let Err(denied) =
            ctx.ensure_can_modify(Resource::KnowledgeBase, knowledge_base.created_by)
        {
            warn!(actor = %ctx.actor_name, knowledge_base_id = %id, "Knowledge base change denied");
            return Err(denied.into());
        }
        Ok(knowledge_base)
    }

    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn create_knowledge_base(
        &self,
        ctx: &AuthorizationContext,
        input: &KnowledgeBaseInput,
    ) -> Result<KnowledgeBase, CatalogError> {
        let title = input.clean()?;
        self.ensure_title_free(&title, None).await?;

        let knowledge_base = KnowledgeBase::new(title, Some(ctx.actor_id));
        let created = self
            .knowledge_bases
            .create(&knowledge_base)
            .await
            .map_err(|e| {
                if e.is_constraint() {
                    CatalogError::invalid("title", TITLE_TAKEN)
                } else {
                    e.into()
                }
            })?;

        info!(knowledge_base_id = %created.id, title = %created.title, "Created knowledge base");
        Ok(created)
    }

    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn update_knowledge_base(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
        input: &KnowledgeBaseInput,
    ) -> Result<KnowledgeBase, CatalogError> {
        self.editable_knowledge_base(ctx, id).await?;
        let title = input.clean()?;
        self.ensure_title_free(&title, Some(id)).await?;

        let updated = self
            .knowledge_bases
            .update_title(id, &title)
            .await
            .map_err(|e| {
                if e.is_constraint() {
                    CatalogError::invalid("title", TITLE_TAKEN)
                } else {
                    e.into()
                }
            })?;

        info!(knowledge_base_id = %id, title = %updated.title, "Updated knowledge base");
        Ok(updated)
    }

    /// Deletes an empty knowledge base. Fails with `Conflict` while it owns
    /// any category.
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor_name))]
    pub async fn delete_knowledge_base(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<(), CatalogError> {
        let knowledge_base = self.editable_knowledge_base(ctx, id).await?;

        match self.knowledge_bases.delete_if_empty(id).await? {
            DeleteOutcome::Deleted => {
                info!(
                    knowledge_base_id = %id,
                    title = %knowledge_base.title,
                    "Deleted knowledge base"
                );
                Ok(())
            }
            DeleteOutcome::NotFound => Err(CatalogError::not_found("Knowledge base", id)),
            DeleteOutcome::HasDependents => {
                let count = self.knowledge_bases.count_categories(id).await?;
                Err(CatalogError::Conflict(format!(
                    "Cannot delete knowledge base \"{}\": it still has {} categor{}.",
                    knowledge_base.title,
                    count,
                    if count == 1 { "y" } else { "ies" }
                )))
            }
        }
    }

    async fn ensure_title_free(
        &self,
        title: &str,
        current: Option<Uuid>,
    ) -> Result<(), CatalogError> {
        match self.knowledge_bases.get_by_title(title).await? {
            Some(existing) if Some(existing.id) != current => {
                Err(CatalogError::invalid("title", TITLE_TAKEN))
            }
            _ => Ok(()),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_categories(
        &self,
        search: Option<&str>,
        pagination: Pagination,
    ) -> Result<PaginatedResult<CategoryOverview>, CatalogError> {
        let filter = CategoryFilter {
            topic: normalize_search(search),
            knowledge_base_id: None,
        };
        Ok(self.categories.list(&filter, &pagination).await?)
    }

    /// All categories with their knowledge base, for select inputs.
    pub async fn category_choices(&self) -> Result<Vec<CategoryOverview>, CatalogError> {
        Ok(self.categories.list_all(&CategoryFilter::default()).await?)
    }

    pub async fn category(&self, id: Uuid) -> Result<Category, CatalogError> {
        self.categories
            .get(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Category", id))
    }

    pub async fn category_detail(&self, id: Uuid) -> Result<CategoryOverview, CatalogError> {
        self.categories
            .get_overview(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Category", id))
    }

    /// Published articles in a category, newest first.
    pub async fn category_articles(
        &self,
        id: Uuid,
        pagination: Pagination,
    ) -> Result<(Category, PaginatedResult<ArticleSummary>), CatalogError> {
        let category = self.category(id).await?;
        let filter = ArticleFilter {
            category_id: Some(id),
            visibility: Visibility::Published,
            ..Default::default()
        };
        let articles = self.articles.list(&filter, &pagination).await?;
        Ok((category, articles))
    }

    /// Employees with at least one published article in the category.
    pub async fn category_authors(
        &self,
        id: Uuid,
        pagination: Pagination,
    ) -> Result<(Category, PaginatedResult<EmployeeSummary>), CatalogError> {
        let category = self.category(id).await?;
        let filter = EmployeeFilter {
            category_id: Some(id),
            ..Default::default()
        };
        let authors = self
            .employees
            .list(&filter, EmployeeOrder::Name, &pagination)
            .await?;
        Ok((category, authors))
    }

    pub async fn editable_category(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<Category, CatalogError> {
        let category = self.category(id).await?;
        if let Err(denied) = ctx.ensure_can_modify(Resource::Category, category.created_by) {
            warn!(actor = %ctx.actor_name, category_id = %id, "Category change denied");
            return Err(denied.into());
        }
        Ok(category)
    }

    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn create_category(
        &self,
        ctx: &AuthorizationContext,
        input: &CategoryInput,
    ) -> Result<Category, CatalogError> {
        let fields = self.clean_category(input, None).await?;

        let category = Category::new(fields.topic, fields.knowledge_base_id, Some(ctx.actor_id));
        let created = self
            .categories
            .create(&category)
            .await
            .map_err(|e| {
                if e.is_constraint() {
                    CatalogError::invalid(NON_FIELD_ERRORS, TOPIC_TAKEN)
                } else {
                    e.into()
                }
            })?;

        info!(category_id = %created.id, topic = %created.topic, "Created category");
        Ok(created)
    }

    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn update_category(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
        input: &CategoryInput,
    ) -> Result<Category, CatalogError> {
        self.editable_category(ctx, id).await?;
        let fields = self.clean_category(input, Some(id)).await?;

        let update = CategoryUpdate {
            topic: Some(fields.topic),
            knowledge_base_id: Some(fields.knowledge_base_id),
        };
        let updated = self.categories.update(id, &update).await.map_err(|e| {
            if e.is_constraint() {
                CatalogError::invalid(NON_FIELD_ERRORS, TOPIC_TAKEN)
            } else {
                e.into()
            }
        })?;

        info!(category_id = %id, topic = %updated.topic, "Updated category");
        Ok(updated)
    }

    /// Deletes a category without articles. Fails with `Conflict` otherwise.
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor_name))]
    pub async fn delete_category(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<(), CatalogError> {
        let category = self.editable_category(ctx, id).await?;

        match self.categories.delete_if_empty(id).await? {
            DeleteOutcome::Deleted => {
                info!(category_id = %id, topic = %category.topic, "Deleted category");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(CatalogError::not_found("Category", id)),
            DeleteOutcome::HasDependents => {
                let count = self.categories.count_articles(id).await?;
                Err(CatalogError::Conflict(format!(
                    "Cannot delete category \"{}\": it still has {} article{}.",
                    category.topic,
                    count,
                    if count == 1 { "" } else { "s" }
                )))
            }
        }
    }

    /// Field rules plus the checks that need the store: the knowledge base
    /// must exist and the topic must be free within it.
    async fn clean_category(
        &self,
        input: &CategoryInput,
        current: Option<Uuid>,
    ) -> Result<CategoryFields, CatalogError> {
        let fields = input.clean()?;

        if self
            .knowledge_bases
            .get(fields.knowledge_base_id)
            .await?
            .is_none()
        {
            return Err(CatalogError::invalid("knowledge_base_id", UNKNOWN_CHOICE));
        }

        if let Some(existing) = self
            .categories
            .get_by_topic(fields.knowledge_base_id, &fields.topic)
            .await?
        {
            if Some(existing.id) != current {
                let mut errors = FormErrors::new();
                errors.add(NON_FIELD_ERRORS, TOPIC_TAKEN);
                return Err(errors.into());
            }
        }

        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::db::test_support::seed_article;

    fn kb_input(title: &str) -> KnowledgeBaseInput {
        KnowledgeBaseInput {
            title: title.to_string(),
        }
    }

    fn category_input(topic: &str, kb: Uuid) -> CategoryInput {
        CategoryInput {
            topic: topic.to_string(),
            knowledge_base_id: kb.to_string(),
        }
    }

    #[tokio::test]
    async fn test_knowledge_base_title_is_unique() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;

        let cars = fx
            .catalog
            .create_knowledge_base(&ann, &kb_input("  Cars "))
            .await
            .unwrap();
        assert_eq!(cars.title, "Cars");
        assert_eq!(cars.created_by, Some(ann.actor_id));

        let err = fx
            .catalog
            .create_knowledge_base(&ann, &kb_input("Cars"))
            .await
            .unwrap_err();
        assert_eq!(err.form_errors().unwrap().first("title"), Some(TITLE_TAKEN));

        // Renaming to its own title is fine.
        fx.catalog
            .update_knowledge_base(&ann, cars.id, &kb_input("Cars"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_only_owner_or_superuser_modifies_knowledge_base() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let (_, bob) = fx.employee("bob").await;
        let (_, root) = fx.superuser("root").await;

        let cars = fx
            .catalog
            .create_knowledge_base(&ann, &kb_input("Cars"))
            .await
            .unwrap();

        let err = fx
            .catalog
            .update_knowledge_base(&bob, cars.id, &kb_input("Trucks"))
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
        assert!(fx
            .catalog
            .delete_knowledge_base(&bob, cars.id)
            .await
            .unwrap_err()
            .is_forbidden());

        let renamed = fx
            .catalog
            .update_knowledge_base(&root, cars.id, &kb_input("Trucks"))
            .await
            .unwrap();
        assert_eq!(renamed.title, "Trucks");
    }

    #[tokio::test]
    async fn test_delete_knowledge_base_blocked_by_categories() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let cars = fx
            .catalog
            .create_knowledge_base(&ann, &kb_input("Cars"))
            .await
            .unwrap();
        let germany = fx
            .catalog
            .create_category(&ann, &category_input("Germany", cars.id))
            .await
            .unwrap();

        let err = fx
            .catalog
            .delete_knowledge_base(&ann, cars.id)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("1 category"));

        fx.catalog.delete_category(&ann, germany.id).await.unwrap();
        fx.catalog
            .delete_knowledge_base(&ann, cars.id)
            .await
            .unwrap();
        assert!(fx
            .catalog
            .knowledge_base(cars.id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_category_requires_existing_knowledge_base_and_free_topic() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let cars = fx
            .catalog
            .create_knowledge_base(&ann, &kb_input("Cars"))
            .await
            .unwrap();
        let bikes = fx
            .catalog
            .create_knowledge_base(&ann, &kb_input("Bikes"))
            .await
            .unwrap();

        let err = fx
            .catalog
            .create_category(&ann, &category_input("Germany", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(err.form_errors().unwrap().has("knowledge_base_id"));

        fx.catalog
            .create_category(&ann, &category_input("Germany", cars.id))
            .await
            .unwrap();
        let err = fx
            .catalog
            .create_category(&ann, &category_input("Germany", cars.id))
            .await
            .unwrap_err();
        assert_eq!(err.form_errors().unwrap().non_field(), [TOPIC_TAKEN.to_string()]);

        // Same topic under another knowledge base is allowed.
        fx.catalog
            .create_category(&ann, &category_input("Germany", bikes.id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_category_blocked_by_articles() {
        let fx = Fixture::new().await;
        let (ann_employee, ann) = fx.employee("ann").await;
        let (_, bob) = fx.employee("bob").await;
        let cars = fx
            .catalog
            .create_knowledge_base(&ann, &kb_input("Cars"))
            .await
            .unwrap();
        let germany = fx
            .catalog
            .create_category(&ann, &category_input("Germany", cars.id))
            .await
            .unwrap();
        seed_article(&fx.pool, "BMW", ann_employee.id, germany.id, true).await;

        assert!(fx
            .catalog
            .delete_category(&bob, germany.id)
            .await
            .unwrap_err()
            .is_forbidden());
        let err = fx
            .catalog
            .delete_category(&ann, germany.id)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("1 article."));
    }

    #[tokio::test]
    async fn test_category_pages() {
        let fx = Fixture::new().await;
        let (ann_employee, ann) = fx.employee("ann").await;
        let cars = fx
            .catalog
            .create_knowledge_base(&ann, &kb_input("Cars"))
            .await
            .unwrap();
        let germany = fx
            .catalog
            .create_category(&ann, &category_input("Germany", cars.id))
            .await
            .unwrap();
        seed_article(&fx.pool, "BMW", ann_employee.id, germany.id, true).await;
        seed_article(&fx.pool, "Draft", ann_employee.id, germany.id, false).await;
        let boats = fx
            .catalog
            .create_knowledge_base(&ann, &kb_input("Boats"))
            .await
            .unwrap();
        fx.catalog
            .create_category(&ann, &category_input("Sailing", boats.id))
            .await
            .unwrap();

        let detail = fx.catalog.knowledge_base_detail(cars.id).await.unwrap();
        assert_eq!(detail.categories.len(), 1);
        assert_eq!(detail.categories[0].category.topic, "Germany");
        assert_eq!(detail.articles_count(), 2);
        assert_eq!(detail.published_articles_count(), 1);

        let (_, articles) = fx
            .catalog
            .category_articles(germany.id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(articles.total, 1);

        let (_, authors) = fx
            .catalog
            .category_authors(germany.id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(authors.items[0].employee.username, "ann");

        let listed = fx
            .catalog
            .list_categories(Some("  germ "), Pagination::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
    }
}
