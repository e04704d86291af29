//! Articles, ratings and comments.

use super::{Catalog, CatalogError, UNKNOWN_CHOICE};
use crate::auth::{AuthorizationContext, Resource};
use crate::db::{ArticleFilter, PaginatedResult, Pagination, Visibility};
use crate::forms::{normalize_search, ArticleFields, ArticleInput, CommentInput, RatingInput};
use crate::models::{Article, ArticleSummary, ArticleUpdate, Comment, CommentView, Rating};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Everything the article page shows.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetail {
    pub summary: ArticleSummary,
    /// Newest first.
    pub comments: Vec<CommentView>,
    /// The viewer's own rating, if they rated the article.
    pub viewer_rating: Option<Rating>,
    /// Whether the viewer may edit or delete the article.
    pub can_edit: bool,
}

fn visibility_for(ctx: &AuthorizationContext) -> Visibility {
    if ctx.is_superuser {
        Visibility::All
    } else {
        Visibility::PublishedOrAuthoredBy(ctx.actor_id)
    }
}

impl Catalog {
    /// Published articles plus the viewer's own drafts; superusers see all.
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor_name))]
    pub async fn list_articles(
        &self,
        ctx: &AuthorizationContext,
        search: Option<&str>,
        pagination: Pagination,
    ) -> Result<PaginatedResult<ArticleSummary>, CatalogError> {
        let filter = ArticleFilter {
            title: normalize_search(search),
            visibility: visibility_for(ctx),
            ..Default::default()
        };
        Ok(self.articles.list(&filter, &pagination).await?)
    }

    /// Loads an article the viewer is allowed to see. Drafts of other
    /// employees are reported as not found.
    pub async fn visible_article(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<Article, CatalogError> {
        match self.articles.get(id).await? {
            Some(article) if ctx.can_view_article(&article) => Ok(article),
            _ => Err(CatalogError::not_found("Article", id)),
        }
    }

    /// The article page. Counts a view before loading the aggregates.
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor_name))]
    pub async fn article_detail(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<ArticleDetail, CatalogError> {
        let article = self.visible_article(ctx, id).await?;

        if let Err(e) = self.articles.increment_views(id).await {
            warn!(article_id = %id, error = %e, "Failed to count article view");
        }

        let summary = self
            .articles
            .get_summary(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Article", id))?;
        let comments = self.comments.list_for_article(id).await?;
        let viewer_rating = self.ratings.get_for(id, ctx.actor_id).await?;

        Ok(ArticleDetail {
            can_edit: ctx.can_modify(Some(article.author_id)),
            summary,
            comments,
            viewer_rating,
        })
    }

    pub async fn editable_article(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<Article, CatalogError> {
        let article = self.visible_article(ctx, id).await?;
        if let Err(denied) = ctx.ensure_can_modify(Resource::Article, Some(article.author_id)) {
            warn!(actor = %ctx.actor_name, article_id = %id, "Article change denied");
            return Err(denied.into());
        }
        Ok(article)
    }

    /// Creates an article authored by the caller.
    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn create_article(
        &self,
        ctx: &AuthorizationContext,
        input: &ArticleInput,
    ) -> Result<Article, CatalogError> {
        let fields = self.clean_article(input).await?;

        let article = Article::new(
            fields.title,
            fields.content,
            ctx.actor_id,
            fields.category_id,
            fields.is_published,
        );
        let created = self.articles.create(&article).await?;

        info!(
            article_id = %created.id,
            title = %created.title,
            published = created.is_published,
            "Created article"
        );
        Ok(created)
    }

    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn update_article(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
        input: &ArticleInput,
    ) -> Result<Article, CatalogError> {
        let mut article = self.editable_article(ctx, id).await?;
        let fields = self.clean_article(input).await?;

        article.apply(&ArticleUpdate {
            title: Some(fields.title),
            content: Some(fields.content),
            category_id: Some(fields.category_id),
            is_published: Some(fields.is_published),
        });
        let updated = self.articles.update(&article).await?;

        info!(
            article_id = %id,
            reading_time = updated.reading_time,
            published = updated.is_published,
            "Updated article"
        );
        Ok(updated)
    }

    /// Deletes an article together with its ratings and comments.
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor_name))]
    pub async fn delete_article(
        &self,
        ctx: &AuthorizationContext,
        id: Uuid,
    ) -> Result<Article, CatalogError> {
        let article = self.editable_article(ctx, id).await?;
        if !self.articles.delete(id).await? {
            return Err(CatalogError::not_found("Article", id));
        }

        info!(article_id = %id, title = %article.title, "Deleted article");
        Ok(article)
    }

    async fn clean_article(&self, input: &ArticleInput) -> Result<ArticleFields, CatalogError> {
        let fields = input.clean()?;
        if self.categories.get(fields.category_id).await?.is_none() {
            return Err(CatalogError::invalid("category_id", UNKNOWN_CHOICE));
        }
        Ok(fields)
    }

    /// Records the caller's rating. Resubmitting replaces the earlier value.
    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn rate_article(
        &self,
        ctx: &AuthorizationContext,
        article_id: Uuid,
        input: &RatingInput,
    ) -> Result<Rating, CatalogError> {
        self.visible_article(ctx, article_id).await?;
        let value = input.clean()?;

        let rating = self
            .ratings
            .upsert(&Rating::new(article_id, ctx.actor_id, value))
            .await?;

        info!(article_id = %article_id, rating = rating.rating, "Rated article");
        Ok(rating)
    }

    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn add_comment(
        &self,
        ctx: &AuthorizationContext,
        article_id: Uuid,
        input: &CommentInput,
    ) -> Result<Comment, CatalogError> {
        self.visible_article(ctx, article_id).await?;
        let commentary = input.clean()?;

        let comment = self
            .comments
            .create(&Comment::new(article_id, ctx.actor_id, commentary))
            .await?;

        info!(article_id = %article_id, comment_id = %comment.id, "Added comment");
        Ok(comment)
    }

    /// Loads a comment the caller may edit. The comment must belong to
    /// `article_id`.
    pub async fn editable_comment(
        &self,
        ctx: &AuthorizationContext,
        article_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Comment, CatalogError> {
        let comment = match self.comments.get(comment_id).await? {
            Some(comment) if comment.article_id == article_id => comment,
            Some(_) => {
                debug!(
                    comment_id = %comment_id,
                    article_id = %article_id,
                    "Comment addressed through another article"
                );
                return Err(CatalogError::not_found("Comment", comment_id));
            }
            None => return Err(CatalogError::not_found("Comment", comment_id)),
        };
        if let Err(denied) =
            ctx.ensure_can_modify(Resource::Comment, Some(comment.commentator_id))
        {
            warn!(actor = %ctx.actor_name, comment_id = %comment_id, "Comment change denied");
            return Err(denied.into());
        }
        Ok(comment)
    }

    #[instrument(skip(self, ctx, input), fields(actor = %ctx.actor_name))]
    pub async fn update_comment(
        &self,
        ctx: &AuthorizationContext,
        article_id: Uuid,
        comment_id: Uuid,
        input: &CommentInput,
    ) -> Result<Comment, CatalogError> {
        let mut comment = self.editable_comment(ctx, article_id, comment_id).await?;
        comment.edit(input.clean()?);
        let updated = self.comments.update(&comment).await?;

        info!(comment_id = %comment_id, "Updated comment");
        Ok(updated)
    }

    #[instrument(skip(self, ctx), fields(actor = %ctx.actor_name))]
    pub async fn delete_comment(
        &self,
        ctx: &AuthorizationContext,
        article_id: Uuid,
        comment_id: Uuid,
    ) -> Result<(), CatalogError> {
        self.editable_comment(ctx, article_id, comment_id).await?;
        if !self.comments.delete(comment_id).await? {
            return Err(CatalogError::not_found("Comment", comment_id));
        }

        info!(comment_id = %comment_id, "Deleted comment");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::*;
    use crate::db::test_support::{seed_category, seed_knowledge_base};
    use crate::models::Category;

    fn article_input(
        title: &str,
        content: &str,
        category: &Category,
        published: bool,
    ) -> ArticleInput {
        ArticleInput {
            title: title.to_string(),
            content: content.to_string(),
            category_id: category.id.to_string(),
            is_published: published.then(|| "on".to_string()),
        }
    }

    fn comment_input(text: &str) -> CommentInput {
        CommentInput {
            commentary: text.to_string(),
        }
    }

    fn rating_input(value: &str) -> RatingInput {
        RatingInput {
            rating: value.to_string(),
        }
    }

    async fn germany(fx: &Fixture) -> Category {
        let cars = seed_knowledge_base(&fx.pool, "Cars").await;
        seed_category(&fx.pool, "Germany", cars.id, None).await
    }

    #[tokio::test]
    async fn test_create_sets_author_and_reading_time() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let germany = germany(&fx).await;

        let article = fx
            .catalog
            .create_article(
                &ann,
                &article_input("BMW", &"word ".repeat(125), &germany, true),
            )
            .await
            .unwrap();
        assert_eq!(article.author_id, ann.actor_id);
        assert_eq!(article.reading_time, 2);

        let updated = fx
            .catalog
            .update_article(
                &ann,
                article.id,
                &article_input("BMW", "short", &germany, true),
            )
            .await
            .unwrap();
        assert_eq!(updated.reading_time, 1);
    }

    #[tokio::test]
    async fn test_unknown_category_is_a_field_error() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let orphan = Category::new("Nowhere", Uuid::new_v4(), None);

        let err = fx
            .catalog
            .create_article(&ann, &article_input("BMW", "text", &orphan, true))
            .await
            .unwrap_err();
        assert_eq!(
            err.form_errors().unwrap().first("category_id"),
            Some(UNKNOWN_CHOICE)
        );
    }

    #[tokio::test]
    async fn test_drafts_hidden_from_other_employees() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let (_, bob) = fx.employee("bob").await;
        let (_, root) = fx.superuser("root").await;
        let germany = germany(&fx).await;

        let draft = fx
            .catalog
            .create_article(&ann, &article_input("Draft", "text", &germany, false))
            .await
            .unwrap();

        assert!(fx
            .catalog
            .article_detail(&bob, draft.id)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(fx
            .catalog
            .rate_article(&bob, draft.id, &rating_input("5"))
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(
            fx.catalog
                .list_articles(&bob, None, Pagination::default())
                .await
                .unwrap()
                .total,
            0
        );

        assert_eq!(
            fx.catalog
                .list_articles(&ann, None, Pagination::default())
                .await
                .unwrap()
                .total,
            1
        );
        assert_eq!(
            fx.catalog
                .list_articles(&root, None, Pagination::default())
                .await
                .unwrap()
                .total,
            1
        );
        assert!(fx
            .catalog
            .article_detail(&root, draft.id)
            .await
            .unwrap()
            .can_edit);
    }

    #[tokio::test]
    async fn test_detail_counts_views_and_collects_feedback() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let (_, bob) = fx.employee("bob").await;
        let germany = germany(&fx).await;
        let bmw = fx
            .catalog
            .create_article(&ann, &article_input("BMW", "text", &germany, true))
            .await
            .unwrap();

        fx.catalog
            .rate_article(&bob, bmw.id, &rating_input("2"))
            .await
            .unwrap();
        fx.catalog
            .rate_article(&bob, bmw.id, &rating_input("4"))
            .await
            .unwrap();
        fx.catalog
            .add_comment(&bob, bmw.id, &comment_input("Nice"))
            .await
            .unwrap();

        fx.catalog.article_detail(&ann, bmw.id).await.unwrap();
        let detail = fx.catalog.article_detail(&bob, bmw.id).await.unwrap();

        assert_eq!(detail.summary.article.views_count, 2);
        assert_eq!(detail.summary.rating_count, 1);
        assert_eq!(detail.summary.average_rating, 4.0);
        assert_eq!(detail.summary.review_count, 1);
        assert_eq!(detail.viewer_rating.unwrap().rating, 4);
        assert_eq!(detail.comments[0].comment.commentary, "Nice");
        assert!(!detail.can_edit);
    }

    #[tokio::test]
    async fn test_invalid_rating_rejected() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let germany = germany(&fx).await;
        let bmw = fx
            .catalog
            .create_article(&ann, &article_input("BMW", "text", &germany, true))
            .await
            .unwrap();

        for raw in ["0", "6", "five", ""] {
            let err = fx
                .catalog
                .rate_article(&ann, bmw.id, &rating_input(raw))
                .await
                .unwrap_err();
            assert!(err.form_errors().unwrap().has("rating"), "{raw}");
        }
    }

    #[tokio::test]
    async fn test_non_owner_cannot_modify_article() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let (_, bob) = fx.employee("bob").await;
        let (_, root) = fx.superuser("root").await;
        let germany = germany(&fx).await;
        let bmw = fx
            .catalog
            .create_article(&ann, &article_input("BMW", "text", &germany, true))
            .await
            .unwrap();

        let err = fx
            .catalog
            .update_article(&bob, bmw.id, &article_input("Mine", "text", &germany, true))
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
        assert!(fx
            .catalog
            .delete_article(&bob, bmw.id)
            .await
            .unwrap_err()
            .is_forbidden());

        fx.catalog.delete_article(&root, bmw.id).await.unwrap();
        assert!(fx
            .catalog
            .visible_article(&ann, bmw.id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_comment_ownership_and_route_consistency() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let (_, bob) = fx.employee("bob").await;
        let germany = germany(&fx).await;
        let bmw = fx
            .catalog
            .create_article(&ann, &article_input("BMW", "text", &germany, true))
            .await
            .unwrap();
        let audi = fx
            .catalog
            .create_article(&ann, &article_input("AUDI", "text", &germany, true))
            .await
            .unwrap();
        let comment = fx
            .catalog
            .add_comment(&bob, bmw.id, &comment_input("Hi"))
            .await
            .unwrap();

        let err = fx
            .catalog
            .update_comment(&ann, bmw.id, comment.id, &comment_input("Edited"))
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        let err = fx
            .catalog
            .delete_comment(&bob, audi.id, comment.id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let edited = fx
            .catalog
            .update_comment(&bob, bmw.id, comment.id, &comment_input(" Edited "))
            .await
            .unwrap();
        assert_eq!(edited.commentary, "Edited");

        fx.catalog
            .delete_comment(&bob, bmw.id, comment.id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_blank_comment_rejected() {
        let fx = Fixture::new().await;
        let (_, ann) = fx.employee("ann").await;
        let germany = germany(&fx).await;
        let bmw = fx
            .catalog
            .create_article(&ann, &article_input("BMW", "text", &germany, true))
            .await
            .unwrap();

        let err = fx
            .catalog
            .add_comment(&ann, bmw.id, &comment_input("   "))
            .await
            .unwrap_err();
        assert!(err.form_errors().unwrap().has("commentary"));
    }
}
