//! Askama template definitions for the portal pages.

use askama::Template;
use kh_core::catalog::{ArticleDetail, EmployeeProfile, KnowledgeBaseDetail};
use kh_core::db::PaginatedResult;
use kh_core::forms::EmployeeProfileInput;
use kh_core::models::CommentView;
use kh_core::{
    ArticleSummary, Category, CategoryOverview, EmployeeSummary, FormErrors, KnowledgeBase,
    KnowledgeBaseSummary, SiteStatistics, TopStatistics,
};
use uuid::Uuid;

use crate::auth::FlashMessage;

// ============================================
// Layout
// ============================================

/// Logged-in employee shown in the navigation bar.
#[derive(Clone)]
pub struct CurrentEmployeeInfo {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub is_superuser: bool,
}

/// Data every page layout needs.
pub struct Chrome {
    pub active_nav: &'static str,
    pub current_user: Option<CurrentEmployeeInfo>,
    pub csrf_token: String,
    pub messages: Vec<FlashMessage>,
}

/// Previous/next links for a paginated list.
pub struct Pager {
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl Pager {
    /// Builds the links, carrying the non-empty `params` along.
    pub fn new<T>(result: &PaginatedResult<T>, params: &[(&str, &str)]) -> Self {
        let href = |page: u32| {
            let page = page.to_string();
            let mut pairs: Vec<(&str, &str)> = params
                .iter()
                .copied()
                .filter(|(_, value)| !value.is_empty())
                .collect();
            pairs.push(("page", page.as_str()));
            format!("?{}", serde_urlencoded::to_string(&pairs).unwrap_or_default())
        };
        Self {
            page: result.page,
            total_pages: result.total_pages,
            total: result.total,
            prev: result.previous_page().map(href),
            next: result.next_page().map(href),
        }
    }
}

/// An `<option>` in a select box.
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

// ============================================
// Home
// ============================================

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub chrome: Chrome,
    pub site: SiteStatistics,
    pub top: TopStatistics,
}

// ============================================
// Knowledge bases
// ============================================

#[derive(Template)]
#[template(path = "knowledge/list.html")]
pub struct KnowledgeListTemplate {
    pub chrome: Chrome,
    pub items: Vec<KnowledgeBaseSummary>,
    pub pager: Pager,
    pub search: String,
}

#[derive(Template)]
#[template(path = "knowledge/detail.html")]
pub struct KnowledgeDetailTemplate {
    pub chrome: Chrome,
    pub detail: KnowledgeBaseDetail,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "knowledge/categories.html")]
pub struct KnowledgeCategoriesTemplate {
    pub chrome: Chrome,
    pub knowledge_base: KnowledgeBase,
    pub items: Vec<CategoryOverview>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "knowledge/form.html")]
pub struct KnowledgeFormTemplate {
    pub chrome: Chrome,
    pub heading: &'static str,
    pub action: String,
    pub cancel_url: String,
    pub title: String,
    pub errors: FormErrors,
}

// ============================================
// Categories
// ============================================

#[derive(Template)]
#[template(path = "category/list.html")]
pub struct CategoryListTemplate {
    pub chrome: Chrome,
    pub items: Vec<CategoryOverview>,
    pub pager: Pager,
    pub search: String,
}

#[derive(Template)]
#[template(path = "category/detail.html")]
pub struct CategoryDetailTemplate {
    pub chrome: Chrome,
    pub overview: CategoryOverview,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "category/articles.html")]
pub struct CategoryArticlesTemplate {
    pub chrome: Chrome,
    pub category: Category,
    pub items: Vec<ArticleSummary>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "category/authors.html")]
pub struct CategoryAuthorsTemplate {
    pub chrome: Chrome,
    pub category: Category,
    pub items: Vec<EmployeeSummary>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "category/form.html")]
pub struct CategoryFormTemplate {
    pub chrome: Chrome,
    pub heading: &'static str,
    pub action: String,
    pub cancel_url: String,
    pub topic: String,
    pub knowledge_bases: Vec<Choice>,
    pub errors: FormErrors,
}

// ============================================
// Articles and comments
// ============================================

#[derive(Template)]
#[template(path = "article/list.html")]
pub struct ArticleListTemplate {
    pub chrome: Chrome,
    pub items: Vec<ArticleSummary>,
    pub pager: Pager,
    pub search: String,
}

/// A comment with the viewer's permissions on it.
pub struct CommentRow {
    pub view: CommentView,
    pub can_edit: bool,
}

#[derive(Template)]
#[template(path = "article/detail.html")]
pub struct ArticleDetailTemplate {
    pub chrome: Chrome,
    pub detail: ArticleDetail,
    pub comments: Vec<CommentRow>,
    pub rating_choices: Vec<Choice>,
}

#[derive(Template)]
#[template(path = "article/form.html")]
pub struct ArticleFormTemplate {
    pub chrome: Chrome,
    pub heading: &'static str,
    pub action: String,
    pub cancel_url: String,
    pub title: String,
    pub content: String,
    pub is_published: bool,
    pub categories: Vec<Choice>,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "comment/form.html")]
pub struct CommentFormTemplate {
    pub chrome: Chrome,
    pub action: String,
    pub cancel_url: String,
    pub commentary: String,
    pub errors: FormErrors,
}

// ============================================
// Employees
// ============================================

#[derive(Template)]
#[template(path = "employee/list.html")]
pub struct EmployeeListTemplate {
    pub chrome: Chrome,
    pub items: Vec<EmployeeSummary>,
    pub pager: Pager,
    pub query: String,
    pub filter: String,
}

#[derive(Template)]
#[template(path = "employee/detail.html")]
pub struct EmployeeDetailTemplate {
    pub chrome: Chrome,
    pub profile: EmployeeProfile,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "employee/form.html")]
pub struct EmployeeFormTemplate {
    pub chrome: Chrome,
    pub action: String,
    pub cancel_url: String,
    pub form: EmployeeProfileInput,
    pub errors: FormErrors,
}

// ============================================
// Shared
// ============================================

#[derive(Template)]
#[template(path = "confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub chrome: Chrome,
    pub kind: &'static str,
    pub name: String,
    pub action: String,
    pub cancel_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kh_core::db::Pagination;

    fn result(total: u64, page: u32) -> PaginatedResult<u32> {
        let pagination = Pagination::page(page).clamped(total);
        PaginatedResult::new(Vec::new(), total, &pagination)
    }

    #[test]
    fn test_pager_links_keep_search() {
        let pager = Pager::new(&result(7, 2), &[("title", "rust lang")]);
        assert_eq!(pager.page, 2);
        assert_eq!(pager.total_pages, 3);
        assert_eq!(pager.prev.as_deref(), Some("?title=rust+lang&page=1"));
        assert_eq!(pager.next.as_deref(), Some("?title=rust+lang&page=3"));
    }

    #[test]
    fn test_pager_skips_empty_params() {
        let pager = Pager::new(&result(4, 1), &[("query", ""), ("filter", "authors")]);
        assert_eq!(pager.prev, None);
        assert_eq!(pager.next.as_deref(), Some("?filter=authors&page=2"));
    }

    #[test]
    fn test_pager_single_page() {
        let pager = Pager::new(&result(0, 1), &[]);
        assert_eq!(pager.total_pages, 1);
        assert!(pager.prev.is_none() && pager.next.is_none());
    }
}
