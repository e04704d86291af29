//! Site-wide aggregates shown on the home page.
//!
//! The queries themselves live in [`crate::db::stats_repo`]; this module holds
//! the result types and the rounding rule shared by every average.

use crate::models::{ArticleSummary, CategoryOverview, EmployeeSummary};
use serde::Serialize;

/// Rounds to one decimal place, half away from zero.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rounded average, or 0 when there is nothing to average.
pub fn display_average(average: Option<f64>) -> f64 {
    average.map(round_one_decimal).unwrap_or(0.0)
}

/// Totals across the whole portal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteStatistics {
    pub total_knowledge_bases: u64,
    pub total_categories: u64,
    /// Published articles only.
    pub total_articles: u64,
    /// Comments on any article.
    pub total_comments: u64,
    pub total_employees: u64,
    /// Distinct authors of published articles.
    pub total_authors: u64,
}

/// Leaders per dimension. Each is `None` when nothing qualifies.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TopStatistics {
    /// Published article with the most views.
    pub most_viewed_article: Option<ArticleSummary>,
    /// Published article with the highest average over at least one rating.
    pub top_rated_article: Option<ArticleSummary>,
    /// Employee with the most published articles.
    pub most_active_author: Option<EmployeeSummary>,
    /// Category with the most published articles.
    pub largest_category: Option<CategoryOverview>,
}

impl TopStatistics {
    pub fn is_empty(&self) -> bool {
        self.most_viewed_article.is_none()
            && self.top_rated_article.is_none()
            && self.most_active_author.is_none()
            && self.largest_category.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_one_decimal() {
        assert_eq!(round_one_decimal(4.0), 4.0);
        assert_eq!(round_one_decimal(3.25), 3.3);
        assert_eq!(round_one_decimal(11.0 / 3.0), 3.7);
        assert_eq!(round_one_decimal(4.44), 4.4);
    }

    #[test]
    fn test_display_average_defaults_to_zero() {
        assert_eq!(display_average(None), 0.0);
        assert_eq!(display_average(Some(4.0)), 4.0);
    }

    #[test]
    fn test_empty_top_statistics() {
        assert!(TopStatistics::default().is_empty());
    }
}
