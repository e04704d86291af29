//! Article ratings on a 1-5 scale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Allowed rating values and their labels.
pub const RATING_CHOICES: [(u8, &str); 5] = [
    (1, "Poor"),
    (2, "Fair"),
    (3, "Good"),
    (4, "Very Good"),
    (5, "Excellent"),
];

/// Label for a rating value, `None` when out of range.
pub fn rating_label(value: u8) -> Option<&'static str> {
    RATING_CHOICES
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(_, label)| *label)
}

/// One employee's rating of one article. `(article_id, employee_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: Uuid,
    pub article_id: Uuid,
    pub employee_id: Uuid,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rating {
    pub fn new(article_id: Uuid, employee_id: Uuid, rating: u8) -> Self {
        let now = super::now();
        Self {
            id: Uuid::new_v4(),
            article_id,
            employee_id,
            rating,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn label(&self) -> &'static str {
        rating_label(self.rating).unwrap_or("Unknown")
    }

    /// "<full name> - <article title> (<n>/5)"
    pub fn describe(&self, employee_name: &str, article_title: &str) -> String {
        format!("{} - {} ({}/5)", employee_name, article_title, self.rating)
    }
}

/// Average and count of the ratings on an article or author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: u64,
}

impl RatingSummary {
    /// Average rounded to one decimal, 0 when there are no ratings.
    pub fn display_average(&self) -> f64 {
        crate::stats::display_average(self.average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_labels() {
        assert_eq!(rating_label(1), Some("Poor"));
        assert_eq!(rating_label(4), Some("Very Good"));
        assert_eq!(rating_label(0), None);
        assert_eq!(rating_label(6), None);
    }

    #[test]
    fn test_describe() {
        let rating = Rating::new(Uuid::new_v4(), Uuid::new_v4(), 5);
        assert_eq!(rating.describe("Ann Lee", "BMW"), "Ann Lee - BMW (5/5)");
        assert_eq!(rating.label(), "Excellent");
    }

    #[test]
    fn test_summary_without_ratings_is_zero() {
        assert_eq!(RatingSummary::default().display_average(), 0.0);
        let summary = RatingSummary {
            average: Some(11.0 / 3.0),
            count: 3,
        };
        assert_eq!(summary.display_average(), 3.7);
    }
}
