//! KPI rating bands and aggregate statistics.

use serde::Serialize;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RatingBand {
    Excellent,
    Good,
    Average,
    Poor,
}

impl RatingBand {
    pub fn of(rating: f64) -> Self {
        if rating >= 4.5 {
            RatingBand::Excellent
        } else if rating >= 3.5 {
            RatingBand::Good
        } else if rating >= 2.5 {
            RatingBand::Average
        } else {
            RatingBand::Poor
        }
    }
}

pub fn validate_rating(rating: f64) -> Result<f64, AppError> {
    if !rating.is_finite() || !(1.0..=5.0).contains(&rating) {
        return Err(AppError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(rating)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub total_reviews: usize,
    pub excellent: usize,
    pub good: usize,
    pub average: usize,
    pub poor: usize,
    /// Mean rating to one decimal place; 0 when there are no reviews.
    pub average_rating: f64,
}

pub fn compute_stats(ratings: &[f64]) -> PerformanceStats {
    let mut stats = PerformanceStats {
        total_reviews: ratings.len(),
        ..Default::default()
    };
    for &rating in ratings {
        match RatingBand::of(rating) {
            RatingBand::Excellent => stats.excellent += 1,
            RatingBand::Good => stats.good += 1,
            RatingBand::Average => stats.average += 1,
            RatingBand::Poor => stats.poor += 1,
        }
    }
    if !ratings.is_empty() {
        let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
        stats.average_rating = (mean * 10.0).round() / 10.0;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(RatingBand::of(5.0), RatingBand::Excellent);
        assert_eq!(RatingBand::of(4.5), RatingBand::Excellent);
        assert_eq!(RatingBand::of(4.49), RatingBand::Good);
        assert_eq!(RatingBand::of(3.5), RatingBand::Good);
        assert_eq!(RatingBand::of(2.5), RatingBand::Average);
        assert_eq!(RatingBand::of(2.4), RatingBand::Poor);
    }

    #[test]
    fn test_stats() {
        let stats = compute_stats(&[5.0, 4.0, 3.0, 1.0, 4.6]);
        assert_eq!(stats.total_reviews, 5);
        assert_eq!(
            (stats.excellent, stats.good, stats.average, stats.poor),
            (2, 1, 1, 1)
        );
        assert_eq!(stats.average_rating, 3.5);
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(compute_stats(&[]), PerformanceStats::default());
    }

    #[test]
    fn test_rating_range() {
        assert!(validate_rating(1.0).is_ok());
        assert!(validate_rating(5.0).is_ok());
        assert!(validate_rating(0.9).is_err());
        assert!(validate_rating(5.1).is_err());
        assert!(validate_rating(f64::NAN).is_err());
    }
}
