//! Returns and review-quality rollups.

use super::month_floor;
use crate::models::OrderFact;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnsRow {
    pub period: NaiveDate,
    pub return_count: u64,
    /// Average of 1..5 review scores in the period. `None` when no order
    /// in the period carries a score; unscored orders never count toward
    /// the average.
    pub avg_review_score: Option<f64>,
}

/// Roll up return counts and average review score per day or per month.
/// A period appears once it contains at least one order; empty input
/// yields an empty table.
pub fn compute_returns(orders: &[OrderFact], granularity: Granularity) -> Vec<ReturnsRow> {
    struct Bucket {
        returns: u64,
        score_sum: u64,
        scored: u64,
    }

    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for o in orders {
        let period = match granularity {
            Granularity::Daily => o.order_date,
            Granularity::Monthly => month_floor(o.order_date),
        };
        let b = buckets.entry(period).or_insert(Bucket {
            returns: 0,
            score_sum: 0,
            scored: 0,
        });
        if o.is_return {
            b.returns += 1;
        }
        if let Some(score) = o.review_score {
            b.score_sum += score as u64;
            b.scored += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(period, b)| ReturnsRow {
            period,
            return_count: b.returns,
            avg_review_score: (b.scored > 0).then(|| b.score_sum as f64 / b.scored as f64),
        })
        .collect()
}
