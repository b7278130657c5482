//! Marketing ROI: daily revenue joined against optional ad spend.
//!
//! Absent spend data is a first-class input state: every row reports zero
//! spend and an uncomputed ROAS. A ROAS is only ever emitted for days with
//! spend strictly above zero, so a division by zero (or a misleading 0.0)
//! cannot appear in the output.

use crate::models::{OrderFact, SpendSource};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiRow {
    pub date: NaiveDate,
    pub revenue: f64,
    pub spend: f64,
    /// `None` means "not computed" (no spend recorded for the day), which
    /// serializes as JSON null. Never a stand-in zero.
    pub roas: Option<f64>,
}

pub fn compute_roi(orders: &[OrderFact], spend: &SpendSource) -> Vec<RoiRow> {
    let mut revenue_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for o in orders {
        *revenue_by_day.entry(o.order_date).or_insert(0.0) += o.revenue;
    }

    let spend_by_day: BTreeMap<NaiveDate, f64> = match spend {
        SpendSource::Present(rows) => rows.iter().map(|s| (s.date, s.spend)).collect(),
        SpendSource::Absent => BTreeMap::new(),
    };

    // Union of order days and spend days, in date order.
    let mut days: BTreeMap<NaiveDate, ()> = BTreeMap::new();
    days.extend(revenue_by_day.keys().map(|d| (*d, ())));
    days.extend(spend_by_day.keys().map(|d| (*d, ())));

    days.into_keys()
        .map(|date| {
            let revenue = revenue_by_day.get(&date).copied().unwrap_or(0.0);
            let spend = spend_by_day.get(&date).copied().unwrap_or(0.0);
            let roas = (spend > 0.0).then(|| revenue / spend);
            RoiRow {
                date,
                revenue,
                spend,
                roas,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpendFact;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn order(date: NaiveDate, revenue: f64) -> OrderFact {
        OrderFact {
            order_id: format!("o-{}", date),
            customer_id: "c1".to_string(),
            order_date: date,
            revenue,
            is_return: false,
            review_score: None,
        }
    }

    #[test]
    fn absent_spend_degrades_to_zero_spend_and_no_roas() {
        let orders = vec![order(d(2026, 6, 1), 100.0), order(d(2026, 6, 2), 200.0)];
        let rows = compute_roi(&orders, &SpendSource::Absent);
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.spend, 0.0);
            assert_eq!(row.roas, None);
        }
        assert_eq!(rows[0].revenue, 100.0);
        assert_eq!(rows[1].revenue, 200.0);
    }

    #[test]
    fn roas_only_where_spend_is_positive() {
        let orders = vec![order(d(2026, 6, 1), 100.0), order(d(2026, 6, 2), 200.0)];
        let spend = SpendSource::Present(vec![
            SpendFact {
                date: d(2026, 6, 1),
                spend: 50.0,
            },
            SpendFact {
                date: d(2026, 6, 2),
                spend: 0.0,
            },
        ]);
        let rows = compute_roi(&orders, &spend);
        assert_eq!(rows[0].roas, Some(2.0));
        assert_eq!(rows[1].roas, None);
    }

    #[test]
    fn spend_days_without_orders_still_appear() {
        let spend = SpendSource::Present(vec![SpendFact {
            date: d(2026, 6, 3),
            spend: 40.0,
        }]);
        let rows = compute_roi(&[], &spend);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].revenue, 0.0);
        assert_eq!(rows[0].roas, Some(0.0));
    }

    #[test]
    fn uncomputed_roas_serializes_as_null() {
        let rows = compute_roi(&[order(d(2026, 6, 1), 100.0)], &SpendSource::Absent);
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json[0]["roas"], serde_json::Value::Null);
    }
}
