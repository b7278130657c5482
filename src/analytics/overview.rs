//! Trailing-window sales overview: headline KPIs plus a daily series,
//! anchored on the latest order date in the snapshot rather than on wall
//! clock time (the snapshot may be historical).

use crate::models::OrderFact;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewKpi {
    pub paid_revenue: f64,
    pub orders: u64,
    /// Average order value; omitted when the window has no orders.
    pub aov: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySales {
    pub order_date: NaiveDate,
    pub paid_revenue: f64,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Overview {
    pub kpi: OverviewKpi,
    pub daily: Vec<DailySales>,
}

impl Default for OverviewKpi {
    fn default() -> Self {
        Self {
            paid_revenue: 0.0,
            orders: 0,
            aov: None,
        }
    }
}

/// Compute KPIs and the daily revenue/orders series for the trailing
/// `window_days` ending at the latest order date in the data.
pub fn compute_overview(orders: &[OrderFact], window_days: i64) -> Overview {
    let end = match orders.iter().map(|o| o.order_date).max() {
        Some(d) => d,
        None => return Overview::default(),
    };
    let cutoff = end - Duration::days(window_days);

    let mut revenue_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut orders_by_day: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
    for o in orders.iter().filter(|o| o.order_date > cutoff) {
        *revenue_by_day.entry(o.order_date).or_insert(0.0) += o.revenue;
        // Order-item rows share an order_id; count each order once.
        orders_by_day
            .entry(o.order_date)
            .or_default()
            .insert(o.order_id.as_str());
    }

    let daily: Vec<DailySales> = revenue_by_day
        .iter()
        .map(|(date, revenue)| DailySales {
            order_date: *date,
            paid_revenue: *revenue,
            orders: orders_by_day[date].len() as u64,
        })
        .collect();

    let paid_revenue: f64 = daily.iter().map(|d| d.paid_revenue).sum();
    let order_count: u64 = daily.iter().map(|d| d.orders).sum();
    let aov = (order_count > 0).then(|| paid_revenue / order_count as f64);

    Overview {
        kpi: OverviewKpi {
            paid_revenue,
            orders: order_count,
            aov,
        },
        daily,
    }
}
