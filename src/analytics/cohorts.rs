//! Cohort assignment, retention matrix, and first-month LTV.
//!
//! A cohort is the calendar month of a customer's first order. Retention
//! cells beyond the dataset's last observed month are omitted rather than
//! emitted as 0%: a month we never observed is unknown, not churned.

use super::{month_floor, months_between};
use crate::models::OrderFact;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortAssignment {
    pub customer_id: String,
    pub cohort_month: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionCell {
    pub cohort_month: NaiveDate,
    pub months_since_cohort: u32,
    pub active_customers: u64,
    pub retention_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirstMonthLtv {
    pub cohort_month: NaiveDate,
    pub cohort_size: u64,
    pub avg_ltv: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CohortReport {
    pub assignments: Vec<CohortAssignment>,
    pub retention: Vec<RetentionCell>,
    pub first_month_ltv: Vec<FirstMonthLtv>,
}

/// Compute cohort assignments, the retention matrix up to
/// `horizon_months`, and average first-month LTV per cohort.
pub fn compute_cohorts(orders: &[OrderFact], horizon_months: u32) -> CohortReport {
    let last_month = match orders.iter().map(|o| o.order_date).max() {
        Some(d) => month_floor(d),
        None => return CohortReport::default(),
    };

    // Cohort month = month of the customer's earliest order. Ties on the
    // earliest date need no further handling: the cohort is month-level.
    let mut first_order: HashMap<&str, NaiveDate> = HashMap::new();
    for o in orders {
        first_order
            .entry(o.customer_id.as_str())
            .and_modify(|d| {
                if o.order_date < *d {
                    *d = o.order_date;
                }
            })
            .or_insert(o.order_date);
    }

    let cohort_of: HashMap<&str, NaiveDate> = first_order
        .iter()
        .map(|(c, d)| (*c, month_floor(*d)))
        .collect();

    let mut members: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
    for (customer, cohort) in &cohort_of {
        members.entry(*cohort).or_default().insert(*customer);
    }

    // Distinct customers active at each (cohort, elapsed-months) cell.
    let mut active: BTreeMap<(NaiveDate, u32), BTreeSet<&str>> = BTreeMap::new();
    let mut first_month_revenue: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for o in orders {
        let cohort = cohort_of[o.customer_id.as_str()];
        let elapsed = months_between(cohort, o.order_date);
        debug_assert!(elapsed >= 0);
        let elapsed = elapsed as u32;
        if elapsed <= horizon_months {
            active
                .entry((cohort, elapsed))
                .or_default()
                .insert(o.customer_id.as_str());
        }
        if elapsed == 0 {
            *first_month_revenue.entry(cohort).or_insert(0.0) += o.revenue;
        }
    }

    let mut retention = Vec::new();
    let mut first_month_ltv = Vec::new();
    for (cohort, customers) in &members {
        let cohort_size = customers.len() as u64;

        // Only months the dataset can actually observe for this cohort.
        let observable = months_between(*cohort, last_month).max(0) as u32;
        for m in 0..=observable.min(horizon_months) {
            let active_customers = active
                .get(&(*cohort, m))
                .map(|s| s.len() as u64)
                .unwrap_or(0);
            retention.push(RetentionCell {
                cohort_month: *cohort,
                months_since_cohort: m,
                active_customers,
                retention_rate: active_customers as f64 / cohort_size as f64,
            });
        }

        let revenue = first_month_revenue.get(cohort).copied().unwrap_or(0.0);
        first_month_ltv.push(FirstMonthLtv {
            cohort_month: *cohort,
            cohort_size,
            avg_ltv: revenue / cohort_size as f64,
        });
    }

    let mut assignments: Vec<CohortAssignment> = cohort_of
        .iter()
        .map(|(customer, cohort)| CohortAssignment {
            customer_id: customer.to_string(),
            cohort_month: *cohort,
        })
        .collect();
    assignments.sort_by(|a, b| {
        (a.cohort_month, &a.customer_id).cmp(&(b.cohort_month, &b.customer_id))
    });

    CohortReport {
        assignments,
        retention,
        first_month_ltv,
    }
}
