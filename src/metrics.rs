//! Metrics computer
//!
//! Pure reductions over a transaction set. No LLM involvement.

use crate::error::PipelineError;
use crate::models::{Metrics, TransactionSet, TransactionSummary};
use crate::Result;
use rust_decimal::Decimal;

/// Aggregate income, spending and net flow.
///
/// Exact decimal sums, so the result does not depend on row order.
/// Amounts too large for a decimal to total are a data fault.
pub fn compute(transactions: &TransactionSet) -> Result<Metrics> {
    let mut total_income = Decimal::ZERO;
    let mut total_spending = Decimal::ZERO;

    for t in transactions.iter() {
        if t.is_credit() {
            total_income = checked_total(total_income, t.amount, transactions)?;
        } else if t.is_debit() {
            total_spending = checked_total(total_spending, t.amount.abs(), transactions)?;
        }
    }

    let net_flow = total_income
        .checked_sub(total_spending)
        .ok_or_else(|| overflow(transactions))?;

    Ok(Metrics {
        total_income,
        total_spending,
        net_flow,
    })
}

fn checked_total(total: Decimal, amount: Decimal, transactions: &TransactionSet) -> Result<Decimal> {
    total.checked_add(amount).ok_or_else(|| overflow(transactions))
}

fn overflow(transactions: &TransactionSet) -> PipelineError {
    PipelineError::DataUnavailable(format!(
        "transaction totals for {} overflow",
        transactions.user_id()
    ))
}

/// Structured summary used to brief the analyzer.
pub fn summarize(transactions: &TransactionSet) -> Result<TransactionSummary> {
    let mut summary = TransactionSummary {
        transaction_count: transactions.len(),
        largest_amount: transactions.iter().map(|t| t.amount).max(),
        smallest_amount: transactions.iter().map(|t| t.amount).min(),
        ..Default::default()
    };

    for t in transactions.iter().filter(|t| t.is_debit()) {
        let total = summary
            .spending_by_category
            .entry(t.category.clone())
            .or_insert(Decimal::ZERO);
        *total = checked_total(*total, t.amount.abs(), transactions)?;
    }

    Ok(summary)
}

impl TransactionSummary {
    /// One-line description of the set, e.g.
    /// "User has 3 transactions. Largest transaction: $5,000.00, Smallest transaction: $-1,200.00."
    pub fn headline(&self) -> String {
        match (self.largest_amount, self.smallest_amount) {
            (Some(largest), Some(smallest)) => format!(
                "User has {} transactions. Largest transaction: ${}, Smallest transaction: ${}.",
                self.transaction_count,
                format_money(largest),
                format_money(smallest)
            ),
            _ => "No transactions found for this user.".to_string(),
        }
    }
}

/// Two decimal places with thousands separators.
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Transaction;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn txn(amount: Decimal, category: &str) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            description: format!("{} payment", category),
            amount,
            category: category.to_string(),
            bank_name: "First Bank".to_string(),
            user_id: "user_001".to_string(),
        }
    }

    fn scenario() -> TransactionSet {
        TransactionSet::new(
            "user_001",
            vec![
                txn(dec!(5000), "salary"),
                txn(dec!(-1200), "rent"),
                txn(dec!(-300), "groceries"),
            ],
        )
    }

    #[test]
    fn test_scenario_metrics() {
        let metrics = compute(&scenario()).unwrap();
        assert_eq!(metrics.total_income, dec!(5000));
        assert_eq!(metrics.total_spending, dec!(1500));
        assert_eq!(metrics.net_flow, dec!(3500));
    }

    #[test]
    fn test_empty_set_is_all_zero() {
        let metrics = compute(&TransactionSet::new("user_009", vec![])).unwrap();
        assert_eq!(metrics, Metrics::default());
        assert!(metrics.total_income.is_zero());
        assert!(metrics.total_spending.is_zero());
        assert!(metrics.net_flow.is_zero());
    }

    #[test]
    fn test_deterministic_and_order_independent() {
        let forward = scenario();
        let mut rows = forward.transactions().to_vec();
        rows.reverse();
        let reversed = TransactionSet::new("user_001", rows);

        assert_eq!(compute(&forward).unwrap(), compute(&forward).unwrap());
        assert_eq!(compute(&forward).unwrap(), compute(&reversed).unwrap());
    }

    #[test]
    fn test_net_flow_identity_with_fractions() {
        let set = TransactionSet::new(
            "user_002",
            vec![
                txn(dec!(0.10), "refund"),
                txn(dec!(0.20), "refund"),
                txn(dec!(-0.30), "fees"),
                txn(dec!(0), "adjustment"),
            ],
        );
        let metrics = compute(&set).unwrap();
        assert_eq!(metrics.total_income, dec!(0.30));
        assert_eq!(metrics.total_spending, dec!(0.30));
        assert_eq!(metrics.net_flow, metrics.total_income - metrics.total_spending);
        assert!(metrics.net_flow.is_zero());
    }

    #[test]
    fn test_overflowing_totals_are_data_fault() {
        let set = TransactionSet::new(
            "user_003",
            vec![txn(Decimal::MAX, "salary"), txn(Decimal::MAX, "bonus")],
        );
        let err = compute(&set).unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable(_)));

        let set = TransactionSet::new(
            "user_003",
            vec![txn(Decimal::MIN, "rent"), txn(Decimal::MIN, "rent")],
        );
        assert!(compute(&set).is_err());
        assert!(summarize(&set).is_err());
    }

    #[test]
    fn test_summary() {
        let summary = summarize(&scenario()).unwrap();
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(summary.largest_amount, Some(dec!(5000)));
        assert_eq!(summary.smallest_amount, Some(dec!(-1200)));
        assert_eq!(summary.spending_by_category.get("rent"), Some(&dec!(1200)));
        assert!(!summary.spending_by_category.contains_key("salary"));
        assert_eq!(
            summary.headline(),
            "User has 3 transactions. Largest transaction: $5,000.00, Smallest transaction: $-1,200.00."
        );
    }

    #[test]
    fn test_empty_summary_headline() {
        let summary = summarize(&TransactionSet::new("user_009", vec![])).unwrap();
        assert_eq!(summary.headline(), "No transactions found for this user.");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(0)), "0.00");
        assert_eq!(format_money(dec!(999.5)), "999.50");
        assert_eq!(format_money(dec!(1234567.891)), "1,234,567.89");
        assert_eq!(format_money(dec!(-1500)), "-1,500.00");
    }
}
