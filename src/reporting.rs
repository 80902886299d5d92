//! Aggregated views over expenses and balances.
//!
//! Everything here is read-only: results are computed on the fly and never
//! written back to the database.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::types::{Amount, Balance, Expense, GroupId, NetBalance, UserId};

/// For each user, the money owed to them minus the money they owe.
///
/// Users that appear in no balance are omitted. The result is sorted by user ID.
pub fn net_balance_per_user(balances: &[Balance]) -> Vec<NetBalance> {
    let mut net: BTreeMap<UserId, Amount> = BTreeMap::new();

    for balance in balances {
        *net.entry(balance.to_user).or_insert(0.0) += balance.amount;
        *net.entry(balance.from_user).or_insert(0.0) -= balance.amount;
    }

    net.into_iter()
        .map(|(user_id, amount)| NetBalance::new(user_id, amount))
        .collect()
}

pub fn totals_by_group(expenses: &[Expense]) -> BTreeMap<GroupId, Amount> {
    sum_by(expenses, |e| e.group_id)
}

/// Expenses without a category are counted under [`DEFAULT_CATEGORY`](crate::types::DEFAULT_CATEGORY).
pub fn totals_by_category(expenses: &[Expense]) -> BTreeMap<String, Amount> {
    sum_by(expenses, |e| e.category_or_default().to_string())
}

/// Daily totals, using the UTC date on which each expense was recorded.
pub fn totals_by_day(expenses: &[Expense]) -> BTreeMap<NaiveDate, Amount> {
    sum_by(expenses, |e| e.created_at.date_naive())
}

/// How much each user paid out of pocket.
pub fn totals_by_payer(expenses: &[Expense]) -> BTreeMap<UserId, Amount> {
    sum_by(expenses, |e| e.paid_by)
}

fn sum_by<K: Ord, F: Fn(&Expense) -> K>(expenses: &[Expense], key: F) -> BTreeMap<K, Amount> {
    let mut totals = BTreeMap::new();
    for expense in expenses {
        *totals.entry(key(expense)).or_insert(0.0) += expense.amount;
    }
    totals
}
