//! The core of the ledger. It contains the algorithm that turns an expense
//! into debts between the members of a group.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::{
    database::Database,
    error::LedgerError,
    types::{Balance, BalanceDelta, Membership, NewExpense, Split},
    validator::validate_amount,
};

/// Split an expense equally among the members of its group.
///
/// The algorithm works as follows:
/// - each user counts once, even if they are listed as a member more than once
/// - the amount is divided by the number of members (*N*), payer included
/// - every member except the payer owes the payer one share
///
/// The payer's own share produces no debt: a user never owes money to themselves.
/// If the payer is not a member of the group, all members owe the payer a share
/// and the payer's part is simply not accounted for.
pub fn compute_split(expense: &NewExpense, members: &[Membership]) -> Result<Split, LedgerError> {
    validate_amount(expense.amount)?;

    let mut seen = HashSet::new();
    let members: Vec<_> = members
        .iter()
        .filter(|m| seen.insert(m.user_id))
        .map(|m| m.user_id)
        .collect();

    if members.is_empty() {
        return Err(LedgerError::EmptyGroup(expense.group_id));
    }

    if !members.contains(&expense.paid_by) {
        warn!(
            "User {} paid for group {} without being one of its members",
            expense.paid_by, expense.group_id
        );
    }

    let share = expense.amount / members.len() as f64;
    let deltas = members
        .into_iter()
        .filter(|&user_id| user_id != expense.paid_by)
        .map(|user_id| BalanceDelta::new(user_id, expense.paid_by, share))
        .collect();

    Ok(Split { share, deltas })
}

/// Apply balance increments to a list of balances, returning the updated list.
///
/// The balance of an ordered pair is increased when it exists and appended otherwise,
/// so that each pair keeps at most one balance. New balances get increasing IDs,
/// starting after the largest existing one.
pub fn apply_deltas(prior: &[Balance], deltas: &[BalanceDelta]) -> Vec<Balance> {
    let mut balances = prior.to_vec();
    let mut next_id = balances.iter().map(|b| b.id).max().unwrap_or(0) + 1;

    for delta in deltas {
        match balances
            .iter_mut()
            .find(|b| b.is_between(delta.from_user, delta.to_user))
        {
            Some(balance) => balance.amount += delta.amount,
            None => {
                balances.push(Balance::new(
                    next_id,
                    delta.from_user,
                    delta.to_user,
                    delta.amount,
                ));
                next_id += 1;
            }
        }
    }

    balances
}

/// Save an expense and update the balances between the members of its group.
///
/// The database stays locked for the whole operation, so no one can observe
/// (or modify) the balances between the moment the members are read and the
/// moment the new amounts are saved. Either the expense and all its balance
/// updates are saved, or nothing is.
///
/// Returns the updated balances, one per member that owes the payer.
pub async fn record_expense<D: Database>(
    database: &Arc<Mutex<D>>,
    expense: NewExpense,
    recorded_at: DateTime<Utc>,
) -> Result<Vec<Balance>, LedgerError> {
    validate_amount(expense.amount)?;

    let mut database = database.lock().await;

    if !database.group_exists(expense.group_id)? {
        return Err(LedgerError::UnknownGroup(expense.group_id));
    }
    if !database.user_exists(expense.paid_by)? {
        return Err(LedgerError::UnknownUser(expense.paid_by));
    }

    let members = database.list_members(expense.group_id)?;
    let split = compute_split(&expense, &members)?;
    debug!(
        "Splitting {} among {} debtors, {} each",
        expense.amount,
        split.deltas.len(),
        split.share
    );

    let group_id = expense.group_id;
    let paid_by = expense.paid_by;
    let amount = expense.amount;
    let balances = database.save_expense_with_balances(expense, recorded_at, &split.deltas)?;

    info!("Recorded expense of {amount} paid by user {paid_by} in group {group_id}");
    Ok(balances)
}
