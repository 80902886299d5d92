//! Produce the strings that are printed on the console.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use crate::types::{Amount, Balance, Expense, Group, NetBalance, User};

/// Names of users (or groups) by ID, used to print records.
pub type NameLookup = HashMap<i64, String>;

pub fn user_names(users: &[User]) -> NameLookup {
    users.iter().map(|u| (u.id, u.name.clone())).collect()
}

pub fn group_names(groups: &[Group]) -> NameLookup {
    groups.iter().map(|g| (g.id, g.name.clone())).collect()
}

fn name_of(names: &NameLookup, id: i64) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("#{id}"))
}

pub fn format_amount(amount: Amount) -> String {
    format!("{:.2}", amount)
}

pub fn format_simple_list<T: AsRef<str>>(elements: &[T]) -> String {
    if elements.is_empty() {
        "Nothing to show!".to_string()
    } else {
        elements
            .iter()
            .map(|g| format!("- {}", g.as_ref()))
            .fold(String::new(), |a, b| a + &b + "\n")
    }
}

pub fn format_list_expenses(
    expenses: &[Expense],
    users: &NameLookup,
    groups: &NameLookup,
) -> String {
    if expenses.is_empty() {
        "Nothing to show!".to_string()
    } else {
        expenses
            .iter()
            .map(|e| format_expense(e, users, groups))
            .fold(String::new(), |a, b| a + &b + "\n")
    }
}

fn format_expense(expense: &Expense, users: &NameLookup, groups: &NameLookup) -> String {
    let result = format!(
        "{}: [{}] {} paid {} #{}",
        expense.id,
        name_of(groups, expense.group_id),
        name_of(users, expense.paid_by),
        format_amount(expense.amount),
        expense.category_or_default(),
    );

    if expense.description.is_empty() {
        result
    } else {
        format!("{} - {}", result, expense.description)
    }
}

/// One line per balance, with the amounts aligned.
pub fn format_balances(balances: &[Balance], users: &NameLookup) -> String {
    if balances.is_empty() {
        return "All clean!".to_string();
    }

    let debtors: Vec<_> = balances.iter().map(|b| name_of(users, b.from_user)).collect();
    let max_debtor_length = debtors
        .iter()
        .map(|d| d.chars().count())
        .max()
        .unwrap_or(0);

    balances
        .iter()
        .zip(debtors)
        .map(|(b, debtor)| {
            format!(
                "{:<width$} owes {:>10} to {}",
                debtor,
                format_amount(b.amount),
                name_of(users, b.to_user),
                width = max_debtor_length
            )
        })
        .fold(String::new(), |a, b| a + &b + "\n")
}

pub fn format_net_balances(net_balances: &[NetBalance], users: &NameLookup) -> String {
    if net_balances.is_empty() {
        return "All clean!".to_string();
    }

    let names: Vec<_> = net_balances
        .iter()
        .map(|n| name_of(users, n.user_id))
        .collect();
    let max_name_length = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);

    net_balances
        .iter()
        .zip(names)
        .map(|(n, name)| {
            format!(
                "{:<width$} {:>+10.2}",
                name,
                n.amount,
                width = max_name_length
            )
        })
        .fold(String::new(), |a, b| a + &b + "\n")
}

/// Print a report with the keys resolved to names.
pub fn format_totals_by_id(totals: &BTreeMap<i64, Amount>, names: &NameLookup) -> String {
    let totals: Vec<_> = totals
        .iter()
        .map(|(&id, &amount)| (name_of(names, id), amount))
        .collect();
    format_totals(&totals)
}

pub fn format_totals<K: Display>(totals: &[(K, Amount)]) -> String {
    if totals.is_empty() {
        "Nothing to show!".to_string()
    } else {
        totals
            .iter()
            .map(|(key, amount)| format!("{}: {}", key, format_amount(*amount)))
            .fold(String::new(), |a, b| a + &b + "\n")
    }
}

pub fn format_recorded_expense(balances: &[Balance], users: &NameLookup) -> String {
    if balances.is_empty() {
        "Expense recorded, nobody owes anything for it.".to_string()
    } else {
        format!("Expense recorded. Updated balances:\n{}", format_balances(balances, users))
    }
}
