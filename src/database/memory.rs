//! A volatile data storage, kept entirely in memory.
//!
//! Nothing survives the process, which makes it handy for tests and for
//! throw-away sessions.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use log::debug;

use crate::{
    balance_engine::apply_deltas,
    error::DatabaseError,
    types::{Balance, BalanceDelta, Expense, Group, GroupId, Membership, NewExpense, User, UserId},
};

use super::{Database, DatabaseResult};

#[derive(Default)]
pub struct InMemoryDatabase {
    users: Vec<User>,
    groups: Vec<Group>,
    memberships: Vec<Membership>,
    expenses: Vec<Expense>,
    balances: Vec<Balance>,
}

impl InMemoryDatabase {
    pub fn new() -> InMemoryDatabase {
        InMemoryDatabase::default()
    }

    fn check_user(&self, user_id: UserId) -> DatabaseResult<()> {
        if self.user_exists(user_id)? {
            Ok(())
        } else {
            Err(DatabaseError::new(
                "foreign key constraint failed",
                anyhow!("user with ID {user_id} not found"),
            ))
        }
    }

    fn check_group(&self, group_id: GroupId) -> DatabaseResult<()> {
        if self.group_exists(group_id)? {
            Ok(())
        } else {
            Err(DatabaseError::new(
                "foreign key constraint failed",
                anyhow!("group with ID {group_id} not found"),
            ))
        }
    }
}

impl Database for InMemoryDatabase {
    fn add_user(&mut self, name: &str) -> DatabaseResult<User> {
        if self.users.iter().any(|u| u.name == name) {
            return Err(DatabaseError::new(
                "cannot add user",
                anyhow!("UNIQUE constraint failed: user.name"),
            ));
        }
        let user = User::new(self.users.len() as i64 + 1, name);
        debug!("Created user {name} with ID {}", user.id);
        self.users.push(user.clone());
        Ok(user)
    }

    fn add_group(&mut self, name: &str) -> DatabaseResult<Group> {
        if self.groups.iter().any(|g| g.name == name) {
            return Err(DatabaseError::new(
                "cannot add group",
                anyhow!("UNIQUE constraint failed: group.name"),
            ));
        }
        let group = Group::new(self.groups.len() as i64 + 1, name);
        debug!("Created group {name} with ID {}", group.id);
        self.groups.push(group.clone());
        Ok(group)
    }

    fn add_membership(&mut self, user_id: UserId, group_id: GroupId) -> DatabaseResult<Membership> {
        self.check_user(user_id)?;
        self.check_group(group_id)?;
        let membership = Membership::new(self.memberships.len() as i64 + 1, user_id, group_id);
        self.memberships.push(membership.clone());
        Ok(membership)
    }

    fn user_exists(&self, user_id: UserId) -> DatabaseResult<bool> {
        Ok(self.users.iter().any(|u| u.id == user_id))
    }

    fn group_exists(&self, group_id: GroupId) -> DatabaseResult<bool> {
        Ok(self.groups.iter().any(|g| g.id == group_id))
    }

    fn find_user_by_name(&self, name: &str) -> DatabaseResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.name == name).cloned())
    }

    fn find_group_by_name(&self, name: &str) -> DatabaseResult<Option<Group>> {
        Ok(self.groups.iter().find(|g| g.name == name).cloned())
    }

    fn list_users(&self) -> DatabaseResult<Vec<User>> {
        Ok(self.users.clone())
    }

    fn list_groups(&self) -> DatabaseResult<Vec<Group>> {
        Ok(self.groups.clone())
    }

    fn list_members(&self, group_id: GroupId) -> DatabaseResult<Vec<Membership>> {
        Ok(self
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    fn list_expenses(&self) -> DatabaseResult<Vec<Expense>> {
        Ok(self.expenses.clone())
    }

    fn list_balances(&self) -> DatabaseResult<Vec<Balance>> {
        Ok(self.balances.clone())
    }

    fn save_expense_with_balances(
        &mut self,
        expense: NewExpense,
        recorded_at: DateTime<Utc>,
        deltas: &[BalanceDelta],
    ) -> DatabaseResult<Vec<Balance>> {
        // Run every check before touching the data, so that a failure leaves
        // the store untouched.
        self.check_group(expense.group_id)?;
        self.check_user(expense.paid_by)?;
        for delta in deltas {
            self.check_user(delta.from_user)?;
            self.check_user(delta.to_user)?;
            if delta.from_user == delta.to_user {
                return Err(DatabaseError::new(
                    "cannot save expense with balances",
                    anyhow!("CHECK constraint failed: from_user <> to_user"),
                ));
            }
        }

        let balances = apply_deltas(&self.balances, deltas);
        let mut updated = Vec::with_capacity(deltas.len());
        for delta in deltas {
            let balance = balances
                .iter()
                .find(|b| b.is_between(delta.from_user, delta.to_user))
                .ok_or_else(|| DatabaseError::concurrency("the updated balance was not found"))?;
            if !balance.amount.is_finite() {
                return Err(DatabaseError::new(
                    "cannot save expense with balances",
                    anyhow!(
                        "the balance from user {} to user {} would overflow",
                        delta.from_user,
                        delta.to_user
                    ),
                ));
            }
            updated.push(balance.clone());
        }

        let expense = Expense::new(self.expenses.len() as i64 + 1, expense, recorded_at);
        debug!("expense_id is {}", expense.id);
        self.expenses.push(expense);
        self.balances = balances;

        Ok(updated)
    }
}
