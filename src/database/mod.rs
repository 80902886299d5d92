//! Internal representation of data.

use chrono::{DateTime, Utc};

use crate::{
    error::DatabaseError,
    types::{Balance, BalanceDelta, Expense, Group, GroupId, Membership, NewExpense, User, UserId},
};

type DatabaseResult<T> = Result<T, DatabaseError>;

pub mod memory;
pub mod sqlite;

/// This trait abstracts over the type of database.

/// The implementation could save the data in any suitable database or even in memory.
pub trait Database {
    /// Create a user with the given *name*.
    ///
    /// Names are unique: if a user with the same name exists, an error is returned.
    fn add_user(&mut self, name: &str) -> DatabaseResult<User>;

    /// Create a group with the given *name*.
    ///
    /// Names are unique: if a group with the same name exists, an error is returned.
    fn add_group(&mut self, name: &str) -> DatabaseResult<Group>;

    /// Add a user to a group.
    ///
    /// Adding the same user twice is allowed and results in two membership records.
    fn add_membership(&mut self, user_id: UserId, group_id: GroupId)
        -> DatabaseResult<Membership>;

    /// Check if a user with the given *user_id* exists.
    fn user_exists(&self, user_id: UserId) -> DatabaseResult<bool>;

    /// Check if a group with the given *group_id* exists.
    fn group_exists(&self, group_id: GroupId) -> DatabaseResult<bool>;

    fn find_user_by_name(&self, name: &str) -> DatabaseResult<Option<User>>;

    fn find_group_by_name(&self, name: &str) -> DatabaseResult<Option<Group>>;

    /// Get the list of all users, ordered by ID.
    fn list_users(&self) -> DatabaseResult<Vec<User>>;

    /// Get the list of all groups, ordered by ID.
    fn list_groups(&self) -> DatabaseResult<Vec<Group>>;

    /// Get all membership records of a group, duplicates included.
    fn list_members(&self, group_id: GroupId) -> DatabaseResult<Vec<Membership>>;

    /// Get the list of all expenses, ordered by ID.
    fn list_expenses(&self) -> DatabaseResult<Vec<Expense>>;

    /// Get the list of all balances, ordered by ID.
    fn list_balances(&self) -> DatabaseResult<Vec<Balance>>;

    /// Save an expense and apply the given balance increments.
    ///
    /// Either everything is saved or nothing is. For each delta, the balance of the
    /// ordered pair `(from_user, to_user)` is created if missing, otherwise its amount is
    /// increased. The updated balances are returned in the same order as *deltas*.
    fn save_expense_with_balances(
        &mut self,
        expense: NewExpense,
        recorded_at: DateTime<Utc>,
        deltas: &[BalanceDelta],
    ) -> DatabaseResult<Vec<Balance>>;
}
