//! The implementation of a data storage using Sqlite.

use std::path::Path;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tokio::task::block_in_place;

use crate::{
    error::DatabaseError,
    types::{Balance, BalanceDelta, Expense, Group, GroupId, Membership, NewExpense, User, UserId},
};

use super::{Database, DatabaseResult};

mod schema;

pub struct SqliteDatabase {
    connection: Connection,
}

impl SqliteDatabase {
    pub fn new<P: AsRef<Path>>(path: P) -> DatabaseResult<SqliteDatabase> {
        block_in_place(|| {
            let connection = Connection::open(path)
                .map_err(|e| DatabaseError::new("cannot open database", e.into()))?;
            SqliteDatabase::with_connection(connection)
        })
    }

    pub fn open_in_memory() -> DatabaseResult<SqliteDatabase> {
        let connection = Connection::open_in_memory()
            .map_err(|e| DatabaseError::new("cannot open in-memory database", e.into()))?;
        SqliteDatabase::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> DatabaseResult<SqliteDatabase> {
        schema::create_all_tables(&connection)
            .map_err(|e| DatabaseError::new("cannot create tables", e))?;
        Ok(SqliteDatabase { connection })
    }
}

impl Database for SqliteDatabase {
    fn add_user(&mut self, name: &str) -> DatabaseResult<User> {
        let fn_impl = || {
            let id: i64 = self.connection.query_row(
                "INSERT INTO user (name) VALUES (?1) RETURNING id",
                params![&name],
                |row| row.get(0),
            )?;

            debug!("Created user {name} with ID {id}");
            Ok(User::new(id, name))
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot add user", e)))
    }

    fn add_group(&mut self, name: &str) -> DatabaseResult<Group> {
        let fn_impl = || {
            let id: i64 = self.connection.query_row(
                "INSERT INTO user_group (name) VALUES (?1) RETURNING id",
                params![&name],
                |row| row.get(0),
            )?;

            debug!("Created group {name} with ID {id}");
            Ok(Group::new(id, name))
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot add group", e)))
    }

    fn add_membership(&mut self, user_id: UserId, group_id: GroupId) -> DatabaseResult<Membership> {
        let fn_impl = || {
            let id: i64 = self.connection.query_row(
                "INSERT INTO group_member (user_id, group_id) VALUES (?1, ?2) RETURNING id",
                params![&user_id, &group_id],
                |row| row.get(0),
            )?;

            Ok(Membership::new(id, user_id, group_id))
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot add membership", e)))
    }

    fn user_exists(&self, user_id: UserId) -> DatabaseResult<bool> {
        let fn_impl = || {
            let id: Option<i64> = self
                .connection
                .query_row(
                    "SELECT id FROM user WHERE id = ?1",
                    params![&user_id],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(id.is_some())
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot check if user exists", e)))
    }

    fn group_exists(&self, group_id: GroupId) -> DatabaseResult<bool> {
        let fn_impl = || {
            let id: Option<i64> = self
                .connection
                .query_row(
                    "SELECT id FROM user_group WHERE id = ?1",
                    params![&group_id],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(id.is_some())
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot check if group exists", e)))
    }

    fn find_user_by_name(&self, name: &str) -> DatabaseResult<Option<User>> {
        let fn_impl = || {
            let user = self
                .connection
                .query_row(
                    "SELECT id, name FROM user WHERE name = ?1",
                    params![&name],
                    |row| Ok(User::new(row.get(0)?, &row.get::<_, String>(1)?)),
                )
                .optional()?;

            Ok(user)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot find user", e)))
    }

    fn find_group_by_name(&self, name: &str) -> DatabaseResult<Option<Group>> {
        let fn_impl = || {
            let group = self
                .connection
                .query_row(
                    "SELECT id, name FROM user_group WHERE name = ?1",
                    params![&name],
                    |row| Ok(Group::new(row.get(0)?, &row.get::<_, String>(1)?)),
                )
                .optional()?;

            Ok(group)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot find group", e)))
    }

    fn list_users(&self) -> DatabaseResult<Vec<User>> {
        let fn_impl = || {
            let mut stmt = self
                .connection
                .prepare_cached("SELECT id, name FROM user ORDER BY id")?;

            let user_iter = stmt.query_map([], |row| {
                Ok(User::new(row.get(0)?, &row.get::<_, String>(1)?))
            })?;

            let users = user_iter.collect::<Result<_, _>>()?;
            Ok(users)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot list users", e)))
    }

    fn list_groups(&self) -> DatabaseResult<Vec<Group>> {
        let fn_impl = || {
            let mut stmt = self
                .connection
                .prepare_cached("SELECT id, name FROM user_group ORDER BY id")?;

            let group_iter = stmt.query_map([], |row| {
                Ok(Group::new(row.get(0)?, &row.get::<_, String>(1)?))
            })?;

            let groups = group_iter.collect::<Result<_, _>>()?;
            Ok(groups)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot list groups", e)))
    }

    fn list_members(&self, group_id: GroupId) -> DatabaseResult<Vec<Membership>> {
        let fn_impl = || {
            let mut stmt = self.connection.prepare_cached(
                "SELECT id, user_id, group_id FROM group_member
                 WHERE group_id = :group_id
                 ORDER BY id",
            )?;

            let member_iter = stmt.query_map(&[(":group_id", &group_id)], |row| {
                Ok(Membership::new(row.get(0)?, row.get(1)?, row.get(2)?))
            })?;

            let members = member_iter.collect::<Result<_, _>>()?;
            Ok(members)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot list group members", e)))
    }

    fn list_expenses(&self) -> DatabaseResult<Vec<Expense>> {
        let fn_impl = || {
            let mut stmt = self.connection.prepare_cached(
                "SELECT id, group_id, paid_by, amount, description, category, created_at
                 FROM expense ORDER BY id",
            )?;

            let expense_iter = stmt.query_map([], expense_from_row)?;

            let expenses = expense_iter.collect::<Result<_, _>>()?;
            Ok(expenses)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot list expenses", e)))
    }

    fn list_balances(&self) -> DatabaseResult<Vec<Balance>> {
        let fn_impl = || {
            let mut stmt = self.connection.prepare_cached(
                "SELECT id, from_user, to_user, amount FROM balance ORDER BY id",
            )?;

            let balance_iter = stmt.query_map([], balance_from_row)?;

            let balances = balance_iter.collect::<Result<_, _>>()?;
            Ok(balances)
        };

        block_in_place(|| fn_impl().map_err(|e| map_error("cannot list balances", e)))
    }

    fn save_expense_with_balances(
        &mut self,
        expense: NewExpense,
        recorded_at: DateTime<Utc>,
        deltas: &[BalanceDelta],
    ) -> DatabaseResult<Vec<Balance>> {
        let mut fn_impl = || {
            // IMMEDIATE takes the write lock up front, so two processes cannot
            // interleave their upserts on the same balance.
            let tx = self
                .connection
                .transaction_with_behavior(TransactionBehavior::Immediate)?;

            let expense_id: i64 = {
                let mut insert_expense_stmt = tx.prepare_cached(
                    "INSERT INTO expense (group_id, paid_by, amount, description, category, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id",
                )?;

                insert_expense_stmt.query_row(
                    params![
                        &expense.group_id,
                        &expense.paid_by,
                        &expense.amount,
                        &expense.description,
                        &expense.category,
                        &recorded_at,
                    ],
                    |row| row.get(0),
                )?
            };

            debug!("expense_id is {expense_id}");

            let mut balances = Vec::with_capacity(deltas.len());
            {
                let mut upsert_balance_stmt = tx.prepare_cached(
                    "INSERT INTO balance (from_user, to_user, amount) VALUES (?1, ?2, ?3)
                     ON CONFLICT(from_user, to_user) DO UPDATE SET amount = amount + excluded.amount
                     RETURNING id, from_user, to_user, amount",
                )?;

                for delta in deltas {
                    let balance = upsert_balance_stmt.query_row(
                        params![&delta.from_user, &delta.to_user, &delta.amount],
                        balance_from_row,
                    )?;
                    if !balance.amount.is_finite() {
                        return Err(anyhow!(
                            "the balance from user {} to user {} would overflow",
                            delta.from_user,
                            delta.to_user
                        ));
                    }
                    balances.push(balance);
                }
            }

            // Dropping the transaction without committing rolls everything back.
            tx.commit()?;

            Ok(balances)
        };

        block_in_place(|| {
            fn_impl().map_err(|e| map_error("cannot save expense with balances", e))
        })
    }
}

fn expense_from_row(row: &Row) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        group_id: row.get(1)?,
        paid_by: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn balance_from_row(row: &Row) -> rusqlite::Result<Balance> {
    Ok(Balance::new(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
    ))
}

fn map_error<T: AsRef<str>>(message: T, e: anyhow::Error) -> DatabaseError {
    match e.downcast::<DatabaseError>() {
        Ok(e) => e,
        Err(e) => DatabaseError::new(message, e),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use tempdir::TempDir;

    use super::*;

    fn make_database() -> SqliteDatabase {
        SqliteDatabase::open_in_memory().expect("test")
    }

    #[test]
    fn test_add_and_find_users_and_groups() -> anyhow::Result<()> {
        let mut database = make_database();

        let alice = database.add_user("alice")?;
        let bob = database.add_user("bob")?;
        let trip = database.add_group("trip")?;

        assert_eq!(database.list_users()?, vec![alice.clone(), bob]);
        assert_eq!(database.list_groups()?, vec![trip.clone()]);
        assert_eq!(database.find_user_by_name("alice")?, Some(alice.clone()));
        assert_eq!(database.find_user_by_name("carol")?, None);
        assert_eq!(database.find_group_by_name("trip")?, Some(trip.clone()));
        assert!(database.user_exists(alice.id)?);
        assert!(!database.user_exists(42)?);
        assert!(database.group_exists(trip.id)?);
        assert!(!database.group_exists(42)?);
        Ok(())
    }

    #[test]
    fn test_names_are_unique() -> anyhow::Result<()> {
        let mut database = make_database();

        database.add_user("alice")?;
        assert!(database.add_user("alice").is_err());

        database.add_group("trip")?;
        assert!(database.add_group("trip").is_err());
        Ok(())
    }

    #[test]
    fn test_duplicate_memberships_are_kept() -> anyhow::Result<()> {
        let mut database = make_database();

        let alice = database.add_user("alice")?;
        let trip = database.add_group("trip")?;
        database.add_membership(alice.id, trip.id)?;
        database.add_membership(alice.id, trip.id)?;

        let members = database.list_members(trip.id)?;
        assert_eq!(members.len(), 2);
        assert!(members.iter().all(|m| m.user_id == alice.id));
        Ok(())
    }

    #[test]
    fn test_save_expense_upserts_balances() -> anyhow::Result<()> {
        let mut database = make_database();

        let alice = database.add_user("alice")?;
        let bob = database.add_user("bob")?;
        let trip = database.add_group("trip")?;

        let expense = NewExpense::new(trip.id, alice.id, 20.0, "taxi", None);
        let deltas = vec![BalanceDelta::new(bob.id, alice.id, 10.0)];
        database.save_expense_with_balances(expense.clone(), Utc::now(), &deltas)?;
        let balances = database.save_expense_with_balances(expense, Utc::now(), &deltas)?;

        assert_eq!(balances.len(), 1);
        assert_abs_diff_eq!(balances[0].amount, 20.0);

        let all_balances = database.list_balances()?;
        assert_eq!(all_balances.len(), 1);
        assert!(all_balances[0].is_between(bob.id, alice.id));
        assert_abs_diff_eq!(all_balances[0].amount, 20.0);

        let expenses = database.list_expenses()?;
        assert_eq!(expenses.len(), 2);
        assert_eq!(expenses[0].description, "taxi");
        assert_eq!(expenses[0].category, None);
        Ok(())
    }

    #[test]
    fn test_failed_save_is_rolled_back() -> anyhow::Result<()> {
        let mut database = make_database();

        let alice = database.add_user("alice")?;
        let bob = database.add_user("bob")?;
        let trip = database.add_group("trip")?;

        let expense = NewExpense::new(trip.id, alice.id, 30.0, "dinner", None);
        // The second delta references a user that does not exist.
        let deltas = vec![
            BalanceDelta::new(bob.id, alice.id, 10.0),
            BalanceDelta::new(999, alice.id, 10.0),
        ];
        let result = database.save_expense_with_balances(expense, Utc::now(), &deltas);

        assert!(result.is_err());
        assert!(database.list_expenses()?.is_empty());
        assert!(database.list_balances()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_data_survives_reopening() -> anyhow::Result<()> {
        let dir = TempDir::new("splitledger")?;
        let path = dir.path().join("ledger.db");

        {
            let mut database = SqliteDatabase::new(&path)?;
            let alice = database.add_user("alice")?;
            let bob = database.add_user("bob")?;
            let trip = database.add_group("trip")?;
            let expense = NewExpense::new(trip.id, alice.id, 8.5, "coffee", Some("Food".into()));
            let deltas = vec![BalanceDelta::new(bob.id, alice.id, 4.25)];
            database.save_expense_with_balances(expense, Utc::now(), &deltas)?;
        }

        let database = SqliteDatabase::new(&path)?;
        let expenses = database.list_expenses()?;
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].category, Some("Food".to_string()));
        assert_abs_diff_eq!(expenses[0].amount, 8.5);
        assert_eq!(database.list_balances()?.len(), 1);
        Ok(())
    }
}
