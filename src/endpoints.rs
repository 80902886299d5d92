//! Core implementation of the console commands.
//!
//! Each handler takes the raw arguments typed by the user and returns the text
//! to print. Parsing, validation and name resolution happen here, so the balance
//! engine only ever deals with IDs.

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    balance_engine::record_expense,
    database::Database,
    error::InputError,
    formatter::{
        format_balances, format_list_expenses, format_net_balances, format_recorded_expense,
        format_simple_list, format_totals, format_totals_by_id, group_names, user_names,
    },
    parser::{parse_expense, parse_group_and_members, parse_limit, parse_name},
    reporting::{
        net_balance_per_user, totals_by_category, totals_by_day, totals_by_group, totals_by_payer,
    },
    types::{Group, NewExpense, User},
    validator::{validate_group_name, validate_user_name, validate_user_names},
};

const EXPENSE_EXAMPLE: &str = "trip alice 90.00 #Food - dinner";

pub async fn handle_add_user<D: Database>(
    database: &Arc<Mutex<D>>,
    payload: &str,
) -> anyhow::Result<String> {
    let name = parse_name(payload);
    validate_user_name(&name)?;
    debug!("Adding user named {name}");

    let mut database = database.lock().await;
    if database.find_user_by_name(&name)?.is_some() {
        return Err(InputError::user_already_exists(&name).into());
    }
    let user = database.add_user(&name)?;

    Ok(format!("User '{}' added.", user.name))
}

pub async fn handle_list_users<D: Database>(database: &Arc<Mutex<D>>) -> anyhow::Result<String> {
    let users = database.lock().await.list_users()?;
    let names: Vec<_> = users.into_iter().map(|u| u.name).collect();
    Ok(format_simple_list(&names))
}

pub async fn handle_add_group<D: Database>(
    database: &Arc<Mutex<D>>,
    payload: &str,
) -> anyhow::Result<String> {
    let name = parse_name(payload);
    validate_group_name(&name)?;
    debug!("Creating group named {name}");

    let mut database = database.lock().await;
    if database.find_group_by_name(&name)?.is_some() {
        return Err(InputError::group_already_exists(&name).into());
    }
    let group = database.add_group(&name)?;

    Ok(format!("Group '{}' created.", group.name))
}

pub async fn handle_list_groups<D: Database>(database: &Arc<Mutex<D>>) -> anyhow::Result<String> {
    let groups = database.lock().await.list_groups()?;
    let names: Vec<_> = groups.into_iter().map(|g| g.name).collect();
    Ok(format_simple_list(&names))
}

/// Add one or more users to a group.
pub async fn handle_join<D: Database>(
    database: &Arc<Mutex<D>>,
    payload: &str,
) -> anyhow::Result<String> {
    let (group_name, members) = parse_group_and_members(payload)?;
    validate_group_name(&group_name)?;
    validate_user_names(&members)?;
    debug!(
        "Adding members to group named {group_name}. Members: {:#?}",
        members
    );

    let mut database = database.lock().await;
    let group = resolve_group(&*database, &group_name)?;
    // Resolve everybody first, so that an unknown name adds nobody.
    let users = members
        .iter()
        .map(|m| resolve_user(&*database, m))
        .collect::<anyhow::Result<Vec<_>>>()?;

    for user in &users {
        database.add_membership(user.id, group.id)?;
    }

    Ok(format!(
        "Added {} member(s) to group '{}'.",
        users.len(),
        group.name
    ))
}

pub async fn handle_list_members<D: Database>(
    database: &Arc<Mutex<D>>,
    group_name: &str,
) -> anyhow::Result<String> {
    let group_name = parse_name(group_name);
    validate_group_name(&group_name)?;
    debug!("Listing all members of group: {group_name}");

    let database = database.lock().await;
    let group = resolve_group(&*database, &group_name)?;
    let users = user_names(&database.list_users()?);

    let mut members: Vec<_> = database
        .list_members(group.id)?
        .into_iter()
        .filter_map(|m| users.get(&m.user_id).cloned())
        .collect();
    members.sort();
    members.dedup();

    Ok(format_simple_list(&members))
}

pub async fn handle_expense<D: Database>(
    database: &Arc<Mutex<D>>,
    payload: &str,
    recorded_at: DateTime<Utc>,
) -> anyhow::Result<String> {
    let (rest, expense) = parse_expense(payload)
        .map_err(|_| InputError::invalid_command_syntax("expense", EXPENSE_EXAMPLE))?;
    if !rest.trim().is_empty() {
        return Err(InputError::invalid_command_syntax("expense", EXPENSE_EXAMPLE).into());
    }

    // Names are resolved under a first lock; the engine takes its own lock and
    // checks again that the IDs still exist.
    let (new_expense, users) = {
        let database = database.lock().await;
        let group = resolve_group(&*database, &expense.group)?;
        let payer = resolve_user(&*database, &expense.paid_by)?;
        let new_expense = NewExpense::new(
            group.id,
            payer.id,
            expense.amount,
            expense.description.as_deref().unwrap_or(""),
            expense.category,
        );
        (new_expense, user_names(&database.list_users()?))
    };

    let balances = record_expense(database, new_expense, recorded_at).await?;
    info!(
        "Expense of {} paid by {} in {} updated {} balance(s)",
        expense.amount,
        expense.paid_by,
        expense.group,
        balances.len()
    );

    Ok(format_recorded_expense(&balances, &users))
}

/// List the last *limit* expenses, oldest first. Without limit, list all of them.
pub async fn handle_list_expenses<D: Database>(
    database: &Arc<Mutex<D>>,
    limit: &str,
) -> anyhow::Result<String> {
    let limit = parse_limit(limit)?;
    debug!("Producing the list of expenses with limit {:?}", limit);

    let database = database.lock().await;
    let expenses = database.list_expenses()?;
    let start = match limit {
        Some(limit) => expenses.len().saturating_sub(limit),
        None => 0,
    };

    let users = user_names(&database.list_users()?);
    let groups = group_names(&database.list_groups()?);
    Ok(format_list_expenses(&expenses[start..], &users, &groups))
}

pub async fn handle_balances<D: Database>(database: &Arc<Mutex<D>>) -> anyhow::Result<String> {
    let database = database.lock().await;
    let balances = database.list_balances()?;
    let users = user_names(&database.list_users()?);
    Ok(format_balances(&balances, &users))
}

pub async fn handle_net_balances<D: Database>(
    database: &Arc<Mutex<D>>,
) -> anyhow::Result<String> {
    let database = database.lock().await;
    let net_balances = net_balance_per_user(&database.list_balances()?);
    let users = user_names(&database.list_users()?);
    Ok(format_net_balances(&net_balances, &users))
}

pub async fn handle_totals<D: Database>(
    database: &Arc<Mutex<D>>,
    kind: &str,
) -> anyhow::Result<String> {
    let kind = parse_name(kind);
    let database = database.lock().await;
    let expenses = database.list_expenses()?;

    let result = match kind.as_str() {
        "group" => {
            let groups = group_names(&database.list_groups()?);
            format_totals_by_id(&totals_by_group(&expenses), &groups)
        }
        "payer" => {
            let users = user_names(&database.list_users()?);
            format_totals_by_id(&totals_by_payer(&expenses), &users)
        }
        "category" => {
            let totals: Vec<_> = totals_by_category(&expenses).into_iter().collect();
            format_totals(&totals)
        }
        "day" => {
            let totals: Vec<_> = totals_by_day(&expenses).into_iter().collect();
            format_totals(&totals)
        }
        _ => return Err(InputError::invalid_report_kind(&kind).into()),
    };

    Ok(result)
}

fn resolve_user<D: Database>(database: &D, name: &str) -> anyhow::Result<User> {
    database
        .find_user_by_name(name)?
        .ok_or_else(|| InputError::unregistered_user(name).into())
}

fn resolve_group<D: Database>(database: &D, name: &str) -> anyhow::Result<Group> {
    database
        .find_group_by_name(name)?
        .ok_or_else(|| InputError::unregistered_group(name).into())
}

#[cfg(test)]
mod tests {
    use crate::database::{memory::InMemoryDatabase, sqlite::SqliteDatabase};
    use crate::error::LedgerError;

    use super::*;

    async fn make_database<D: Database>(database: D) -> anyhow::Result<Arc<Mutex<D>>> {
        let database = Arc::new(Mutex::new(database));
        for name in ["U1", "u2", "u3"] {
            handle_add_user(&database, name).await?;
        }
        handle_add_group(&database, "g").await?;
        handle_join(&database, "g u1 u2 u3").await?;
        Ok(database)
    }

    #[tokio::test]
    async fn test_add_and_list() -> anyhow::Result<()> {
        let database = make_database(InMemoryDatabase::new()).await?;

        assert_eq!(handle_list_users(&database).await?, "- u1\n- u2\n- u3\n");
        assert_eq!(handle_list_groups(&database).await?, "- g\n");
        assert_eq!(
            handle_list_members(&database, " G ").await?,
            "- u1\n- u2\n- u3\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_input_errors() -> anyhow::Result<()> {
        let database = make_database(InMemoryDatabase::new()).await?;

        let error = handle_add_user(&database, "u1").await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<InputError>(),
            Some(InputError::UserAlreadyExists(_))
        ));

        let error = handle_add_group(&database, "1g").await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<InputError>(),
            Some(InputError::InvalidGroupName(_))
        ));

        let error = handle_join(&database, "g u1 nobody").await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<InputError>(),
            Some(InputError::UnregisteredUser(_))
        ));
        // u1 was not added a second time.
        let members = database.lock().await.list_members(1)?;
        assert_eq!(members.len(), 3);

        let error = handle_expense(&database, "nope u1 10", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<InputError>(),
            Some(InputError::UnregisteredGroup(_))
        ));

        let error = handle_expense(&database, "g u1 ten", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<InputError>(),
            Some(InputError::InvalidCommandSyntax(_, _))
        ));

        let error = handle_totals(&database, "week").await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<InputError>(),
            Some(InputError::InvalidReportKind(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_expense_errors_from_engine() -> anyhow::Result<()> {
        let database = make_database(InMemoryDatabase::new()).await?;
        handle_add_group(&database, "empty").await?;

        let error = handle_expense(&database, "g u1 -5", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<LedgerError>(),
            Some(LedgerError::InvalidAmount(_))
        ));

        let error = handle_expense(&database, "empty u1 5", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<LedgerError>(),
            Some(LedgerError::EmptyGroup(_))
        ));

        assert_eq!(handle_list_expenses(&database, "").await?, "Nothing to show!");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expense_flow() -> anyhow::Result<()> {
        let database = make_database(SqliteDatabase::open_in_memory()?).await?;

        let result = handle_expense(&database, "g u1 90 #Food - dinner", Utc::now()).await?;
        assert_eq!(
            result,
            "Expense recorded. Updated balances:\nu2 owes      30.00 to u1\nu3 owes      30.00 to u1\n"
        );
        handle_expense(&database, "G U2 30,00 #Food - snacks", Utc::now()).await?;
        handle_expense(&database, "g u3 6", Utc::now()).await?;

        assert_eq!(
            handle_balances(&database).await?,
            "u2 owes      30.00 to u1\n\
             u3 owes      30.00 to u1\n\
             u1 owes      10.00 to u2\n\
             u3 owes      10.00 to u2\n\
             u1 owes       2.00 to u3\n\
             u2 owes       2.00 to u3\n"
        );
        assert_eq!(
            handle_net_balances(&database).await?,
            "u1     +48.00\nu2     -12.00\nu3     -36.00\n"
        );
        assert_eq!(
            handle_totals(&database, "category").await?,
            "Food: 120.00\nOther: 6.00\n"
        );
        assert_eq!(handle_totals(&database, "group").await?, "g: 126.00\n");
        assert_eq!(
            handle_totals(&database, "payer").await?,
            "u1: 90.00\nu2: 30.00\nu3: 6.00\n"
        );

        let list = handle_list_expenses(&database, "2").await?;
        assert_eq!(list, "2: [g] u2 paid 30.00 #Food - snacks\n3: [g] u3 paid 6.00 #Other\n");
        Ok(())
    }
}
