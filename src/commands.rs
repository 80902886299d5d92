//! Definition of console commands and of the dispatcher that runs them.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::{
    database::Database,
    endpoints::{
        handle_add_group, handle_add_user, handle_balances, handle_expense, handle_join,
        handle_list_expenses, handle_list_groups, handle_list_members, handle_list_users,
        handle_net_balances, handle_totals,
    },
    error::InputError,
    parser::parse_command,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    AddUser(String),
    Users,
    AddGroup(String),
    Groups,
    Join(String),
    Members(String),
    Expense(String),
    Expenses(String),
    Balances,
    Net,
    Totals(String),
    Quit,
}

/// Usage and description of each command, in the order they are shown by `/help`.
const DESCRIPTIONS: &[(&str, &str)] = &[
    ("/help", "shows this message."),
    ("/adduser name", "registers a new user."),
    ("/users", "lists all users."),
    ("/addgroup name", "creates a new group."),
    ("/groups", "lists all groups."),
    (
        "/join group user1 user2",
        "adds two users to a group.",
    ),
    ("/members group", "lists the members of a group."),
    (
        "/expense group payer amount [#category] [- description]",
        "records an expense paid by payer and split equally among the group members.",
    ),
    ("/e ...", "shortcut for the /expense command."),
    (
        "/expenses [n]",
        "shows the last n expenses; without argument, it shows all of them.",
    ),
    ("/balances", "shows who owes whom."),
    ("/net", "shows how much each user is owed (positive) or owes (negative)."),
    (
        "/totals group|category|day|payer",
        "shows the total amount spent, grouped as requested.",
    ),
    ("/quit", "exits."),
];

pub fn descriptions() -> String {
    let width = DESCRIPTIONS.iter().map(|(u, _)| u.len()).max().unwrap_or(0);
    DESCRIPTIONS.iter().fold(
        "This ledger keeps track of shared expenses. Supported commands:\n".to_string(),
        |a, (usage, description)| a + &format!("{usage:<width$}  {description}\n"),
    )
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, InputError> {
        let (_, (name, args)) = parse_command(line)
            .map_err(|_| InputError::unknown_command(line.trim()))?;
        let args = args.to_string();

        let command = match name.as_str() {
            "help" => Command::Help,
            "adduser" => Command::AddUser(args),
            "users" => Command::Users,
            "addgroup" => Command::AddGroup(args),
            "groups" => Command::Groups,
            "join" => Command::Join(args),
            "members" => Command::Members(args),
            "expense" | "e" => Command::Expense(args),
            "expenses" => Command::Expenses(args),
            "balances" | "balance" => Command::Balances,
            "net" => Command::Net,
            "totals" => Command::Totals(args),
            "quit" | "exit" => Command::Quit,
            _ => return Err(InputError::unknown_command(&name)),
        };

        Ok(command)
    }
}

/// What the console should do after a line was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Parse and run a line typed by the user.
///
/// Errors are not returned: they are logged and turned into a message for the user.
pub async fn handle_line<D: Database>(database: &Arc<Mutex<D>>, line: &str) -> Reply {
    let result = match Command::parse(line) {
        Ok(command) => {
            debug!("Running command {:?}", command);
            dispatch(database, command).await
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Command `{}` failed: {:#}", line.trim(), e);
            Reply::Text(format!("An error occurred: {e}"))
        }
    }
}

pub async fn dispatch<D: Database>(
    database: &Arc<Mutex<D>>,
    command: Command,
) -> anyhow::Result<Reply> {
    let text = match command {
        Command::Help => descriptions(),
        Command::AddUser(name) => handle_add_user(database, &name).await?,
        Command::Users => handle_list_users(database).await?,
        Command::AddGroup(name) => handle_add_group(database, &name).await?,
        Command::Groups => handle_list_groups(database).await?,
        Command::Join(payload) => handle_join(database, &payload).await?,
        Command::Members(group_name) => handle_list_members(database, &group_name).await?,
        Command::Expense(payload) => handle_expense(database, &payload, Utc::now()).await?,
        Command::Expenses(limit) => handle_list_expenses(database, &limit).await?,
        Command::Balances => handle_balances(database).await?,
        Command::Net => handle_net_balances(database).await?,
        Command::Totals(kind) => handle_totals(database, &kind).await?,
        Command::Quit => return Ok(Reply::Quit),
    };

    Ok(Reply::Text(text))
}

#[cfg(test)]
mod tests {
    use crate::database::memory::InMemoryDatabase;

    use super::*;

    #[test]
    fn test_parse_commands() -> anyhow::Result<()> {
        assert_eq!(Command::parse("/help")?, Command::Help);
        assert_eq!(
            Command::parse(" /E trip alice 3 ")?,
            Command::Expense("trip alice 3".to_string())
        );
        assert_eq!(Command::parse("/expenses 5")?, Command::Expenses("5".to_string()));
        assert_eq!(Command::parse("/expenses")?, Command::Expenses(String::new()));
        assert_eq!(Command::parse("/exit")?, Command::Quit);

        assert!(matches!(
            Command::parse("/frobnicate"),
            Err(InputError::UnknownCommand(_))
        ));
        assert!(matches!(
            Command::parse("hello"),
            Err(InputError::UnknownCommand(_))
        ));
        Ok(())
    }

    #[test]
    fn test_descriptions() {
        let help = descriptions();
        assert!(help.starts_with("This ledger keeps track of shared expenses."));
        assert_eq!(help.lines().count(), DESCRIPTIONS.len() + 1);
    }

    #[tokio::test]
    async fn test_handle_line() {
        let database = Arc::new(Mutex::new(InMemoryDatabase::new()));

        for line in ["/adduser a", "/adduser b", "/addgroup g", "/join g a b"] {
            assert!(matches!(handle_line(&database, line).await, Reply::Text(_)));
        }

        assert_eq!(
            handle_line(&database, "/e g a 10").await,
            Reply::Text("Expense recorded. Updated balances:\nb owes       5.00 to a\n".to_string())
        );
        assert_eq!(
            handle_line(&database, "/adduser a").await,
            Reply::Text("An error occurred: a user named `a` already exists".to_string())
        );
        assert_eq!(
            handle_line(&database, "/e g a 0").await,
            Reply::Text(
                "An error occurred: invalid amount `0`: the amount of an expense must be a positive number"
                    .to_string()
            )
        );
        assert_eq!(handle_line(&database, "/quit").await, Reply::Quit);
    }
}
