use thiserror::Error;

use crate::types::{GroupId, UserId};

/// Errors returned by the balance engine.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("group with ID {0} does not exist")]
    UnknownGroup(GroupId),

    #[error("user with ID {0} does not exist")]
    UnknownUser(UserId),

    #[error("group with ID {0} has no members, the expense cannot be split")]
    EmptyGroup(GroupId),

    #[error("invalid amount `{0}`: the amount of an expense must be a positive number")]
    InvalidAmount(String),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl LedgerError {
    pub fn invalid_amount(amount: f64) -> Self {
        LedgerError::InvalidAmount(amount.to_string())
    }
}

/// A failure of the underlying storage.
///
/// The cause is kept as an `anyhow::Error`, so that any implementation of the
/// store can wrap whatever error its backend returns.
#[derive(Error, Debug)]
#[error("{message}: {cause}")]
pub struct DatabaseError {
    message: String,
    cause: anyhow::Error,
}

impl DatabaseError {
    pub fn new<T: AsRef<str>>(message: T, cause: anyhow::Error) -> Self {
        DatabaseError {
            message: message.as_ref().to_string(),
            cause,
        }
    }

    /// Data changed between a check and the actual query: the caller may try again.
    pub fn concurrency(message: &str) -> Self {
        DatabaseError::new(
            "concurrent modification detected",
            anyhow::anyhow!(message.to_string()),
        )
    }
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("invalid syntax for `/{0}`; example of valid syntax: {1}")]
    InvalidCommandSyntax(String, String),

    #[error("unknown command `{0}`; type /help to get the list of commands")]
    UnknownCommand(String),

    #[error(
        "invalid user name `{0}`: user names must be alphanumeric, can only \
             include ASCII characters and must start with a letter"
    )]
    InvalidUserName(String),

    #[error(
        "invalid group name `{0}`: group names must be alphanumeric, can only \
             include ASCII characters and must start with a letter"
    )]
    InvalidGroupName(String),

    #[error("`{0}` is not a registered user")]
    UnregisteredUser(String),

    #[error("`{0}` is not a registered group")]
    UnregisteredGroup(String),

    #[error("a user named `{0}` already exists")]
    UserAlreadyExists(String),

    #[error("a group named `{0}` already exists")]
    GroupAlreadyExists(String),

    #[error("there must be at least one user. Format must be 'group_name user_name [user_name...]'")]
    UsersNotProvided,

    #[error("invalid value `{0}` for limit: expected a positive integer")]
    InvalidLimit(String),

    #[error("invalid report `{0}`: expected one of group, category, day, payer")]
    InvalidReportKind(String),
}

impl InputError {
    pub fn invalid_command_syntax(command: &str, example: &str) -> Self {
        InputError::InvalidCommandSyntax(command.to_string(), example.to_string())
    }

    pub fn unknown_command(command: &str) -> Self {
        InputError::UnknownCommand(command.to_string())
    }

    pub fn invalid_user_name(name: &str) -> Self {
        InputError::InvalidUserName(name.to_string())
    }

    pub fn invalid_group_name(name: &str) -> Self {
        InputError::InvalidGroupName(name.to_string())
    }

    pub fn unregistered_user(name: &str) -> Self {
        InputError::UnregisteredUser(name.to_string())
    }

    pub fn unregistered_group(name: &str) -> Self {
        InputError::UnregisteredGroup(name.to_string())
    }

    pub fn user_already_exists(name: &str) -> Self {
        InputError::UserAlreadyExists(name.to_string())
    }

    pub fn group_already_exists(name: &str) -> Self {
        InputError::GroupAlreadyExists(name.to_string())
    }

    pub fn users_not_provided() -> Self {
        InputError::UsersNotProvided
    }

    pub fn invalid_limit(limit: &str) -> Self {
        InputError::InvalidLimit(limit.to_string())
    }

    pub fn invalid_report_kind(kind: &str) -> Self {
        InputError::InvalidReportKind(kind.to_string())
    }
}
