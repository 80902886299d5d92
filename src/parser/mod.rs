//! Parse the user input.

mod expense;

pub use expense::parse_expense;

use nom::{
    character::complete::{alphanumeric1, char, multispace0},
    combinator::rest,
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::InputError;

/// Split a command line into the command name (without `/`, lower-cased) and its
/// arguments (trimmed).
pub fn parse_command(s: &str) -> IResult<&str, (String, &str)> {
    let (s, (name, args)) = tuple((
        preceded(multispace0, preceded(char('/'), alphanumeric1)),
        rest,
    ))(s)?;

    Ok((s, (name.to_lowercase(), args.trim())))
}

pub fn parse_names(s: &str) -> Vec<String> {
    s.split_whitespace().map(|x| x.to_lowercase()).collect()
}

pub fn parse_name(s: &str) -> String {
    s.trim().to_lowercase()
}

pub fn parse_group_and_members(s: &str) -> Result<(String, Vec<String>), InputError> {
    let mut parts = parse_names(s);
    if parts.len() < 2 {
        Err(InputError::users_not_provided())
    } else {
        let members = parts.split_off(1);
        Ok((
            parts
                .pop()
                .expect("Just checked that the Vec contains at least one element"),
            members,
        ))
    }
}

/// An empty string means no limit.
pub fn parse_limit(s: &str) -> Result<Option<usize>, InputError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    match s.parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(Some(limit)),
        _ => Err(InputError::invalid_limit(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() -> anyhow::Result<()> {
        let (_, (name, args)) = parse_command("  /Expense trip alice 3 ")?;
        assert_eq!(name, "expense");
        assert_eq!(args, "trip alice 3");

        let (_, (name, args)) = parse_command("/balances")?;
        assert_eq!(name, "balances");
        assert_eq!(args, "");

        assert!(parse_command("expense trip").is_err());
        assert!(parse_command("/ expense").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_group_and_members() -> anyhow::Result<()> {
        let (group_name, members) = parse_group_and_members("g1 p1  P2 p3 ")?;
        assert_eq!(group_name, "g1");
        assert_eq!(members, vec!["p1", "p2", "p3"]);

        assert!(parse_group_and_members(" g1  ").is_err());
        assert!(parse_group_and_members("").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_limit() -> anyhow::Result<()> {
        assert_eq!(parse_limit("")?, None);
        assert_eq!(parse_limit(" 3 ")?, Some(3));
        assert!(parse_limit("0").is_err());
        assert!(parse_limit("-1").is_err());
        assert!(parse_limit("abc").is_err());
        Ok(())
    }
}
