//! Parse an expense.
//!
//! Since expenses have a more or less complex syntax, we use nom.

use nom::{
    bytes::complete::{is_not, tag},
    character::complete::{char, multispace0, not_line_ending},
    combinator::{map, map_res, opt, verify},
    sequence::preceded,
    AsChar, IResult, InputTakeAtPosition,
};

use crate::{
    types::{Amount, ParsedExpense},
    validator::is_valid_name,
};

/// Parse an expense submitted by the user.
///
/// Syntax: `group payer amount [#category] [- description]`, for instance
/// `trip alice 90.00 #Food - dinner`. Names are lower-cased, while category and
/// description are kept as typed. Whether the amount makes sense is checked later.
pub fn parse_expense(s: &str) -> IResult<&str, ParsedExpense> {
    let (s, group) = parse_name(s)?;
    let (s, paid_by) = parse_name(s)?;
    let (s, amount) = parse_amount(s)?;
    let (s, category) = parse_category(s)?;
    let (s, description) = parse_description(s)?;
    let (s, _) = multispace0(s)?;

    Ok((
        s,
        ParsedExpense::new(group, paid_by, amount, category, description),
    ))
}

fn parse_name(s: &str) -> IResult<&str, String> {
    preceded(
        multispace0,
        map(
            // Match until a whitespace is found, then use is_valid_name to make
            // sure that a name was matched (and not a number, which would be the amount).
            verify(is_not(" \t\r\n"), |name: &str| is_valid_name(name)),
            |name: &str| name.to_lowercase(),
        ),
    )(s)
}

fn float1(s: &str) -> IResult<&str, &str> {
    s.split_at_position1_complete(
        |item| !item.is_dec_digit() && item != ',' && item != '.' && item != '-' && item != '+',
        nom::error::ErrorKind::Float,
    )
}

/// Both `.` and `,` are accepted as decimal separator.
fn parse_amount(s: &str) -> IResult<&str, Amount> {
    preceded(
        multispace0,
        map_res(float1, |x: &str| x.replace(',', ".").parse::<Amount>()),
    )(s)
}

fn parse_category(s: &str) -> IResult<&str, Option<String>> {
    opt(preceded(
        multispace0,
        preceded(char('#'), map(is_not(" \t\r\n"), |c: &str| c.to_string())),
    ))(s)
}

fn parse_description(s: &str) -> IResult<&str, Option<String>> {
    opt(preceded(
        multispace0,
        preceded(
            tag("- "),
            map(not_line_ending, |d: &str| d.trim().to_string()),
        ),
    ))(s)
}
