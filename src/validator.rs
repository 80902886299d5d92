//! Functions that check the validity of user input.
//!
//! These functions are called after the parsing phase and execute
//! checks that are not easily done by the parser.

use crate::error::{InputError, LedgerError};
use crate::types::Amount;

/// The amount of an expense must be a finite, strictly positive number.
pub fn validate_amount(amount: Amount) -> Result<(), LedgerError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(LedgerError::invalid_amount(amount))
    }
}

pub fn validate_user_name(name: &str) -> Result<(), InputError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(InputError::invalid_user_name(name))
    }
}

pub fn validate_user_names<T: AsRef<str>>(names: &[T]) -> Result<(), InputError> {
    for name in names {
        validate_user_name(name.as_ref())?;
    }
    Ok(())
}

pub fn validate_group_name(name: &str) -> Result<(), InputError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(InputError::invalid_group_name(name))
    }
}

/// Names must be ASCII alphanumeric (underscores are allowed) and start with a letter.
pub fn is_valid_name(name: &str) -> bool {
    match name.chars().next() {
        Some(first) if first.is_ascii_alphabetic() => name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}
