use chrono::{DateTime, Utc};

pub type Amount = f64;
pub type UserId = i64;
pub type GroupId = i64;
pub type MembershipId = i64;
pub type ExpenseId = i64;
pub type BalanceId = i64;

/// Category used in reports when an expense has none.
pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub group_id: GroupId,
}

/// An expense as submitted by the user, before it is saved.
#[derive(Clone, Debug, PartialEq)]
pub struct NewExpense {
    pub group_id: GroupId,
    pub paid_by: UserId,
    pub amount: Amount,
    pub description: String,
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expense {
    pub id: ExpenseId,
    pub group_id: GroupId,
    pub paid_by: UserId,
    pub amount: Amount,
    pub description: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A directed debt: *from_user* owes *to_user* the given amount.
#[derive(Clone, Debug, PartialEq)]
pub struct Balance {
    pub id: BalanceId,
    pub from_user: UserId,
    pub to_user: UserId,
    pub amount: Amount,
}

/// An increment to the balance between two users.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceDelta {
    pub from_user: UserId,
    pub to_user: UserId,
    pub amount: Amount,
}

/// The outcome of splitting an expense among the members of a group.
#[derive(Clone, Debug, PartialEq)]
pub struct Split {
    pub share: Amount,
    pub deltas: Vec<BalanceDelta>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetBalance {
    pub user_id: UserId,
    pub amount: Amount,
}

impl User {
    pub fn new(id: UserId, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
        }
    }
}

impl Group {
    pub fn new(id: GroupId, name: &str) -> Group {
        Group {
            id,
            name: name.to_string(),
        }
    }
}

impl Membership {
    pub fn new(id: MembershipId, user_id: UserId, group_id: GroupId) -> Membership {
        Membership {
            id,
            user_id,
            group_id,
        }
    }
}

impl NewExpense {
    pub fn new(
        group_id: GroupId,
        paid_by: UserId,
        amount: Amount,
        description: &str,
        category: Option<String>,
    ) -> NewExpense {
        NewExpense {
            group_id,
            paid_by,
            amount,
            description: description.to_string(),
            category,
        }
    }
}

impl Expense {
    pub fn new(
        id: ExpenseId,
        expense: NewExpense,
        created_at: DateTime<Utc>,
    ) -> Expense {
        Expense {
            id,
            group_id: expense.group_id,
            paid_by: expense.paid_by,
            amount: expense.amount,
            description: expense.description,
            category: expense.category,
            created_at,
        }
    }

    /// The category shown in reports.
    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }
}

impl Balance {
    pub fn new(id: BalanceId, from_user: UserId, to_user: UserId, amount: Amount) -> Balance {
        Balance {
            id,
            from_user,
            to_user,
            amount,
        }
    }

    pub fn is_between(&self, from_user: UserId, to_user: UserId) -> bool {
        self.from_user == from_user && self.to_user == to_user
    }
}

impl BalanceDelta {
    pub fn new(from_user: UserId, to_user: UserId, amount: Amount) -> BalanceDelta {
        BalanceDelta {
            from_user,
            to_user,
            amount,
        }
    }
}

impl NetBalance {
    pub fn new(user_id: UserId, amount: Amount) -> NetBalance {
        NetBalance { user_id, amount }
    }
}

/// An expense as typed by the user: group and payer are still names.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedExpense {
    pub group: String,
    pub paid_by: String,
    pub amount: Amount,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl ParsedExpense {
    pub fn new(
        group: String,
        paid_by: String,
        amount: Amount,
        category: Option<String>,
        description: Option<String>,
    ) -> ParsedExpense {
        ParsedExpense {
            group,
            paid_by,
            amount,
            category,
            description,
        }
    }
}
