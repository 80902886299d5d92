const CREATE_USER_TABLE: &str = "CREATE TABLE IF NOT EXISTS user (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE
)";

const CREATE_GROUP_TABLE: &str = "CREATE TABLE IF NOT EXISTS user_group (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE
)";

// No UNIQUE(user_id, group_id): duplicate memberships are tolerated.
const CREATE_GROUP_MEMBER_TABLE: &str = "CREATE TABLE IF NOT EXISTS group_member (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL REFERENCES user(id),
  group_id INTEGER NOT NULL REFERENCES user_group(id)
)";

const CREATE_EXPENSE_TABLE: &str = "CREATE TABLE IF NOT EXISTS expense (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  group_id INTEGER NOT NULL REFERENCES user_group(id),
  paid_by INTEGER NOT NULL REFERENCES user(id),
  amount REAL NOT NULL,
  description TEXT NOT NULL,
  category TEXT,
  created_at DATETIME NOT NULL
)";

const CREATE_BALANCE_TABLE: &str = "CREATE TABLE IF NOT EXISTS balance (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  from_user INTEGER NOT NULL REFERENCES user(id),
  to_user INTEGER NOT NULL REFERENCES user(id),
  amount REAL NOT NULL,
  UNIQUE(from_user, to_user),
  CHECK(from_user <> to_user)
)";

pub fn create_all_tables(connection: &rusqlite::Connection) -> anyhow::Result<()> {
    connection.pragma_update(None, "foreign_keys", true)?;
    connection.execute(CREATE_USER_TABLE, ())?;
    connection.execute(CREATE_GROUP_TABLE, ())?;
    connection.execute(CREATE_GROUP_MEMBER_TABLE, ())?;
    connection.execute(CREATE_EXPENSE_TABLE, ())?;
    connection.execute(CREATE_BALANCE_TABLE, ())?;
    Ok(())
}
