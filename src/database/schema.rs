use rusqlite::{Connection, Result};

const SCHEMA_VERSION: i32 = 1;

/// Create or migrate the account database
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )?;

    if current_version < 1 {
        create_schema_v1(conn)?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

fn create_schema_v1(conn: &Connection) -> Result<()> {
    // One row per verified (server, user) pair
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            server_url TEXT NOT NULL,
            user_id TEXT NOT NULL,
            login_name TEXT NOT NULL,
            display_name TEXT NOT NULL,
            app_password TEXT NOT NULL,
            server_version TEXT,
            talk_version TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (server_url, user_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS update_accounts_timestamp
         AFTER UPDATE ON accounts
         FOR EACH ROW
         BEGIN
            UPDATE accounts SET updated_at = CURRENT_TIMESTAMP WHERE id = NEW.id;
         END",
        [],
    )?;

    Ok(())
}
