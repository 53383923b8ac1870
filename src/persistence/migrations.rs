use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; entry `n` brings the file to version `n + 1`.
const MIGRATIONS: &[(i32, &str)] = &[
    (1, include_str!("schemas/schema_v1.sql")),
    (2, include_str!("schemas/schema_v2.sql")),
];

const CURRENT_SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Brings the area database up to `CURRENT_SCHEMA_VERSION` in a single
/// transaction, tracked through `PRAGMA user_version`.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version > CURRENT_SCHEMA_VERSION {
        bail!("area database is at schema v{version}, this build knows up to v{CURRENT_SCHEMA_VERSION}");
    }

    let pending: Vec<_> = MIGRATIONS
        .iter()
        .filter(|(target, _)| *target > version)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction().context("failed to open migration transaction")?;
    for (target, script) in pending {
        tx.execute_batch(script)
            .with_context(|| format!("migrating area database to v{target} failed"))?;
    }
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")
}
