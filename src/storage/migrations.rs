use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; entry `n` upgrades the store to version `n + 1`.
const MIGRATIONS: &[(&str, &str)] = &[("kv_entries", include_str!("schemas/schema_v1.sql"))];

pub fn schema_version() -> i32 {
    MIGRATIONS.len() as i32
}

fn stored_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("reading store schema version")
}

/// Brings the key/value store up to [`schema_version`] inside one
/// transaction. A store written by a newer build is refused untouched.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let target = schema_version();
    let found = stored_version(conn)?;
    if found > target {
        bail!("focusdial store is at schema {found}, this build only knows {target}");
    }
    if found == target {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("opening schema upgrade transaction")?;
    for (index, (name, sql)) in MIGRATIONS.iter().enumerate().skip(found.max(0) as usize) {
        tx.execute_batch(sql)
            .with_context(|| format!("applying schema {} ({name})", index + 1))?;
    }
    tx.pragma_update(None, "user_version", target)
        .context("recording store schema version")?;
    tx.commit().context("committing schema upgrade")?;

    Ok(())
}
