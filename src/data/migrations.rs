//! Embedded schema migrations.
//!
//! Each migration runs once inside its own transaction and is recorded in
//! `__migrations_history` with a SHA-256 checksum of its SQL.

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{Result, SalesWebError};

pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

pub fn migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_initial",
            sql: include_str!("../../migrations/001_initial.sql"),
        },
        Migration {
            id: "002_other_entities",
            sql: include_str!("../../migrations/002_other_entities.sql"),
        },
    ]
}

pub fn checksum(sql: &str) -> String {
    hex::encode(Sha256::digest(sql.as_bytes()))
}

/// Applies every pending migration in order and returns how many ran.
pub fn apply_migrations(conn: &mut Connection) -> Result<usize> {
    apply(conn, &migrations())
}

pub(crate) fn apply(conn: &mut Connection, migrations: &[Migration]) -> Result<usize> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS __migrations_history (
            migration_id TEXT PRIMARY KEY,
            checksum     TEXT NOT NULL,
            applied_at   TEXT NOT NULL
        )",
        [],
    )?;

    let mut applied = 0;
    for migration in migrations {
        let expected = checksum(migration.sql);
        let recorded: Option<String> = conn
            .query_row(
                "SELECT checksum FROM __migrations_history WHERE migration_id = ?1",
                params![migration.id],
                |row| row.get(0),
            )
            .optional()?;

        match recorded {
            Some(found) if found == expected => continue,
            Some(_) => {
                return Err(SalesWebError::Migration {
                    id: migration.id.to_string(),
                    message: "checksum mismatch with the applied version".to_string(),
                })
            }
            None => {}
        }

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| SalesWebError::Migration {
                id: migration.id.to_string(),
                message: e.to_string(),
            })?;
        tx.execute(
            "INSERT INTO __migrations_history (migration_id, checksum, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.id, expected, chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        info!(migration = migration.id, "Applied migration");
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_all_migrations_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply_migrations(&mut conn).unwrap(), 2);
        assert_eq!(apply_migrations(&mut conn).unwrap(), 0);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('department', 'seller', 'sales_record')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn changed_migration_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        let original = [Migration {
            id: "001_test",
            sql: "CREATE TABLE t (id INTEGER);",
        }];
        apply(&mut conn, &original).unwrap();

        let edited = [Migration {
            id: "001_test",
            sql: "CREATE TABLE t (id INTEGER, name TEXT);",
        }];
        let err = apply(&mut conn, &edited).unwrap_err();
        assert!(matches!(err, SalesWebError::Migration { .. }));
    }

    #[test]
    fn failed_migration_is_not_recorded() {
        let mut conn = Connection::open_in_memory().unwrap();
        let broken = [Migration {
            id: "001_broken",
            sql: "CREATE TABLE ok (id INTEGER); NOT VALID SQL;",
        }];
        assert!(apply(&mut conn, &broken).is_err());

        let recorded: i64 = conn
            .query_row("SELECT COUNT(*) FROM __migrations_history", [], |row| row.get(0))
            .unwrap();
        assert_eq!(recorded, 0);
    }
}
