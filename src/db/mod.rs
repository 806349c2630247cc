//! Record storage behind the built-in feature modules.
//!
//! The console itself persists nothing; this store exists so the users,
//! finance and notes modules have real record sets to search and list.
//! There is no update/delete surface: entity management is owned by the
//! feature applications, not the console.

mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
}

/// A ledger entry owned by one user. Amounts are stored in minor units
/// (cents) to avoid float arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner: String,
    pub payee: String,
    pub amount_minor: i64,
    pub currency: String,
    pub memo: String,
    pub booked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionInput {
    pub owner: String,
    pub payee: String,
    pub amount_minor: i64,
    pub currency: String,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub owner: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteInput {
    pub owner: String,
    pub content: String,
}

pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Store path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "opsconsole")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("opsconsole.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("store lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User operations
    // ============================================================

    pub fn create_user(&self, input: CreateUserInput) -> Result<User> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (id, username, email, is_staff, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.username,
                &input.email,
                if input.is_staff { 1 } else { 0 },
                now.to_rfc3339(),
            ),
        )?;

        Ok(User {
            id,
            username: input.username,
            email: input.email,
            is_staff: input.is_staff,
            created_at: now,
        })
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, username, email, is_staff, created_at
             FROM users ORDER BY username",
        )?;

        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    pub fn search_users(&self, query: &str) -> Result<Vec<User>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, username, email, is_staff, created_at
             FROM users WHERE username LIKE ?1 OR email LIKE ?1 ORDER BY username",
        )?;

        let pattern = like_pattern(query);
        let users = stmt
            .query_map([pattern], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    // ============================================================
    // Transaction operations
    // ============================================================

    pub fn create_transaction(&self, input: CreateTransactionInput) -> Result<Transaction> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO transactions (id, owner, payee, amount_minor, currency, memo, booked_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.owner,
                &input.payee,
                input.amount_minor,
                &input.currency,
                &input.memo,
                now.to_rfc3339(),
            ),
        )?;

        Ok(Transaction {
            id,
            owner: input.owner,
            payee: input.payee,
            amount_minor: input.amount_minor,
            currency: input.currency,
            memo: input.memo,
            booked_at: now,
        })
    }

    pub fn list_transactions(&self, owner: &str) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, owner, payee, amount_minor, currency, memo, booked_at
             FROM transactions WHERE owner = ? ORDER BY booked_at DESC",
        )?;

        let transactions = stmt
            .query_map([owner], transaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    pub fn search_transactions(&self, owner: &str, query: &str) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, owner, payee, amount_minor, currency, memo, booked_at
             FROM transactions
             WHERE owner = ?1 AND (payee LIKE ?2 OR memo LIKE ?2)
             ORDER BY booked_at DESC",
        )?;

        let pattern = like_pattern(query);
        let transactions = stmt
            .query_map((owner, pattern), transaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let count = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    // ============================================================
    // Note operations
    // ============================================================

    pub fn create_note(&self, input: CreateNoteInput) -> Result<Note> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO notes (id, owner, content, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.owner,
                &input.content,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Note {
            id,
            owner: input.owner,
            content: input.content,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn list_notes(&self, owner: &str) -> Result<Vec<Note>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, owner, content, created_at, updated_at
             FROM notes WHERE owner = ? ORDER BY updated_at DESC",
        )?;

        let notes = stmt
            .query_map([owner], note_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    pub fn search_notes(&self, owner: &str, query: &str) -> Result<Vec<Note>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, owner, content, created_at, updated_at
             FROM notes WHERE owner = ?1 AND content LIKE ?2
             ORDER BY updated_at DESC",
        )?;

        let pattern = like_pattern(query);
        let notes = stmt
            .query_map((owner, pattern), note_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    pub fn count_notes(&self) -> Result<i64> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let count = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(row.get::<_, String>(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        is_staff: row.get::<_, i32>(3)? != 0,
        created_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn transaction_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: parse_uuid(row.get::<_, String>(0)?),
        owner: row.get(1)?,
        payee: row.get(2)?,
        amount_minor: row.get(3)?,
        currency: row.get(4)?,
        memo: row.get(5)?,
        booked_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn note_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: parse_uuid(row.get::<_, String>(0)?),
        owner: row.get(1)?,
        content: row.get(2)?,
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn like_pattern(query: &str) -> String {
    // Strip LIKE wildcards from user input; a stray % would otherwise
    // match everything.
    format!("%{}%", query.replace(['%', '_'], ""))
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
