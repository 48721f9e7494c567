//! Table definitions and the named statement registry.
//!
//! Every SQL string the loaders run lives here, keyed by what it does, next
//! to the conflict policy it implements.

use crate::error::Result;
use rusqlite::Connection;
use tracing::info;

pub struct Table {
    pub name: &'static str,
    pub create: &'static str,
    pub drop: &'static str,
}

pub const USERS_TABLE: Table = Table {
    name: "users",
    create: "CREATE TABLE IF NOT EXISTS users (
        user_id    INTEGER PRIMARY KEY,
        first_name TEXT,
        last_name  TEXT,
        gender     TEXT,
        level      TEXT
    );",
    drop: "DROP TABLE IF EXISTS users;",
};

pub const SONGS_TABLE: Table = Table {
    name: "songs",
    create: "CREATE TABLE IF NOT EXISTS songs (
        song_id   TEXT PRIMARY KEY,
        title     TEXT NOT NULL,
        artist_id TEXT NOT NULL,
        year      INTEGER,
        duration  REAL
    );",
    drop: "DROP TABLE IF EXISTS songs;",
};

pub const ARTISTS_TABLE: Table = Table {
    name: "artists",
    create: "CREATE TABLE IF NOT EXISTS artists (
        artist_id TEXT PRIMARY KEY,
        name      TEXT NOT NULL,
        location  TEXT,
        latitude  REAL,
        longitude REAL
    );",
    drop: "DROP TABLE IF EXISTS artists;",
};

pub const TIME_TABLE: Table = Table {
    name: "time",
    create: "CREATE TABLE IF NOT EXISTS time (
        start_time TEXT PRIMARY KEY,
        hour       INTEGER NOT NULL,
        day        INTEGER NOT NULL,
        week       INTEGER NOT NULL,
        month      INTEGER NOT NULL,
        year       INTEGER NOT NULL,
        weekday    INTEGER NOT NULL
    );",
    drop: "DROP TABLE IF EXISTS time;",
};

pub const SONGPLAYS_TABLE: Table = Table {
    name: "songplays",
    create: "CREATE TABLE IF NOT EXISTS songplays (
        songplay_id INTEGER PRIMARY KEY AUTOINCREMENT,
        start_time  TEXT NOT NULL,
        user_id     INTEGER,
        level       TEXT,
        song_id     TEXT,
        artist_id   TEXT,
        session_id  INTEGER NOT NULL,
        location    TEXT,
        user_agent  TEXT,
        CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users (user_id),
        CONSTRAINT fk_song FOREIGN KEY (song_id) REFERENCES songs (song_id),
        CONSTRAINT fk_artist FOREIGN KEY (artist_id) REFERENCES artists (artist_id),
        CONSTRAINT fk_time FOREIGN KEY (start_time) REFERENCES time (start_time)
    );",
    drop: "DROP TABLE IF EXISTS songplays;",
};

/// Dimensions first so songplays can reference them.
pub const CREATE_ORDER: &[Table] = &[
    USERS_TABLE,
    SONGS_TABLE,
    ARTISTS_TABLE,
    TIME_TABLE,
    SONGPLAYS_TABLE,
];

/// Fact table first so no foreign key is left dangling mid-drop.
pub const DROP_ORDER: &[Table] = &[
    SONGPLAYS_TABLE,
    USERS_TABLE,
    SONGS_TABLE,
    ARTISTS_TABLE,
    TIME_TABLE,
];

/// What a statement does when its key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep the existing row (`ON CONFLICT DO NOTHING`).
    Ignore,
    /// Overwrite `level` with the incoming value.
    UpdateLevel,
    /// No natural key; every execution adds a row.
    Append,
    /// Lookup only; never writes.
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    InsertSong,
    InsertArtist,
    UpsertUser,
    InsertTime,
    InsertSongplay,
    FindSong,
}

impl Statement {
    pub fn sql(self) -> &'static str {
        match self {
            Statement::InsertSong => {
                "INSERT INTO songs (song_id, title, artist_id, year, duration)
                 VALUES (:song_id, :title, :artist_id, :year, :duration)
                 ON CONFLICT (song_id) DO NOTHING"
            }
            Statement::InsertArtist => {
                "INSERT INTO artists (artist_id, name, location, latitude, longitude)
                 VALUES (:artist_id, :name, :location, :latitude, :longitude)
                 ON CONFLICT (artist_id) DO NOTHING"
            }
            Statement::UpsertUser => {
                "INSERT INTO users (user_id, first_name, last_name, gender, level)
                 VALUES (:user_id, :first_name, :last_name, :gender, :level)
                 ON CONFLICT (user_id) DO UPDATE SET level = excluded.level"
            }
            Statement::InsertTime => {
                "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
                 VALUES (:start_time, :hour, :day, :week, :month, :year, :weekday)
                 ON CONFLICT (start_time) DO NOTHING"
            }
            Statement::InsertSongplay => {
                "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
                 VALUES (:start_time, :user_id, :level, :song_id, :artist_id, :session_id, :location, :user_agent)"
            }
            Statement::FindSong => {
                "SELECT s.song_id, a.artist_id
                 FROM songs s
                 JOIN artists a ON s.artist_id = a.artist_id
                 WHERE s.title = :title AND a.name = :artist AND s.duration = :duration
                 LIMIT 1"
            }
        }
    }

    /// Checked by the write path in `db`: read-only statements are refused
    /// there, and ignored conflicts are traced.
    pub fn conflict_policy(self) -> ConflictPolicy {
        match self {
            Statement::InsertSong | Statement::InsertArtist | Statement::InsertTime => {
                ConflictPolicy::Ignore
            }
            Statement::UpsertUser => ConflictPolicy::UpdateLevel,
            Statement::InsertSongplay => ConflictPolicy::Append,
            Statement::FindSong => ConflictPolicy::ReadOnly,
        }
    }
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    for table in CREATE_ORDER {
        conn.execute_batch(table.create)?;
    }
    info!(tables = CREATE_ORDER.len(), "schema ready");
    Ok(())
}

pub fn drop_tables(conn: &Connection) -> Result<()> {
    for table in DROP_ORDER {
        conn.execute_batch(table.drop)?;
        info!(table = table.name, "dropped table");
    }
    Ok(())
}

/// Drop and recreate every table. All loaded data is lost.
pub fn reset_tables(conn: &Connection) -> Result<()> {
    drop_tables(conn)?;
    create_tables(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        assert_eq!(
            table_names(&conn),
            vec!["artists", "songplays", "songs", "time", "users"]
        );
    }

    #[test]
    fn test_reset_clears_rows() {
        let conn = open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (user_id, level) VALUES (1, 'free')",
            [],
        )
        .unwrap();
        reset_tables(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_drop_order_covers_create_order() {
        let mut created: Vec<_> = CREATE_ORDER.iter().map(|t| t.name).collect();
        let mut dropped: Vec<_> = DROP_ORDER.iter().map(|t| t.name).collect();
        assert_eq!(DROP_ORDER[0].name, "songplays");
        assert_eq!(CREATE_ORDER.last().map(|t| t.name), Some("songplays"));
        created.sort();
        dropped.sort();
        assert_eq!(created, dropped);
    }

    const ALL_STATEMENTS: [Statement; 6] = [
        Statement::InsertSong,
        Statement::InsertArtist,
        Statement::UpsertUser,
        Statement::InsertTime,
        Statement::InsertSongplay,
        Statement::FindSong,
    ];

    #[test]
    fn test_every_statement_prepares() {
        let conn = open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        for stmt in ALL_STATEMENTS {
            assert!(conn.prepare(stmt.sql()).is_ok(), "{:?} failed to prepare", stmt);
        }
    }

    #[test]
    fn test_conflict_policies() {
        assert_eq!(Statement::UpsertUser.conflict_policy(), ConflictPolicy::UpdateLevel);
        assert_eq!(Statement::InsertTime.conflict_policy(), ConflictPolicy::Ignore);
        assert_eq!(Statement::InsertSongplay.conflict_policy(), ConflictPolicy::Append);
        assert!(!Statement::InsertSongplay.sql().contains("ON CONFLICT"));
    }
}
