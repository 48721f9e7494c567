//! Connection setup and typed row persistence.

use crate::error::{EtlError, Result};
use crate::models::{ArtistRow, SongMatch, SongRow, SongplayRow, TimeRow, UserRow};
use crate::schema::{ConflictPolicy, Statement};
use rusqlite::{named_params, Connection, OptionalExtension, ToSql};
use std::path::Path;
use std::time::Duration;
use tracing::trace;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the SQLite database at `path` with foreign keys enforced.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(|source| EtlError::Connection {
        path: path.to_path_buf(),
        source,
    })?;
    configure(&conn).map_err(|source| EtlError::Connection {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let path = Path::new(":memory:");
    let conn = Connection::open_in_memory().map_err(|source| EtlError::Connection {
        path: path.to_path_buf(),
        source,
    })?;
    configure(&conn).map_err(|source| EtlError::Connection {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(conn)
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA temp_store = MEMORY;",
    )
}

/// Execute a registry write and return the number of changed rows.
/// Lookups are refused here; they go through `query_row`.
fn execute_write(
    conn: &Connection,
    statement: Statement,
    params: &[(&str, &dyn ToSql)],
) -> Result<usize> {
    let policy = statement.conflict_policy();
    if policy == ConflictPolicy::ReadOnly {
        return Err(EtlError::Database(rusqlite::Error::InvalidQuery));
    }
    let mut stmt = conn.prepare_cached(statement.sql())?;
    let changed = stmt.execute(params)?;
    if changed == 0 && policy == ConflictPolicy::Ignore {
        trace!(?statement, "existing row kept");
    }
    Ok(changed)
}

/// Returns true when a new song row was written.
pub fn insert_song(conn: &Connection, row: &SongRow) -> Result<bool> {
    let changed = execute_write(conn, Statement::InsertSong, &named_params! {
        ":song_id": row.song_id,
        ":title": row.title,
        ":artist_id": row.artist_id,
        ":year": row.year,
        ":duration": row.duration,
    })?;
    Ok(changed > 0)
}

/// Returns true when a new artist row was written.
pub fn insert_artist(conn: &Connection, row: &ArtistRow) -> Result<bool> {
    let changed = execute_write(conn, Statement::InsertArtist, &named_params! {
        ":artist_id": row.artist_id,
        ":name": row.name,
        ":location": row.location,
        ":latitude": row.latitude,
        ":longitude": row.longitude,
    })?;
    Ok(changed > 0)
}

/// Insert the user, or overwrite `level` if the user already exists.
pub fn upsert_user(conn: &Connection, row: &UserRow) -> Result<()> {
    execute_write(conn, Statement::UpsertUser, &named_params! {
        ":user_id": row.user_id,
        ":first_name": row.first_name,
        ":last_name": row.last_name,
        ":gender": row.gender,
        ":level": row.level,
    })?;
    Ok(())
}

/// Returns true when the timestamp was not seen before.
pub fn insert_time(conn: &Connection, row: &TimeRow) -> Result<bool> {
    let changed = execute_write(conn, Statement::InsertTime, &named_params! {
        ":start_time": row.start_time,
        ":hour": row.hour,
        ":day": row.day,
        ":week": row.week,
        ":month": row.month,
        ":year": row.year,
        ":weekday": row.weekday,
    })?;
    Ok(changed > 0)
}

/// Append a songplay and return its surrogate id.
pub fn insert_songplay(conn: &Connection, row: &SongplayRow) -> Result<i64> {
    execute_write(conn, Statement::InsertSongplay, &named_params! {
        ":start_time": row.start_time,
        ":user_id": row.user_id,
        ":level": row.level,
        ":song_id": row.song_id,
        ":artist_id": row.artist_id,
        ":session_id": row.session_id,
        ":location": row.location,
        ":user_agent": row.user_agent,
    })?;
    Ok(conn.last_insert_rowid())
}

/// Exact-match lookup of a played song. Any null input, or a duration off by
/// any amount, yields None.
pub fn find_song(
    conn: &Connection,
    title: Option<&str>,
    artist: Option<&str>,
    duration: Option<f64>,
) -> Result<Option<SongMatch>> {
    let mut stmt = conn.prepare_cached(Statement::FindSong.sql())?;
    let found = stmt
        .query_row(
            named_params! {
                ":title": title,
                ":artist": artist,
                ":duration": duration,
            },
            |row| {
                Ok(SongMatch {
                    song_id: row.get(0)?,
                    artist_id: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(found)
}
