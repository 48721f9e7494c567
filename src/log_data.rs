//! Activity-log loader.
//!
//! A log file holds one JSON event per line. Only play events (`NextSong`)
//! are loaded, in three passes over the same filtered events:
//!
//! 1. time rows, one per event, duplicates dropped by the table's key
//! 2. user rows, skipping events without a user id, level last-write-wins
//! 3. songplay facts, one per event, with song/artist ids resolved by an
//!    exact (title, artist name, duration) lookup
//!
//! Time and user rows go in before any songplay so the fact table's foreign
//! keys always point at existing rows.

use crate::db::{find_song, insert_songplay, insert_time, upsert_user};
use crate::error::{EtlError, Result};
use crate::models::{timestamp_from_millis, LogEvent, LogFileStats, SongplayRow, TimeRow};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

/// A play event with its required fields checked.
#[derive(Clone, Debug)]
pub struct PlayEvent {
    pub start_time: NaiveDateTime,
    pub session_id: i64,
    pub event: LogEvent,
}

/// Parse every non-blank line of an activity log.
/// Returns (line number, event) pairs, line numbers starting at 1.
pub fn read_log_file(path: &Path) -> Result<Vec<(usize, LogEvent)>> {
    let text = std::fs::read_to_string(path).map_err(|e| EtlError::fs(path, e))?;
    let mut events = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event: LogEvent = serde_json::from_str(line)
            .map_err(|e| EtlError::parse(path, Some(idx + 1), e.to_string()))?;
        events.push((idx + 1, event));
    }
    Ok(events)
}

/// Keep only play events, checking the fields a songplay cannot do without.
pub fn play_events(path: &Path, events: Vec<(usize, LogEvent)>) -> Result<Vec<PlayEvent>> {
    events
        .into_iter()
        .filter(|(_, event)| event.is_play())
        .map(|(line, event)| {
            let ts = event
                .ts
                .ok_or_else(|| EtlError::parse(path, Some(line), "play event without `ts`"))?;
            let start_time = timestamp_from_millis(ts).ok_or_else(|| {
                EtlError::parse(path, Some(line), format!("`ts` {} out of range", ts))
            })?;
            let session_id = event.session_id.ok_or_else(|| {
                EtlError::parse(path, Some(line), "play event without `sessionId`")
            })?;
            Ok(PlayEvent {
                start_time,
                session_id,
                event,
            })
        })
        .collect()
}

/// Load one activity-log file.
pub fn process_log_file(conn: &Connection, path: &Path) -> Result<LogFileStats> {
    let events = read_log_file(path)?;
    let mut stats = LogFileStats {
        events: events.len(),
        ..Default::default()
    };
    let plays = play_events(path, events)?;
    stats.plays = plays.len();

    for play in &plays {
        insert_time(conn, &TimeRow::from_timestamp(play.start_time))?;
    }

    for user in plays.iter().filter_map(|play| play.event.user_row()) {
        upsert_user(conn, &user)?;
        stats.users_upserted += 1;
    }

    for play in &plays {
        let event = &play.event;
        let found = find_song(
            conn,
            event.song.as_deref(),
            event.artist.as_deref(),
            event.length,
        )?;
        let (song_id, artist_id) = match found {
            Some(m) => {
                stats.songplays_matched += 1;
                (Some(m.song_id), Some(m.artist_id))
            }
            None => (None, None),
        };

        insert_songplay(
            conn,
            &SongplayRow {
                start_time: play.start_time,
                user_id: event.user_id,
                level: event.level.clone(),
                song_id,
                artist_id,
                session_id: play.session_id,
                location: event.location.clone(),
                user_agent: event.user_agent.clone(),
            },
        )?;
        stats.songplays_inserted += 1;
    }

    debug!(
        file = %path.display(),
        events = stats.events,
        plays = stats.plays,
        users = stats.users_upserted,
        matched = stats.songplays_matched,
        "log file loaded"
    );
    Ok(stats)
}
