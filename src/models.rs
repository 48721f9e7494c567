//! Core data models for the Sparkify load.
//!
//! Input records mirror the two fixed JSON shapes; row structs mirror the
//! five tables and are bound to statements by parameter name.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

// ============================================================================
// Input Records
// ============================================================================

/// One song-metadata file (a single JSON object).
#[derive(Clone, Debug, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
    pub artist_name: String,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
}

impl SongRecord {
    /// Split into the song row and the artist row, in insert order.
    pub fn into_rows(self) -> (SongRow, ArtistRow) {
        let artist = ArtistRow {
            artist_id: self.artist_id.clone(),
            name: self.artist_name,
            location: self.artist_location,
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        };
        let song = SongRow {
            song_id: self.song_id,
            title: self.title,
            artist_id: self.artist_id,
            year: self.year,
            duration: self.duration,
        };
        (song, artist)
    }
}

/// One line of an activity-log file.
///
/// Only `page` is required on every line; navigation and login events leave
/// most of the other fields null.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub page: String,
    #[serde(default)]
    pub ts: Option<i64>,
    #[serde(default, deserialize_with = "de_user_id")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub session_id: Option<i64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

pub const PLAY_PAGE: &str = "NextSong";

impl LogEvent {
    pub fn is_play(&self) -> bool {
        self.page == PLAY_PAGE
    }

    /// User row for this event, or None when the event carries no user id.
    pub fn user_row(&self) -> Option<UserRow> {
        self.user_id.map(|user_id| UserRow {
            user_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender.clone(),
            level: self.level.clone(),
        })
    }
}

/// userId arrives as a number, a numeric string, or "" for logged-out events.
fn de_user_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawUserId {
        Int(i64),
        Text(String),
    }

    match Option::<RawUserId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawUserId::Int(id)) => Ok(Some(id)),
        Some(RawUserId::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed
                    .parse()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("invalid userId {:?}", s)))
            }
        }
    }
}

// ============================================================================
// Table Rows
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRow {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

/// Time dimension row. `week` is the ISO week number, `weekday` counts from
/// Sunday = 0 so it lines up with the weekday report labels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeRow {
    pub start_time: NaiveDateTime,
    pub hour: u32,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
    pub weekday: u32,
}

impl TimeRow {
    pub fn from_timestamp(start_time: NaiveDateTime) -> Self {
        Self {
            start_time,
            hour: start_time.hour(),
            day: start_time.day(),
            week: start_time.iso_week().week(),
            month: start_time.month(),
            year: start_time.year(),
            // Sunday = 0, the index the weekday report labels by
            weekday: start_time.weekday().num_days_from_sunday(),
        }
    }
}

/// Convert a millisecond epoch (UTC) into a naive timestamp.
pub fn timestamp_from_millis(ts: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ts).map(|dt| dt.naive_utc())
}

/// Songplay fact row. Ids resolved by lookup stay None when unmatched.
#[derive(Clone, Debug, PartialEq)]
pub struct SongplayRow {
    pub start_time: NaiveDateTime,
    pub user_id: Option<i64>,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Result of resolving (title, artist name, duration) against songs/artists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

// ============================================================================
// Statistics
// ============================================================================

/// Per-file counts from the activity-log loader.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFileStats {
    pub events: usize,
    pub plays: usize,
    pub users_upserted: usize,
    pub songplays_inserted: usize,
    pub songplays_matched: usize,
}

impl LogFileStats {
    pub fn add(&mut self, other: &LogFileStats) {
        self.events += other.events;
        self.plays += other.plays;
        self.users_upserted += other.users_upserted;
        self.songplays_inserted += other.songplays_inserted;
        self.songplays_matched += other.songplays_matched;
    }

    /// Share of inserted songplays that resolved to a song, as a percentage.
    pub fn match_rate(&self) -> f64 {
        if self.songplays_inserted == 0 {
            0.0
        } else {
            100.0 * self.songplays_matched as f64 / self.songplays_inserted as f64
        }
    }
}
