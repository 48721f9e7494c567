//! Song-metadata loader: one file, one song row, one artist row.

use crate::db::{insert_artist, insert_song};
use crate::error::{EtlError, Result};
use crate::models::SongRecord;
use rusqlite::Connection;
use serde_json::Deserializer;
use std::path::Path;
use tracing::debug;

/// Parse the single record in a song-metadata file.
///
/// The first JSON value in the file is the record; anything after it is
/// ignored.
pub fn read_song_file(path: &Path) -> Result<SongRecord> {
    let text = std::fs::read_to_string(path).map_err(|e| EtlError::fs(path, e))?;
    let mut stream = Deserializer::from_str(&text).into_iter::<SongRecord>();
    match stream.next() {
        Some(Ok(record)) => Ok(record),
        Some(Err(e)) => Err(EtlError::parse(path, Some(e.line()), e.to_string())),
        None => Err(EtlError::parse(path, None, "no song record in file")),
    }
}

/// Load one song-metadata file: song first, then its artist. Both inserts
/// leave existing rows untouched.
pub fn process_song_file(conn: &Connection, path: &Path) -> Result<()> {
    let (song, artist) = read_song_file(path)?.into_rows();

    let new_song = insert_song(conn, &song)?;
    let new_artist = insert_artist(conn, &artist)?;
    debug!(
        file = %path.display(),
        song_id = %song.song_id,
        artist_id = %artist.artist_id,
        new_song,
        new_artist,
        "song file loaded"
    );
    Ok(())
}
