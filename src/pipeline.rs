//! Batch driver: one transaction per file, strictly sequential.

use crate::error::{EtlError, Result};
use crate::progress::FileProgress;
use crate::walk::find_json_files;
use rusqlite::Connection;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Run `handler` over every JSON file under `root`, committing after each
/// file. Returns the number of files processed. Progress lines go to stdout.
///
/// The first handler error aborts the batch. The failing file's transaction
/// is rolled back; files committed before it stay loaded.
pub fn process_data<F>(conn: &mut Connection, root: &Path, handler: F) -> Result<usize>
where
    F: FnMut(&Connection, &Path) -> Result<()>,
{
    process_data_to(conn, root, handler, std::io::stdout())
}

/// Same as [`process_data`], writing progress lines to `out`.
pub fn process_data_to<F, W>(
    conn: &mut Connection,
    root: &Path,
    mut handler: F,
    out: W,
) -> Result<usize>
where
    F: FnMut(&Connection, &Path) -> Result<()>,
    W: Write,
{
    let files = find_json_files(root)?;
    let total = files.len();

    let mut progress = FileProgress::with_writer(root, total, out);
    progress.found(root).map_err(EtlError::Output)?;
    info!(root = %root.display(), files = total, "batch started");

    for path in &files {
        let tx = conn.transaction()?;
        handler(&*tx, path.as_path())?;
        tx.commit()?;
        debug!(file = %path.display(), "committed");
        progress.file_done().map_err(EtlError::Output)?;
    }

    progress.finish();
    info!(root = %root.display(), files = total, "batch finished");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use std::fs;

    fn setup() -> Connection {
        let conn = open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE seen (name TEXT PRIMARY KEY);")
            .unwrap();
        conn
    }

    fn record(conn: &Connection, path: &Path) -> Result<()> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        conn.execute("INSERT INTO seen (name) VALUES (?1)", [&name])?;
        if fs::read_to_string(path).unwrap().contains("bad") {
            return Err(EtlError::parse(path, None, "bad file"));
        }
        Ok(())
    }

    fn seen(conn: &Connection) -> Vec<String> {
        let mut stmt = conn.prepare("SELECT name FROM seen ORDER BY name").unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_processes_every_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let mut conn = setup();
        let mut order = Vec::new();
        let count = process_data(&mut conn, dir.path(), |c, p| {
            order.push(p.file_name().unwrap().to_string_lossy().into_owned());
            record(c, p)
        })
        .unwrap();
        assert_eq!(count, 2);
        assert_eq!(order, vec!["a.json", "b.json"]);
        assert_eq!(seen(&conn), vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_fail_fast_keeps_earlier_commits() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("b.json"), "bad").unwrap();
        fs::write(dir.path().join("c.json"), "{}").unwrap();

        let mut conn = setup();
        let err = process_data(&mut conn, dir.path(), record).unwrap_err();
        assert!(matches!(err, EtlError::Parse { .. }));
        // b.json was rolled back and c.json never ran
        assert_eq!(seen(&conn), vec!["a.json"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = setup();
        assert_eq!(process_data(&mut conn, dir.path(), record).unwrap(), 0);
    }

    #[test]
    fn test_progress_lines_written_to_output() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.json", "b.json"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let mut conn = setup();
        let mut out = Vec::new();
        process_data_to(&mut conn, dir.path(), record, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!(
                "2 files found in {}\n1/2 files processed.\n2/2 files processed.\n",
                dir.path().display()
            )
        );
    }

    #[test]
    fn test_progress_stops_at_failing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("b.json"), "bad").unwrap();
        let mut conn = setup();
        let mut out = Vec::new();
        assert!(process_data_to(&mut conn, dir.path(), record, &mut out).is_err());
        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with("1/2 files processed.\n"));
        assert!(!out.contains("2/2"));
    }
}
