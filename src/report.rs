//! Fixed analytical queries over the loaded tables.

use crate::error::Result;
use rusqlite::Connection;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Count,
    Total,
}

pub struct ReportQuery {
    pub description: &'static str,
    pub sql: &'static str,
    pub kind: ValueKind,
}

pub const PLAYS_BY_WEEKDAY: ReportQuery = ReportQuery {
    description: "1- Amount of music heard per day of the week",
    sql: "SELECT CASE t.weekday
                WHEN 0 THEN 'Sunday'
                WHEN 1 THEN 'Monday'
                WHEN 2 THEN 'Tuesday'
                WHEN 3 THEN 'Wednesday'
                WHEN 4 THEN 'Thursday'
                WHEN 5 THEN 'Friday'
                WHEN 6 THEN 'Saturday'
            END AS weekday,
            COUNT(s.songplay_id) AS plays
          FROM songplays s
          JOIN time t ON s.start_time = t.start_time
          GROUP BY t.weekday
          ORDER BY plays DESC, t.weekday",
    kind: ValueKind::Count,
};

pub const PLAYS_BY_GENDER: ReportQuery = ReportQuery {
    description: "2- Amount of music heard by gender",
    sql: "SELECT CASE WHEN u.gender = 'F' THEN 'Woman' ELSE 'Man' END AS gender,
            COUNT(*) AS plays
          FROM songplays s
          JOIN users u ON s.user_id = u.user_id
          GROUP BY 1
          ORDER BY 1 DESC",
    kind: ValueKind::Count,
};

pub const DURATION_BY_ARTIST: ReportQuery = ReportQuery {
    description: "3- Duration by artist",
    sql: "SELECT a.name, SUM(sg.duration) AS total
          FROM songplays s
          JOIN artists a ON s.artist_id = a.artist_id
          JOIN songs sg ON sg.song_id = s.song_id
          GROUP BY a.name
          ORDER BY a.name",
    kind: ValueKind::Total,
};

pub const PLAYS_BY_LEVEL: ReportQuery = ReportQuery {
    description: "4- Amount by level",
    sql: "SELECT COALESCE(level, 'unknown') AS level, COUNT(*) AS plays
          FROM songplays
          GROUP BY 1
          ORDER BY plays DESC, 1",
    kind: ValueKind::Count,
};

pub const REPORT_QUERIES: &[ReportQuery] = &[
    PLAYS_BY_WEEKDAY,
    PLAYS_BY_GENDER,
    DURATION_BY_ARTIST,
    PLAYS_BY_LEVEL,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportValue {
    Count(i64),
    Total(f64),
}

impl fmt::Display for ReportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportValue::Count(n) => write!(f, "{}", n),
            ReportValue::Total(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub label: String,
    pub value: ReportValue,
}

impl fmt::Display for ReportRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.label, self.value)
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub description: &'static str,
    pub rows: Vec<ReportRow>,
}

pub fn run_report(conn: &Connection, query: &ReportQuery) -> Result<Report> {
    let mut stmt = conn.prepare(query.sql)?;
    let rows = stmt
        .query_map([], |row| {
            let label: String = row.get(0)?;
            let value = match query.kind {
                ValueKind::Count => ReportValue::Count(row.get(1)?),
                ValueKind::Total => ReportValue::Total(row.get(1)?),
            };
            Ok(ReportRow { label, value })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Report {
        description: query.description,
        rows,
    })
}

pub fn run_reports(conn: &Connection) -> Result<Vec<Report>> {
    REPORT_QUERIES
        .iter()
        .map(|query| run_report(conn, query))
        .collect()
}

pub fn print_reports(reports: &[Report]) {
    println!("\n###  QUERY EXAMPLES  ###");
    for report in reports {
        println!("\n{}", report.description);
        for row in &report.rows {
            println!("{}", row);
        }
    }
}
