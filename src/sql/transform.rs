//! INSERT...SELECT statements that reshape staged rows into the star schema.
//!
//! Only NextSong events represent a play. Song and artist ids on the fact
//! table come from an exact (title, artist name, duration) match against the
//! dimensions; anything unmatched keeps NULL ids.
//!
//! Redshift accepts but never enforces primary keys, so a user seen on two
//! levels or an artist listed with two locations yields several rows per key.
//! Postgres enforces them; there the keyed inserts keep the first row per key
//! via `ON CONFLICT (<key>) DO NOTHING`.

use super::{Constraint, Statement, StatementKind, Table};
use crate::config::Dialect;

const SONGPLAYS_INSERT: &str = "\
INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
SELECT TIMESTAMP 'epoch' + se.ts / 1000 * INTERVAL '1 second' AS start_time,
       se.userId,
       se.level,
       music.song_id,
       music.artist_id,
       se.sessionId,
       se.location,
       se.userAgent
FROM staging_events se
LEFT JOIN (
    SELECT s.song_id, s.title, s.duration, a.artist_id, a.name
    FROM songs s
    LEFT JOIN artists a ON s.artist_id = a.artist_id
) AS music
    ON se.song = music.title
   AND se.artist = music.name
   AND se.length = music.duration
WHERE se.page = 'NextSong'";

const USERS_INSERT: &str = "\
INSERT INTO users (user_id, first_name, last_name, gender, level)
SELECT DISTINCT se.userId, se.firstName, se.lastName, se.gender, se.level
FROM staging_events se
WHERE se.page = 'NextSong'";

const SONGS_INSERT: &str = "\
INSERT INTO songs (song_id, title, artist_id, year, duration)
SELECT DISTINCT ss.song_id, ss.title, ss.artist_id, ss.year, ss.duration
FROM staging_songs ss";

const ARTISTS_INSERT: &str = "\
INSERT INTO artists (artist_id, name, location, latitude, longitude)
SELECT DISTINCT ss.artist_id, ss.artist_name, ss.artist_location, ss.artist_latitude, ss.artist_longitude
FROM staging_songs ss";

const TIME_INSERT: &str = "\
INSERT INTO time (start_time, hour, day, week, month, year, weekday)
SELECT DISTINCT sp.start_time,
       EXTRACT(HOUR FROM sp.start_time),
       EXTRACT(DAY FROM sp.start_time),
       EXTRACT(WEEK FROM sp.start_time),
       EXTRACT(MONTH FROM sp.start_time),
       EXTRACT(YEAR FROM sp.start_time),
       EXTRACT(DOW FROM sp.start_time)
FROM songplays sp";

/// The INSERT...SELECT that populates `table`, or `None` for staging tables.
pub fn insert_statement(table: Table, dialect: Dialect) -> Option<Statement> {
    let sql = match table {
        Table::Songplays => SONGPLAYS_INSERT,
        Table::Users => USERS_INSERT,
        Table::Songs => SONGS_INSERT,
        Table::Artists => ARTISTS_INSERT,
        Table::Time => TIME_INSERT,
        Table::StagingEvents | Table::StagingSongs => return None,
    };
    let enforced_key = table
        .columns()
        .iter()
        .find(|c| c.constraint == Constraint::PrimaryKey);
    let sql = match (dialect, enforced_key) {
        (Dialect::Postgres, Some(key)) => format!("{sql}\nON CONFLICT ({}) DO NOTHING", key.name),
        _ => sql.to_string(),
    };
    Some(Statement::new(table, StatementKind::Insert, sql))
}
