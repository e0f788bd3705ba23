/**
 * Storage for word lists and lifetime results, in an SQLite database in the
 * application directory.
 *
 * Both words and results are keyed by owner and Korean text, so a word keeps its
 * results however the list around it changes.
 */
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::common::{EngineError, QuizError, Result};
use super::session::RecordedOutcome;
use super::vocab::VocabularyItem;


/// Where a session's words come from.
pub trait VocabularySource {
    /// All of `owner`'s words, in the order they were added.
    fn load_vocabulary(&self, owner: &str) -> Result<Vec<VocabularyItem>>;

    /// Replace the word stored as `old_korean`. Returns `false` if there is no such
    /// word.
    fn update_word(&self, owner: &str, old_korean: &str, word: &VocabularyItem) -> Result<bool>;
}


/// Where recorded outcomes go.
pub trait OutcomeSink {
    fn persist_outcome(&self, owner: &str, korean: &str, record: &OutcomeRecord) -> Result<()>;
}


/// One scored guess together with the word's session statistics after it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutcomeRecord {
    pub attempts: u32,
    pub successes: u32,
    pub recent_success_rate: f64,
    pub succeeded: bool,
}


impl From<&RecordedOutcome> for OutcomeRecord {
    fn from(outcome: &RecordedOutcome) -> Self {
        OutcomeRecord {
            attempts: outcome.stats.session_attempts,
            successes: outcome.stats.session_successes,
            recent_success_rate: outcome.stats.recent_success_rate,
            succeeded: outcome.succeeded,
        }
    }
}


/// Lifetime results for one word.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StoredStats {
    pub korean: String,
    pub attempts: u32,
    pub successes: u32,
    /// As of the most recent session in which the word was asked.
    pub recent_success_rate: f64,
    pub updated_at: Option<DateTime<Utc>>,
}


impl StoredStats {
    /// Percentage of correct answers, or `None` for words never asked.
    pub fn score(&self) -> Option<f64> {
        if self.attempts == 0 {
            None
        } else {
            Some(100.0 * self.successes as f64 / self.attempts as f64)
        }
    }
}


pub struct SqliteStore {
    conn: Connection,
}


impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        SqliteStore::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        SqliteStore::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS words(
              owner TEXT NOT NULL,
              korean TEXT NOT NULL CHECK(korean != ''),
              english TEXT NOT NULL CHECK(english != ''),
              example TEXT,
              position INTEGER NOT NULL,
              PRIMARY KEY(owner, korean)
            );
            CREATE TABLE IF NOT EXISTS word_stats(
              owner TEXT NOT NULL,
              korean TEXT NOT NULL,
              attempts INTEGER NOT NULL DEFAULT 0,
              successes INTEGER NOT NULL DEFAULT 0,
              recent_success_rate REAL NOT NULL DEFAULT 0,
              updated_at TEXT,
              PRIMARY KEY(owner, korean)
            );
            ",
        )?;
        Ok(SqliteStore { conn })
    }

    /// Add `words` to the end of `owner`'s list. Words already stored keep their place
    /// and results but take the new spelling and example. Returns the number of words
    /// written.
    pub fn import_words(&self, owner: &str, words: &[VocabularyItem]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO
                  words(owner, korean, english, example, position)
                VALUES
                  (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(position), -1) + 1 FROM words WHERE owner = ?1))
                ON CONFLICT(owner, korean) DO UPDATE SET
                  english = excluded.english,
                  example = excluded.example
                ",
            )?;
            for word in words.iter() {
                stmt.execute(params![owner, word.korean, word.english, word.example])?;
            }
        }
        tx.commit()?;
        Ok(words.len())
    }

    /// Delete a word and its results. Returns `false` if there was no such word.
    pub fn remove_word(&self, owner: &str, korean: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute(
            "DELETE FROM words WHERE owner = ?1 AND korean = ?2",
            params![owner, korean],
        )?;
        tx.execute(
            "DELETE FROM word_stats WHERE owner = ?1 AND korean = ?2",
            params![owner, korean],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Lifetime results for every stored word of `owner`, in list order. Words that
    /// were never asked have zero attempts.
    pub fn load_stats(&self, owner: &str) -> Result<Vec<StoredStats>> {
        let mut stmt = self.conn.prepare(
            "
            SELECT
              words.korean,
              COALESCE(word_stats.attempts, 0),
              COALESCE(word_stats.successes, 0),
              COALESCE(word_stats.recent_success_rate, 0.0),
              word_stats.updated_at
            FROM
              words
            LEFT JOIN
              word_stats
            ON
              word_stats.owner = words.owner AND word_stats.korean = words.korean
            WHERE
              words.owner = ?1
            ORDER BY
              words.position
            ",
        )?;
        let rows = stmt.query_map(params![owner], |row| {
            let updated_at: Option<String> = row.get(4)?;
            Ok(StoredStats {
                korean: row.get(0)?,
                attempts: row.get(1)?,
                successes: row.get(2)?,
                recent_success_rate: row.get(3)?,
                updated_at: updated_at.as_deref().and_then(parse_timestamp),
            })
        })?;

        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }
}


impl VocabularySource for SqliteStore {
    fn load_vocabulary(&self, owner: &str) -> Result<Vec<VocabularyItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT korean, english, example FROM words WHERE owner = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![owner], |row| {
            Ok(VocabularyItem {
                korean: row.get(0)?,
                english: row.get(1)?,
                example: row.get(2)?,
            })
        })?;

        let mut words = Vec::new();
        for row in rows {
            words.push(row?);
        }
        Ok(words)
    }

    fn update_word(&self, owner: &str, old_korean: &str, word: &VocabularyItem) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;

        if word.korean != old_korean {
            let taken: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM words WHERE owner = ?1 AND korean = ?2",
                    params![owner, word.korean],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                return Err(QuizError::Engine(EngineError::DuplicateWord(word.korean.clone())));
            }
        }

        let updated = tx.execute(
            "UPDATE words SET korean = ?3, english = ?4, example = ?5 WHERE owner = ?1 AND korean = ?2",
            params![owner, old_korean, word.korean, word.english, word.example],
        )?;
        if updated == 0 {
            return Ok(false);
        }

        if word.korean != old_korean {
            tx.execute(
                "DELETE FROM word_stats WHERE owner = ?1 AND korean = ?2",
                params![owner, word.korean],
            )?;
            tx.execute(
                "UPDATE word_stats SET korean = ?3 WHERE owner = ?1 AND korean = ?2",
                params![owner, old_korean, word.korean],
            )?;
        }

        tx.commit()?;
        Ok(true)
    }
}


impl OutcomeSink for SqliteStore {
    fn persist_outcome(&self, owner: &str, korean: &str, record: &OutcomeRecord) -> Result<()> {
        self.conn.execute(
            "
            INSERT INTO
              word_stats(owner, korean, attempts, successes, recent_success_rate, updated_at)
            VALUES
              (?1, ?2, 1, ?3, ?4, ?5)
            ON CONFLICT(owner, korean) DO UPDATE SET
              attempts = attempts + 1,
              successes = successes + excluded.successes,
              recent_success_rate = excluded.recent_success_rate,
              updated_at = excluded.updated_at
            ",
            params![
                owner,
                korean,
                record.succeeded as i64,
                record.recent_success_rate,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}


fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc))
}


/// The directory holding the database and config file: `directory` if given,
/// otherwise `~/.hangul-drill`.
pub fn get_app_dir_path(directory: Option<&Path>) -> PathBuf {
    match directory {
        Some(directory) => directory.to_path_buf(),
        None => {
            let mut dirpath = dirs::home_dir().unwrap_or_else(PathBuf::new);
            dirpath.push(".hangul-drill");
            dirpath
        }
    }
}


/// Create the application directory if it does not exist yet.
pub fn require_app_dir_path(directory: Option<&Path>) -> Result<PathBuf> {
    let dirpath = get_app_dir_path(directory);
    if !dirpath.exists() {
        fs::create_dir_all(&dirpath).map_err(|_| QuizError::CannotMakeAppDir(dirpath.clone()))?;
    }
    Ok(dirpath)
}


pub fn get_db_path(app_dir: &Path) -> PathBuf {
    app_dir.join("words.sqlite3")
}


pub fn get_config_path(app_dir: &Path) -> PathBuf {
    app_dir.join("config.json")
}


#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(words: &[(&str, &str)]) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let items: Vec<VocabularyItem> = words.iter().map(|(k, e)| VocabularyItem::new(k, e)).collect();
        store.import_words("me", &items).unwrap();
        store
    }

    fn record(succeeded: bool, rate: f64) -> OutcomeRecord {
        OutcomeRecord { attempts: 1, successes: succeeded as u32, recent_success_rate: rate, succeeded }
    }

    #[test]
    fn words_load_in_import_order() {
        let store = store_with(&[("가다", "go"), ("오다", "come"), ("먹다", "eat")]);
        let words = store.load_vocabulary("me").unwrap();
        let koreans: Vec<&str> = words.iter().map(|w| w.korean.as_str()).collect();
        assert_eq!(koreans, vec!["가다", "오다", "먹다"]);
        assert!(store.load_vocabulary("someone else").unwrap().is_empty());
    }

    #[test]
    fn reimport_updates_spelling_in_place() {
        let store = store_with(&[("가다", "go"), ("오다", "come")]);
        let mut again = VocabularyItem::new("가다", "go, to go");
        again.example = Some(String::from("집에 가요."));
        store.import_words("me", &[again.clone(), VocabularyItem::new("자다", "sleep")]).unwrap();

        let words = store.load_vocabulary("me").unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0], again);
        assert_eq!(words[2].korean, "자다");
    }

    #[test]
    fn outcomes_accumulate() {
        let store = store_with(&[("가다", "go"), ("오다", "come")]);
        store.persist_outcome("me", "가다", &record(true, 1.0)).unwrap();
        store.persist_outcome("me", "가다", &record(false, 0.5)).unwrap();

        let stats = store.load_stats("me").unwrap();
        assert_eq!(stats[0].attempts, 2);
        assert_eq!(stats[0].successes, 1);
        assert_eq!(stats[0].recent_success_rate, 0.5);
        assert_eq!(stats[0].score(), Some(50.0));
        assert!(stats[0].updated_at.is_some());
        assert_eq!(stats[1].attempts, 0);
        assert_eq!(stats[1].score(), None);
    }

    #[test]
    fn update_word_moves_results() {
        let store = store_with(&[("가다", "go"), ("오다", "come")]);
        store.persist_outcome("me", "가다", &record(true, 1.0)).unwrap();

        let renamed = VocabularyItem::new("가요", "go");
        assert!(store.update_word("me", "가다", &renamed).unwrap());
        let stats = store.load_stats("me").unwrap();
        assert_eq!(stats[0].korean, "가요");
        assert_eq!(stats[0].attempts, 1);

        assert!(!store.update_word("me", "없다", &VocabularyItem::new("있다", "exist")).unwrap());
        match store.update_word("me", "가요", &VocabularyItem::new("오다", "come")) {
            Err(QuizError::Engine(EngineError::DuplicateWord(korean))) => assert_eq!(korean, "오다"),
            other => panic!("expected duplicate word error, got {:?}", other),
        }
    }

    #[test]
    fn remove_word_drops_results() {
        let store = store_with(&[("가다", "go")]);
        store.persist_outcome("me", "가다", &record(true, 1.0)).unwrap();
        assert!(store.remove_word("me", "가다").unwrap());
        assert!(!store.remove_word("me", "가다").unwrap());
        assert!(store.load_stats("me").unwrap().is_empty());
    }

    #[test]
    fn store_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = get_db_path(dir.path());
        {
            let store = SqliteStore::open(&path).unwrap();
            store.import_words("me", &[VocabularyItem::new("가다", "go")]).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_vocabulary("me").unwrap().len(), 1);
    }
}
