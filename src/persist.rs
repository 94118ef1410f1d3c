//! Board ↔ redb persistence.
//!
//! redb is a save file: loaded on boot, flushed on every mutation.
//! Never queried at runtime — the Board is the runtime truth. Rows are
//! postcard-encoded; JSON never touches the save file.

use crate::board::{AcademicTask, Board, Category, Command, Event, Priority, SecondaryTask, TaskType};
use chrono::{DateTime, Duration, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use std::sync::Arc;

const ACADEMIC_TASKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("academic_tasks");
const SECONDARY_TASKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("secondary_tasks");
const BOARD_META: TableDefinition<&str, &[u8]> = TableDefinition::new("board_meta");

/// Thin handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct SaveFile {
    db: Arc<Database>,
}

impl SaveFile {
    /// Open (or create) the save file at the given path.
    /// Creates tables if they don't exist.
    pub fn open(path: &str) -> Result<Self, SaveFileError> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(ACADEMIC_TASKS)?;
            let _ = txn.open_table(SECONDARY_TASKS)?;
            let _ = txn.open_table(BOARD_META)?;
        }
        txn.commit()?;

        Ok(SaveFile { db: Arc::new(db) })
    }

    /// Load the entire Board from disk. Called once at boot.
    pub fn load_board(&self) -> Result<Board, SaveFileError> {
        let mut board = Board::new();
        let txn = self.db.begin_read()?;

        let academic_table = txn.open_table(ACADEMIC_TASKS)?;
        for entry in academic_table.iter()? {
            let (_, value) = entry?;
            let task: AcademicTask = postcard::from_bytes(value.value())
                .map_err(|e| SaveFileError::Decode(e.to_string()))?;
            board.academic.insert(task.id, task);
        }

        let secondary_table = txn.open_table(SECONDARY_TASKS)?;
        for entry in secondary_table.iter()? {
            let (_, value) = entry?;
            let task: SecondaryTask = postcard::from_bytes(value.value())
                .map_err(|e| SaveFileError::Decode(e.to_string()))?;
            board.secondary.insert(task.id, task);
        }

        let meta_table = txn.open_table(BOARD_META)?;
        if let Some(rev_data) = meta_table.get("revision")? {
            let bytes = rev_data.value();
            if bytes.len() == 8 {
                board.revision = u64::from_le_bytes(bytes.try_into().unwrap());
            }
        }

        Ok(board)
    }

    /// Flush a single event to disk. Called after every Board::apply().
    /// Writes the affected row + updated revision in one transaction.
    pub fn flush(&self, board: &Board, event: &Event) -> Result<(), SaveFileError> {
        let txn = self.db.begin_write()?;
        {
            let mut academic = txn.open_table(ACADEMIC_TASKS)?;
            let mut secondary = txn.open_table(SECONDARY_TASKS)?;
            let mut meta = txn.open_table(BOARD_META)?;

            match event {
                Event::AcademicCreated { task, .. } | Event::AcademicUpdated { task, .. } => {
                    let bytes = postcard::to_allocvec(task)
                        .map_err(|e| SaveFileError::Encode(e.to_string()))?;
                    academic.insert(task.id.as_bytes().as_slice(), bytes.as_slice())?;
                }

                Event::AcademicDeleted { task_id, .. } => {
                    academic.remove(task_id.as_bytes().as_slice())?;
                }

                Event::SecondaryCreated { task, .. } | Event::SecondaryUpdated { task, .. } => {
                    let bytes = postcard::to_allocvec(task)
                        .map_err(|e| SaveFileError::Encode(e.to_string()))?;
                    secondary.insert(task.id.as_bytes().as_slice(), bytes.as_slice())?;
                }

                Event::SecondaryDeleted { task_id, .. } => {
                    secondary.remove(task_id.as_bytes().as_slice())?;
                }
            }

            // Always update revision
            meta.insert("revision", board.revision.to_le_bytes().as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Seed the demo task set on a fresh save file. A board that already
    /// holds any task of either kind is left alone. Returns how many tasks
    /// were created.
    pub fn seed_demo_tasks(
        &self,
        board: &mut Board,
        now: DateTime<Utc>,
    ) -> Result<usize, SaveFileError> {
        if !board.academic.is_empty() || !board.secondary.is_empty() {
            return Ok(0);
        }

        let academic: [(&str, &str, &str, i64, Priority, TaskType); 4] = [
            (
                "Data Structures Assignment 3",
                "CS301 - Data Structures",
                "Implement Red-Black Tree with insertion and deletion operations",
                2,
                Priority::High,
                TaskType::Assignment,
            ),
            (
                "Database Systems Mid-term",
                "CS401 - Database Systems",
                "Covers SQL, Normalization, and Transaction Management",
                5,
                Priority::High,
                TaskType::Exam,
            ),
            (
                "Machine Learning Lab 4",
                "CS501 - Machine Learning",
                "Neural Network implementation using TensorFlow",
                7,
                Priority::Medium,
                TaskType::Lab,
            ),
            (
                "Software Engineering Project Phase 2",
                "CS402 - Software Engineering",
                "Complete design documentation and UML diagrams",
                10,
                Priority::High,
                TaskType::Project,
            ),
        ];

        let secondary: [(&str, Category, &str, &str); 4] = [
            (
                "LeetCode Daily Challenge",
                Category::Cp,
                "Solve daily problem and maintain streak",
                "Maintain 30-day streak",
            ),
            (
                "Build Personal Portfolio Website",
                Category::Project,
                "Create a modern portfolio using Next.js",
                "Deploy by end of semester",
            ),
            (
                "Learn Docker & Kubernetes",
                Category::Learning,
                "Complete online course on containerization",
                "Deploy a containerized app",
            ),
            (
                "Codeforces Contest Participation",
                Category::Cp,
                "Participate in weekly contests",
                "Reach Expert rating",
            ),
        ];

        let mut created = 0;

        for (title, course, description, days_out, priority, task_type) in academic {
            let event = board
                .apply(
                    Command::CreateAcademic {
                        title: title.to_string(),
                        course: course.to_string(),
                        description: Some(description.to_string()),
                        due_date: now + Duration::days(days_out),
                        priority,
                        task_type,
                    },
                    now,
                )
                .expect("demo academic task is valid");
            self.flush(board, &event)?;
            created += 1;
        }

        for (title, category, description, goal) in secondary {
            let event = board
                .apply(
                    Command::CreateSecondary {
                        title: title.to_string(),
                        category,
                        description: Some(description.to_string()),
                        goal: Some(goal.to_string()),
                    },
                    now,
                )
                .expect("demo secondary task is valid");
            self.flush(board, &event)?;
            created += 1;
        }

        Ok(created)
    }
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SaveFileError {
    Redb(String),
    Decode(String),
    Encode(String),
}

// redb 2.x has many error types. Blanket them all into SaveFileError::Redb.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for SaveFileError {
            fn from(e: $t) -> Self { SaveFileError::Redb(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

impl std::fmt::Display for SaveFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveFileError::Redb(e) => write!(f, "redb: {e}"),
            SaveFileError::Decode(e) => write!(f, "decode: {e}"),
            SaveFileError::Encode(e) => write!(f, "encode: {e}"),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
