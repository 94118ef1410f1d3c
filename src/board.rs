use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ── Entity types ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low = 0,
    Medium = 1,
    High = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Assignment,
    Exam,
    Project,
    Lab,
    Other,
}

/// Secondary task category. CP = competitive programming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Cp,
    Project,
    Learning,
}

/// A coursework item — the unit of work that locks the secondary board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicTask {
    pub id: Uuid,
    pub title: String,
    pub course: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A personal item — visible but locked while academic work is pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryTask {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub description: Option<String>,
    pub goal: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AcademicTask {
    /// Flip the completion flag. Touches nothing but the flag and updated_at.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        self.updated_at = now;
    }
}

impl SecondaryTask {
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        self.updated_at = now;
    }
}

// ── Patches ────────────────────────────────────────────────────

/// Partial update for an academic task. Absent fields are left alone.
/// Applying any patch refreshes updated_at.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcademicPatch {
    pub title: Option<String>,
    pub course: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    #[serde(rename = "type")]
    pub task_type: Option<TaskType>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecondaryPatch {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub goal: Option<String>,
    pub completed: Option<bool>,
}

// ── Commands (client → board) ──────────────────────────────────

/// A command is something a client wants to happen.
/// The board validates it, applies it, and returns an Event (or an error).
#[derive(Debug, Clone)]
pub enum Command {
    CreateAcademic {
        title: String,
        course: String,
        description: Option<String>,
        due_date: DateTime<Utc>,
        priority: Priority,
        task_type: TaskType,
    },
    UpdateAcademic {
        id: Uuid,
        patch: AcademicPatch,
    },
    ToggleAcademic {
        id: Uuid,
        completed: bool,
    },
    DeleteAcademic {
        id: Uuid,
    },
    CreateSecondary {
        title: String,
        category: Category,
        description: Option<String>,
        goal: Option<String>,
    },
    UpdateSecondary {
        id: Uuid,
        patch: SecondaryPatch,
    },
    ToggleSecondary {
        id: Uuid,
        completed: bool,
    },
    DeleteSecondary {
        id: Uuid,
    },
}

// ── Events (board → clients) ───────────────────────────────────

/// An event is what actually happened. Flushed to the save file, then
/// broadcast as JSON to every connected dashboard. Each event carries the
/// revision it was applied at.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    AcademicCreated { revision: u64, task: AcademicTask },
    AcademicUpdated { revision: u64, task: AcademicTask },
    AcademicDeleted { revision: u64, task_id: Uuid },
    SecondaryCreated { revision: u64, task: SecondaryTask },
    SecondaryUpdated { revision: u64, task: SecondaryTask },
    SecondaryDeleted { revision: u64, task_id: Uuid },
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    TaskNotFound,
    EmptyTitle,
    EmptyCourse,
}

impl std::fmt::Display for BoardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardError::TaskNotFound => write!(f, "task not found"),
            BoardError::EmptyTitle => write!(f, "title must not be empty"),
            BoardError::EmptyCourse => write!(f, "course must not be empty"),
        }
    }
}

// ── The Board ──────────────────────────────────────────────────

/// The authoritative task state. Lives in memory. Loaded from redb on boot.
/// All mutations go through apply() which validates, mutates, and returns
/// an Event for flush + broadcast.
pub struct Board {
    pub academic: HashMap<Uuid, AcademicTask>,
    pub secondary: HashMap<Uuid, SecondaryTask>,
    pub revision: u64,
}

impl Board {
    pub fn new() -> Self {
        Board {
            academic: HashMap::new(),
            secondary: HashMap::new(),
            revision: 0,
        }
    }

    /// Apply a command to the board. Returns the resulting Event on success.
    /// This is THE mutation codepath — every state change goes through here.
    /// A rejected command leaves the board untouched.
    pub fn apply(&mut self, cmd: Command, now: DateTime<Utc>) -> Result<Event, BoardError> {
        match cmd {
            Command::CreateAcademic { title, course, description, due_date, priority, task_type } => {
                if title.trim().is_empty() {
                    return Err(BoardError::EmptyTitle);
                }
                if course.trim().is_empty() {
                    return Err(BoardError::EmptyCourse);
                }

                let task = AcademicTask {
                    id: Uuid::new_v4(),
                    title,
                    course,
                    description,
                    due_date,
                    priority,
                    task_type,
                    completed: false,
                    created_at: now,
                    updated_at: now,
                };

                self.revision += 1;
                let event = Event::AcademicCreated {
                    revision: self.revision,
                    task: task.clone(),
                };
                self.academic.insert(task.id, task);
                Ok(event)
            }

            Command::UpdateAcademic { id, patch } => {
                // Validate before touching the task
                if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
                    return Err(BoardError::EmptyTitle);
                }
                if matches!(&patch.course, Some(c) if c.trim().is_empty()) {
                    return Err(BoardError::EmptyCourse);
                }

                let task = self.academic.get_mut(&id)
                    .ok_or(BoardError::TaskNotFound)?;

                if let Some(title) = patch.title {
                    task.title = title;
                }
                if let Some(course) = patch.course {
                    task.course = course;
                }
                if let Some(description) = patch.description {
                    task.description = Some(description);
                }
                if let Some(due_date) = patch.due_date {
                    task.due_date = due_date;
                }
                if let Some(priority) = patch.priority {
                    task.priority = priority;
                }
                if let Some(task_type) = patch.task_type {
                    task.task_type = task_type;
                }
                if let Some(completed) = patch.completed {
                    task.completed = completed;
                }
                task.updated_at = now;

                self.revision += 1;
                Ok(Event::AcademicUpdated {
                    revision: self.revision,
                    task: task.clone(),
                })
            }

            Command::ToggleAcademic { id, completed } => {
                let task = self.academic.get_mut(&id)
                    .ok_or(BoardError::TaskNotFound)?;

                task.set_completed(completed, now);

                self.revision += 1;
                Ok(Event::AcademicUpdated {
                    revision: self.revision,
                    task: task.clone(),
                })
            }

            Command::DeleteAcademic { id } => {
                if self.academic.remove(&id).is_none() {
                    return Err(BoardError::TaskNotFound);
                }

                self.revision += 1;
                Ok(Event::AcademicDeleted {
                    revision: self.revision,
                    task_id: id,
                })
            }

            Command::CreateSecondary { title, category, description, goal } => {
                if title.trim().is_empty() {
                    return Err(BoardError::EmptyTitle);
                }

                let task = SecondaryTask {
                    id: Uuid::new_v4(),
                    title,
                    category,
                    description,
                    goal,
                    completed: false,
                    created_at: now,
                    updated_at: now,
                };

                self.revision += 1;
                let event = Event::SecondaryCreated {
                    revision: self.revision,
                    task: task.clone(),
                };
                self.secondary.insert(task.id, task);
                Ok(event)
            }

            Command::UpdateSecondary { id, patch } => {
                if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
                    return Err(BoardError::EmptyTitle);
                }

                let task = self.secondary.get_mut(&id)
                    .ok_or(BoardError::TaskNotFound)?;

                if let Some(title) = patch.title {
                    task.title = title;
                }
                if let Some(category) = patch.category {
                    task.category = category;
                }
                if let Some(description) = patch.description {
                    task.description = Some(description);
                }
                if let Some(goal) = patch.goal {
                    task.goal = Some(goal);
                }
                if let Some(completed) = patch.completed {
                    task.completed = completed;
                }
                task.updated_at = now;

                self.revision += 1;
                Ok(Event::SecondaryUpdated {
                    revision: self.revision,
                    task: task.clone(),
                })
            }

            Command::ToggleSecondary { id, completed } => {
                let task = self.secondary.get_mut(&id)
                    .ok_or(BoardError::TaskNotFound)?;

                task.set_completed(completed, now);

                self.revision += 1;
                Ok(Event::SecondaryUpdated {
                    revision: self.revision,
                    task: task.clone(),
                })
            }

            Command::DeleteSecondary { id } => {
                if self.secondary.remove(&id).is_none() {
                    return Err(BoardError::TaskNotFound);
                }

                self.revision += 1;
                Ok(Event::SecondaryDeleted {
                    revision: self.revision,
                    task_id: id,
                })
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    // A representative instant and a due date two days later.
    fn now() -> DateTime<Utc> {
        t("2026-03-04T10:00:00Z")
    }

    fn create_academic(board: &mut Board) -> Uuid {
        let event = board.apply(
            Command::CreateAcademic {
                title: "Graph theory problem set".into(),
                course: "CS301".into(),
                description: None,
                due_date: t("2026-03-06T23:59:00Z"),
                priority: Priority::High,
                task_type: TaskType::Assignment,
            },
            now(),
        ).unwrap();

        match event {
            Event::AcademicCreated { task, .. } => task.id,
            _ => panic!("expected AcademicCreated"),
        }
    }

    fn create_secondary(board: &mut Board) -> Uuid {
        let event = board.apply(
            Command::CreateSecondary {
                title: "Solve five contest problems".into(),
                category: Category::Cp,
                description: None,
                goal: Some("Keep the streak alive".into()),
            },
            now(),
        ).unwrap();

        match event {
            Event::SecondaryCreated { task, .. } => task.id,
            _ => panic!("expected SecondaryCreated"),
        }
    }

    #[test]
    fn create_academic_starts_pending() {
        let mut board = Board::new();
        let id = create_academic(&mut board);

        let task = &board.academic[&id];
        assert!(!task.completed);
        assert_eq!(task.created_at, now());
        assert_eq!(task.updated_at, now());
        assert_eq!(board.revision, 1);
    }

    #[test]
    fn create_rejects_empty_title() {
        let mut board = Board::new();
        let result = board.apply(
            Command::CreateAcademic {
                title: "   ".into(),
                course: "CS301".into(),
                description: None,
                due_date: now(),
                priority: Priority::Low,
                task_type: TaskType::Other,
            },
            now(),
        );
        assert_eq!(result.unwrap_err(), BoardError::EmptyTitle);
        assert_eq!(board.revision, 0);
    }

    #[test]
    fn create_rejects_empty_course() {
        let mut board = Board::new();
        let result = board.apply(
            Command::CreateAcademic {
                title: "Essay".into(),
                course: "".into(),
                description: None,
                due_date: now(),
                priority: Priority::Low,
                task_type: TaskType::Other,
            },
            now(),
        );
        assert_eq!(result.unwrap_err(), BoardError::EmptyCourse);
    }

    #[test]
    fn patch_updates_only_present_fields() {
        let mut board = Board::new();
        let id = create_academic(&mut board);

        let later = t("2026-03-04T11:30:00Z");
        board.apply(
            Command::UpdateAcademic {
                id,
                patch: AcademicPatch {
                    priority: Some(Priority::Low),
                    description: Some("Chapters 4-6".into()),
                    ..Default::default()
                },
            },
            later,
        ).unwrap();

        let task = &board.academic[&id];
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(task.description.as_deref(), Some("Chapters 4-6"));
        assert_eq!(task.title, "Graph theory problem set"); // untouched
        assert_eq!(task.course, "CS301");
        assert_eq!(task.updated_at, later);
        assert_eq!(task.created_at, now()); // never refreshed
    }

    #[test]
    fn patch_cannot_blank_title() {
        let mut board = Board::new();
        let id = create_academic(&mut board);

        let result = board.apply(
            Command::UpdateAcademic {
                id,
                patch: AcademicPatch {
                    title: Some("".into()),
                    ..Default::default()
                },
            },
            now(),
        );
        assert_eq!(result.unwrap_err(), BoardError::EmptyTitle);
        assert_eq!(board.academic[&id].title, "Graph theory problem set");
    }

    #[test]
    fn patch_unknown_id_is_not_found() {
        let mut board = Board::new();
        let result = board.apply(
            Command::UpdateAcademic {
                id: Uuid::new_v4(),
                patch: AcademicPatch::default(),
            },
            now(),
        );
        assert_eq!(result.unwrap_err(), BoardError::TaskNotFound);
    }

    #[test]
    fn toggle_twice_restores_flag_and_advances_timestamp() {
        let mut board = Board::new();
        let id = create_academic(&mut board);

        let first = t("2026-03-04T12:00:00Z");
        let second = t("2026-03-04T12:05:00Z");

        board.apply(Command::ToggleAcademic { id, completed: true }, first).unwrap();
        assert!(board.academic[&id].completed);
        assert_eq!(board.academic[&id].updated_at, first);

        board.apply(Command::ToggleAcademic { id, completed: false }, second).unwrap();
        let task = &board.academic[&id];
        assert!(!task.completed); // back where it started
        assert_eq!(task.updated_at, second);
        assert!(task.updated_at > first);
    }

    #[test]
    fn toggle_alters_no_other_field() {
        let mut board = Board::new();
        let id = create_academic(&mut board);
        let before = board.academic[&id].clone();

        board.apply(
            Command::ToggleAcademic { id, completed: true },
            t("2026-03-04T12:00:00Z"),
        ).unwrap();

        let after = &board.academic[&id];
        assert_eq!(after.title, before.title);
        assert_eq!(after.course, before.course);
        assert_eq!(after.due_date, before.due_date);
        assert_eq!(after.priority, before.priority);
        assert_eq!(after.task_type, before.task_type);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn delete_academic_task() {
        let mut board = Board::new();
        let id = create_academic(&mut board);

        board.apply(Command::DeleteAcademic { id }, now()).unwrap();
        assert!(!board.academic.contains_key(&id));
    }

    #[test]
    fn delete_nonexistent_leaves_collection_alone() {
        let mut board = Board::new();
        create_academic(&mut board);

        let result = board.apply(Command::DeleteAcademic { id: Uuid::new_v4() }, now());
        assert_eq!(result.unwrap_err(), BoardError::TaskNotFound);
        assert_eq!(board.academic.len(), 1);
    }

    #[test]
    fn secondary_lifecycle() {
        let mut board = Board::new();
        let id = create_secondary(&mut board);

        let task = &board.secondary[&id];
        assert_eq!(task.category, Category::Cp);
        assert_eq!(task.goal.as_deref(), Some("Keep the streak alive"));
        assert!(!task.completed);

        let later = t("2026-03-04T15:00:00Z");
        board.apply(
            Command::UpdateSecondary {
                id,
                patch: SecondaryPatch {
                    category: Some(Category::Learning),
                    goal: Some("Finish the course".into()),
                    ..Default::default()
                },
            },
            later,
        ).unwrap();
        assert_eq!(board.secondary[&id].category, Category::Learning);
        assert_eq!(board.secondary[&id].updated_at, later);

        board.apply(Command::ToggleSecondary { id, completed: true }, later).unwrap();
        assert!(board.secondary[&id].completed);

        board.apply(Command::DeleteSecondary { id }, later).unwrap();
        assert!(board.secondary.is_empty());
    }

    #[test]
    fn revision_increments_on_every_mutation() {
        let mut board = Board::new();
        assert_eq!(board.revision, 0);

        let id = create_academic(&mut board);
        assert_eq!(board.revision, 1);

        board.apply(Command::ToggleAcademic { id, completed: true }, now()).unwrap();
        assert_eq!(board.revision, 2);

        let sid = create_secondary(&mut board);
        assert_eq!(board.revision, 3);

        board.apply(Command::DeleteSecondary { id: sid }, now()).unwrap();
        assert_eq!(board.revision, 4);
    }

    #[test]
    fn failed_commands_dont_change_state() {
        let mut board = Board::new();
        create_academic(&mut board);
        let rev_before = board.revision;

        let _ = board.apply(Command::DeleteAcademic { id: Uuid::new_v4() }, now());
        let _ = board.apply(
            Command::ToggleSecondary { id: Uuid::new_v4(), completed: true },
            now(),
        );

        assert_eq!(board.revision, rev_before);
        assert_eq!(board.academic.len(), 1);
        assert!(board.secondary.is_empty());
    }

    #[test]
    fn enum_wire_values_are_screaming_snake_case() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"HIGH\"");
        assert_eq!(serde_json::to_string(&TaskType::Assignment).unwrap(), "\"ASSIGNMENT\"");
        assert_eq!(serde_json::to_string(&Category::Cp).unwrap(), "\"CP\"");

        let p: Priority = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(p, Priority::Medium);
        assert!(serde_json::from_str::<Priority>("\"URGENT\"").is_err());
    }
}
