//! Domain models for Taskdeck

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub use crate::colors::TagColor;

/// Deserialize a field that distinguishes "absent" from "explicit null"
///
/// Absent → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
/// Pair with `#[serde(default)]`.
fn double_option<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

// ========== Owners ==========

/// An authenticated owner of tasks, notes and tags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// API token metadata (the secret itself is never stored)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub id: String,
    pub user_id: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

// ========== Enumerations ==========

/// Task board column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Category {
    /// Unsorted: no priority or schedule decided yet
    #[default]
    Inbox,
    /// In progress or should be started now
    Doing,
    /// Scheduled next
    Todo,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Inbox, Category::Doing, Category::Todo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Doing => "doing",
            Self::Todo => "todo",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inbox" => Ok(Self::Inbox),
            "doing" => Ok(Self::Doing),
            "todo" => Ok(Self::Todo),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Note category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum NoteCategory {
    #[default]
    General,
    Diary,
    Idea,
    Reference,
    TaskNote,
}

impl NoteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Diary => "diary",
            Self::Idea => "idea",
            Self::Reference => "reference",
            Self::TaskNote => "task_note",
        }
    }
}

impl std::str::FromStr for NoteCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(Self::General),
            "diary" => Ok(Self::Diary),
            "idea" => Ok(Self::Idea),
            "reference" => Ok(Self::Reference),
            "task_note" | "task-note" => Ok(Self::TaskNote),
            _ => Err(format!("Unknown note category: {}", s)),
        }
    }
}

impl TryFrom<String> for NoteCategory {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Task/note priority
///
/// Accepts the legacy labels `高`/`中`/`低` on input; always emits English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" | "高" => Ok(Self::High),
            "medium" | "mid" | "中" => Ok(Self::Medium),
            "low" | "低" => Ok(Self::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Task progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Pending,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
            Self::Pending => "pending",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "todo" | "未完了" => Ok(Self::Todo),
            "in-progress" | "in_progress" | "進行中" => Ok(Self::InProgress),
            "done" | "完了" => Ok(Self::Done),
            "pending" | "保留" => Ok(Self::Pending),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Which kind of record a tag association belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Task,
    Note,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Note => "note",
        }
    }

    /// Table holding the records of this kind
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Task => "tasks",
            Self::Note => "notes",
        }
    }

    /// Join table and its foreign-key column
    pub(crate) fn tag_table(&self) -> (&'static str, &'static str) {
        match self {
            Self::Task => ("task_tags", "task_id"),
            Self::Note => ("note_tags", "note_id"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "note" => Ok(Self::Note),
            _ => Err(format!("Unknown entity kind: {}", s)),
        }
    }
}

// ========== Tags ==========

/// A persisted tag owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: TagColor,
    /// Parent tag ID for hierarchy (None = root tag)
    pub parent_id: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One element of a reconciliation request
///
/// A JSON string references an existing tag by ID; an object describes a tag
/// by name, creating it if the owner has none with that name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagInput {
    Existing(String),
    New {
        name: String,
        #[serde(default)]
        color: Option<TagColor>,
    },
}

impl TagInput {
    pub fn named(name: &str) -> Self {
        TagInput::New {
            name: name.to_string(),
            color: None,
        }
    }
}

/// Tag with usage counts (for list views)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithUsage {
    #[serde(flatten)]
    pub tag: Tag,
    pub task_count: i64,
    pub note_count: i64,
}

impl TagWithUsage {
    pub fn total(&self) -> i64 {
        self.task_count + self.note_count
    }
}

/// A tag with its computed path and hierarchy info (for tree display)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithPath {
    #[serde(flatten)]
    pub tag: Tag,
    /// Full path from root (e.g., "Work / Reports")
    pub path: String,
    /// Depth in hierarchy (0 = root)
    pub depth: i32,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<TagWithPath>,
}

/// Hierarchy shape statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HierarchyStats {
    pub max_depth: i32,
    pub avg_depth: f64,
    pub total_parents: i64,
    pub total_leaves: i64,
}

/// Aggregate tag analytics for one owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagAnalytics {
    pub total_tags: i64,
    pub total_usage: i64,
    pub top_tags: Vec<TagWithUsage>,
    pub hierarchy: HierarchyStats,
    pub recent: Vec<Tag>,
}

/// Update payload for a tag (identity never changes)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagUpdate {
    pub name: Option<String>,
    pub color: Option<TagColor>,
}

// ========== Tasks ==========

/// A task on the owner's board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Option<Priority>,
    pub status: TaskStatus,
    pub task_order: i64,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload for a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Partial update for a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<Priority>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

// ========== Notes ==========

/// A free-form note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub category: NoteCategory,
    pub priority: Option<Priority>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload for a note
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: NoteCategory,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// Partial update for a note
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<NoteCategory>,
    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<Priority>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_accepts_legacy_labels() {
        assert_eq!("高".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("中".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("Low".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());

        let p: Priority = serde_json::from_str(r#""低""#).unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), r#""low""#);
    }

    #[test]
    fn test_status_legacy_mapping() {
        assert_eq!("完了".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            r#""in-progress""#
        );
    }

    #[test]
    fn test_category_rejects_unknown() {
        assert!(serde_json::from_str::<Category>(r#""someday""#).is_err());
        assert_eq!(
            serde_json::from_str::<Category>(r#""doing""#).unwrap(),
            Category::Doing
        );
    }

    #[test]
    fn test_tag_input_untagged() {
        let inputs: Vec<TagInput> =
            serde_json::from_str(r#"["t1", {"name": "home"}, {"name": "x", "color": {"bg": "a", "color": "b"}}]"#)
                .unwrap();
        assert_eq!(inputs[0], TagInput::Existing("t1".into()));
        assert_eq!(inputs[1], TagInput::named("home"));
        match &inputs[2] {
            TagInput::New { color: Some(c), .. } => assert_eq!(c.bg, "a"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_task_update_double_option() {
        let u: TaskUpdate = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(u.description, Some(None));
        let u: TaskUpdate = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(u.description, None);
    }
}
