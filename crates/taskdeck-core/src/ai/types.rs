//! Request and output types for AI operations

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::colors::{TagColor, PALETTE};
use crate::models::{Category, Priority};

use super::error::AIError;

/// Which engine handles a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Remote generative API; needs a caller-supplied key
    Cloud,
    /// In-process heuristic engine; no key, no network
    Local,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Local => "local",
        }
    }
}

impl std::str::FromStr for Engine {
    type Err = AIError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cloud" | "gemini" => Ok(Self::Cloud),
            "local" | "transformers" => Ok(Self::Local),
            _ => Err(AIError::invalid_request(format!("Unknown engine: {}", s))),
        }
    }
}

/// Requested operation, which fixes the output shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Summary,
    Tags,
    Classify,
    Priority,
    Suggest,
    /// Draft a task (title, description, priority, tags, due date) from free text
    Create,
}

impl OutputKind {
    pub const ALL: [OutputKind; 6] = [
        Self::Summary,
        Self::Tags,
        Self::Classify,
        Self::Priority,
        Self::Suggest,
        Self::Create,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Tags => "tags",
            Self::Classify => "classify",
            Self::Priority => "priority",
            Self::Suggest => "suggest",
            Self::Create => "create",
        }
    }
}

impl std::str::FromStr for OutputKind {
    type Err = AIError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "tags" => Ok(Self::Tags),
            "classify" => Ok(Self::Classify),
            "priority" => Ok(Self::Priority),
            "suggest" => Ok(Self::Suggest),
            "create" => Ok(Self::Create),
            _ => Err(AIError::invalid_request(format!("Unknown output kind: {}", s))),
        }
    }
}

/// Free text plus optional context hints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AIRequest {
    pub text: String,
    /// Tag names the owner already uses; preferred by tag suggestions
    #[serde(default)]
    pub existing_tags: Vec<String>,
    /// Titles of the owner's tasks; `suggest` avoids duplicating them
    #[serde(default)]
    pub existing_tasks: Vec<String>,
}

impl AIRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// First non-empty line, used as the title in prompts
    pub fn headline(&self) -> &str {
        self.text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

/// A suggested tag (not persisted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTag {
    pub name: String,
    pub color: TagColor,
}

impl SuggestedTag {
    /// Suggestion with a palette color chosen stably from the name
    pub fn from_name(name: &str) -> Self {
        let index = name.chars().map(|c| c as usize).sum::<usize>() % PALETTE.len();
        Self {
            name: name.to_string(),
            color: PALETTE[index].to_color(),
        }
    }
}

/// A proposed follow-up task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// A task drafted from free text (not persisted until saved)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// Tag names; saving resolves them through the tag reconciler
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// Category classification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    /// Always within `[0, 1]`
    pub confidence: f64,
    pub reason: String,
}

/// Normalized result of one AI operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AIOutput {
    Summary {
        text: String,
    },
    Tags {
        #[serde(rename = "suggestedTags")]
        suggested_tags: Vec<SuggestedTag>,
    },
    Classify {
        category: Category,
        confidence: f64,
        reason: String,
    },
    Priority {
        priority: Priority,
    },
    Suggest {
        #[serde(rename = "nextTask")]
        next_task: NextTask,
    },
    Create {
        task: TaskDraft,
    },
}

impl AIOutput {
    pub fn kind(&self) -> OutputKind {
        match self {
            Self::Summary { .. } => OutputKind::Summary,
            Self::Tags { .. } => OutputKind::Tags,
            Self::Classify { .. } => OutputKind::Classify,
            Self::Priority { .. } => OutputKind::Priority,
            Self::Suggest { .. } => OutputKind::Suggest,
            Self::Create { .. } => OutputKind::Create,
        }
    }
}

impl From<Classification> for AIOutput {
    fn from(c: Classification) -> Self {
        AIOutput::Classify {
            category: c.category,
            confidence: c.confidence,
            reason: c.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_parsing() {
        assert_eq!("cloud".parse::<Engine>().unwrap(), Engine::Cloud);
        assert_eq!("Local".parse::<Engine>().unwrap(), Engine::Local);
        let err = "quantum".parse::<Engine>().unwrap_err();
        assert_eq!(err.kind, super::super::AIErrorKind::InvalidRequest);
    }

    #[test]
    fn test_output_serialization_shapes() {
        let out = AIOutput::Tags {
            suggested_tags: vec![SuggestedTag::from_name("work")],
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["kind"], "tags");
        assert_eq!(json["suggestedTags"][0]["name"], "work");
        assert!(json["suggestedTags"][0]["color"]["bg"].is_string());

        let out = AIOutput::Suggest {
            next_task: NextTask {
                title: "Draft outline".into(),
                description: "Sketch sections".into(),
                priority: Priority::High,
                estimated_duration: Some("1h".into()),
                dependencies: vec![],
            },
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["nextTask"]["estimatedDuration"], "1h");
        assert_eq!(json["nextTask"]["priority"], "high");

        let out = AIOutput::Create {
            task: TaskDraft {
                title: "Renew passport".into(),
                description: String::new(),
                priority: Priority::Low,
                tags: vec!["admin".into()],
                due_date: NaiveDate::from_ymd_opt(2026, 11, 2),
            },
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["kind"], "create");
        assert_eq!(json["task"]["dueDate"], "2026-11-02");
        assert_eq!(json["task"]["tags"][0], "admin");
        assert_eq!(out.kind(), OutputKind::Create);
    }

    #[test]
    fn test_headline_skips_blank_lines() {
        let req = AIRequest::new("\n\n  Fix login bug \nDetails here");
        assert_eq!(req.headline(), "Fix login bug");
    }

    #[test]
    fn test_suggested_tag_color_is_stable() {
        assert_eq!(
            SuggestedTag::from_name("home"),
            SuggestedTag::from_name("home")
        );
    }
}
