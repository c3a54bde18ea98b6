//! Prompt templates for the cloud engine
//!
//! Templates use `{{name}}` placeholders. Every template ends with the exact
//! JSON shape the response parser expects.

use chrono::Local;

use super::types::{AIRequest, OutputKind};

const SUMMARY: &str = r#"Summarize the following task in about three lines.
Keep every important point and be concrete.

Title: {{title}}
Content: {{content}}

Output format:
{
  "summary": "summary text"
}"#;

const TAGS: &str = r#"Suggest suitable tags for the following task.
Suggest at least one and at most five tags.

Title: {{title}}
Content: {{content}}
Existing tags: {{existingTags}}

Output format:
{
  "suggestedTags": ["tag1", "tag2", "tag3"]
}

Notes:
- No more than five tags
- Keep tags short and specific
- Prefer existing tags when they fit"#;

const CLASSIFY: &str = r#"Classify the following task into the best category.

Title: {{title}}
Content: {{content}}

Categories:
- inbox: not yet organized; priority and timing are undecided
- doing: in progress, or should be started right now
- todo: scheduled next; priority is known but it is not started yet

Output format:
{
  "category": "inbox" | "doing" | "todo",
  "confidence": a number from 0.0 to 1.0,
  "reason": "why this category fits"
}

Consider urgency, importance and dependencies. 1.0 is the most certain."#;

const PRIORITY: &str = r#"Judge the priority of the following task as "high", "medium" or "low".

Title: {{title}}
Content: {{content}}

Criteria:
- Urgency (deadlines, time constraints)
- Importance (scope and consequences)
- Dependencies (other tasks waiting on it)
- Effort (amount of work, complexity)

Output format:
{
  "priority": "high" | "medium" | "low"
}"#;

const SUGGEST: &str = r#"Propose the next step that follows the target task.

Target task:
Title: {{title}}
Description: {{content}}

Existing tasks (avoid duplicating these):
{{tasksText}}

Steps:
1. Understand the goal of the target task
2. Pick the direct follow-up work, sized to take 30 minutes to 2 hours
3. Check the existing tasks and pick a different angle if it would duplicate one

Output format:
{
  "nextTask": {
    "title": "title starting with a concrete verb",
    "description": "short description, three lines at most",
    "priority": "high" | "medium" | "low",
    "estimatedDuration": "30m" | "1h" | "2h",
    "dependencies": ["titles of existing tasks this depends on"]
  }
}"#;

const CREATE: &str = r#"Turn the following free text into a single task.

Text: {{content}}
Today: {{today}}
Existing tags: {{existingTags}}

Output format:
{
  "title": "short title starting with a concrete verb",
  "description": "the remaining details, or an empty string",
  "priority": "high" | "medium" | "low",
  "tags": ["tag1", "tag2"],
  "dueDate": "YYYY-MM-DD" | null
}

Notes:
- Resolve relative dates such as "tomorrow" or "next week" against today
- Use null when the text names no deadline
- At most five tags, preferring existing tags when they fit"#;

fn template(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::Summary => SUMMARY,
        OutputKind::Tags => TAGS,
        OutputKind::Classify => CLASSIFY,
        OutputKind::Priority => PRIORITY,
        OutputKind::Suggest => SUGGEST,
        OutputKind::Create => CREATE,
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

/// Render the prompt for one request
pub fn render(kind: OutputKind, request: &AIRequest) -> String {
    let tasks_text = if request.existing_tasks.is_empty() {
        "(none)".to_string()
    } else {
        request
            .existing_tasks
            .iter()
            .map(|t| format!("- {}", t))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let vars: [(&str, String); 5] = [
        ("title", request.headline().to_string()),
        ("content", request.text.trim().to_string()),
        ("existingTags", join_or_none(&request.existing_tags)),
        ("tasksText", tasks_text),
        ("today", Local::now().date_naive().format("%Y-%m-%d").to_string()),
    ];

    vars.iter().fold(template(kind).to_string(), |prompt, (key, value)| {
        prompt.replace(&format!("{{{{{}}}}}", key), value)
    })
}
