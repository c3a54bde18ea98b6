//! Local backend: deterministic in-process heuristics
//!
//! No credential, no network. Scoring is lexicon based: each priority factor
//! (urgency, importance, dependency, effort) starts neutral at 0.5, rises
//! with matching cue words and falls with "someday"-style cues. The weighted
//! factor score then drives priority and category decisions.
//!
//! English cues match whole words only ("down" never matches "download");
//! CJK cues match as substrings since those scripts have no word breaks.
//!
//! Work runs on the blocking thread pool so large inputs never stall the
//! async runtime.

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDate};
use regex::Regex;

use crate::models::{Category, Priority};

use super::error::{AIError, AIErrorKind, AIResult};
use super::parsing::MAX_SUGGESTED_TAGS;
use super::types::{AIRequest, Classification, NextTask, SuggestedTag, TaskDraft};
use super::AIBackend;

const URGENCY_CUES: &[&str] = &[
    "urgent", "asap", "immediately", "today", "tonight", "deadline", "right now", "overdue",
    "emergency", "down", "緊急", "至急", "今日", "すぐ", "期限", "締め切り",
];

const IMPORTANCE_CUES: &[&str] = &[
    "important", "critical", "must", "essential", "key", "customer", "production", "security",
    "blocker", "重要", "必須", "大事", "本番",
];

const DEPENDENCY_CUES: &[&str] = &[
    "blocked", "blocking", "depends", "dependency", "waiting", "before", "after", "prerequisite",
    "依存", "待ち", "前提",
];

const EFFORT_CUES: &[&str] = &[
    "refactor", "migrate", "migration", "redesign", "implement", "research", "investigate",
    "rewrite", "build", "実装", "移行", "調査", "設計",
];

/// Cues that push urgency and importance down
const LOW_CUES: &[&str] = &[
    "someday", "maybe", "eventually", "optional", "whenever", "nice to have", "later",
    "low priority", "いつか", "余裕", "後回し",
];

const WEIGHT_URGENCY: f64 = 0.4;
const WEIGHT_IMPORTANCE: f64 = 0.3;
const WEIGHT_DEPENDENCY: f64 = 0.2;
const WEIGHT_EFFORT: f64 = 0.1;

const HIGH_THRESHOLD: f64 = 0.7;
const MEDIUM_THRESHOLD: f64 = 0.4;

/// Topic lexicon for tag suggestions: (tag, cue words)
const TOPICS: &[(&str, &[&str])] = &[
    (
        "work",
        &["meeting", "report", "client", "project", "deploy", "release", "review", "office", "仕事", "会議"],
    ),
    (
        "personal",
        &["family", "home", "birthday", "health", "doctor", "gym", "個人", "家族"],
    ),
    (
        "shopping",
        &["buy", "order", "groceries", "purchase", "shop", "買い物", "購入"],
    ),
    (
        "schedule",
        &["appointment", "calendar", "schedule", "book", "reserve", "予定", "予約"],
    ),
    (
        "idea",
        &["idea", "brainstorm", "concept", "maybe", "explore", "アイデア"],
    ),
    (
        "development",
        &["bug", "fix", "code", "api", "test", "refactor", "implement", "開発", "実装"],
    ),
];

/// Tag returned when nothing else matches
const FALLBACK_TAG: &str = "task";

/// Factor scores in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityFactors {
    pub urgency: f64,
    pub importance: f64,
    pub dependency: f64,
    pub effort: f64,
}

impl PriorityFactors {
    pub fn weighted(&self) -> f64 {
        self.urgency * WEIGHT_URGENCY
            + self.importance * WEIGHT_IMPORTANCE
            + self.dependency * WEIGHT_DEPENDENCY
            + self.effort * WEIGHT_EFFORT
    }
}

/// Compiled word-bounded patterns for every ASCII cue in the lexicons
fn cue_patterns() -> &'static HashMap<&'static str, Regex> {
    static PATTERNS: OnceLock<HashMap<&'static str, Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let topic_cues = TOPICS.iter().flat_map(|(_, cues)| cues.iter());
        URGENCY_CUES
            .iter()
            .chain(IMPORTANCE_CUES)
            .chain(DEPENDENCY_CUES)
            .chain(EFFORT_CUES)
            .chain(LOW_CUES)
            .chain(topic_cues)
            .filter(|cue| cue.is_ascii())
            .filter_map(|cue| {
                Regex::new(&format!(r"\b{}\b", regex::escape(cue)))
                    .ok()
                    .map(|re| (*cue, re))
            })
            .collect()
    })
}

/// Whether a lowercased text contains a cue
fn cue_matches(text: &str, cue: &str) -> bool {
    match cue_patterns().get(cue) {
        Some(re) => re.is_match(text),
        None => text.contains(cue),
    }
}

fn count_cues(text: &str, cues: &[&str]) -> usize {
    cues.iter().filter(|cue| cue_matches(text, cue)).count()
}

/// Relative due-date phrases, longest alternatives first
fn relative_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"明後日|\bday after tomorrow\b|明日|\btomorrow\b|今日|\btoday\b|\btonight\b|今週末|\bthis weekend\b|今月末|\bend of (?:the )?month\b|来週|\bnext week\b|来月|\bnext month\b|今週|\bthis week\b",
        )
        .expect("valid regex")
    })
}

fn full_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4})[-/年](\d{1,2})[-/月](\d{1,2})日?").expect("valid regex")
    })
}

fn month_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\D)(\d{1,2})(?:/|月)(\d{1,2})日?").expect("valid regex"))
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

fn resolve_relative(phrase: &str, today: NaiveDate) -> Option<NaiveDate> {
    let weekday = i64::from(today.weekday().num_days_from_monday());
    match phrase {
        "今日" | "today" | "tonight" => Some(today),
        "明日" | "tomorrow" => Some(today + Duration::days(1)),
        "明後日" | "day after tomorrow" => Some(today + Duration::days(2)),
        // Friday of this week, or today once the week is that far along
        "今週" | "this week" => Some(today + Duration::days((4 - weekday).max(0))),
        // Saturday, or today during the weekend
        "今週末" | "this weekend" => Some(today + Duration::days((5 - weekday).max(0))),
        "来週" | "next week" => Some(today + Duration::days(7 - weekday)),
        "来月" | "next month" => first_of_next_month(today),
        "今月末" => first_of_next_month(today).map(|d| d - Duration::days(1)),
        p if p.starts_with("end of") => first_of_next_month(today).map(|d| d - Duration::days(1)),
        _ => None,
    }
}

/// Find a due date in free text
///
/// Full dates (`2026-03-15`, `2026/3/15`, `2026年3月15日`) win over month/day
/// forms (`3/15`, `3月15日`, rolled to next year once passed), which win over
/// relative phrases (`明日`, `next week`, `今月末`, ...).
pub fn extract_due_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = text.to_lowercase();

    if let Some(c) = full_date_re().captures(&lower) {
        let date = NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
        if date.is_some() {
            return date;
        }
    }

    if let Some(c) = month_day_re().captures(&lower) {
        let month: u32 = c[1].parse().ok()?;
        let day: u32 = c[2].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(today.year(), month, day) {
            return if date < today {
                NaiveDate::from_ymd_opt(today.year() + 1, month, day)
            } else {
                Some(date)
            };
        }
    }

    relative_date_re()
        .find(&lower)
        .and_then(|m| resolve_relative(m.as_str(), today))
}

/// Drop list markers and "todo:"-style prefixes from a title line
fn clean_title(line: &str) -> String {
    let mut title = line.trim().trim_start_matches(['-', '*', '・', '•']).trim();
    for prefix in ["todo:", "task:", "タスク:", "タスク："] {
        let matched = title
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matched {
            title = title[prefix.len()..].trim();
            break;
        }
    }
    title.chars().take(80).collect()
}

/// 0.5 baseline, saturating toward 1 with positive cues and toward 0 with negative ones
fn factor(positive: usize, negative: usize) -> f64 {
    let up = 1.0 - 0.5f64.powi(positive as i32);
    let down = 1.0 - 0.5f64.powi(negative as i32);
    (0.5 + 0.5 * up - 0.5 * down).clamp(0.0, 1.0)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Lexicon-driven local engine
#[derive(Debug, Clone, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }

    /// Score the priority factors of a text
    pub fn factors(&self, text: &str) -> PriorityFactors {
        let lower = text.to_lowercase();
        let low = count_cues(&lower, LOW_CUES);
        PriorityFactors {
            urgency: factor(count_cues(&lower, URGENCY_CUES), low),
            importance: factor(count_cues(&lower, IMPORTANCE_CUES), low),
            dependency: factor(count_cues(&lower, DEPENDENCY_CUES), 0),
            effort: factor(count_cues(&lower, EFFORT_CUES), 0),
        }
    }

    /// Extractive summary: the first three sentences
    pub fn summarize_sync(&self, request: &AIRequest) -> AIResult<String> {
        let mut sentences: Vec<String> = Vec::new();
        let mut current = String::new();

        for ch in request.text.chars() {
            if ch == '\n' {
                push_sentence(&mut sentences, &mut current);
                continue;
            }
            current.push(ch);
            if matches!(ch, '.' | '!' | '?' | '。' | '！' | '？') {
                push_sentence(&mut sentences, &mut current);
            }
            if sentences.len() >= 3 {
                break;
            }
        }
        if sentences.len() < 3 {
            push_sentence(&mut sentences, &mut current);
        }
        sentences.truncate(3);

        if sentences.is_empty() {
            return Err(AIError::invalid_request("Nothing to summarize"));
        }
        Ok(sentences.join(" "))
    }

    /// Prefer existing tags mentioned in the text, then lexicon topics
    pub fn suggest_tags_sync(&self, request: &AIRequest) -> AIResult<Vec<SuggestedTag>> {
        let lower = request.text.to_lowercase();
        let mut names: Vec<String> = Vec::new();

        for existing in &request.existing_tags {
            let name = existing.trim();
            if !name.is_empty() && lower.contains(&name.to_lowercase()) && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }

        let mut scored: Vec<(usize, &str)> = TOPICS
            .iter()
            .map(|(tag, cues)| (count_cues(&lower, cues), *tag))
            .filter(|(hits, _)| *hits > 0)
            .collect();
        // Stable sort keeps lexicon order on ties
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, tag) in scored {
            if names.len() >= 3 {
                break;
            }
            // Reuse an existing tag's spelling when it names the same topic
            let name = request
                .existing_tags
                .iter()
                .find(|t| t.trim().eq_ignore_ascii_case(tag))
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| tag.to_string());
            if !names.contains(&name) {
                names.push(name);
            }
        }

        if names.is_empty() {
            names.push(FALLBACK_TAG.to_string());
        }
        names.truncate(MAX_SUGGESTED_TAGS);

        Ok(names.iter().map(|n| SuggestedTag::from_name(n)).collect())
    }

    /// Urgent → doing, important → todo, otherwise inbox
    pub fn classify_sync(&self, request: &AIRequest) -> AIResult<Classification> {
        let f = self.factors(&request.text);

        let (category, confidence, reason) = if f.urgency > HIGH_THRESHOLD {
            (
                Category::Doing,
                f.urgency,
                "Time-sensitive wording suggests starting now",
            )
        } else if f.importance > HIGH_THRESHOLD {
            (
                Category::Todo,
                f.importance,
                "Important but not time-critical; schedule it next",
            )
        } else {
            (
                Category::Inbox,
                (1.0 - f.urgency).max(1.0 - f.importance),
                "No clear urgency or importance yet",
            )
        };

        Ok(Classification {
            category,
            confidence: round2(confidence.clamp(0.0, 1.0)),
            reason: reason.to_string(),
        })
    }

    /// Weighted factor score → high / medium / low
    pub fn prioritize_sync(&self, request: &AIRequest) -> AIResult<Priority> {
        Ok(priority_for(self.factors(&request.text).weighted()))
    }

    /// Rule-based follow-up task
    pub fn suggest_next_task_sync(&self, request: &AIRequest) -> AIResult<NextTask> {
        let headline = request.headline();
        if headline.is_empty() {
            return Err(AIError::invalid_request("Nothing to base a suggestion on"));
        }
        let subject: String = headline.chars().take(60).collect();
        let lower = request.text.to_lowercase();
        let factors = self.factors(&request.text);

        let (verb, description) = if lower.contains("bug") || lower.contains("fix") || lower.contains("修正") {
            ("Verify the fix for", "Reproduce the original problem, confirm it is gone, and add a regression test.")
        } else if lower.contains("meeting") || lower.contains("会議") {
            ("Send notes and action items from", "Write up decisions and owners, then share them with attendees.")
        } else if lower.contains("draft") || lower.contains("write") || lower.contains("report") {
            ("Review and polish", "Read the draft end to end, fix gaps, and collect feedback.")
        } else if lower.contains("research") || lower.contains("investigate") || lower.contains("調査") {
            ("Summarize findings from", "Capture conclusions and open questions, and propose a next decision.")
        } else {
            ("Plan the next step for", "Break the remaining work into a concrete, 30 minute to 2 hour action.")
        };

        let mut title = format!("{}: {}", verb, subject);
        if request
            .existing_tasks
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(&title))
        {
            title.push_str(" (follow-up)");
        }

        let estimated_duration = if factors.effort > HIGH_THRESHOLD {
            "2h"
        } else if factors.effort > 0.5 {
            "1h"
        } else {
            "30m"
        };

        let dependencies = request
            .existing_tasks
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .filter(|t| t.eq_ignore_ascii_case(headline) || lower.contains(&t.to_lowercase()))
            .map(str::to_string)
            .collect();

        Ok(NextTask {
            title,
            description: description.to_string(),
            priority: priority_for(factors.weighted()),
            estimated_duration: Some(estimated_duration.to_string()),
            dependencies,
        })
    }

    /// Draft a task: first line as title, the rest as description,
    /// lexicon tags and priority, and a resolved due date
    pub fn draft_task_sync(&self, request: &AIRequest, today: NaiveDate) -> AIResult<TaskDraft> {
        let title = clean_title(request.headline());
        if title.is_empty() {
            return Err(AIError::invalid_request("Nothing to draft a task from"));
        }

        let description = request
            .text
            .lines()
            .map(str::trim)
            .skip_while(|l| l.is_empty())
            .skip(1)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let tags = self
            .suggest_tags_sync(request)?
            .into_iter()
            .map(|t| t.name)
            .filter(|n| n != FALLBACK_TAG)
            .collect();

        Ok(TaskDraft {
            title,
            description,
            priority: self.prioritize_sync(request)?,
            tags,
            due_date: extract_due_date(&request.text, today),
        })
    }

    /// Run a synchronous operation on the blocking pool
    async fn blocking<T, F>(&self, request: &AIRequest, op: F) -> AIResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&LocalBackend, &AIRequest) -> AIResult<T> + Send + 'static,
    {
        let engine = self.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || op(&engine, &request))
            .await
            .map_err(|e| {
                AIError::new(AIErrorKind::Unknown, format!("Local engine task failed: {}", e))
                    .with_source(e)
            })?
    }
}

fn push_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let s = current.trim();
    if !s.is_empty() {
        sentences.push(s.to_string());
    }
    current.clear();
}

fn priority_for(score: f64) -> Priority {
    if score > HIGH_THRESHOLD {
        Priority::High
    } else if score > MEDIUM_THRESHOLD {
        Priority::Medium
    } else {
        Priority::Low
    }
}

#[async_trait]
impl AIBackend for LocalBackend {
    async fn summarize(&self, request: &AIRequest) -> AIResult<String> {
        self.blocking(request, |e, r| e.summarize_sync(r)).await
    }

    async fn suggest_tags(&self, request: &AIRequest) -> AIResult<Vec<SuggestedTag>> {
        self.blocking(request, |e, r| e.suggest_tags_sync(r)).await
    }

    async fn classify(&self, request: &AIRequest) -> AIResult<Classification> {
        self.blocking(request, |e, r| e.classify_sync(r)).await
    }

    async fn prioritize(&self, request: &AIRequest) -> AIResult<Priority> {
        self.blocking(request, |e, r| e.prioritize_sync(r)).await
    }

    async fn suggest_next_task(&self, request: &AIRequest) -> AIResult<NextTask> {
        self.blocking(request, |e, r| e.suggest_next_task_sync(r)).await
    }

    async fn draft_task(&self, request: &AIRequest) -> AIResult<TaskDraft> {
        let today = Local::now().date_naive();
        self.blocking(request, move |e, r| e.draft_task_sync(r, today))
            .await
    }

    fn name(&self) -> &str {
        "local"
    }
}
