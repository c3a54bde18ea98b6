//! Note operations

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::tags::load_entity_tags;
use super::{new_id, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::*;

const NOTE_COLUMNS: &str =
    "id, owner_id, title, content, category, priority, created_at, updated_at";

fn note_from_row(row: &Row) -> rusqlite::Result<Note> {
    let category: String = row.get(4)?;
    let priority: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(Note {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        category: category.parse().unwrap_or_default(),
        priority: priority.and_then(|p| p.parse().ok()),
        tags: Vec::new(),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn fetch_note(conn: &Connection, owner_id: &str, id: &str) -> Result<Option<Note>> {
    let note = conn
        .query_row(
            &format!(
                "SELECT {} FROM notes WHERE id = ? AND owner_id = ?",
                NOTE_COLUMNS
            ),
            params![id, owner_id],
            note_from_row,
        )
        .optional()?;

    match note {
        Some(mut note) => {
            note.tags = load_entity_tags(conn, EntityKind::Note, &note.id)?;
            Ok(Some(note))
        }
        None => Ok(None),
    }
}

impl Database {
    /// Create a note
    pub fn create_note(&self, owner_id: &str, note: &NewNote) -> Result<Note> {
        let title = note.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidData("Note title cannot be empty".to_string()));
        }

        let conn = self.conn()?;
        let id = new_id();
        conn.execute(
            "INSERT INTO notes (id, owner_id, title, content, category, priority) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                owner_id,
                title,
                note.content,
                note.category.as_str(),
                note.priority.map(|p| p.as_str()),
            ],
        )?;

        fetch_note(&conn, owner_id, &id)?
            .ok_or_else(|| Error::NotFound(format!("Note {} not found", id)))
    }

    /// Get one of the owner's notes with its tags
    pub fn get_note(&self, owner_id: &str, id: &str) -> Result<Option<Note>> {
        let conn = self.conn()?;
        fetch_note(&conn, owner_id, id)
    }

    /// List the owner's notes, newest first
    pub fn list_notes(&self, owner_id: &str, category: Option<NoteCategory>) -> Result<Vec<Note>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM notes
            WHERE owner_id = ?1 AND (?2 IS NULL OR category = ?2)
            ORDER BY updated_at DESC, id
            "#,
            NOTE_COLUMNS
        ))?;

        let mut notes = stmt
            .query_map(
                params![owner_id, category.map(|c| c.as_str())],
                note_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for note in &mut notes {
            note.tags = load_entity_tags(&conn, EntityKind::Note, &note.id)?;
        }

        Ok(notes)
    }

    /// Apply a partial update
    pub fn update_note(&self, owner_id: &str, id: &str, update: &NoteUpdate) -> Result<Note> {
        let conn = self.conn()?;
        let existing = fetch_note(&conn, owner_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Note {} not found", id)))?;

        let title = match update.title {
            Some(ref t) if t.trim().is_empty() => {
                return Err(Error::InvalidData("Note title cannot be empty".to_string()))
            }
            Some(ref t) => t.trim().to_string(),
            None => existing.title,
        };
        let content = update.content.clone().unwrap_or(existing.content);
        let category = update.category.unwrap_or(existing.category);
        let priority = update.priority.unwrap_or(existing.priority);

        conn.execute(
            r#"
            UPDATE notes
            SET title = ?, content = ?, category = ?, priority = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                title,
                content,
                category.as_str(),
                priority.map(|p| p.as_str()),
                id
            ],
        )?;

        fetch_note(&conn, owner_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Note {} not found", id)))
    }

    /// Delete a note (its tag associations go with it, the tags stay)
    pub fn delete_note(&self, owner_id: &str, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM notes WHERE id = ? AND owner_id = ?",
            params![id, owner_id],
        )?;
        if removed == 0 {
            return Err(Error::NotFound(format!("Note {} not found", id)));
        }
        Ok(())
    }
}
