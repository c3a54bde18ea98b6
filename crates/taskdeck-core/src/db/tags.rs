//! Tag, tag hierarchy, and task/note association operations
//!
//! The free functions take a plain `&Connection` so they can run either on a
//! pooled connection or inside a caller-owned transaction (see
//! [`crate::tags::TagReconciler`]).

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{new_id, parse_datetime, Database};
use crate::colors::TagColor;
use crate::error::{Error, Result};
use crate::models::*;

/// Column list matching [`tag_from_row`]
const TAG_COLUMNS: &str = "id, name, color, parent_id, owner_id, created_at, updated_at";

/// Hierarchies deeper than this are treated as corrupt
const MAX_TAG_DEPTH: usize = 64;

fn tag_from_row(row: &Row) -> rusqlite::Result<Tag> {
    let color: Option<String> = row.get(2)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: TagColor::from_stored(color.as_deref()),
        parent_id: row.get(3)?,
        owner_id: row.get(4)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

/// Map an insert/update failure, turning a lost uniqueness race into `Conflict`
fn map_write_error(err: rusqlite::Error, name: &str) -> Error {
    if Error::is_unique_violation(&err) {
        Error::Conflict(format!("Tag '{}' already exists", name))
    } else {
        Error::Database(err)
    }
}

/// Validate and normalize a tag name
pub(crate) fn clean_tag_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidData("Tag name cannot be empty".to_string()));
    }
    Ok(name)
}

/// Fetch one of the owner's tags by ID
pub(crate) fn fetch_tag(conn: &Connection, owner_id: &str, tag_id: &str) -> Result<Option<Tag>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM tags WHERE id = ? AND owner_id = ?",
            TAG_COLUMNS
        ),
        params![tag_id, owner_id],
        tag_from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Fetch one of the owner's tags by exact (case-sensitive) name
pub(crate) fn fetch_tag_by_name(
    conn: &Connection,
    owner_id: &str,
    name: &str,
) -> Result<Option<Tag>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM tags WHERE owner_id = ? AND name = ?",
            TAG_COLUMNS
        ),
        params![owner_id, name],
        tag_from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Insert a new tag row and return it
pub(crate) fn insert_tag(
    conn: &Connection,
    owner_id: &str,
    name: &str,
    color: &TagColor,
    parent_id: Option<&str>,
) -> Result<Tag> {
    let id = new_id();
    conn.execute(
        "INSERT INTO tags (id, owner_id, name, color, parent_id) VALUES (?, ?, ?, ?, ?)",
        params![id, owner_id, name, color.to_stored(), parent_id],
    )
    .map_err(|e| map_write_error(e, name))?;

    fetch_tag(conn, owner_id, &id)?
        .ok_or_else(|| Error::NotFound(format!("Tag {} vanished after insert", id)))
}

/// Overwrite a tag's color
pub(crate) fn set_tag_color(conn: &Connection, tag_id: &str, color: &TagColor) -> Result<()> {
    conn.execute(
        "UPDATE tags SET color = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        params![color.to_stored(), tag_id],
    )?;
    Ok(())
}

/// Whether the owner has a task/note with this ID
pub(crate) fn entity_exists(
    conn: &Connection,
    kind: EntityKind,
    owner_id: &str,
    entity_id: &str,
) -> Result<bool> {
    let found = conn
        .query_row(
            &format!(
                "SELECT 1 FROM {} WHERE id = ? AND owner_id = ?",
                kind.table()
            ),
            params![entity_id, owner_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Replace the full association set of one task/note
pub(crate) fn replace_entity_tags(
    conn: &Connection,
    kind: EntityKind,
    entity_id: &str,
    tag_ids: &[String],
) -> Result<()> {
    let (table, column) = kind.tag_table();

    conn.execute(
        &format!("DELETE FROM {} WHERE {} = ?", table, column),
        params![entity_id],
    )?;

    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {} ({}, tag_id, position) VALUES (?, ?, ?)",
        table, column
    ))?;
    for (position, tag_id) in tag_ids.iter().enumerate() {
        stmt.execute(params![entity_id, tag_id, position as i64])?;
    }

    conn.execute(
        &format!(
            "UPDATE {} SET updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            kind.table()
        ),
        params![entity_id],
    )?;
    Ok(())
}

/// Load the tags attached to one task/note, in association order
pub(crate) fn load_entity_tags(
    conn: &Connection,
    kind: EntityKind,
    entity_id: &str,
) -> Result<Vec<Tag>> {
    let (table, column) = kind.tag_table();
    let sql = format!(
        r#"
        SELECT t.id, t.name, t.color, t.parent_id, t.owner_id, t.created_at, t.updated_at
        FROM tags t
        JOIN {table} et ON et.tag_id = t.id
        WHERE et.{column} = ?
        ORDER BY et.position
        "#
    );

    let mut stmt = conn.prepare(&sql)?;
    let tags = stmt
        .query_map(params![entity_id], tag_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Build the nested tree from a flat list
fn build_subtree(
    tags: &[Tag],
    parent_id: Option<&str>,
    parent_path: &str,
    depth: i32,
) -> Vec<TagWithPath> {
    tags.iter()
        .filter(|t| t.parent_id.as_deref() == parent_id)
        .map(|t| {
            let path = if parent_path.is_empty() {
                t.name.clone()
            } else {
                format!("{} / {}", parent_path, t.name)
            };
            let children = build_subtree(tags, Some(t.id.as_str()), &path, depth + 1);
            TagWithPath {
                tag: t.clone(),
                path,
                depth,
                children,
            }
        })
        .collect()
}

impl Database {
    /// Create a tag directly (outside reconciliation)
    pub fn create_tag(
        &self,
        owner_id: &str,
        name: &str,
        color: Option<&TagColor>,
        parent_id: Option<&str>,
    ) -> Result<Tag> {
        let name = clean_tag_name(name)?;
        let conn = self.conn()?;

        if let Some(pid) = parent_id {
            if fetch_tag(&conn, owner_id, pid)?.is_none() {
                return Err(Error::NotFound(format!("Parent tag {} does not exist", pid)));
            }
        }

        let default_color = TagColor::default();
        insert_tag(
            &conn,
            owner_id,
            name,
            color.unwrap_or(&default_color),
            parent_id,
        )
    }

    /// Get one of the owner's tags by ID
    pub fn get_tag(&self, owner_id: &str, id: &str) -> Result<Option<Tag>> {
        let conn = self.conn()?;
        fetch_tag(&conn, owner_id, id)
    }

    /// Get one of the owner's tags by exact name
    pub fn get_tag_by_name(&self, owner_id: &str, name: &str) -> Result<Option<Tag>> {
        let conn = self.conn()?;
        fetch_tag_by_name(&conn, owner_id, name)
    }

    /// List the owner's tags with task/note usage counts
    pub fn list_tags(&self, owner_id: &str) -> Result<Vec<TagWithUsage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.name, t.color, t.parent_id, t.owner_id, t.created_at, t.updated_at,
                   (SELECT COUNT(*) FROM task_tags tt WHERE tt.tag_id = t.id),
                   (SELECT COUNT(*) FROM note_tags nt WHERE nt.tag_id = t.id)
            FROM tags t
            WHERE t.owner_id = ?
            ORDER BY t.name
            "#,
        )?;

        let tags = stmt
            .query_map(params![owner_id], |row| {
                Ok(TagWithUsage {
                    tag: tag_from_row(row)?,
                    task_count: row.get(7)?,
                    note_count: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    /// Update a tag's name and/or color
    pub fn update_tag(&self, owner_id: &str, id: &str, update: &TagUpdate) -> Result<Tag> {
        let conn = self.conn()?;
        let existing = fetch_tag(&conn, owner_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Tag {} not found", id)))?;

        if let Some(ref name) = update.name {
            let name = clean_tag_name(name)?;
            if name != existing.name {
                conn.execute(
                    "UPDATE tags SET name = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                    params![name, id],
                )
                .map_err(|e| map_write_error(e, name))?;
            }
        }
        if let Some(ref color) = update.color {
            set_tag_color(&conn, id, color)?;
        }

        fetch_tag(&conn, owner_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Tag {} not found", id)))
    }

    /// Re-parent a tag (None makes it a root), rejecting cycles
    pub fn move_tag(&self, owner_id: &str, id: &str, new_parent_id: Option<&str>) -> Result<Tag> {
        let conn = self.conn()?;
        fetch_tag(&conn, owner_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Tag {} not found", id)))?;

        if let Some(pid) = new_parent_id {
            if pid == id {
                return Err(Error::InvalidData(
                    "A tag cannot be its own parent".to_string(),
                ));
            }

            // Walk up from the new parent; meeting `id` means a cycle
            let mut cursor = Some(pid.to_string());
            let mut steps = 0;
            while let Some(current) = cursor {
                if current == id {
                    return Err(Error::InvalidData(
                        "Cannot move a tag under its own descendant".to_string(),
                    ));
                }
                steps += 1;
                if steps > MAX_TAG_DEPTH {
                    return Err(Error::InvalidData("Tag hierarchy is too deep".to_string()));
                }
                let parent = fetch_tag(&conn, owner_id, &current)?.ok_or_else(|| {
                    Error::NotFound(format!("Parent tag {} does not exist", current))
                })?;
                cursor = parent.parent_id;
            }
        }

        conn.execute(
            "UPDATE tags SET parent_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![new_parent_id, id],
        )?;

        fetch_tag(&conn, owner_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Tag {} not found", id)))
    }

    /// Delete a tag
    ///
    /// Children move up to the deleted tag's parent; task/note associations
    /// are removed by cascade. Returns the number of re-parented children.
    pub fn delete_tag(&self, owner_id: &str, id: &str) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let tag = fetch_tag(&tx, owner_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Tag {} not found", id)))?;

        let children = tx.execute(
            "UPDATE tags SET parent_id = ?, updated_at = CURRENT_TIMESTAMP WHERE parent_id = ? AND owner_id = ?",
            params![tag.parent_id, id, owner_id],
        )?;
        tx.execute("DELETE FROM tags WHERE id = ?", params![id])?;

        tx.commit()?;
        Ok(children)
    }

    /// Get the owner's tag hierarchy
    pub fn get_tag_tree(&self, owner_id: &str) -> Result<Vec<TagWithPath>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tags WHERE owner_id = ? ORDER BY name",
            TAG_COLUMNS
        ))?;

        let all_tags: Vec<Tag> = stmt
            .query_map(params![owner_id], tag_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(build_subtree(&all_tags, None, "", 0))
    }

    /// Aggregate usage and hierarchy statistics for the owner's tags
    pub fn tag_analytics(&self, owner_id: &str) -> Result<TagAnalytics> {
        let tags = self.list_tags(owner_id)?;

        let total_tags = tags.len() as i64;
        let total_usage = tags.iter().map(TagWithUsage::total).sum();

        let mut top_tags: Vec<TagWithUsage> = tags.iter().filter(|t| t.total() > 0).cloned().collect();
        top_tags.sort_by(|a, b| {
            b.total()
                .cmp(&a.total())
                .then_with(|| a.tag.name.cmp(&b.tag.name))
        });
        top_tags.truncate(5);

        let mut recent: Vec<Tag> = tags.iter().map(|t| t.tag.clone()).collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(5);

        Ok(TagAnalytics {
            total_tags,
            total_usage,
            top_tags,
            hierarchy: hierarchy_stats(&tags),
            recent,
        })
    }

    /// Tags attached to one of the owner's tasks/notes
    pub fn get_entity_tags(
        &self,
        owner_id: &str,
        kind: EntityKind,
        entity_id: &str,
    ) -> Result<Vec<Tag>> {
        let conn = self.conn()?;
        if !entity_exists(&conn, kind, owner_id, entity_id)? {
            return Err(Error::NotFound(format!(
                "{} {} not found",
                kind.as_str(),
                entity_id
            )));
        }
        load_entity_tags(&conn, kind, entity_id)
    }
}

fn hierarchy_stats(tags: &[TagWithUsage]) -> HierarchyStats {
    if tags.is_empty() {
        return HierarchyStats::default();
    }

    let parent_of: HashMap<&str, Option<&str>> = tags
        .iter()
        .map(|t| (t.tag.id.as_str(), t.tag.parent_id.as_deref()))
        .collect();
    let parents: HashSet<&str> = tags
        .iter()
        .filter_map(|t| t.tag.parent_id.as_deref())
        .filter(|pid| parent_of.contains_key(pid))
        .collect();

    let depths: Vec<i32> = tags
        .iter()
        .map(|t| {
            let mut depth = 0;
            let mut cursor = t.tag.parent_id.as_deref();
            while let Some(pid) = cursor {
                if depth as usize >= MAX_TAG_DEPTH {
                    break;
                }
                depth += 1;
                cursor = parent_of.get(pid).copied().flatten();
            }
            depth
        })
        .collect();

    let total_parents = parents.len() as i64;
    HierarchyStats {
        max_depth: depths.iter().copied().max().unwrap_or(0),
        avg_depth: depths.iter().map(|d| *d as f64).sum::<f64>() / depths.len() as f64,
        total_parents,
        total_leaves: tags.len() as i64 - total_parents,
    }
}
