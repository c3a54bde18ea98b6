//! Tag reconciliation for tasks and notes
//!
//! A reconciliation request carries a mixed, ordered list of tag references:
//! IDs of tags the owner already has, and `{name, color?}` descriptors that
//! are matched by exact name or created on first use. The resolved set then
//! replaces the entity's associations.
//!
//! The whole call runs inside one `BEGIN IMMEDIATE` transaction, so two
//! concurrent reconciliations for the same owner serialize on the write lock
//! and a failure part-way leaves nothing behind.

use std::collections::HashMap;

use rusqlite::TransactionBehavior;
use tracing::{debug, info};

use crate::colors::TagColor;
use crate::db::tags::{
    clean_tag_name, entity_exists, fetch_tag, fetch_tag_by_name, insert_tag,
    replace_entity_tags, set_tag_color,
};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{EntityKind, Tag, TagInput};

/// One reconciliation call
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    /// Authenticated owner; `None` when the caller has no session
    pub owner_id: Option<String>,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    /// `None` when the request carried no tag list at all
    pub tags: Option<Vec<TagInput>>,
}

impl ReconcileRequest {
    pub fn new(owner_id: &str, entity_kind: EntityKind, entity_id: &str, tags: Vec<TagInput>) -> Self {
        Self {
            owner_id: Some(owner_id.to_string()),
            entity_kind,
            entity_id: entity_id.to_string(),
            tags: Some(tags),
        }
    }
}

/// Resolves tag inputs and rewrites an entity's tag set
pub struct TagReconciler<'a> {
    db: &'a Database,
}

impl<'a> TagReconciler<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Reconcile and return the resolved tags in first-seen order
    pub fn reconcile(&self, request: &ReconcileRequest) -> Result<Vec<Tag>> {
        let owner_id = request
            .owner_id
            .as_deref()
            .ok_or_else(|| Error::Unauthorized("Authentication required".to_string()))?;
        let inputs = request
            .tags
            .as_deref()
            .ok_or_else(|| Error::InvalidData("Tag list is required".to_string()))?;

        let mut conn = self.db.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(busy_as_conflict)?;

        if !entity_exists(&tx, request.entity_kind, owner_id, &request.entity_id)? {
            return Err(Error::NotFound(format!(
                "{} {} not found",
                request.entity_kind.as_str(),
                request.entity_id
            )));
        }

        let mut resolved: Vec<Tag> = Vec::with_capacity(inputs.len());
        let mut index_by_id: HashMap<String, usize> = HashMap::new();
        let mut created = 0usize;

        for input in inputs {
            let tag = match input {
                TagInput::Existing(id) => fetch_tag(&tx, owner_id, id)?
                    .ok_or_else(|| Error::NotFound(format!("Tag {} not found", id)))?,
                TagInput::New { name, color } => {
                    let name = clean_tag_name(name)?;
                    match fetch_tag_by_name(&tx, owner_id, name)? {
                        Some(mut existing) => {
                            if let Some(color) = color {
                                if *color != existing.color {
                                    set_tag_color(&tx, &existing.id, color)?;
                                    existing.color = color.clone();
                                }
                            }
                            existing
                        }
                        None => {
                            created += 1;
                            let default_color = TagColor::default();
                            insert_tag(
                                &tx,
                                owner_id,
                                name,
                                color.as_ref().unwrap_or(&default_color),
                                None,
                            )?
                        }
                    }
                }
            };

            // A repeated tag keeps its first position but picks up the latest color
            match index_by_id.get(&tag.id) {
                Some(&index) => resolved[index] = tag,
                None => {
                    index_by_id.insert(tag.id.clone(), resolved.len());
                    resolved.push(tag);
                }
            }
        }

        let tag_ids: Vec<String> = resolved.iter().map(|t| t.id.clone()).collect();
        replace_entity_tags(&tx, request.entity_kind, &request.entity_id, &tag_ids)?;

        tx.commit().map_err(busy_as_conflict)?;

        if created > 0 {
            info!(
                entity = %request.entity_id,
                created,
                "Created tags during reconciliation"
            );
        }
        debug!(
            entity_kind = request.entity_kind.as_str(),
            entity = %request.entity_id,
            tags = resolved.len(),
            "Reconciled tags"
        );

        Ok(resolved)
    }
}

/// A write lock that could not be taken in time is a retryable conflict
fn busy_as_conflict(err: rusqlite::Error) -> Error {
    if Error::is_busy(&err) {
        Error::Conflict("Tag store is busy, retry the request".to_string())
    } else {
        Error::Database(err)
    }
}
