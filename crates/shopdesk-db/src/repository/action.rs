//! SurrealDB implementation of [`ActionRepository`].

use shopdesk_core::error::ShopdeskResult;
use shopdesk_core::models::action::{Action, CreateAction};
use shopdesk_core::repository::ActionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ActionRowWithId {
    record_id: String,
    name: String,
    description: String,
}

/// SurrealDB implementation of the Action repository.
#[derive(Clone)]
pub struct SurrealActionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealActionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ActionRepository for SurrealActionRepository<C> {
    async fn create(&self, input: CreateAction) -> ShopdeskResult<Action> {
        let id = Uuid::new_v4();

        self.db
            .query("CREATE type::record('action', $id) SET name = $name, description = $description")
            .bind(("id", id.to_string()))
            .bind(("name", input.name.clone()))
            .bind(("description", input.description.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(Action {
            id,
            name: input.name,
            description: input.description,
        })
    }

    async fn get_by_name(&self, name: &str) -> ShopdeskResult<Action> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM action WHERE name = $name")
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "action".into(),
            id: format!("name={name}"),
        })?;

        Ok(Action {
            id: parse_uuid(&row.record_id, "action")?,
            name: row.name,
            description: row.description,
        })
    }

    async fn list(&self) -> ShopdeskResult<Vec<Action>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM action ORDER BY created_at ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActionRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                Ok(Action {
                    id: parse_uuid(&row.record_id, "action")?,
                    name: row.name,
                    description: row.description,
                })
            })
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }
}
