//! SurrealDB implementation of [`ResourceRepository`].

use shopdesk_core::error::ShopdeskResult;
use shopdesk_core::models::resource::{CreateResource, Resource};
use shopdesk_core::repository::ResourceRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ResourceRowWithId {
    record_id: String,
    name: String,
    description: String,
    category: Option<String>,
}

impl ResourceRowWithId {
    fn try_into_resource(self) -> Result<Resource, DbError> {
        Ok(Resource {
            id: parse_uuid(&self.record_id, "resource")?,
            name: self.name,
            description: self.description,
            category: self.category,
        })
    }
}

/// SurrealDB implementation of the Resource repository.
#[derive(Clone)]
pub struct SurrealResourceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealResourceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ResourceRepository for SurrealResourceRepository<C> {
    async fn create(&self, input: CreateResource) -> ShopdeskResult<Resource> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('resource', $id) SET \
                 name = $name, description = $description, \
                 category = $category",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name.clone()))
            .bind(("description", input.description.clone()))
            .bind(("category", input.category.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(Resource {
            id,
            name: input.name,
            description: input.description,
            category: input.category,
        })
    }

    async fn get_by_name(&self, name: &str) -> ShopdeskResult<Resource> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM resource WHERE name = $name")
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: format!("name={name}"),
        })?;

        Ok(row.try_into_resource()?)
    }

    async fn list(&self) -> ShopdeskResult<Vec<Resource>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM resource ORDER BY name ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| row.try_into_resource())
            .collect::<Result<Vec<_>, DbError>>()
            .map_err(Into::into)
    }
}
