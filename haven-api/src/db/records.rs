//! Generic record operations over [`Listable`] and [`Component`] kinds.

use std::time::Instant;

use deadpool_postgres::Object;
use serde_json::Value as JsonValue;
use tokio_postgres::types::ToSql;

use haven_core::{RecordId, SearchFilter};

use crate::component::{Component, Listable, SqlParam, UniqueKey};
use crate::constants::MSG_NO_DATA;
use crate::error::{ApiError, ApiResult};

use super::{observe, DbClient};

/// Row projection as JSON, with the ordered image URL list for kinds that
/// carry attachments.
fn row_json<C: Listable>() -> String {
    match C::ATTACHMENTS {
        Some(owner) => format!(
            "to_jsonb(t) || jsonb_build_object('images', COALESCE((\
             SELECT jsonb_agg(i.image_url ORDER BY i.id_image) FROM {} i \
             WHERE i.{} = t.{}), '[]'::jsonb))",
            owner.table(),
            owner.parent_column(),
            C::PK_FIELD
        ),
        None => "to_jsonb(t)".to_string(),
    }
}

fn placeholders(from: usize, count: usize) -> String {
    (from..from + count)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

impl DbClient {
    /// Generic create operation for any Component type.
    ///
    /// Fails with `EntityAlreadyExists` when a row already holds one of the
    /// component's unique keys; nothing is written in that case.
    pub async fn create<C: Component>(&self, req: &C::Create) -> ApiResult<C> {
        let start = Instant::now();
        let result = self.create_inner::<C>(req).await;
        observe("create", C::ENTITY_NAME, start, &result);
        result
    }

    async fn create_inner<C: Component>(&self, req: &C::Create) -> ApiResult<C> {
        let columns = C::create_columns(req)?;
        let conn = self.get_conn().await?;

        for key in C::create_unique_keys(req) {
            if key_taken::<C>(&conn, &key, None).await? {
                return Err(ApiError::entity_already_exists(C::ENTITY_NAME, key.label));
            }
        }

        let sql = format!(
            "WITH t AS (INSERT INTO {} ({}) VALUES ({}) RETURNING *) SELECT to_jsonb(t) FROM t",
            C::TABLE,
            columns.names().collect::<Vec<_>>().join(", "),
            placeholders(1, columns.len())
        );
        let params: Vec<&(dyn ToSql + Sync)> = columns.params().map(SqlParam::as_to_sql).collect();

        let row = conn.query_one(&sql, &params).await?;
        let json: JsonValue = row.try_get(0)?;
        C::from_json(json)
    }

    /// Generic get operation. Returns `None` when the row does not exist.
    pub async fn get<C: Listable>(&self, id: RecordId) -> ApiResult<Option<C>> {
        let start = Instant::now();
        let result = self.get_inner::<C>(id).await;
        observe("get", C::ENTITY_NAME, start, &result);
        result
    }

    async fn get_inner<C: Listable>(&self, id: RecordId) -> ApiResult<Option<C>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM {} t WHERE t.{} = $1",
            row_json::<C>(),
            C::TABLE,
            C::PK_FIELD
        );
        match conn.query_opt(&sql, &[&id]).await? {
            Some(row) => {
                let json: JsonValue = row.try_get(0)?;
                C::from_json(json).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Generic partial update. Only the columns present in the request are
    /// written; unique keys are checked against every other row.
    pub async fn update<C: Component>(&self, id: RecordId, req: &C::Update) -> ApiResult<C> {
        let start = Instant::now();
        let result = self.update_inner::<C>(id, req).await;
        observe("update", C::ENTITY_NAME, start, &result);
        result
    }

    async fn update_inner<C: Component>(&self, id: RecordId, req: &C::Update) -> ApiResult<C> {
        let columns = C::update_columns(req)?;
        let conn = self.get_conn().await?;

        let exists_sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)",
            C::TABLE,
            C::PK_FIELD
        );
        let exists: bool = conn.query_one(&exists_sql, &[&id]).await?.try_get(0)?;
        if !exists {
            return Err(ApiError::entity_not_found(C::ENTITY_NAME, id));
        }

        for key in C::update_unique_keys(req) {
            if key_taken::<C>(&conn, &key, Some(id)).await? {
                return Err(ApiError::entity_already_exists(C::ENTITY_NAME, key.label));
            }
        }

        if columns.is_empty() {
            drop(conn);
            return self
                .get_inner::<C>(id)
                .await?
                .ok_or_else(|| ApiError::entity_not_found(C::ENTITY_NAME, id));
        }

        let assignments = columns
            .names()
            .enumerate()
            .map(|(i, name)| format!("{} = ${}", name, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "WITH t AS (UPDATE {} SET {} WHERE {} = ${} RETURNING *) SELECT to_jsonb(t) FROM t",
            C::TABLE,
            assignments,
            C::PK_FIELD,
            columns.len() + 1
        );
        let mut params: Vec<&(dyn ToSql + Sync)> =
            columns.params().map(SqlParam::as_to_sql).collect();
        params.push(&id);

        match conn.query_opt(&sql, &params).await? {
            Some(row) => {
                let json: JsonValue = row.try_get(0)?;
                C::from_json(json)
            }
            None => Err(ApiError::entity_not_found(C::ENTITY_NAME, id)),
        }
    }

    /// Generic list operation.
    ///
    /// The filter is compiled against the table alias `t`. Results are
    /// ordered by the kind's ordering column. An empty result is reported
    /// as `EntityNotFound`.
    pub async fn list<C: Listable>(&self, filter: &SearchFilter) -> ApiResult<Vec<C>> {
        let start = Instant::now();
        let result = self.list_inner::<C>(filter).await;
        observe("list", C::ENTITY_NAME, start, &result);
        result
    }

    async fn list_inner<C: Listable>(&self, filter: &SearchFilter) -> ApiResult<Vec<C>> {
        let compiled = filter.compile(Some("t"), 1)?;
        let order = C::ORDER_FIELD
            .map(|field| format!(" ORDER BY t.{} ASC", field))
            .unwrap_or_default();
        let sql = format!(
            "SELECT {} FROM {} t{}{}",
            row_json::<C>(),
            C::TABLE,
            compiled.where_clause(),
            order
        );
        let values: Vec<SqlParam> = compiled.params.into_iter().map(SqlParam::from).collect();
        let params: Vec<&(dyn ToSql + Sync)> = values.iter().map(SqlParam::as_to_sql).collect();

        let conn = self.get_conn().await?;
        let rows = conn.query(&sql, &params).await?;
        if rows.is_empty() {
            return Err(ApiError::not_found(MSG_NO_DATA));
        }

        rows.iter()
            .map(|row| {
                let json: JsonValue = row.try_get(0)?;
                C::from_json(json)
            })
            .collect()
    }
}

/// Whether another row already holds `key`.
async fn key_taken<C: Listable>(
    conn: &Object,
    key: &UniqueKey,
    exclude: Option<RecordId>,
) -> ApiResult<bool> {
    let mut conditions = Vec::with_capacity(key.columns.len() + 1);
    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(key.columns.len() + 1);
    for (column, value) in &key.columns {
        params.push(value.as_to_sql());
        conditions.push(format!("{} = ${}", column, params.len()));
    }
    if let Some(id) = exclude.as_ref() {
        params.push(id);
        conditions.push(format!("{} <> ${}", C::PK_FIELD, params.len()));
    }

    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
        C::TABLE,
        conditions.join(" AND ")
    );
    let taken: bool = conn.query_one(&sql, &params).await?.try_get(0)?;
    Ok(taken)
}
