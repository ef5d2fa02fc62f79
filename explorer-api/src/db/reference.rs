//! Reference table operations
//!
//! One set of queries serves all eight vocabularies; the table and label
//! column come from [`ReferenceKind`], never from request input.

use explorer_common::db::{Label, ReferenceKind, ReferenceRow};
use explorer_common::{Error, Result};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};

fn bind_label<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    label: &'q Label,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match label {
        Label::Name(name) => query.bind(name.as_str()),
        Label::Number(number) => query.bind(*number),
    }
}

fn row_to_reference(kind: ReferenceKind, row: &SqliteRow) -> Result<ReferenceRow> {
    let id: i64 = row.try_get("id")?;
    let label = if kind.is_numeric() {
        Label::Number(row.try_get(kind.label_column())?)
    } else {
        Label::Name(row.try_get(kind.label_column())?)
    };

    Ok(ReferenceRow { id, label })
}

fn ensure_fits(kind: ReferenceKind, label: &Label) -> Result<()> {
    if label.fits(kind) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{} values are identified by '{}'",
            kind,
            kind.label_column()
        )))
    }
}

/// All rows of one vocabulary, ordered by id
pub async fn find_all(pool: &SqlitePool, kind: ReferenceKind) -> Result<Vec<ReferenceRow>> {
    let sql = format!(
        "SELECT id, {} FROM {} ORDER BY id",
        kind.label_column(),
        kind.table_name()
    );

    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(|row| row_to_reference(kind, row)).collect()
}

pub async fn find_by_id(
    pool: &SqlitePool,
    kind: ReferenceKind,
    id: i64,
) -> Result<Option<ReferenceRow>> {
    let sql = format!(
        "SELECT id, {} FROM {} WHERE id = ?",
        kind.label_column(),
        kind.table_name()
    );

    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.map(|row| row_to_reference(kind, &row)).transpose()
}

/// Exact match on the unique label column
pub async fn find_by_label(
    pool: &SqlitePool,
    kind: ReferenceKind,
    label: &Label,
) -> Result<Option<ReferenceRow>> {
    ensure_fits(kind, label)?;

    let sql = format!(
        "SELECT id, {col} FROM {table} WHERE {col} = ?",
        col = kind.label_column(),
        table = kind.table_name()
    );

    let row = bind_label(sqlx::query(&sql), label)
        .fetch_optional(pool)
        .await?;
    row.map(|row| row_to_reference(kind, &row)).transpose()
}

pub async fn create(pool: &SqlitePool, kind: ReferenceKind, label: &Label) -> Result<ReferenceRow> {
    let mut conn = pool.acquire().await?;
    let id = insert(&mut conn, kind, label).await?;

    Ok(ReferenceRow {
        id,
        label: label.clone(),
    })
}

/// Insert every label in one transaction; returns the number inserted.
///
/// Either all labels are inserted or none are.
pub async fn create_many(pool: &SqlitePool, kind: ReferenceKind, labels: &[Label]) -> Result<u64> {
    let mut tx = pool.begin().await?;

    for label in labels {
        insert(&mut tx, kind, label).await?;
    }

    tx.commit().await?;

    Ok(labels.len() as u64)
}

async fn insert(conn: &mut SqliteConnection, kind: ReferenceKind, label: &Label) -> Result<i64> {
    ensure_fits(kind, label)?;

    let sql = format!(
        "INSERT INTO {} ({}) VALUES (?)",
        kind.table_name(),
        kind.label_column()
    );

    let result = bind_label(sqlx::query(&sql), label).execute(conn).await?;
    Ok(result.last_insert_rowid())
}

/// Rename a row; `None` if the id does not exist
pub async fn update(
    pool: &SqlitePool,
    kind: ReferenceKind,
    id: i64,
    label: &Label,
) -> Result<Option<ReferenceRow>> {
    ensure_fits(kind, label)?;

    let sql = format!(
        "UPDATE {} SET {} = ? WHERE id = ?",
        kind.table_name(),
        kind.label_column()
    );

    let result = bind_label(sqlx::query(&sql), label)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    Ok(Some(ReferenceRow {
        id,
        label: label.clone(),
    }))
}

/// Delete a row; `false` if the id does not exist
pub async fn delete(pool: &SqlitePool, kind: ReferenceKind, id: i64) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?", kind.table_name());

    let result = sqlx::query(&sql).bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
