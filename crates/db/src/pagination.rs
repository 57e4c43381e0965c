//! Pagination engine.
//!
//! [`paginate`] validates a [`ListQuery`], asks a [`QueryableSet`] for one
//! window and wraps the answer in a [`ListResult`]. [`fetch_window`] is the
//! PostgreSQL implementation of the window read used by the table-backed
//! stores.

use catalog_core::pagination::{ListQuery, ListResult};
use sqlx::PgPool;

use crate::error::RepoError;
use crate::query::{bind_values, bind_values_scalar, build_order_by, build_where};
use crate::store::{Entity, QueryableSet, StoreError, Window, WindowPage};

/// Return one page of `source` under `query`.
///
/// Malformed windows are rejected before the store is touched. An offset past
/// the end of the filtered set yields an empty page with the correct total.
pub async fn paginate<E, S>(query: &ListQuery<E::Field>, source: &S) -> Result<ListResult<E>, RepoError>
where
    E: Entity,
    S: QueryableSet<E> + ?Sized,
{
    query.validate()?;

    let window = Window {
        filter: query.filter.as_ref(),
        order_by: &query.order_by,
        limit: query.page_size,
        offset: query.offset(),
    };

    let page = source.fetch_window(window).await.map_err(|source| {
        RepoError::store(
            "paginate",
            format!("{} page {}", E::TABLE, query.page),
            source,
        )
    })?;

    Ok(ListResult::new(page.items, page.total_count, query))
}

/// Count and window `E::TABLE` in one read-only snapshot.
///
/// Both statements run inside a `REPEATABLE READ` transaction so the total and
/// the items are computed against the same filtered view.
pub async fn fetch_window<E: Entity>(
    pool: &PgPool,
    window: Window<'_, E::Field>,
) -> Result<WindowPage<E>, StoreError> {
    let filter = build_where(window.filter);
    let order = build_order_by(window.order_by, E::KEY);

    let count_query = format!(
        "SELECT COUNT(*)::BIGINT FROM {} {}",
        E::TABLE,
        filter.clause
    );
    let select_query = format!(
        "SELECT {} FROM {} {} {order} LIMIT ${} OFFSET ${}",
        E::COLUMNS,
        E::TABLE,
        filter.clause,
        filter.next_idx,
        filter.next_idx + 1
    );
    tracing::debug!(table = E::TABLE, %select_query, binds = filter.binds.len(), "fetching window");

    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let total_count = bind_values_scalar(sqlx::query_scalar::<_, i64>(&count_query), &filter.binds)
        .fetch_one(&mut *tx)
        .await?;

    let items = if window.offset >= total_count {
        Vec::new()
    } else {
        bind_values(sqlx::query_as::<_, E>(&select_query), &filter.binds)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(&mut *tx)
            .await?
    };

    tx.commit().await?;

    Ok(WindowPage { total_count, items })
}
