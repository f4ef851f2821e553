use crate::domain::{title::Title, value_objects::TitleId};
use crate::ports::{CatalogStore as CatalogStoreTrait, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::rows::{TITLE_COLUMNS, map_row_to_title, map_sqlx_error};

/// CatalogStoreのPostgreSQL実装
///
/// READ COMMITTEDで読むため、更新途中の貸出可能数が見えることはない。
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    /// PostgreSQLコネクションプールから新しいCatalogStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn get_title(&self, title_id: TitleId) -> Result<Option<Title>> {
        let sql = format!("SELECT {} FROM titles WHERE title_id = $1", TITLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(title_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_title).transpose()
    }

    async fn list_titles(&self) -> Result<Vec<Title>> {
        let sql = format!(
            "SELECT {} FROM titles ORDER BY name, title_id",
            TITLE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_title).collect()
    }
}
