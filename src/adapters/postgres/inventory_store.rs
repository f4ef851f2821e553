use crate::domain::{
    loan::Loan,
    title::Title,
    value_objects::{LoanId, TitleId},
};
use crate::ports::{
    InventoryStore as InventoryStoreTrait, InventoryTransaction, Result, StoreError,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;

use super::rows::{
    LOAN_COLUMNS, TITLE_COLUMNS, copies_to_i32, map_row_to_loan, map_row_to_title,
    map_sqlx_error, status_of,
};

/// PostgreSQL implementation of InventoryStore
///
/// Each transaction runs at READ COMMITTED and takes row locks with
/// `SELECT ... FOR UPDATE`, so the read-decide-write sequence on a title is
/// serialized against every other transaction touching the same title.
/// Lock waits are bounded by `lock_timeout`; a timeout surfaces as
/// `StoreError::Conflict`.
pub struct InventoryStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl InventoryStore {
    /// Create a new InventoryStore with a PostgreSQL connection pool
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl InventoryStoreTrait for InventoryStore {
    async fn begin(&self) -> Result<Box<dyn InventoryTransaction>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // SET LOCAL accepts no bind parameters; set_config(..., true) is the equivalent
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Box::new(PgInventoryTransaction { tx }))
    }
}

struct PgInventoryTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InventoryTransaction for PgInventoryTransaction {
    async fn lock_title(&mut self, title_id: TitleId) -> Result<Option<Title>> {
        let sql = format!(
            "SELECT {} FROM titles WHERE title_id = $1 FOR UPDATE",
            TITLE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(title_id.value())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_title).transpose()
    }

    async fn lock_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        let sql = format!(
            "SELECT {} FROM loans WHERE loan_id = $1 FOR UPDATE",
            LOAN_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(loan_id.value())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn insert_title(&mut self, title: &Title) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO titles (
                title_id,
                name,
                author,
                isbn,
                total_copies,
                available_copies,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(title.title_id.value())
        .bind(&title.name)
        .bind(&title.author)
        .bind(&title.isbn)
        .bind(copies_to_i32(title.stock.total())?)
        .bind(copies_to_i32(title.stock.available())?)
        .bind(title.created_at)
        .bind(title.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update_title(&mut self, title: &Title) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE titles
            SET
                name = $2,
                author = $3,
                isbn = $4,
                total_copies = $5,
                available_copies = $6,
                updated_at = $7
            WHERE title_id = $1
            "#,
        )
        .bind(title.title_id.value())
        .bind(&title.name)
        .bind(&title.author)
        .bind(&title.isbn)
        .bind(copies_to_i32(title.stock.total())?)
        .bind(copies_to_i32(title.stock.available())?)
        .bind(title.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::InvalidRecord(format!(
                "title {} vanished while locked",
                title.title_id
            )));
        }

        Ok(())
    }

    async fn delete_title(&mut self, title_id: TitleId) -> Result<()> {
        sqlx::query("DELETE FROM titles WHERE title_id = $1")
            .bind(title_id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn insert_loan(&mut self, loan: &Loan) -> Result<()> {
        let core = loan.core();
        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                title_id,
                patron_id,
                loaned_at,
                due_at,
                status,
                returned_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(core.loan_id.value())
        .bind(core.title_id.value())
        .bind(core.patron_id.value())
        .bind(core.loaned_at)
        .bind(core.due_at)
        .bind(status_of(loan))
        .bind(loan.returned_at())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET
                status = $2,
                returned_at = $3
            WHERE loan_id = $1
            "#,
        )
        .bind(loan.loan_id().value())
        .bind(status_of(loan))
        .bind(loan.returned_at())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::InvalidRecord(format!(
                "loan {} vanished while locked",
                loan.loan_id()
            )));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.commit().await.map_err(map_sqlx_error)
    }
}
