use crate::domain::{
    loan::{ActiveLoan, Loan},
    value_objects::{LoanId, PatronId, TitleId},
};
use crate::ports::{LoanLedger as LoanLedgerTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::rows::{LOAN_COLUMNS, map_row_to_active_loan, map_row_to_loan, map_sqlx_error};

/// LoanLedgerのPostgreSQL実装
///
/// loansテーブルの読み取り専用ビュー。書き込みはInventoryStoreが行う。
pub struct LoanLedger {
    pool: PgPool,
}

impl LoanLedger {
    /// PostgreSQLコネクションプールから新しいLoanLedgerを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanLedgerTrait for LoanLedger {
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let sql = format!("SELECT {} FROM loans WHERE loan_id = $1", LOAN_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(loan_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    /// (patron_id, status)のインデックスを使用する
    async fn find_active_by_patron(&self, patron_id: PatronId) -> Result<Vec<ActiveLoan>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM loans
            WHERE patron_id = $1 AND status = 'active'
            ORDER BY loaned_at DESC
            "#,
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(patron_id.value())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_active_loan).collect()
    }

    async fn find_by_patron(&self, patron_id: PatronId) -> Result<Vec<Loan>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM loans
            WHERE patron_id = $1
            ORDER BY loaned_at DESC
            "#,
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(patron_id.value())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn find_active_by_title(&self, title_id: TitleId) -> Result<Vec<ActiveLoan>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM loans
            WHERE title_id = $1 AND status = 'active'
            ORDER BY loaned_at ASC
            "#,
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(title_id.value())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_active_loan).collect()
    }

    /// (due_at)の部分インデックス（status = 'active'）を使用する
    async fn find_due_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<ActiveLoan>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM loans
            WHERE status = 'active' AND due_at < $1
            ORDER BY due_at ASC
            "#,
            LOAN_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_active_loan).collect()
    }
}
