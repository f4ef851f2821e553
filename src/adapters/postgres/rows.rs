use crate::domain::{
    Stock,
    loan::{ActiveLoan, Loan, LoanCore, ReturnedLoan},
    title::Title,
    value_objects::{LoanId, PatronId, TitleId},
};
use crate::ports::{Result, StoreError};
use chrono::{DateTime, Utc};
use sqlx::{Row, postgres::PgRow};

/// titlesテーブルの列（SELECT句で共有）
pub(super) const TITLE_COLUMNS: &str = r#"
    title_id,
    name,
    author,
    isbn,
    total_copies,
    available_copies,
    created_at,
    updated_at
"#;

/// loansテーブルの列（SELECT句で共有）
pub(super) const LOAN_COLUMNS: &str = r#"
    loan_id,
    title_id,
    patron_id,
    loaned_at,
    due_at,
    status,
    returned_at
"#;

/// Map a sqlx error onto the port's error taxonomy.
///
/// Serialization failures, detected deadlocks and lock timeouts are reported
/// as `Conflict` so that the application layer retries the transaction.
pub(super) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        // 40001: serialization_failure, 40P01: deadlock_detected, 55P03: lock_not_available
        if matches!(db_err.code().as_deref(), Some("40001" | "40P01" | "55P03")) {
            return StoreError::Conflict;
        }
    }

    let unavailable = matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    );
    if unavailable {
        StoreError::Unavailable(Box::new(err))
    } else {
        StoreError::Backend(Box::new(err))
    }
}

fn copies(row: &PgRow, column: &str) -> Result<u32> {
    let value: i32 = row.try_get(column).map_err(map_sqlx_error)?;
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("{} out of range: {}", column, value)))
}

/// PostgreSQLの行データをTitleに変換する
///
/// 所蔵数・貸出可能数の範囲はStockの生成で検証する。
pub(super) fn map_row_to_title(row: &PgRow) -> Result<Title> {
    let total = copies(row, "total_copies")?;
    let available = copies(row, "available_copies")?;
    let stock = Stock::new(total, available)
        .map_err(|e| StoreError::InvalidRecord(format!("title stock: {}", e)))?;

    Ok(Title {
        title_id: TitleId::from_uuid(row.try_get("title_id").map_err(map_sqlx_error)?),
        name: row.try_get("name").map_err(map_sqlx_error)?,
        author: row.try_get("author").map_err(map_sqlx_error)?,
        isbn: row.try_get("isbn").map_err(map_sqlx_error)?,
        stock,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
    })
}

/// PostgreSQLの行データをLoanに変換する
///
/// statusとreturned_atの組み合わせが不正な行はエラーにする。
pub(super) fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let core = LoanCore {
        loan_id: LoanId::from_uuid(row.try_get("loan_id").map_err(map_sqlx_error)?),
        title_id: TitleId::from_uuid(row.try_get("title_id").map_err(map_sqlx_error)?),
        patron_id: PatronId::from_uuid(row.try_get("patron_id").map_err(map_sqlx_error)?),
        loaned_at: row.try_get("loaned_at").map_err(map_sqlx_error)?,
        due_at: row.try_get("due_at").map_err(map_sqlx_error)?,
    };
    let status: &str = row.try_get("status").map_err(map_sqlx_error)?;
    let returned_at: Option<DateTime<Utc>> = row.try_get("returned_at").map_err(map_sqlx_error)?;

    match (status, returned_at) {
        ("active", None) => Ok(Loan::Active(ActiveLoan { core })),
        ("returned", Some(returned_at)) => Ok(Loan::Returned(ReturnedLoan { core, returned_at })),
        (status, returned_at) => Err(StoreError::InvalidRecord(format!(
            "loan {} has status {} with returned_at {:?}",
            core.loan_id, status, returned_at
        ))),
    }
}

/// 貸出中であることを期待して変換する
pub(super) fn map_row_to_active_loan(row: &PgRow) -> Result<ActiveLoan> {
    match map_row_to_loan(row)? {
        Loan::Active(active) => Ok(active),
        Loan::Returned(returned) => Err(StoreError::InvalidRecord(format!(
            "loan {} is not active",
            returned.loan_id
        ))),
    }
}

/// Loanのstatus列の値
pub(super) fn status_of(loan: &Loan) -> &'static str {
    match loan {
        Loan::Active(_) => "active",
        Loan::Returned(_) => "returned",
    }
}

/// 所蔵数をINTEGER列に変換する
pub(super) fn copies_to_i32(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("copy count out of range: {}", value)))
}
