use crate::application::retry::Retryable;
use crate::domain::value_objects::{LoanId, TitleId};
use crate::ports::StoreError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// 在庫エンジンのエラー
///
/// どれも呼び出し側に返す値で、プロセスを止める条件ではない。
#[derive(Debug, Error)]
pub enum InventoryError {
    /// 書名が存在しない
    #[error("Title {0} not found")]
    TitleNotFound(TitleId),

    /// 貸出が存在しない
    #[error("Loan {0} not found")]
    LoanNotFound(LoanId),

    /// 貸出可能な冊数がない
    #[error("Title {0} is out of stock")]
    OutOfStock(TitleId),

    /// 既に返却済み
    #[error("Loan {0} is already returned")]
    AlreadyReturned(LoanId),

    /// 貸出期間を足した返却期限が日時の範囲を超える
    #[error("Due date out of range for a loan requested at {requested_at}")]
    DueDateOutOfRange { requested_at: DateTime<Utc> },

    /// 競合が続き、再試行を使い切った
    #[error("Gave up after {attempts} conflicting attempts")]
    TransientFailure { attempts: u32 },

    /// ストアのエラー
    #[error("Store error")]
    Store(#[from] StoreError),
}

impl Retryable for InventoryError {
    fn is_conflict(&self) -> bool {
        matches!(self, InventoryError::Store(StoreError::Conflict))
    }

    fn exhausted(attempts: u32) -> Self {
        InventoryError::TransientFailure { attempts }
    }
}

/// 在庫エンジンの Result型
pub type Result<T> = std::result::Result<T, InventoryError>;
