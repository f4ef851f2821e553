use crate::application::retry::Retryable;
use crate::domain::{TitleValidationError, value_objects::TitleId};
use crate::ports::StoreError;
use thiserror::Error;

/// 蔵書目録管理のエラー
#[derive(Debug, Error)]
pub enum CatalogError {
    /// 入力が書名の形を満たさない
    #[error("Invalid title: {0}")]
    InvalidTitle(TitleValidationError),

    /// 書名が存在しない
    #[error("Title {0} not found")]
    TitleNotFound(TitleId),

    /// 所蔵数を貸出中の冊数より少なくしようとした
    #[error("Title {title_id} has {on_loan} copies on loan")]
    BelowOutstanding { title_id: TitleId, on_loan: u32 },

    /// 貸出中の書名を削除しようとした
    #[error("Title {title_id} cannot be removed with {on_loan} copies on loan")]
    HasActiveLoans { title_id: TitleId, on_loan: u32 },

    /// 競合が続き、再試行を使い切った
    #[error("Gave up after {attempts} conflicting attempts")]
    TransientFailure { attempts: u32 },

    /// ストアのエラー
    #[error("Store error")]
    Store(#[from] StoreError),
}

impl Retryable for CatalogError {
    fn is_conflict(&self) -> bool {
        matches!(self, CatalogError::Store(StoreError::Conflict))
    }

    fn exhausted(attempts: u32) -> Self {
        CatalogError::TransientFailure { attempts }
    }
}

/// 蔵書目録管理の Result型
pub type Result<T> = std::result::Result<T, CatalogError>;
