use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{CheckInError, CheckOutError, LoanId, PatronId, TitleId};

/// 貸出期間の既定値（日数）
pub const DEFAULT_LOAN_PERIOD_DAYS: i64 = 14;

/// 貸出期間の上限（日数）
pub const MAX_LOAN_PERIOD_DAYS: i64 = 3650;

// ============================================================================
// 型安全な状態パターン
// ============================================================================

/// Loanの共通フィールド
///
/// すべての貸出状態（Active, Returned）で共有されるコアデータ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCore {
    // 識別子
    pub loan_id: LoanId,

    // 他の記録への参照（IDのみ）
    pub title_id: TitleId,
    pub patron_id: PatronId,

    // 貸出管理の責務
    pub loaned_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

/// 貸出中状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLoan {
    #[serde(flatten)]
    pub core: LoanCore,
}

impl std::ops::Deref for ActiveLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 返却済み状態
///
/// ビジネスルール：
/// - returned_atが必須（型で保証）
/// - 終端状態。以降の遷移はない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedLoan {
    #[serde(flatten)]
    pub core: LoanCore,
    pub returned_at: DateTime<Utc>,
}

impl std::ops::Deref for ReturnedLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// Loanの統合型
///
/// 状態遷移は `Active -> Returned` のみ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Loan {
    Active(ActiveLoan),
    Returned(ReturnedLoan),
}

impl Loan {
    pub fn core(&self) -> &LoanCore {
        match self {
            Loan::Active(active) => &active.core,
            Loan::Returned(returned) => &returned.core,
        }
    }

    pub fn loan_id(&self) -> LoanId {
        self.core().loan_id
    }

    pub fn title_id(&self) -> TitleId {
        self.core().title_id
    }

    pub fn patron_id(&self) -> PatronId {
        self.core().patron_id
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Loan::Active(_) => None,
            Loan::Returned(returned) => Some(returned.returned_at),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Loan::Active(_))
    }
}

impl From<ActiveLoan> for Loan {
    fn from(loan: ActiveLoan) -> Self {
        Loan::Active(loan)
    }
}

impl From<ReturnedLoan> for Loan {
    fn from(loan: ReturnedLoan) -> Self {
        Loan::Returned(loan)
    }
}

/// 純粋関数：貸出記録を作成する
///
/// ビジネスルール：
/// - 返却期限は貸出日時 + 貸出期間
/// - 状態はActive
///
/// 在庫の引当は`title::check_out_copy`の責務で、ここでは行わない。
///
/// # エラー
/// 返却期限が表現できる日時の範囲を超える場合は`CheckOutError::DueDateOutOfRange`を返す
pub fn check_out(
    title_id: TitleId,
    patron_id: PatronId,
    loaned_at: DateTime<Utc>,
    loan_period: Duration,
) -> Result<ActiveLoan, CheckOutError> {
    let due_at = loaned_at
        .checked_add_signed(loan_period)
        .ok_or(CheckOutError::DueDateOutOfRange)?;

    Ok(ActiveLoan {
        core: LoanCore {
            loan_id: LoanId::new(),
            title_id,
            patron_id,
            loaned_at,
            due_at,
        },
    })
}

/// 純粋関数：貸出を返却済みにする
///
/// ビジネスルール：
/// - 返却済みの貸出は再返却できない
/// - 延滞していても返却は受け付ける
/// - returned_atは貸出日時より前にならない（時計の巻き戻りは貸出日時に揃える）
pub fn check_in(loan: Loan, returned_at: DateTime<Utc>) -> Result<ReturnedLoan, CheckInError> {
    match loan {
        Loan::Active(active) => {
            let returned_at = returned_at.max(active.loaned_at);
            Ok(ReturnedLoan {
                core: active.core,
                returned_at,
            })
        }
        Loan::Returned(_) => Err(CheckInError::AlreadyReturned),
    }
}

/// 純粋関数：延滞判定
///
/// 延滞は保存しない。貸出中かつ返却期限を過ぎていれば延滞とみなす。
pub fn is_overdue(loan: &Loan, now: DateTime<Utc>) -> bool {
    match loan {
        Loan::Active(active) => now > active.due_at,
        Loan::Returned(_) => false,
    }
}
