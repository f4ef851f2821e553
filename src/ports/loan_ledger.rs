use crate::domain::{
    loan::{ActiveLoan, Loan},
    value_objects::{LoanId, PatronId, TitleId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;

/// 貸出台帳ポート（読み取り側）
///
/// 貸出記録は追記専用の履歴で、削除されない。
/// コミット済みの記録だけを返す。
#[async_trait]
pub trait LoanLedger: Send + Sync {
    /// IDで貸出を取得する
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 利用者の貸出中の貸出を取得する（貸出日時の新しい順）
    async fn find_active_by_patron(&self, patron_id: PatronId) -> Result<Vec<ActiveLoan>>;

    /// 利用者の全貸出を取得する（貸出履歴、貸出日時の新しい順）
    async fn find_by_patron(&self, patron_id: PatronId) -> Result<Vec<Loan>>;

    /// 書名ごとの貸出中の貸出を取得する（貸出日時の古い順）
    async fn find_active_by_title(&self, title_id: TitleId) -> Result<Vec<ActiveLoan>>;

    /// 返却期限が`cutoff`より前の貸出中の貸出を検索する（返却期限の古い順）
    ///
    /// 延滞一覧の表示に使用される。
    async fn find_due_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<ActiveLoan>>;
}
