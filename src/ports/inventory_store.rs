use crate::domain::{
    loan::Loan,
    title::Title,
    value_objects::{LoanId, TitleId},
};
use async_trait::async_trait;

use super::Result;

/// 在庫ストアポート（書き込み側）
///
/// TitleとLoanをまたぐ更新を1つのトランザクションにまとめる。
/// 貸出可能数の読み取り・判断・更新は、必ずこのトランザクションの中で行う。
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// トランザクションを開始する
    async fn begin(&self) -> Result<Box<dyn InventoryTransaction>>;
}

/// 在庫トランザクション
///
/// - `lock_*`で取得した行ロックはコミットまたは破棄まで保持される
/// - 書き込みは`commit`まで他から見えない
/// - `commit`せずにdropした場合はロールバックされる
///
/// 1つのトランザクションでロックするのはTitle 1件とLoan 1件まで。
/// Loanを先にロックし、Titleを後にロックする。
#[async_trait]
pub trait InventoryTransaction: Send {
    /// 書名を排他ロックして読み込む
    async fn lock_title(&mut self, title_id: TitleId) -> Result<Option<Title>>;

    /// 貸出を排他ロックして読み込む
    async fn lock_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 新しい書名を追加する
    async fn insert_title(&mut self, title: &Title) -> Result<()>;

    /// ロック済みの書名を更新する
    async fn update_title(&mut self, title: &Title) -> Result<()>;

    /// ロック済みの書名を削除する
    async fn delete_title(&mut self, title_id: TitleId) -> Result<()>;

    /// 新しい貸出を追加する
    async fn insert_loan(&mut self, loan: &Loan) -> Result<()>;

    /// ロック済みの貸出を更新する
    async fn update_loan(&mut self, loan: &Loan) -> Result<()>;

    /// すべての書き込みを反映する
    async fn commit(self: Box<Self>) -> Result<()>;
}
