use crate::domain::loan::DEFAULT_LOAN_PERIOD_DAYS;
use crate::ports::{CatalogStore, InventoryStore, LoanLedger};
use chrono::Duration;
use std::sync::Arc;

use super::retry::RetryPolicy;

/// 貸出業務のポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LendingPolicy {
    /// 貸出期間
    pub loan_period: Duration,
    /// 競合時の再試行
    pub retry: RetryPolicy,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            loan_period: Duration::days(DEFAULT_LOAN_PERIOD_DAYS),
            retry: RetryPolicy::default(),
        }
    }
}

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、各ユースケース関数に明示的に渡す。
/// ストアは起動時に一度だけ開き、ここに注入する。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub inventory_store: Arc<dyn InventoryStore>,
    pub catalog_store: Arc<dyn CatalogStore>,
    pub loan_ledger: Arc<dyn LoanLedger>,
    pub policy: LendingPolicy,
}

impl ServiceDependencies {
    /// 3つのポートをすべて実装する単一のストアから構築する
    pub fn from_store<S>(store: Arc<S>, policy: LendingPolicy) -> Self
    where
        S: InventoryStore + CatalogStore + LoanLedger + 'static,
    {
        Self {
            inventory_store: store.clone(),
            catalog_store: store.clone(),
            loan_ledger: store,
            policy,
        }
    }
}
