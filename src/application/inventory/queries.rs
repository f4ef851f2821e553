use crate::application::ServiceDependencies;
use crate::domain::{
    self,
    loan::{ActiveLoan, Loan},
    title::Title,
    value_objects::{LoanId, PatronId, TitleId},
};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::collections::HashMap;

use super::errors::{InventoryError, Result};

// 読み取り専用の問い合わせ。コミット済みの状態だけを返す。

/// 書名と現在の在庫数を取得する
pub async fn get_title(deps: &ServiceDependencies, title_id: TitleId) -> Result<Title> {
    deps.catalog_store
        .get_title(title_id)
        .await?
        .ok_or(InventoryError::TitleNotFound(title_id))
}

/// 蔵書目録の全書名（書名順）
pub async fn list_titles(deps: &ServiceDependencies) -> Result<Vec<Title>> {
    Ok(deps.catalog_store.list_titles().await?)
}

/// 貸出を取得する
pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    deps.loan_ledger
        .get_by_id(loan_id)
        .await?
        .ok_or(InventoryError::LoanNotFound(loan_id))
}

/// 利用者の貸出中の貸出
pub async fn active_loans_for_patron(
    deps: &ServiceDependencies,
    patron_id: PatronId,
) -> Result<Vec<ActiveLoan>> {
    Ok(deps.loan_ledger.find_active_by_patron(patron_id).await?)
}

/// 利用者の貸出履歴（返却済みを含む）
pub async fn loan_history_for_patron(
    deps: &ServiceDependencies,
    patron_id: PatronId,
) -> Result<Vec<Loan>> {
    Ok(deps.loan_ledger.find_by_patron(patron_id).await?)
}

/// 書名ごとの貸出中の貸出
///
/// 書名が存在しない場合は`TitleNotFound`。
pub async fn active_loans_for_title(
    deps: &ServiceDependencies,
    title_id: TitleId,
) -> Result<Vec<ActiveLoan>> {
    get_title(deps, title_id).await?;
    Ok(deps.loan_ledger.find_active_by_title(title_id).await?)
}

/// 延滞中の貸出を検索する
///
/// 延滞は保存された状態ではなく、`now`時点で返却期限を過ぎた貸出中の貸出として導出する。
pub async fn find_overdue_loans(
    deps: &ServiceDependencies,
    now: DateTime<Utc>,
) -> Result<Vec<ActiveLoan>> {
    let candidates = deps.loan_ledger.find_due_before(now).await?;

    Ok(candidates
        .into_iter()
        .filter(|loan| domain::loan::is_overdue(&Loan::Active(loan.clone()), now))
        .collect())
}

/// 貸出に書名を添える
///
/// 書名は重複を除いて並行に取得する。削除済みの書名は`None`になる。
pub async fn describe_loans(
    deps: &ServiceDependencies,
    loans: Vec<Loan>,
) -> Result<Vec<(Loan, Option<Title>)>> {
    let mut title_ids: Vec<TitleId> = loans.iter().map(Loan::title_id).collect();
    title_ids.sort_by_key(|id| id.value());
    title_ids.dedup();

    let titles = try_join_all(
        title_ids
            .iter()
            .map(|title_id| deps.catalog_store.get_title(*title_id)),
    )
    .await?;

    let by_id: HashMap<TitleId, Title> = titles
        .into_iter()
        .flatten()
        .map(|title| (title.title_id, title))
        .collect();

    Ok(loans
        .into_iter()
        .map(|loan| {
            let title = by_id.get(&loan.title_id()).cloned();
            (loan, title)
        })
        .collect())
}
