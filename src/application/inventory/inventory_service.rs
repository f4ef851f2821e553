use crate::application::{ServiceDependencies, retry::with_retry};
use crate::domain::{
    self, CheckOutError,
    commands::{CheckIn, CheckOut},
    loan::{ActiveLoan, Loan, ReturnedLoan},
};

use super::errors::{InventoryError, Result};

/// 書籍を1冊貸し出す
///
/// ビジネスルール：
/// - 書名が存在すること
/// - 貸出可能な冊数が1以上であること（0なら何も書き込まずに`OutOfStock`）
/// - 返却期限は貸出日時 + 貸出期間
///
/// # 一貫性保証
///
/// 書名の行ロックを取ってから在庫を読み、貸出可能数の減算と貸出記録の作成を
/// 同じトランザクションでコミットする。同じ書名への貸出・返却はこの区間で直列化され、
/// 貸出可能数が負になることも、1冊を2件の貸出が取り合うこともない。
///
/// 競合でトランザクションが破棄された場合は、ポリシーの回数まで最初からやり直す。
/// やり直しのたびに在庫を読み直すので、再試行は安全。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `cmd` - 貸出コマンド
///
/// # 戻り値
/// 作成された貸出
pub async fn check_out(deps: &ServiceDependencies, cmd: CheckOut) -> Result<ActiveLoan> {
    let result = with_retry(&deps.policy.retry, "check_out", || {
        attempt_check_out(deps, &cmd)
    })
    .await;

    match &result {
        Ok(loan) => tracing::info!(
            loan_id = %loan.loan_id,
            title_id = %loan.title_id,
            patron_id = %loan.patron_id,
            due_at = %loan.due_at,
            "copy checked out"
        ),
        Err(InventoryError::OutOfStock(title_id)) => tracing::info!(
            title_id = %title_id,
            patron_id = %cmd.patron_id,
            "check-out refused, no copies available"
        ),
        Err(_) => {}
    }

    result
}

async fn attempt_check_out(deps: &ServiceDependencies, cmd: &CheckOut) -> Result<ActiveLoan> {
    let mut tx = deps.inventory_store.begin().await?;

    // 1. 書名をロックして読み込む
    let title = tx
        .lock_title(cmd.title_id)
        .await?
        .ok_or(InventoryError::TitleNotFound(cmd.title_id))?;

    // 2. 1冊を引き当てる（在庫切れならtxをdropしてロールバック）
    let updated_title = domain::title::check_out_copy(&title, cmd.requested_at)
        .map_err(|e| check_out_failure(e, cmd))?;

    // 3. 貸出記録を作成
    let loan = domain::loan::check_out(
        cmd.title_id,
        cmd.patron_id,
        cmd.requested_at,
        deps.policy.loan_period,
    )
    .map_err(|e| check_out_failure(e, cmd))?;

    // 4. 書名と貸出を同じトランザクションで書き込む
    tx.update_title(&updated_title).await?;
    tx.insert_loan(&Loan::Active(loan.clone())).await?;
    tx.commit().await?;

    Ok(loan)
}

fn check_out_failure(err: CheckOutError, cmd: &CheckOut) -> InventoryError {
    match err {
        CheckOutError::OutOfStock => InventoryError::OutOfStock(cmd.title_id),
        CheckOutError::DueDateOutOfRange => InventoryError::DueDateOutOfRange {
            requested_at: cmd.requested_at,
        },
    }
}

/// 貸出を返却する
///
/// ビジネスルール：
/// - 貸出が存在すること
/// - 貸出中であること（返却済みなら何も書き込まずに`AlreadyReturned`）
/// - 延滞していても返却は受け付ける
/// - 在庫は貸出記録が指す書名に戻す
///
/// # 一貫性保証
///
/// 貸出の行ロック、続いて書名の行ロックを取り、返却済みへの遷移と貸出可能数の加算を
/// 同じトランザクションでコミットする。同じ貸出への同時返却は1件だけが成功し、
/// 残りは`AlreadyReturned`を受け取る。再送された返却も同様に安全。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `cmd` - 返却コマンド
///
/// # 戻り値
/// 返却済みになった貸出
pub async fn check_in(deps: &ServiceDependencies, cmd: CheckIn) -> Result<ReturnedLoan> {
    let result = with_retry(&deps.policy.retry, "check_in", || {
        attempt_check_in(deps, &cmd)
    })
    .await;

    match &result {
        Ok(loan) => tracing::info!(
            loan_id = %loan.loan_id,
            title_id = %loan.title_id,
            patron_id = %loan.patron_id,
            "copy checked in"
        ),
        Err(InventoryError::AlreadyReturned(loan_id)) => {
            tracing::info!(loan_id = %loan_id, "check-in ignored, loan already returned")
        }
        Err(_) => {}
    }

    result
}

async fn attempt_check_in(deps: &ServiceDependencies, cmd: &CheckIn) -> Result<ReturnedLoan> {
    let mut tx = deps.inventory_store.begin().await?;

    // 1. 貸出をロックして読み込む
    let loan = tx
        .lock_loan(cmd.loan_id)
        .await?
        .ok_or(InventoryError::LoanNotFound(cmd.loan_id))?;

    // 2. 返却済みへ遷移する
    let returned = domain::loan::check_in(loan, cmd.returned_at)
        .map_err(|_| InventoryError::AlreadyReturned(cmd.loan_id))?;

    // 3. 貸出記録が指す書名をロックして1冊戻す
    let title = tx
        .lock_title(returned.title_id)
        .await?
        .ok_or(InventoryError::TitleNotFound(returned.title_id))?;
    let (updated_title, clamped) = domain::title::check_in_copy(&title, cmd.returned_at);
    if clamped {
        tracing::warn!(
            loan_id = %returned.loan_id,
            title_id = %returned.title_id,
            total = title.stock.total(),
            "available copies already at total, check-in credit clamped"
        );
    }

    // 4. 書名と貸出を同じトランザクションで書き込む
    tx.update_title(&updated_title).await?;
    tx.update_loan(&Loan::Returned(returned.clone())).await?;
    tx.commit().await?;

    Ok(returned)
}
