use crate::application::{ServiceDependencies, retry::with_retry};
use crate::domain::{
    self, TitleValidationError,
    commands::{RegisterTitle, ReviseTitle},
    title::{Title, TitleRevision},
    value_objects::TitleId,
};

use super::errors::{CatalogError, Result};

/// 書名を登録する
///
/// ビジネスルール：
/// - 書名・著者名が空でないこと
/// - 登録時点では全冊が貸出可能
pub async fn register_title(deps: &ServiceDependencies, cmd: RegisterTitle) -> Result<Title> {
    let title = domain::title::register_title(
        &cmd.name,
        &cmd.author,
        cmd.isbn.as_deref(),
        cmd.quantity,
        cmd.registered_at,
    )
    .map_err(CatalogError::InvalidTitle)?;

    with_retry(&deps.policy.retry, "register_title", || {
        insert_title(deps, &title)
    })
    .await?;

    tracing::info!(
        title_id = %title.title_id,
        total = title.stock.total(),
        "title registered"
    );
    Ok(title)
}

async fn insert_title(deps: &ServiceDependencies, title: &Title) -> Result<()> {
    let mut tx = deps.inventory_store.begin().await?;
    tx.insert_title(title).await?;
    tx.commit().await?;
    Ok(())
}

/// 書名の情報・所蔵数を改訂する
///
/// ビジネスルール：
/// - 所蔵数を変えても貸出中の冊数は変わらない（貸出可能数を同じだけ動かす）
/// - 所蔵数は貸出中の冊数を下回れない
///
/// 書名の行ロックの中で行うため、同時に進む貸出・返却と食い違うことはない。
pub async fn revise_title(deps: &ServiceDependencies, cmd: ReviseTitle) -> Result<Title> {
    let title = with_retry(&deps.policy.retry, "revise_title", || {
        attempt_revise_title(deps, &cmd)
    })
    .await?;

    tracing::info!(
        title_id = %title.title_id,
        total = title.stock.total(),
        available = title.stock.available(),
        "title revised"
    );
    Ok(title)
}

async fn attempt_revise_title(deps: &ServiceDependencies, cmd: &ReviseTitle) -> Result<Title> {
    let mut tx = deps.inventory_store.begin().await?;

    let title = tx
        .lock_title(cmd.title_id)
        .await?
        .ok_or(CatalogError::TitleNotFound(cmd.title_id))?;

    let revision = TitleRevision {
        name: cmd.name.as_deref(),
        author: cmd.author.as_deref(),
        isbn: cmd.isbn.as_deref(),
        total_copies: cmd.total_copies,
    };
    let revised =
        domain::title::revise_title(&title, revision, cmd.revised_at).map_err(|e| match e {
            TitleValidationError::BelowOutstanding { on_loan } => CatalogError::BelowOutstanding {
                title_id: cmd.title_id,
                on_loan,
            },
            other => CatalogError::InvalidTitle(other),
        })?;

    tx.update_title(&revised).await?;
    tx.commit().await?;

    Ok(revised)
}

/// 書名を削除する
///
/// ビジネスルール：
/// - 貸出中の冊がある書名は削除できない
/// - 返却済みの貸出記録は履歴として残る
pub async fn remove_title(deps: &ServiceDependencies, title_id: TitleId) -> Result<()> {
    with_retry(&deps.policy.retry, "remove_title", || {
        attempt_remove_title(deps, title_id)
    })
    .await?;

    tracing::info!(title_id = %title_id, "title removed");
    Ok(())
}

async fn attempt_remove_title(deps: &ServiceDependencies, title_id: TitleId) -> Result<()> {
    let mut tx = deps.inventory_store.begin().await?;

    let title = tx
        .lock_title(title_id)
        .await?
        .ok_or(CatalogError::TitleNotFound(title_id))?;

    let on_loan = title.stock.on_loan();
    if on_loan > 0 {
        return Err(CatalogError::HasActiveLoans { title_id, on_loan });
    }

    tx.delete_title(title_id).await?;
    tx.commit().await?;

    Ok(())
}
