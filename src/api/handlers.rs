use crate::application::{ServiceDependencies, catalog, inventory};
use crate::domain::{
    commands::{CheckIn, CheckOut},
    loan::Loan,
    value_objects::{LoanId, TitleId},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    claims::Claims,
    error::ApiError,
    types::{
        CheckInResponse, CheckOutRequest, ListLoansQuery, LoanResponse, RegisterTitleRequest,
        ReviseTitleRequest, TitleResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Catalog handlers
// ============================================================================

/// POST /titles - 書名を登録（管理者）
pub async fn register_title(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Json(req): Json<RegisterTitleRequest>,
) -> Result<(StatusCode, Json<TitleResponse>), ApiError> {
    claims.require_admin()?;

    let title = catalog::register_title(&state.service_deps, req.to_command(Utc::now())).await?;

    Ok((StatusCode::CREATED, Json(TitleResponse::from(title))))
}

/// GET /titles - 蔵書目録の一覧（書名順）
pub async fn list_titles(
    State(state): State<Arc<AppState>>,
    _claims: Claims,
) -> Result<Json<Vec<TitleResponse>>, ApiError> {
    let titles = inventory::list_titles(&state.service_deps).await?;

    Ok(Json(titles.into_iter().map(TitleResponse::from).collect()))
}

/// GET /titles/:id - 書名と在庫数を取得
pub async fn get_title(
    State(state): State<Arc<AppState>>,
    _claims: Claims,
    Path(title_id): Path<Uuid>,
) -> Result<Json<TitleResponse>, ApiError> {
    let title = inventory::get_title(&state.service_deps, TitleId::from_uuid(title_id)).await?;

    Ok(Json(TitleResponse::from(title)))
}

/// PUT /titles/:id - 書名を改訂（管理者）
///
/// 所蔵数を変更しても貸出中の冊数は保たれる。
pub async fn revise_title(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(title_id): Path<Uuid>,
    Json(req): Json<ReviseTitleRequest>,
) -> Result<Json<TitleResponse>, ApiError> {
    claims.require_admin()?;

    let cmd = req.to_command(TitleId::from_uuid(title_id), Utc::now());
    let title = catalog::revise_title(&state.service_deps, cmd).await?;

    Ok(Json(TitleResponse::from(title)))
}

/// DELETE /titles/:id - 書名を削除（管理者）
pub async fn remove_title(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(title_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    claims.require_admin()?;

    catalog::remove_title(&state.service_deps, TitleId::from_uuid(title_id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /titles/:id/loans - 書名の貸出中の貸出一覧（管理者）
pub async fn list_title_loans(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(title_id): Path<Uuid>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    claims.require_admin()?;

    let now = Utc::now();
    let loans =
        inventory::active_loans_for_title(&state.service_deps, TitleId::from_uuid(title_id))
            .await?;

    Ok(Json(
        loans
            .into_iter()
            .map(|loan| LoanResponse::from_active(loan, now))
            .collect(),
    ))
}

// ============================================================================
// Inventory handlers
// ============================================================================

/// POST /loans - 呼び出し元の利用者に1冊貸し出す
///
/// 在庫切れは409 OUT_OF_STOCK。失敗した場合、在庫も貸出記録も変化しない。
pub async fn check_out(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Json(req): Json<CheckOutRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let now = Utc::now();
    let cmd = CheckOut {
        title_id: TitleId::from_uuid(req.title_id),
        patron_id: claims.patron_id,
        requested_at: now,
    };

    let loan = inventory::check_out(&state.service_deps, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse::from_active(loan, now)),
    ))
}

/// POST /loans/:id/return - 貸出を返却
///
/// 本人または管理者のみ。2回目の返却は409 ALREADY_RETURNED。
pub async fn check_in(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<CheckInResponse>, ApiError> {
    let loan_id = LoanId::from_uuid(loan_id);

    let existing = inventory::get_loan(&state.service_deps, loan_id).await?;
    claims.require_self_or_admin(existing.patron_id())?;

    let now = Utc::now();
    let cmd = CheckIn {
        loan_id,
        returned_at: now,
    };
    let loan = inventory::check_in(&state.service_deps, cmd).await?;

    Ok(Json(CheckInResponse {
        success: true,
        loan: LoanResponse::from_returned(loan, now),
    }))
}

/// GET /loans/:id - 貸出を取得（本人または管理者）
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = inventory::get_loan(&state.service_deps, LoanId::from_uuid(loan_id)).await?;
    claims.require_self_or_admin(loan.patron_id())?;

    Ok(Json(LoanResponse::from_loan(&loan, Utc::now())))
}

/// GET /loans - 呼び出し元の貸出一覧
///
/// クエリパラメータ:
/// - status: active（既定）または all
pub async fn list_my_loans(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Query(query): Query<ListLoansQuery>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let loans: Vec<Loan> = match query.status.as_deref().unwrap_or("active") {
        "active" => inventory::active_loans_for_patron(&state.service_deps, claims.patron_id)
            .await?
            .into_iter()
            .map(Loan::from)
            .collect(),
        "all" => inventory::loan_history_for_patron(&state.service_deps, claims.patron_id).await?,
        other => {
            return Err(ApiError::BadRequest(format!(
                "Invalid status filter: {}",
                other
            )));
        }
    };

    let now = Utc::now();
    let described = inventory::describe_loans(&state.service_deps, loans).await?;

    Ok(Json(
        described
            .into_iter()
            .map(|(loan, title)| {
                LoanResponse::from_loan(&loan, now).with_title_name(title.map(|t| t.name))
            })
            .collect(),
    ))
}

/// GET /loans/overdue - 延滞中の貸出一覧（管理者）
pub async fn list_overdue_loans(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    claims.require_admin()?;

    let now = Utc::now();
    let overdue = inventory::find_overdue_loans(&state.service_deps, now).await?;

    Ok(Json(
        overdue
            .into_iter()
            .map(|loan| LoanResponse::from_active(loan, now))
            .collect(),
    ))
}
