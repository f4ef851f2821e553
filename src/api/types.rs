use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    commands::{RegisterTitle, ReviseTitle},
    loan::{ActiveLoan, Loan, ReturnedLoan},
    title::Title,
    value_objects::TitleId,
};

/// 貸出リクエスト（POST /loans）
///
/// 利用者はヘッダーの認証情報から決まる。
#[derive(Debug, Deserialize)]
pub struct CheckOutRequest {
    pub title_id: Uuid,
}

/// 書名登録リクエスト（POST /titles）
#[derive(Debug, Deserialize)]
pub struct RegisterTitleRequest {
    pub name: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl RegisterTitleRequest {
    pub fn to_command(&self, registered_at: DateTime<Utc>) -> RegisterTitle {
        RegisterTitle {
            name: self.name.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
            quantity: self.quantity,
            registered_at,
        }
    }
}

/// 書名改訂リクエスト（PUT /titles/:id）
#[derive(Debug, Default, Deserialize)]
pub struct ReviseTitleRequest {
    pub name: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: Option<u32>,
}

impl ReviseTitleRequest {
    pub fn to_command(&self, title_id: TitleId, revised_at: DateTime<Utc>) -> ReviseTitle {
        ReviseTitle {
            title_id,
            name: self.name.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
            total_copies: self.total_copies,
            revised_at,
        }
    }
}

/// 貸出一覧取得のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ListLoansQuery {
    /// active（既定）または all
    pub status: Option<String>,
}

/// 書名レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct TitleResponse {
    pub title_id: Uuid,
    pub name: String,
    pub author: String,
    pub isbn: Option<String>,
    pub total_copies: u32,
    pub available_copies: u32,
    pub on_loan: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Title> for TitleResponse {
    fn from(title: Title) -> Self {
        Self {
            title_id: title.title_id.value(),
            name: title.name,
            author: title.author,
            isbn: title.isbn,
            total_copies: title.stock.total(),
            available_copies: title.stock.available(),
            on_loan: title.stock.on_loan(),
            created_at: title.created_at,
            updated_at: title.updated_at,
        }
    }
}

/// 貸出レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanResponse {
    pub loan_id: Uuid,
    pub title_id: Uuid,
    pub patron_id: Uuid,
    pub loaned_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub status: String,
    pub returned_at: Option<DateTime<Utc>>,
    /// 貸出中かつ返却期限超過
    pub overdue: bool,
    /// 一覧取得時のみ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_name: Option<String>,
}

impl LoanResponse {
    pub fn from_loan(loan: &Loan, now: DateTime<Utc>) -> Self {
        let core = loan.core();
        Self {
            loan_id: core.loan_id.value(),
            title_id: core.title_id.value(),
            patron_id: core.patron_id.value(),
            loaned_at: core.loaned_at,
            due_at: core.due_at,
            status: match loan {
                Loan::Active(_) => "active",
                Loan::Returned(_) => "returned",
            }
            .to_string(),
            returned_at: loan.returned_at(),
            overdue: crate::domain::loan::is_overdue(loan, now),
            title_name: None,
        }
    }

    pub fn with_title_name(self, title_name: Option<String>) -> Self {
        Self { title_name, ..self }
    }

    pub fn from_active(loan: ActiveLoan, now: DateTime<Utc>) -> Self {
        Self::from_loan(&Loan::Active(loan), now)
    }

    pub fn from_returned(loan: ReturnedLoan, now: DateTime<Utc>) -> Self {
        Self::from_loan(&Loan::Returned(loan), now)
    }
}

/// 返却レスポンス（POST /loans/:id/return）
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub success: bool,
    pub loan: LoanResponse,
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
