use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LoanId, PatronId, TitleId};

/// コマンド：1冊を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOut {
    pub title_id: TitleId,
    pub patron_id: PatronId,
    pub requested_at: DateTime<Utc>,
}

/// コマンド：貸出を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub loan_id: LoanId,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：書名を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterTitle {
    pub name: String,
    pub author: String,
    pub isbn: Option<String>,
    pub quantity: u32,
    pub registered_at: DateTime<Utc>,
}

/// コマンド：書名の情報・所蔵数を改訂する
///
/// `None`のフィールドは変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviseTitle {
    pub title_id: TitleId,
    pub name: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: Option<u32>,
    pub revised_at: DateTime<Utc>,
}
