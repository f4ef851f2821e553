use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CheckOutError, Stock, TitleId, TitleValidationError};

/// 1書名あたりの所蔵数の上限（INTEGER列に収まる範囲）
pub const MAX_COPIES: u32 = i32::MAX as u32;

/// Title - 蔵書目録の1作品
///
/// 所蔵数と貸出可能数は`Stock`で保持し、範囲外の値は作れない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub title_id: TitleId,
    pub name: String,
    pub author: String,
    pub isbn: Option<String>,
    pub stock: Stock,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn required(value: &str, err: TitleValidationError) -> Result<String, TitleValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed.to_string())
}

fn copies(total: u32) -> Result<u32, TitleValidationError> {
    if total > MAX_COPIES {
        return Err(TitleValidationError::TooManyCopies { max: MAX_COPIES });
    }
    Ok(total)
}

fn optional_isbn(isbn: Option<&str>) -> Option<String> {
    isbn.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// 純粋関数：書名を登録する
///
/// ビジネスルール：
/// - 書名・著者名は空白のみ不可
/// - 登録時点では全冊が貸出可能
/// - 所蔵数0も許容する（常に在庫切れ扱い）
/// - 所蔵数は`MAX_COPIES`まで
pub fn register_title(
    name: &str,
    author: &str,
    isbn: Option<&str>,
    quantity: u32,
    registered_at: DateTime<Utc>,
) -> Result<Title, TitleValidationError> {
    Ok(Title {
        title_id: TitleId::new(),
        name: required(name, TitleValidationError::EmptyName)?,
        author: required(author, TitleValidationError::EmptyAuthor)?,
        isbn: optional_isbn(isbn),
        stock: Stock::full(copies(quantity)?),
        created_at: registered_at,
        updated_at: registered_at,
    })
}

/// 改訂内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleRevision<'a> {
    pub name: Option<&'a str>,
    pub author: Option<&'a str>,
    pub isbn: Option<&'a str>,
    pub total_copies: Option<u32>,
}

/// 純粋関数：書名を改訂する
///
/// 所蔵数の変更は貸出中の冊数を保ったまま貸出可能数へ反映する。
/// 貸出中の冊数を下回る所蔵数は受け付けない。
pub fn revise_title(
    title: &Title,
    revision: TitleRevision<'_>,
    revised_at: DateTime<Utc>,
) -> Result<Title, TitleValidationError> {
    let name = match revision.name {
        Some(name) => required(name, TitleValidationError::EmptyName)?,
        None => title.name.clone(),
    };
    let author = match revision.author {
        Some(author) => required(author, TitleValidationError::EmptyAuthor)?,
        None => title.author.clone(),
    };
    let isbn = match revision.isbn {
        Some(isbn) => optional_isbn(Some(isbn)),
        None => title.isbn.clone(),
    };
    let stock = match revision.total_copies {
        Some(total) => title
            .stock
            .resize(copies(total)?)
            .map_err(|e| TitleValidationError::BelowOutstanding { on_loan: e.on_loan })?,
        None => title.stock,
    };

    Ok(Title {
        name,
        author,
        isbn,
        stock,
        updated_at: revised_at,
        ..title.clone()
    })
}

/// 純粋関数：1冊を貸出に回す
///
/// 副作用なし。貸出可能数を1減らした新しいTitleを返す。
pub fn check_out_copy(title: &Title, at: DateTime<Utc>) -> Result<Title, CheckOutError> {
    let stock = title
        .stock
        .take_one()
        .map_err(|_| CheckOutError::OutOfStock)?;

    Ok(Title {
        stock,
        updated_at: at,
        ..title.clone()
    })
}

/// 純粋関数：1冊を貸出可能に戻す
///
/// 所蔵数で頭打ちになった場合は`true`を併せて返す。
pub fn check_in_copy(title: &Title, at: DateTime<Utc>) -> (Title, bool) {
    let (stock, clamped) = title.stock.put_back_one();
    (
        Title {
            stock,
            updated_at: at,
            ..title.clone()
        },
        clamped,
    )
}
