use std::fmt;

/// 在庫数の操作エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockError {
    /// 貸出可能な冊数がない
    Exhausted,
    /// 貸出可能数が所蔵数を超えている（不正なデータ）
    AvailableExceedsTotal { total: u32, available: u32 },
}

impl fmt::Display for StockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockError::Exhausted => write!(f, "no copies available"),
            StockError::AvailableExceedsTotal { total, available } => write!(
                f,
                "available copies ({}) exceed total copies ({})",
                available, total
            ),
        }
    }
}

/// 所蔵数の変更エラー：新しい所蔵数が貸出中の冊数を下回る
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BelowOutstanding {
    pub on_loan: u32,
}

/// 貸出のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutError {
    /// 在庫切れ
    OutOfStock,
    /// 返却期限が日時の範囲を超える
    DueDateOutOfRange,
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInError {
    /// 既に返却済み
    AlreadyReturned,
}

/// 書名の入力エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleValidationError {
    /// 書名が空
    EmptyName,
    /// 著者名が空
    EmptyAuthor,
    /// 所蔵数が貸出中の冊数を下回る
    BelowOutstanding { on_loan: u32 },
    /// 所蔵数が保存できる上限を超える
    TooManyCopies { max: u32 },
}

impl fmt::Display for TitleValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleValidationError::EmptyName => write!(f, "name must not be empty"),
            TitleValidationError::EmptyAuthor => write!(f, "author must not be empty"),
            TitleValidationError::BelowOutstanding { on_loan } => {
                write!(f, "total copies cannot drop below {} on loan", on_loan)
            }
            TitleValidationError::TooManyCopies { max } => {
                write!(f, "total copies cannot exceed {}", max)
            }
        }
    }
}
