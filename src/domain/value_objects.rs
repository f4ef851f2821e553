use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{BelowOutstanding, StockError};

/// 貸出ID - 貸出台帳の記録ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanId(Uuid);

impl LoanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for LoanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 書名ID - 蔵書目録のタイトル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TitleId(Uuid);

impl TitleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for TitleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 利用者ID - 認証済みの利用者への参照（中身は関知しない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatronId(Uuid);

impl PatronId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for PatronId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PatronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 在庫数（所蔵数と貸出可能数の組）
///
/// 不変条件：`0 <= available <= total`
/// 型システムでこの制約を強制し、範囲外の組を作成できないようにする。
/// `total - available` が貸出中の冊数になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStock", into = "RawStock")]
pub struct Stock {
    total: u32,
    available: u32,
}

#[derive(Serialize, Deserialize)]
struct RawStock {
    total: u32,
    available: u32,
}

impl Stock {
    /// 全冊貸出可能な状態で作成
    pub fn full(total: u32) -> Self {
        Self {
            total,
            available: total,
        }
    }

    /// 永続化された値から復元する
    ///
    /// # エラー
    /// `available > total` の場合は`StockError::AvailableExceedsTotal`を返す
    pub fn new(total: u32, available: u32) -> Result<Self, StockError> {
        if available > total {
            return Err(StockError::AvailableExceedsTotal { total, available });
        }
        Ok(Self { total, available })
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    /// 貸出中の冊数
    pub fn on_loan(&self) -> u32 {
        self.total - self.available
    }

    /// 1冊を貸出に回す
    ///
    /// # エラー
    /// 貸出可能な冊数が0の場合は`StockError::Exhausted`を返す
    pub fn take_one(self) -> Result<Self, StockError> {
        if self.available == 0 {
            return Err(StockError::Exhausted);
        }
        Ok(Self {
            available: self.available - 1,
            ..self
        })
    }

    /// 1冊を貸出可能に戻す
    ///
    /// 所蔵数を超える場合は所蔵数で頭打ちにする。戻り値の`bool`は頭打ちが起きたかどうか。
    pub fn put_back_one(self) -> (Self, bool) {
        if self.available >= self.total {
            return (self, true);
        }
        (
            Self {
                available: self.available + 1,
                ..self
            },
            false,
        )
    }

    /// 所蔵数を変更する
    ///
    /// 貸出中の冊数は維持したまま、貸出可能数を同じ差分だけ動かす。
    ///
    /// # エラー
    /// 新しい所蔵数が貸出中の冊数を下回る場合は`BelowOutstanding`を返す
    pub fn resize(self, total: u32) -> Result<Self, BelowOutstanding> {
        let on_loan = self.on_loan();
        if total < on_loan {
            return Err(BelowOutstanding { on_loan });
        }
        Ok(Self {
            total,
            available: total - on_loan,
        })
    }
}

impl TryFrom<RawStock> for Stock {
    type Error = StockError;

    fn try_from(raw: RawStock) -> Result<Self, Self::Error> {
        Stock::new(raw.total, raw.available)
    }
}

impl From<Stock> for RawStock {
    fn from(stock: Stock) -> Self {
        Self {
            total: stock.total,
            available: stock.available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // TDD: Stock のテスト
    #[test]
    fn test_stock_full() {
        let stock = Stock::full(3);
        assert_eq!(stock.total(), 3);
        assert_eq!(stock.available(), 3);
        assert_eq!(stock.on_loan(), 0);
    }

    #[test]
    fn test_stock_new_rejects_available_above_total() {
        let result = Stock::new(2, 3);
        assert_eq!(
            result.unwrap_err(),
            StockError::AvailableExceedsTotal {
                total: 2,
                available: 3
            }
        );
    }

    #[test]
    fn test_stock_take_one_until_exhausted() {
        let stock = Stock::full(2);
        let stock = stock.take_one().unwrap();
        assert_eq!(stock.available(), 1);
        let stock = stock.take_one().unwrap();
        assert_eq!(stock.available(), 0);
        assert_eq!(stock.on_loan(), 2);

        assert_eq!(stock.take_one().unwrap_err(), StockError::Exhausted);
    }

    #[test]
    fn test_stock_zero_copies_is_always_exhausted() {
        let stock = Stock::full(0);
        assert_eq!(stock.take_one().unwrap_err(), StockError::Exhausted);
    }

    #[test]
    fn test_stock_put_back_one() {
        let stock = Stock::new(2, 0).unwrap();
        let (stock, clamped) = stock.put_back_one();
        assert!(!clamped);
        assert_eq!(stock.available(), 1);
    }

    #[test]
    fn test_stock_put_back_one_clamps_at_total() {
        let stock = Stock::full(2);
        let (stock, clamped) = stock.put_back_one();
        assert!(clamped);
        assert_eq!(stock.available(), 2);
    }

    #[test]
    fn test_stock_resize_keeps_on_loan() {
        let stock = Stock::new(3, 1).unwrap();

        let grown = stock.resize(5).unwrap();
        assert_eq!(grown.available(), 3);
        assert_eq!(grown.on_loan(), 2);

        let shrunk = stock.resize(2).unwrap();
        assert_eq!(shrunk.available(), 0);
        assert_eq!(shrunk.on_loan(), 2);
    }

    #[test]
    fn test_stock_resize_below_on_loan_fails() {
        let stock = Stock::new(3, 1).unwrap();
        assert_eq!(
            stock.resize(1).unwrap_err(),
            BelowOutstanding { on_loan: 2 }
        );
    }

    #[test]
    fn test_stock_deserialize_validates() {
        let ok: Stock = serde_json::from_str(r#"{"total":2,"available":1}"#).unwrap();
        assert_eq!(ok.on_loan(), 1);

        let bad = serde_json::from_str::<Stock>(r#"{"total":1,"available":2}"#);
        assert!(bad.is_err());
    }

    // ID value objects のテスト
    #[test]
    fn test_loan_id_creation() {
        let id1 = LoanId::new();
        let id2 = LoanId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_title_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = TitleId::from_uuid(uuid);
        assert_eq!(id.value(), uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn test_patron_id_creation() {
        let id1 = PatronId::new();
        let id2 = PatronId::new();
        assert_ne!(id1, id2);
    }
}
