use thiserror::Error;

/// 永続化層のエラー
///
/// アプリケーション層はこの分類だけを見て、再試行するかどうかを判断する。
#[derive(Debug, Error)]
pub enum StoreError {
    /// 並行更新との競合（ロック待ちのタイムアウト、直列化失敗、デッドロック検出）
    ///
    /// トランザクションは何も反映せずに破棄されている。再試行してよい。
    #[error("Concurrent update conflict")]
    Conflict,

    /// ストレージに到達できない
    #[error("Storage unavailable")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// 保存されている記録がTitle/Loanの形を満たさない
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// その他のストレージエラー
    #[error("Storage backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// ポート層の Result型
pub type Result<T> = std::result::Result<T, StoreError>;
