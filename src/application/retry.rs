use std::future::Future;
use std::time::Duration;

/// 競合時の再試行ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 1操作あたりの最大試行回数（1以上）
    pub max_attempts: u32,
    /// 再試行ごとに線形に伸ばす待ち時間
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(10),
        }
    }
}

/// 再試行の対象となるエラー
pub(crate) trait Retryable {
    /// ストアが競合を検出してトランザクションを破棄したか
    fn is_conflict(&self) -> bool;

    /// 試行回数を使い切ったときのエラー
    fn exhausted(attempts: u32) -> Self;
}

/// 競合で失敗したトランザクションを丸ごとやり直す
///
/// 各試行は独立したトランザクションで、失敗した試行は何も反映していない。
/// 競合以外の結果（成功・業務エラー・障害）はそのまま返す。
pub(crate) async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, E>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut tries = 0;

    loop {
        tries += 1;
        match attempt().await {
            Err(err) if err.is_conflict() => {
                if tries >= max_attempts {
                    tracing::warn!(
                        operation,
                        attempts = tries,
                        "giving up after storage conflicts"
                    );
                    return Err(E::exhausted(tries));
                }
                tracing::debug!(operation, attempt = tries, "storage conflict, retrying");
                tokio::time::sleep(policy.backoff * tries).await;
            }
            result => return result,
        }
    }
}
