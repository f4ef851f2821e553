use crate::domain::{title::Title, value_objects::TitleId};
use async_trait::async_trait;

use super::Result;

/// 蔵書目録ポート（読み取り側）
///
/// コミット済みのTitleだけを返す。更新は`InventoryStore`のトランザクション経由で行う。
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// IDで書名を取得する
    async fn get_title(&self, title_id: TitleId) -> Result<Option<Title>>;

    /// すべての書名を書名順に取得する
    async fn list_titles(&self) -> Result<Vec<Title>>;
}
