use crate::domain::{
    loan::{ActiveLoan, Loan},
    title::Title,
    value_objects::{LoanId, PatronId, TitleId},
};
use crate::ports::{
    CatalogStore, InventoryStore, InventoryTransaction, LoanLedger, Result, StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// ロック待ちの既定の上限
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// コミット済みの状態
#[derive(Default)]
struct State {
    titles: HashMap<TitleId, Title>,
    loans: HashMap<LoanId, Loan>,
}

/// ID単位の非同期ロック表
struct LockTable<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Copy> LockTable<K> {
    fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self, key: K) -> Result<Arc<AsyncMutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| poisoned())?;
        Ok(locks.entry(key).or_default().clone())
    }

    /// 誰も保持も待機もしていないエントリを取り除く
    ///
    /// 参照カウントは表のMutexの中でしか増えないため、1なら表だけが持っている。
    fn release<'a>(&self, keys: impl IntoIterator<Item = &'a K>)
    where
        K: 'a,
    {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        for key in keys {
            let idle = locks
                .get(key)
                .is_some_and(|lock| Arc::strong_count(lock) == 1);
            if idle {
                locks.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

struct Shared {
    state: Mutex<State>,
    title_locks: LockTable<TitleId>,
    loan_locks: LockTable<LoanId>,
    pending_conflicts: AtomicU32,
    lock_timeout: Duration,
}

impl Shared {
    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| poisoned())
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".into())
}

/// プロセス内で完結するストア実装
///
/// CatalogStore / LoanLedger / InventoryStore の3ポートを1つの状態で実装する。
/// 行ロックはID単位の`tokio::sync::Mutex`で表現し、書き込みはコミット時に
/// まとめて反映するため、読み取り側が途中状態を見ることはない。
///
/// PostgreSQLなしでサービスを起動する場合や、テストで使用する。
#[derive(Clone)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// ロック待ちの上限を指定して作成
    ///
    /// 上限を超えたロック待ちは`StoreError::Conflict`になる。
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                title_locks: LockTable::new(),
                loan_locks: LockTable::new(),
                pending_conflicts: AtomicU32::new(0),
                lock_timeout,
            }),
        }
    }

    /// 次の`count`回のコミットを競合として失敗させる（障害注入用）
    pub fn fail_next_commits(&self, count: u32) {
        self.shared.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// コミット済みの貸出の件数
    pub fn loan_count(&self) -> Result<usize> {
        Ok(self.shared.state()?.loans.len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn get_title(&self, title_id: TitleId) -> Result<Option<Title>> {
        Ok(self.shared.state()?.titles.get(&title_id).cloned())
    }

    async fn list_titles(&self) -> Result<Vec<Title>> {
        let mut titles: Vec<Title> = self.shared.state()?.titles.values().cloned().collect();
        titles.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.title_id.value().cmp(&b.title_id.value()))
        });
        Ok(titles)
    }
}

fn active_only(loan: &Loan) -> Option<ActiveLoan> {
    match loan {
        Loan::Active(active) => Some(active.clone()),
        Loan::Returned(_) => None,
    }
}

#[async_trait]
impl LoanLedger for InMemoryStore {
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.shared.state()?.loans.get(&loan_id).cloned())
    }

    async fn find_active_by_patron(&self, patron_id: PatronId) -> Result<Vec<ActiveLoan>> {
        let state = self.shared.state()?;
        let mut loans: Vec<ActiveLoan> = state
            .loans
            .values()
            .filter(|l| l.patron_id() == patron_id)
            .filter_map(active_only)
            .collect();
        loans.sort_by(|a, b| b.loaned_at.cmp(&a.loaned_at));
        Ok(loans)
    }

    async fn find_by_patron(&self, patron_id: PatronId) -> Result<Vec<Loan>> {
        let state = self.shared.state()?;
        let mut loans: Vec<Loan> = state
            .loans
            .values()
            .filter(|l| l.patron_id() == patron_id)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.core().loaned_at.cmp(&a.core().loaned_at));
        Ok(loans)
    }

    async fn find_active_by_title(&self, title_id: TitleId) -> Result<Vec<ActiveLoan>> {
        let state = self.shared.state()?;
        let mut loans: Vec<ActiveLoan> = state
            .loans
            .values()
            .filter(|l| l.title_id() == title_id)
            .filter_map(active_only)
            .collect();
        loans.sort_by(|a, b| a.loaned_at.cmp(&b.loaned_at));
        Ok(loans)
    }

    async fn find_due_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<ActiveLoan>> {
        let state = self.shared.state()?;
        let mut loans: Vec<ActiveLoan> = state
            .loans
            .values()
            .filter_map(active_only)
            .filter(|l| l.due_at < cutoff)
            .collect();
        loans.sort_by(|a, b| a.due_at.cmp(&b.due_at));
        Ok(loans)
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn InventoryTransaction>> {
        Ok(Box::new(MemoryTransaction {
            shared: self.shared.clone(),
            guards: Vec::new(),
            locked_titles: HashSet::new(),
            locked_loans: HashSet::new(),
            titles: HashMap::new(),
            loans: HashMap::new(),
        }))
    }
}

/// インメモリのトランザクション
///
/// `titles`の`None`は削除を表す。
struct MemoryTransaction {
    shared: Arc<Shared>,
    guards: Vec<OwnedMutexGuard<()>>,
    locked_titles: HashSet<TitleId>,
    locked_loans: HashSet<LoanId>,
    titles: HashMap<TitleId, Option<Title>>,
    loans: HashMap<LoanId, Loan>,
}

impl MemoryTransaction {
    async fn acquire(&mut self, lock: Arc<AsyncMutex<()>>) -> Result<()> {
        let guard = tokio::time::timeout(self.shared.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| StoreError::Conflict)?;
        self.guards.push(guard);
        Ok(())
    }
}

#[async_trait]
impl InventoryTransaction for MemoryTransaction {
    async fn lock_title(&mut self, title_id: TitleId) -> Result<Option<Title>> {
        if self.locked_titles.insert(title_id) {
            let lock = self.shared.title_locks.handle(title_id)?;
            if let Err(e) = self.acquire(lock).await {
                self.locked_titles.remove(&title_id);
                self.shared.title_locks.release([&title_id]);
                return Err(e);
            }
        }

        if let Some(staged) = self.titles.get(&title_id) {
            return Ok(staged.clone());
        }
        Ok(self.shared.state()?.titles.get(&title_id).cloned())
    }

    async fn lock_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        if self.locked_loans.insert(loan_id) {
            let lock = self.shared.loan_locks.handle(loan_id)?;
            if let Err(e) = self.acquire(lock).await {
                self.locked_loans.remove(&loan_id);
                self.shared.loan_locks.release([&loan_id]);
                return Err(e);
            }
        }

        if let Some(staged) = self.loans.get(&loan_id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.shared.state()?.loans.get(&loan_id).cloned())
    }

    async fn insert_title(&mut self, title: &Title) -> Result<()> {
        if self.shared.state()?.titles.contains_key(&title.title_id) {
            return Err(StoreError::InvalidRecord(format!(
                "title {} already exists",
                title.title_id
            )));
        }
        self.titles.insert(title.title_id, Some(title.clone()));
        Ok(())
    }

    async fn update_title(&mut self, title: &Title) -> Result<()> {
        self.titles.insert(title.title_id, Some(title.clone()));
        Ok(())
    }

    async fn delete_title(&mut self, title_id: TitleId) -> Result<()> {
        self.titles.insert(title_id, None);
        Ok(())
    }

    async fn insert_loan(&mut self, loan: &Loan) -> Result<()> {
        if self.shared.state()?.loans.contains_key(&loan.loan_id()) {
            return Err(StoreError::InvalidRecord(format!(
                "loan {} already exists",
                loan.loan_id()
            )));
        }
        self.loans.insert(loan.loan_id(), loan.clone());
        Ok(())
    }

    async fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        self.loans.insert(loan.loan_id(), loan.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let injected = self
            .shared
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Conflict);
        }

        let mut this = self;
        let titles = std::mem::take(&mut this.titles);
        let loans = std::mem::take(&mut this.loans);
        {
            let mut state = this.shared.state()?;
            for (title_id, title) in titles {
                match title {
                    Some(title) => {
                        state.titles.insert(title_id, title);
                    }
                    None => {
                        state.titles.remove(&title_id);
                    }
                }
            }
            for (loan_id, loan) in loans {
                state.loans.insert(loan_id, loan);
            }
        }
        // 行ロックは反映後、dropで解放する
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    /// コミット・ロールバックのどちらでも行ロックを解放し、ロック表を掃除する
    fn drop(&mut self) {
        self.guards.clear();
        self.shared.title_locks.release(&self.locked_titles);
        self.shared.loan_locks.release(&self.locked_loans);
    }
}
