use chrono::{DateTime, Duration, Utc};
use lending_registry::application::{
    ServiceDependencies,
    catalog::{self, CatalogError},
    inventory::{self, InventoryError},
};
use lending_registry::domain::{
    TitleValidationError,
    commands::{CheckIn, CheckOut, RegisterTitle, ReviseTitle},
    loan::ActiveLoan,
    value_objects::{LoanId, PatronId, TitleId},
};

mod common;

use common::{in_memory_deps, register};

// ============================================================================
// ヘルパー関数
// ============================================================================

async fn check_out(
    deps: &ServiceDependencies,
    title_id: TitleId,
    patron_id: PatronId,
) -> Result<ActiveLoan, InventoryError> {
    inventory::check_out(
        deps,
        CheckOut {
            title_id,
            patron_id,
            requested_at: Utc::now(),
        },
    )
    .await
}

async fn check_in(
    deps: &ServiceDependencies,
    loan_id: LoanId,
) -> Result<lending_registry::domain::loan::ReturnedLoan, InventoryError> {
    inventory::check_in(
        deps,
        CheckIn {
            loan_id,
            returned_at: Utc::now(),
        },
    )
    .await
}

async fn available(deps: &ServiceDependencies, title_id: TitleId) -> u32 {
    inventory::get_title(deps, title_id)
        .await
        .unwrap()
        .stock
        .available()
}

/// 貸出可能数 + 貸出中の貸出数 = 所蔵数
async fn assert_conserved(deps: &ServiceDependencies, title_id: TitleId) {
    let title = inventory::get_title(deps, title_id).await.unwrap();
    let active = inventory::active_loans_for_title(deps, title_id)
        .await
        .unwrap();
    assert_eq!(
        title.stock.available() as usize + active.len(),
        title.stock.total() as usize
    );
}

// ============================================================================
// 基本シナリオ
// ============================================================================

#[tokio::test]
async fn test_two_copies_lifecycle() {
    let (store, deps) = in_memory_deps();
    let title = register(&deps, "Dune", 2).await;
    let p1 = PatronId::new();
    let p2 = PatronId::new();
    let p3 = PatronId::new();

    // 1冊目
    let l1 = check_out(&deps, title.title_id, p1).await.unwrap();
    assert_eq!(available(&deps, title.title_id).await, 1);

    // 2冊目
    check_out(&deps, title.title_id, p2).await.unwrap();
    assert_eq!(available(&deps, title.title_id).await, 0);

    // 在庫切れ
    let result = check_out(&deps, title.title_id, p3).await;
    assert!(matches!(result, Err(InventoryError::OutOfStock(id)) if id == title.title_id));
    assert_eq!(available(&deps, title.title_id).await, 0);
    assert_eq!(store.loan_count().unwrap(), 2);

    // 返却すると1冊戻る
    let returned = check_in(&deps, l1.loan_id).await.unwrap();
    assert_eq!(returned.loan_id, l1.loan_id);
    assert_eq!(available(&deps, title.title_id).await, 1);

    // 2回目の返却は何も変えない
    let result = check_in(&deps, l1.loan_id).await;
    assert!(matches!(result, Err(InventoryError::AlreadyReturned(id)) if id == l1.loan_id));
    assert_eq!(available(&deps, title.title_id).await, 1);

    assert_conserved(&deps, title.title_id).await;
}

#[tokio::test]
async fn test_check_out_sets_due_date_from_policy() {
    let (_store, deps) = in_memory_deps();
    let title = register(&deps, "Emma", 1).await;

    let loan = check_out(&deps, title.title_id, PatronId::new())
        .await
        .unwrap();

    assert_eq!(loan.due_at - loan.loaned_at, Duration::days(14));
    let stored = inventory::get_loan(&deps, loan.loan_id).await.unwrap();
    assert!(stored.is_active());
}

#[tokio::test]
async fn test_check_out_unknown_title() {
    let (store, deps) = in_memory_deps();

    let result = check_out(&deps, TitleId::new(), PatronId::new()).await;

    assert!(matches!(result, Err(InventoryError::TitleNotFound(_))));
    assert_eq!(store.loan_count().unwrap(), 0);
}

#[tokio::test]
async fn test_check_in_unknown_loan() {
    let (_store, deps) = in_memory_deps();

    let result = check_in(&deps, LoanId::new()).await;

    assert!(matches!(result, Err(InventoryError::LoanNotFound(_))));
}

#[tokio::test]
async fn test_zero_copy_title_is_always_out_of_stock() {
    let (store, deps) = in_memory_deps();
    let title = register(&deps, "Reference Only", 0).await;

    let result = check_out(&deps, title.title_id, PatronId::new()).await;

    assert!(matches!(result, Err(InventoryError::OutOfStock(_))));
    assert_eq!(store.loan_count().unwrap(), 0);
}

#[tokio::test]
async fn test_check_out_then_check_in_restores_stock() {
    let (_store, deps) = in_memory_deps();
    let title = register(&deps, "Ulysses", 3).await;

    let loan = check_out(&deps, title.title_id, PatronId::new())
        .await
        .unwrap();
    check_in(&deps, loan.loan_id).await.unwrap();

    let after = inventory::get_title(&deps, title.title_id).await.unwrap();
    assert_eq!(after.stock, title.stock);
    let stored = inventory::get_loan(&deps, loan.loan_id).await.unwrap();
    assert!(stored.returned_at().is_some());
}

#[tokio::test]
async fn test_mixed_sequence_keeps_stock_conserved() {
    let (_store, deps) = in_memory_deps();
    let title = register(&deps, "Middlemarch", 4).await;
    let mut open: Vec<LoanId> = Vec::new();

    for step in 0..20 {
        if step % 3 == 2 {
            if let Some(loan_id) = open.pop() {
                check_in(&deps, loan_id).await.unwrap();
            }
        } else {
            match check_out(&deps, title.title_id, PatronId::new()).await {
                Ok(loan) => open.push(loan.loan_id),
                Err(InventoryError::OutOfStock(_)) => assert!(open.len() == 4),
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_conserved(&deps, title.title_id).await;
    }
}

// ============================================================================
// 並行性
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_check_outs_never_oversell() {
    let (store, deps) = in_memory_deps();
    let title = register(&deps, "Neuromancer", 7).await;

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let deps = deps.clone();
            let title_id = title.title_id;
            tokio::spawn(async move { check_out(&deps, title_id, PatronId::new()).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(InventoryError::OutOfStock(_)) => out_of_stock += 1,
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert_eq!(succeeded, 7);
    assert_eq!(out_of_stock, 43);
    assert_eq!(available(&deps, title.title_id).await, 0);
    assert_eq!(store.loan_count().unwrap(), 7);
    assert_conserved(&deps, title.title_id).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_check_ins_credit_once() {
    let (_store, deps) = in_memory_deps();
    let title = register(&deps, "Solaris", 1).await;
    let loan = check_out(&deps, title.title_id, PatronId::new())
        .await
        .unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let deps = deps.clone();
            let loan_id = loan.loan_id;
            tokio::spawn(async move { check_in(&deps, loan_id).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(InventoryError::AlreadyReturned(_)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(available(&deps, title.title_id).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mixed_traffic_on_one_title() {
    let (_store, deps) = in_memory_deps();
    let title = register(&deps, "Kindred", 3).await;

    let mut initial = Vec::new();
    for _ in 0..3 {
        initial.push(
            check_out(&deps, title.title_id, PatronId::new())
                .await
                .unwrap(),
        );
    }

    let mut handles = Vec::new();
    for loan in initial {
        let deps = deps.clone();
        handles.push(tokio::spawn(async move {
            check_in(&deps, loan.loan_id).await.map(|_| ())
        }));
    }
    for _ in 0..6 {
        let deps = deps.clone();
        let title_id = title.title_id;
        handles.push(tokio::spawn(async move {
            check_out(&deps, title_id, PatronId::new()).await.map(|_| ())
        }));
    }

    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) | Err(InventoryError::OutOfStock(_)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    let after = inventory::get_title(&deps, title.title_id).await.unwrap();
    assert!(after.stock.available() <= after.stock.total());
    assert_conserved(&deps, title.title_id).await;
}

// ============================================================================
// 競合と再試行
// ============================================================================

#[tokio::test]
async fn test_conflict_is_retried_transparently() {
    let (store, deps) = in_memory_deps();
    let title = register(&deps, "Beloved", 1).await;

    store.fail_next_commits(2);
    let loan = check_out(&deps, title.title_id, PatronId::new())
        .await
        .unwrap();

    assert_eq!(loan.title_id, title.title_id);
    assert_eq!(available(&deps, title.title_id).await, 0);
    assert_eq!(store.loan_count().unwrap(), 1);
}

#[tokio::test]
async fn test_persistent_conflict_becomes_transient_failure() {
    let (store, deps) = in_memory_deps();
    let title = register(&deps, "Lolita", 1).await;

    store.fail_next_commits(3);
    let result = check_out(&deps, title.title_id, PatronId::new()).await;

    assert!(matches!(
        result,
        Err(InventoryError::TransientFailure { attempts: 3 })
    ));
    // 失敗した試行は何も反映していない
    assert_eq!(available(&deps, title.title_id).await, 1);
    assert_eq!(store.loan_count().unwrap(), 0);
}

#[tokio::test]
async fn test_check_in_conflict_leaves_loan_active() {
    let (store, deps) = in_memory_deps();
    let title = register(&deps, "Walden", 1).await;
    let loan = check_out(&deps, title.title_id, PatronId::new())
        .await
        .unwrap();

    store.fail_next_commits(3);
    let result = check_in(&deps, loan.loan_id).await;
    assert!(matches!(result, Err(InventoryError::TransientFailure { .. })));

    let stored = inventory::get_loan(&deps, loan.loan_id).await.unwrap();
    assert!(stored.is_active());
    assert_eq!(available(&deps, title.title_id).await, 0);

    // 後から再送すれば成功する
    check_in(&deps, loan.loan_id).await.unwrap();
    assert_eq!(available(&deps, title.title_id).await, 1);
}

// ============================================================================
// 蔵書目録との相互作用
// ============================================================================

#[tokio::test]
async fn test_resize_keeps_on_loan_count() {
    let (_store, deps) = in_memory_deps();
    let title = register(&deps, "Hamlet", 3).await;
    check_out(&deps, title.title_id, PatronId::new())
        .await
        .unwrap();
    check_out(&deps, title.title_id, PatronId::new())
        .await
        .unwrap();

    let revised = catalog::revise_title(
        &deps,
        ReviseTitle {
            title_id: title.title_id,
            name: None,
            author: None,
            isbn: None,
            total_copies: Some(5),
            revised_at: Utc::now(),
        },
    )
    .await
    .unwrap();
    assert_eq!(revised.stock.total(), 5);
    assert_eq!(revised.stock.available(), 3);

    let result = catalog::revise_title(
        &deps,
        ReviseTitle {
            title_id: title.title_id,
            name: None,
            author: None,
            isbn: None,
            total_copies: Some(1),
            revised_at: Utc::now(),
        },
    )
    .await;
    assert!(matches!(
        result,
        Err(CatalogError::BelowOutstanding { on_loan: 2, .. })
    ));
    assert_conserved(&deps, title.title_id).await;
}

#[tokio::test]
async fn test_register_title_with_too_many_copies_is_invalid() {
    let (_store, deps) = in_memory_deps();

    let result = catalog::register_title(
        &deps,
        RegisterTitle {
            name: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: None,
            quantity: 3_000_000_000,
            registered_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(CatalogError::InvalidTitle(
            TitleValidationError::TooManyCopies { .. }
        ))
    ));
    assert!(inventory::list_titles(&deps).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_title_with_active_loans_is_refused() {
    let (_store, deps) = in_memory_deps();
    let title = register(&deps, "Macbeth", 1).await;
    let loan = check_out(&deps, title.title_id, PatronId::new())
        .await
        .unwrap();

    let result = catalog::remove_title(&deps, title.title_id).await;
    assert!(matches!(
        result,
        Err(CatalogError::HasActiveLoans { on_loan: 1, .. })
    ));

    check_in(&deps, loan.loan_id).await.unwrap();
    catalog::remove_title(&deps, title.title_id).await.unwrap();

    let result = inventory::get_title(&deps, title.title_id).await;
    assert!(matches!(result, Err(InventoryError::TitleNotFound(_))));
    // 返却済みの貸出は履歴として残る
    let stored = inventory::get_loan(&deps, loan.loan_id).await.unwrap();
    assert!(!stored.is_active());
}

// ============================================================================
// 問い合わせ
// ============================================================================

#[tokio::test]
async fn test_list_titles_is_ordered_by_name() {
    let (_store, deps) = in_memory_deps();
    assert!(inventory::list_titles(&deps).await.unwrap().is_empty());

    let emma = register(&deps, "Emma", 1).await;
    register(&deps, "Persuasion", 2).await;
    register(&deps, "Mansfield Park", 3).await;
    check_out(&deps, emma.title_id, PatronId::new())
        .await
        .unwrap();

    let titles = inventory::list_titles(&deps).await.unwrap();

    let names: Vec<&str> = titles.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Emma", "Mansfield Park", "Persuasion"]);
    assert_eq!(titles[0].stock.available(), 0);
}

#[tokio::test]
async fn test_patron_loan_queries() {
    let (_store, deps) = in_memory_deps();
    let t1 = register(&deps, "Persuasion", 2).await;
    let t2 = register(&deps, "Sanditon", 2).await;
    let patron = PatronId::new();

    let l1 = check_out(&deps, t1.title_id, patron).await.unwrap();
    check_out(&deps, t2.title_id, patron).await.unwrap();
    check_out(&deps, t2.title_id, PatronId::new())
        .await
        .unwrap();
    check_in(&deps, l1.loan_id).await.unwrap();

    let active = inventory::active_loans_for_patron(&deps, patron)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].title_id, t2.title_id);

    let history = inventory::loan_history_for_patron(&deps, patron)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);

    let described = inventory::describe_loans(&deps, history).await.unwrap();
    assert!(described.iter().all(|(_, title)| title.is_some()));
}

#[tokio::test]
async fn test_overdue_is_derived_at_read_time() {
    let (_store, deps) = in_memory_deps();
    let title = register(&deps, "Bleak House", 2).await;

    let loan = inventory::check_out(
        &deps,
        CheckOut {
            title_id: title.title_id,
            patron_id: PatronId::new(),
            requested_at: Utc::now() - Duration::days(20),
        },
    )
    .await
    .unwrap();
    check_out(&deps, title.title_id, PatronId::new())
        .await
        .unwrap();

    let overdue = inventory::find_overdue_loans(&deps, Utc::now())
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].loan_id, loan.loan_id);

    // 延滞していても返却できる
    check_in(&deps, loan.loan_id).await.unwrap();
    let overdue = inventory::find_overdue_loans(&deps, Utc::now())
        .await
        .unwrap();
    assert!(overdue.is_empty());
}

#[tokio::test]
async fn test_active_loans_for_unknown_title() {
    let (_store, deps) = in_memory_deps();

    let result = inventory::active_loans_for_title(&deps, TitleId::new()).await;

    assert!(matches!(result, Err(InventoryError::TitleNotFound(_))));
}

#[tokio::test]
async fn test_check_out_with_unrepresentable_due_date_changes_nothing() {
    let (store, deps) = in_memory_deps();
    let title = register(&deps, "Foundation", 1).await;

    let result = inventory::check_out(
        &deps,
        CheckOut {
            title_id: title.title_id,
            patron_id: PatronId::new(),
            requested_at: DateTime::<Utc>::MAX_UTC - Duration::days(1),
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(InventoryError::DueDateOutOfRange { .. })
    ));
    assert_eq!(available(&deps, title.title_id).await, 1);
    assert_eq!(store.loan_count().unwrap(), 0);
}
