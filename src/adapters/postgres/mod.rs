pub mod catalog_store;
pub mod inventory_store;
pub mod loan_ledger;
mod rows;

// パブリックに型を再エクスポート
pub use catalog_store::CatalogStore as PostgresCatalogStore;
pub use inventory_store::InventoryStore as PostgresInventoryStore;
pub use loan_ledger::LoanLedger as PostgresLoanLedger;
