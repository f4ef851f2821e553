pub mod catalog_store;
pub mod inventory_store;
pub mod loan_ledger;
pub mod store_error;

pub use catalog_store::CatalogStore;
pub use inventory_store::{InventoryStore, InventoryTransaction};
pub use loan_ledger::LoanLedger;
pub use store_error::{Result, StoreError};
