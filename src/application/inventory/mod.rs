mod errors;
mod inventory_service;
mod queries;

pub use errors::{InventoryError, Result};
pub use inventory_service::{check_in, check_out};
pub use queries::{
    active_loans_for_patron, active_loans_for_title, describe_loans, find_overdue_loans,
    get_loan, get_title, list_titles, loan_history_for_patron,
};
