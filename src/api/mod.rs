pub mod claims;
pub mod error;
pub mod handlers;
pub mod router;
pub mod types;

pub use claims::{Claims, PATRON_ID_HEADER, PATRON_ROLE_HEADER, Role};
pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use types::*;
