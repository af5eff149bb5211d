//! Gateway types module
//!
//! ## Submodules
//! - [`response`]: Response envelope, handler errors and error codes
//! - [`transfer`]: Transfer and account request/response bodies

pub mod response;
pub mod transfer;

// Re-export commonly used types at module root
pub use response::{ApiError, ApiResponse, ApiResult, accepted, error_codes, ok};
pub use transfer::{
    BalanceResponse, CreateTransferRequest, CreateTransferResponse, TransactionListResponse,
};
