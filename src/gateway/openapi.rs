//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::account::User;
use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    BalanceResponse, CreateTransferRequest, CreateTransferResponse, TransactionListResponse,
};
use crate::transfer::{Transaction, TransactionId, TransactionStatus};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Money Transfer API",
        version = "1.0.0",
        description = "Accepts transfers between users and settles them asynchronously. \
                       A created transfer is PENDING until the settlement worker marks it SUCCESS or FAILED.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::create_transfer,
        crate::gateway::handlers::get_transfers,
        crate::gateway::handlers::get_transaction,
        crate::gateway::handlers::get_balance,
        crate::gateway::handlers::get_user,
    ),
    components(
        schemas(
            HealthResponse,
            CreateTransferRequest,
            CreateTransferResponse,
            TransactionListResponse,
            BalanceResponse,
            Transaction,
            TransactionId,
            TransactionStatus,
            User,
        )
    ),
    tags(
        (name = "Transfer", description = "Transfer creation, history and status"),
        (name = "Account", description = "Balances and user profiles"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
