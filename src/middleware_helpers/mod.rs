pub mod idempotency;
pub mod request_id;
pub mod retry;

pub use idempotency::{idempotency_middleware, IDEMPOTENCY_KEY_HEADER};
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
pub use retry::{with_retry, DbRetryPolicy, RetryConfig};
