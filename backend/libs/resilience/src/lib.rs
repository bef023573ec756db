/// Resilience helpers for the image pipeline services
///
/// - **Retry**: bounded attempts with fixed or exponential backoff
/// - **Timeout**: deadlines around single external calls
/// - **Presets**: the policies each gateway uses
///
/// # Example: metadata write with backoff
///
/// ```rust,no_run
/// use resilience::{presets, with_retry};
///
/// #[tokio::main]
/// async fn main() {
///     let result = with_retry(presets::metadata_write(), || async {
///         // Your INSERT here
///         Ok::<_, String>(())
///     })
///     .await;
///     assert!(result.is_ok());
/// }
/// ```

pub mod presets;
pub mod retry;
pub mod timeout;

pub use retry::{with_retry, RetryConfig, RetryError};
pub use timeout::{with_timeout, with_timeout_result, TimeoutConfig, TimeoutError};
