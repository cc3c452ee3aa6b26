//! Timeout race.

use std::time::Duration;

use crate::{Error, Result};

/// Race `operation` against a timer of `duration`.
///
/// When the timer wins the operation is dropped, which cancels it locally
/// (an in-flight call closes its connection; the server may still have
/// processed it), and the race fails with `timeout of <ms>ms`. When the operation
/// settles first the timer is dropped with it. A zero duration disables the
/// race.
///
/// # Errors
///
/// Returns a timeout error when the timer fires first, otherwise whatever
/// `operation` fails with.
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// use std::time::Duration;
///
/// let value = fata::timeout_it(Duration::from_millis(200), async { Ok(7) }).await;
/// assert_eq!(value.unwrap(), 7);
/// # }
/// ```
pub async fn timeout_it<T, F>(duration: Duration, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if duration.is_zero() {
        return operation.await;
    }

    tokio::time::timeout(duration, operation)
        .await
        .map_err(|_| Error::timeout(duration))?
}
