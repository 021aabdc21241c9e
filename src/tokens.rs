use tracing::{debug, warn};

use crate::oracle::Oracle;

/// Approximate token count: one token per four characters, rounded down.
pub fn approximate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Token count for `text`, exact when the oracle can count, otherwise
/// [`approximate_tokens`].
pub async fn estimate_tokens(oracle: &dyn Oracle, text: &str) -> usize {
    match oracle.count_tokens(text).await {
        Ok(count) => {
            debug!(count, "exact token count");
            count
        }
        Err(e) => {
            let estimated = approximate_tokens(text);
            warn!(error = %e, estimated, "token count failed, using estimate");
            estimated
        }
    }
}
