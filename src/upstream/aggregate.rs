//! Response aggregator: drains a fragment stream into one string.

use futures::TryStreamExt;

use crate::error::UpstreamError;
use crate::upstream::decode::Fragments;

/// Concatenate every fragment in arrival order.
///
/// Any error, including one after some fragments arrived, fails the whole
/// aggregation; partial text is discarded.
pub async fn aggregate(fragments: Fragments) -> Result<String, UpstreamError> {
    fragments
        .try_fold(String::new(), |mut text, fragment| async move {
            text.push_str(&fragment);
            Ok(text)
        })
        .await
}
