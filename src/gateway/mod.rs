mod blockade;
mod completion;
mod embedding;
mod poll;
mod scenario;

pub use blockade::*;
pub use completion::*;
pub use embedding::*;
pub use poll::*;
pub use scenario::*;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

// Reads a provider response, turning non-2xx statuses and undecodable bodies into upstream errors.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(Error::Upstream(format!("{status}: {body}")));
    }

    serde_json::from_str(&body)
        .map_err(|e| Error::Upstream(format!("malformed response body ({e}): {body}")))
}
