use std::time::Duration;

use serde::Deserialize;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct ReadinessBody {
    ready: Option<bool>,
}

/// One readiness probe. Anything other than a 2xx response whose body does
/// not report incompleteness means "not ready", including connection
/// errors, which are expected while the worker is still booting.
pub async fn probe_ready(client: &reqwest::Client, base_url: &str) -> bool {
    let url = format!("{}/ready", base_url.trim_end_matches('/'));

    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => {
            match response.json::<ReadinessBody>().await {
                Ok(body) => body.ready.unwrap_or(true),
                // A 2xx with a non-JSON body still counts as ready
                Err(_) => true,
            }
        }
        Ok(response) => {
            debug!(%url, status = %response.status(), "readiness probe reported not ready");
            false
        }
        Err(error) => {
            debug!(%url, %error, "readiness probe unreachable");
            false
        }
    }
}

/// Polls the readiness endpoint until it reports complete, bounded by an
/// absolute timeout. Returns whether readiness was reached in time.
pub async fn wait_until_ready(
    base_url: &str,
    poll_interval: Duration,
    overall_timeout: Duration,
) -> bool {
    let client = reqwest::Client::new();

    let reached = timeout(overall_timeout, async {
        loop {
            if probe_ready(&client, base_url).await {
                return;
            }
            sleep(poll_interval).await;
        }
    })
    .await
    .is_ok();

    if reached {
        info!(url = %base_url, "worker reported readiness");
    }

    reached
}
