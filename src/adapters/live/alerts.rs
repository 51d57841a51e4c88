//! Live alert sink posting to an HTTP logging endpoint.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::ports::AlertSink;

/// Application name sent with every alert.
const APP_NAME: &str = "taskmirror";

/// Severity sent with every alert; the sink only carries errors.
const LEVEL: &str = "ERR";

/// Alert sink that fires a GET request per report.
///
/// Best-effort by contract: transport failures and non-2xx responses are
/// noted at debug level and otherwise ignored.
pub struct HttpAlertSink {
    client: Client,
    url: String,
}

impl HttpAlertSink {
    /// Creates a sink posting to `url`.
    #[must_use]
    pub fn new(url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, url: url.to_string() }
    }
}

impl AlertSink for HttpAlertSink {
    fn report(&self, function: &str, message: &str) {
        let result = self
            .client
            .get(&self.url)
            .query(&[
                ("app", APP_NAME),
                ("level", LEVEL),
                ("function", function),
                ("msg", message),
            ])
            .send();
        if let Err(err) = result {
            tracing::debug!(%err, "alert delivery failed");
        }
    }
}
