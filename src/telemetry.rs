/// Error reporting sink for request handlers.
use serde_json::json;
use tower_lsp::Client;
use tracing::error;

pub trait Telemetry: Send + Sync {
    fn send_error(&self, event_name: &str, properties: serde_json::Value);
}

/// Reports errors to the log only.
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn send_error(&self, event_name: &str, properties: serde_json::Value) {
        error!(event = event_name, properties = %properties, "telemetry: error event");
    }
}

/// Reports errors to the log and forwards them to the editor as
/// `telemetry/event` notifications.
pub struct ClientTelemetry {
    client: Client,
}

impl ClientTelemetry {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Telemetry for ClientTelemetry {
    fn send_error(&self, event_name: &str, properties: serde_json::Value) {
        TracingTelemetry.send_error(event_name, properties.clone());
        let client = self.client.clone();
        let event = json!({ "name": event_name, "type": "track", "properties": properties });
        tokio::spawn(async move {
            client.telemetry_event(event).await;
        });
    }
}

/// Render an error and its source chain as a single message.
pub fn convert_error_to_telemetry_msg(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Send `err` under `event_name` with the standard `{ "error": ... }` payload.
pub fn report(telemetry: &dyn Telemetry, event_name: &str, err: &dyn std::error::Error) {
    telemetry.send_error(
        event_name,
        json!({ "error": convert_error_to_telemetry_msg(err) }),
    );
}


#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn message_includes_source_chain() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "inner"));
        assert_eq!(convert_error_to_telemetry_msg(&err), "outer: inner");
    }

    #[test]
    fn report_uses_error_payload() {
        let sink = testing::RecordingTelemetry::default();
        let err = crate::error::ServiceError::LinkFinder {
            message: "boom".to_string(),
        };
        report(&sink, "yaml.documentLink.error", &err);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "yaml.documentLink.error");
        assert_eq!(events[0].1["error"], "link finder failed: boom");
    }
}
