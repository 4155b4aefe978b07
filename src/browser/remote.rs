//! Browser access through the companion extension.
//!
//! Tab queries, captures and downloads are forwarded as protocol commands.
//! The scroll controller runs locally in a [`ContentHost`] and moves the
//! page through small `scripting.evaluate` calls.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::SaverConfig;
use crate::error::{Error, Result};
use crate::identifiers::{DownloadId, TabId};
use crate::page::{ContentHost, PageLocation, Viewport, ViewportMetrics};
use crate::protocol::{
    Command, DownloadsCommand, Request, ScriptingCommand, ScrollRequest, ScrollResponse,
    TabsCommand,
};
use crate::transport::{Connection, PendingServer};

use super::capability::{DownloadItem, DownloadRequest, Downloads, JpegFormat, TabInfo, Tabs};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for one command round-trip to the extension.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

const METRICS_SCRIPT: &str = "return { scrollY: window.scrollY, width: window.innerWidth, \
     height: window.innerHeight, documentHeight: document.body.scrollHeight, \
     devicePixelRatio: window.devicePixelRatio };";

const LOCATION_SCRIPT: &str = "return { title: document.title, url: window.location.href };";

const PROBE_SCRIPT: &str = "return document.readyState;";

// ============================================================================
// RemoteBrowser
// ============================================================================

/// [`Tabs`] and [`Downloads`] served by the companion extension.
///
/// # Example
///
/// ```ignore
/// let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("point the extension at {}", server.ws_url());
///
/// let browser = Arc::new(RemoteBrowser::connect(server, &config).await?);
/// let tab = browser.active_tab().await?;
/// ```
pub struct RemoteBrowser {
    connection: Connection,
    host: Arc<ContentHost>,
    command_timeout: Duration,
}

impl RemoteBrowser {
    /// Wraps an established connection.
    #[must_use]
    pub fn new(connection: Connection, config: &SaverConfig) -> Self {
        Self {
            connection,
            host: Arc::new(ContentHost::new(config.scroll, config.message_timeout)),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Waits for the extension to connect to `server`.
    pub async fn connect(server: PendingServer, config: &SaverConfig) -> Result<Self> {
        let (connection, _ready) = server
            .with_ready_timeout(config.message_timeout)
            .accept()
            .await?;
        Ok(Self::new(connection, config))
    }

    /// Sets the timeout for one command round-trip.
    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Returns the host running scroll controllers for this browser.
    #[inline]
    #[must_use]
    pub fn content_host(&self) -> &ContentHost {
        &self.host
    }

    /// Closes the connection to the extension.
    pub fn shutdown(&self) {
        self.connection.close();
    }

    fn viewport(&self, tab_id: TabId) -> RemoteViewport {
        RemoteViewport {
            connection: self.connection.clone(),
            tab_id,
            command_timeout: self.command_timeout,
        }
    }

    async fn send(&self, request: Request) -> Result<Value> {
        self.connection
            .request(request, self.command_timeout)
            .await?
            .into_result()
    }
}

#[async_trait]
impl Tabs for RemoteBrowser {
    async fn active_tab(&self) -> Result<TabInfo> {
        let result = self
            .send(Request::new(Command::Tabs(TabsCommand::QueryActive)))
            .await?;
        let tab: TabInfo = serde_json::from_value(result)
            .map_err(|e| Error::protocol(format!("Malformed active tab: {e}")))?;

        debug!(tab_id = %tab.id, url = %tab.url, "Active tab");
        Ok(tab)
    }

    async fn send_message(&self, tab_id: TabId, request: ScrollRequest) -> Result<ScrollResponse> {
        self.host.send(tab_id, request).await
    }

    async fn inject_controller(&self, tab_id: TabId) -> Result<()> {
        let viewport = self.viewport(tab_id);

        viewport
            .evaluate(PROBE_SCRIPT)
            .await
            .map_err(|e| Error::script_injection(tab_id, e.to_string()))?;

        self.host.install(tab_id, Box::new(viewport));
        Ok(())
    }

    async fn capture_visible_tab(&self, tab_id: TabId, format: JpegFormat) -> Result<Vec<u8>> {
        debug!(tab_id = %tab_id, quality = format.quality(), "Capturing visible tab");

        let command = Command::Tabs(TabsCommand::CaptureVisibleTab {
            format: JpegFormat::WIRE_NAME.to_string(),
            quality: Some(format.quality()),
        });

        let result = self
            .send(Request::for_tab(tab_id, command))
            .await
            .map_err(|e| Error::capture(e.to_string()))?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::capture("Capture response missing data field"))?;

        decode_data_url(data).map_err(|e| Error::capture(e.to_string()))
    }
}

#[async_trait]
impl Downloads for RemoteBrowser {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId> {
        debug!(filename = %request.filename, bytes = request.bytes.len(), "Starting remote download");

        let command = Command::Downloads(DownloadsCommand::Download {
            url: encode_data_url(&request.mime_type, &request.bytes),
            filename: request.filename,
            save_as: request.save_as,
            conflict_action: request.conflict_action,
        });

        let result = self.send(Request::new(command)).await?;
        let id = result
            .get("downloadId")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| Error::protocol("Download response missing downloadId"))?;

        Ok(DownloadId::new(id))
    }

    async fn search(&self, id: DownloadId) -> Result<Option<DownloadItem>> {
        let command = Command::Downloads(DownloadsCommand::Search { id });
        let result = self.send(Request::new(command)).await?;

        let Some(first) = result
            .get("items")
            .and_then(|v| v.as_array())
            .and_then(|items| items.first())
        else {
            return Ok(None);
        };

        serde_json::from_value(first.clone())
            .map(Some)
            .map_err(|e| Error::protocol(format!("Malformed download item: {e}")))
    }
}

// ============================================================================
// RemoteViewport
// ============================================================================

/// [`Viewport`] of a tab, driven by script evaluation over the connection.
#[derive(Clone)]
pub struct RemoteViewport {
    connection: Connection,
    tab_id: TabId,
    command_timeout: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetrics {
    scroll_y: f64,
    width: f64,
    height: f64,
    document_height: f64,
    #[serde(default = "default_pixel_ratio")]
    device_pixel_ratio: f64,
}

fn default_pixel_ratio() -> f64 {
    1.0
}

impl RemoteViewport {
    async fn evaluate(&self, script: &str) -> Result<Value> {
        let command = Command::Scripting(ScriptingCommand::Evaluate {
            script: script.to_string(),
        });

        let result = self
            .connection
            .request(Request::for_tab(self.tab_id, command), self.command_timeout)
            .await?
            .into_result()?;

        Ok(result.get("value").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Viewport for RemoteViewport {
    async fn metrics(&self) -> Result<ViewportMetrics> {
        let raw: RawMetrics = serde_json::from_value(self.evaluate(METRICS_SCRIPT).await?)
            .map_err(|e| Error::protocol(format!("Malformed viewport metrics: {e}")))?;

        Ok(ViewportMetrics {
            scroll_y: raw.scroll_y,
            width: raw.width,
            height: raw.height,
            document_height: raw.document_height,
            device_pixel_ratio: raw.device_pixel_ratio,
        })
    }

    async fn scroll_to(&self, y: f64) -> Result<()> {
        self.evaluate(&format!("window.scrollTo(0, {y});")).await?;
        Ok(())
    }

    async fn scroll_by(&self, dy: f64) -> Result<()> {
        self.evaluate(&format!("window.scrollBy(0, {dy});")).await?;
        Ok(())
    }

    async fn location(&self) -> Result<PageLocation> {
        let value = self.evaluate(LOCATION_SCRIPT).await?;
        let field = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        Ok(PageLocation {
            title: field("title"),
            url: field("url"),
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Decodes `data:<mime>;base64,<payload>` or a bare base64 payload.
fn decode_data_url(data: &str) -> Result<Vec<u8>> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => data,
    };

    Base64Standard
        .decode(payload)
        .map_err(|e| Error::protocol(format!("Failed to decode base64: {e}")))
}

fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", Base64Standard.encode(bytes))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::tungstenite::Message;

    use crate::browser::DownloadState;

    #[test]
    fn test_data_url_roundtrip() {
        let url = encode_data_url("image/jpeg", &[0xff, 0xd8, 0xff]);
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(decode_data_url(&url).expect("decode"), vec![0xff, 0xd8, 0xff]);
    }

    #[test]
    fn test_decode_bare_base64() {
        assert_eq!(decode_data_url("AQID").expect("decode"), vec![1, 2, 3]);
        assert!(decode_data_url("data:image/png;base64,***").is_err());
    }

    /// Answers commands the way the companion extension would.
    fn reply_for(request: &Value) -> Value {
        let id = request["id"].clone();
        let result = match request["method"].as_str().unwrap_or_default() {
            "tabs.queryActive" => json!({
                "tabId": 5,
                "title": "Example Domain",
                "url": "https://example.com/"
            }),
            "tabs.captureVisibleTab" => json!({ "data": "data:image/jpeg;base64,AQID" }),
            "scripting.evaluate" => {
                let script = request["params"]["script"].as_str().unwrap_or_default();
                if script.contains("innerHeight") {
                    json!({ "value": {
                        "scrollY": 0.0,
                        "width": 1280.0,
                        "height": 720.0,
                        "documentHeight": 2000.0
                    }})
                } else {
                    json!({ "value": "complete" })
                }
            }
            "downloads.download" => json!({ "downloadId": 11 }),
            "downloads.search" => json!({ "items": [{
                "id": 11,
                "filename": "/downloads/SavedTabs/a.jpg",
                "state": "complete"
            }]}),
            other => {
                return json!({ "id": id, "type": "error", "error": "unknown command", "message": other });
            }
        };
        json!({ "id": id, "type": "success", "result": result })
    }

    async fn connect_fake_extension() -> RemoteBrowser {
        let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind");
        let url = server.ws_url();

        tokio::spawn(async move {
            let (mut ws, _) = tokio_tungstenite::connect_async(url).await.expect("connect");
            let ready = json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "type": "success",
                "result": { "version": "test" }
            });
            ws.send(Message::Text(ready.to_string().into()))
                .await
                .expect("ready");

            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let request: Value = serde_json::from_str(&text).expect("request json");
                let reply = reply_for(&request);
                if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                    break;
                }
            }
        });

        let config = SaverConfig::new().without_delays();
        RemoteBrowser::connect(server, &config).await.expect("connect")
    }

    #[tokio::test]
    async fn test_active_tab_and_capture() {
        let browser = connect_fake_extension().await;

        let tab = browser.active_tab().await.expect("active tab");
        assert_eq!(tab.id.as_u32(), 5);
        assert_eq!(tab.url, "https://example.com/");

        let bytes = browser
            .capture_visible_tab(tab.id, JpegFormat::new(100))
            .await
            .expect("capture");
        assert_eq!(bytes, vec![1, 2, 3]);

        browser.shutdown();
    }

    #[tokio::test]
    async fn test_inject_then_message() {
        let browser = connect_fake_extension().await;
        let tab_id = TabId::new(5).expect("valid tab id");

        let err = browser
            .send_message(tab_id, ScrollRequest::Ping)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoReceiver { .. }));

        browser.inject_controller(tab_id).await.expect("inject");
        browser.inject_controller(tab_id).await.expect("inject again");

        let reply = browser
            .send_message(tab_id, ScrollRequest::GetDimensions)
            .await
            .expect("dimensions");
        let dimensions = reply.into_dimensions().expect("dimensions reply");
        assert_eq!(dimensions.height, 720.0);
        assert_eq!(dimensions.device_pixel_ratio, 1.0);

        browser.shutdown();
    }

    #[tokio::test]
    async fn test_download_and_search() {
        let browser = connect_fake_extension().await;

        let id = browser
            .download(DownloadRequest::new("SavedTabs/a.jpg", vec![9], "image/jpeg"))
            .await
            .expect("download");
        assert_eq!(id, DownloadId::new(11));

        let item = browser.search(id).await.expect("search").expect("item");
        assert_eq!(item.state, DownloadState::Complete);

        browser.shutdown();
    }
}
