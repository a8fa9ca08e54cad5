//! MCP (Model Context Protocol) server for the bridge.
//!
//! Exposes the bridge as a JSON-RPC 2.0 server over stdin/stdout. Tools
//! let scripts and agents boot the bridge, drive the bus and the far end of
//! the line, and observe internal state.

#![allow(
    clippy::cast_possible_truncation,
    clippy::needless_pass_by_value,
    clippy::redundant_closure_for_method_calls
)]

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use axi_lite_regs::Strobe;
use sim_core::{Observable, Tickable, Ticks, Value};

use crate::{Bridge, BridgeConfig};

// ---------------------------------------------------------------------------
// JSON-RPC types
// ---------------------------------------------------------------------------

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const SERVER_ERROR: i32 = -32000;

#[derive(Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: JsonValue,
    #[serde(default)]
    id: JsonValue,
}

#[derive(Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: JsonValue,
}

#[derive(Serialize)]
struct RpcError {
    code: i32,
    message: String,
}

impl RpcResponse {
    fn success(id: JsonValue, result: JsonValue) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: JsonValue, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(RpcError { code, message }),
            id,
        }
    }
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

/// MCP server wrapping a headless bridge.
pub struct McpServer {
    bridge: Option<Bridge>,
    defaults: BridgeConfig,
}

impl McpServer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bridge: None,
            defaults: BridgeConfig::default(),
        }
    }

    /// Configuration `boot` starts from (e.g. from command-line flags).
    pub fn set_defaults(&mut self, config: BridgeConfig) {
        self.defaults = config;
    }

    /// Run the server loop: read JSON-RPC from stdin, write responses to stdout.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut stdout = stdout.lock();

        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let Some(reply) = self.handle_line(&line) else {
                continue;
            };
            let _ = writeln!(stdout, "{reply}");
            let _ = stdout.flush();
        }
    }

    /// Handle one line of input, returning the serialized response.
    /// Blank lines produce no response.
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<RpcRequest>(line) {
            Err(e) => RpcResponse::error(JsonValue::Null, PARSE_ERROR, format!("Parse error: {e}")),
            Ok(request) if request.jsonrpc != "2.0" => RpcResponse::error(
                request.id,
                INVALID_REQUEST,
                "Invalid JSON-RPC version".to_string(),
            ),
            Ok(request) => self.dispatch(&request.method, &request.params, request.id),
        };
        Some(serde_json::to_string(&response).unwrap_or_default())
    }

    fn dispatch(&mut self, method: &str, params: &JsonValue, id: JsonValue) -> RpcResponse {
        match method {
            "boot" => self.handle_boot(params, id),
            "reset" => self.handle_reset(id),
            "step_ticks" => self.handle_step_ticks(params, id),
            "bus_write" => self.handle_bus_write(params, id),
            "bus_read" => self.handle_bus_read(params, id),
            "set_send_enable" => self.handle_set_send_enable(params, id),
            "peer_send" => self.handle_peer_send(params, id),
            "peer_received" => self.handle_peer_received(id),
            "rx_words" => self.handle_rx_words(id),
            "query" => self.handle_query(params, id),
            "query_paths" => self.handle_query_paths(id),
            _ => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Unknown method: {method}")),
        }
    }

    fn require_bridge(&mut self, id: &JsonValue) -> Result<&mut Bridge, RpcResponse> {
        self.bridge.as_mut().ok_or_else(|| {
            RpcResponse::error(
                id.clone(),
                SERVER_ERROR,
                "No bridge instance. Call 'boot' first.".to_string(),
            )
        })
    }

    // === Tool handlers ===

    fn handle_boot(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let mut config = self.defaults;
        if let Some(hz) = params.get("clock_hz").and_then(|v| v.as_u64()) {
            config.clock_hz = hz;
        }
        if let Some(clks) = params.get("clks_per_bit").and_then(|v| v.as_u64()) {
            config.clks_per_bit = u32::try_from(clks).unwrap_or(u32::MAX);
        }
        if let Some(k) = params.get("fifo_depth_log2").and_then(|v| v.as_u64()) {
            config.fifo_depth_log2 = u8::try_from(k).unwrap_or(u8::MAX);
        }
        if let Some(loopback) = params.get("loopback").and_then(|v| v.as_bool()) {
            config.loopback = loopback;
        }
        if let Some(baud) = params.get("baud").and_then(|v| v.as_u64()) {
            let baud = u32::try_from(baud).unwrap_or(u32::MAX);
            config = match config.with_baud(baud) {
                Ok(c) => c,
                Err(e) => return RpcResponse::error(id, INVALID_PARAMS, e),
            };
        }

        match Bridge::new(&config) {
            Ok(bridge) => {
                self.bridge = Some(bridge);
                RpcResponse::success(
                    id,
                    serde_json::json!({
                        "status": "ok",
                        "clock_hz": config.clock_hz,
                        "clks_per_bit": config.clks_per_bit,
                        "baud": config.clock().baud_for(config.clks_per_bit),
                        "fifo_depth_log2": config.fifo_depth_log2,
                        "loopback": config.loopback,
                    }),
                )
            }
            Err(e) => RpcResponse::error(id, INVALID_PARAMS, format!("Boot failed: {e}")),
        }
    }

    fn handle_reset(&mut self, id: JsonValue) -> RpcResponse {
        match self.require_bridge(&id) {
            Ok(bridge) => {
                bridge.reset();
                RpcResponse::success(id, serde_json::json!({"status": "ok"}))
            }
            Err(e) => e,
        }
    }

    fn handle_step_ticks(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let bridge = match self.require_bridge(&id) {
            Ok(b) => b,
            Err(e) => return e,
        };

        let count = params.get("count").and_then(|v| v.as_u64()).unwrap_or(1);
        bridge.tick_n(Ticks::new(count));

        RpcResponse::success(
            id,
            serde_json::json!({"master_clock": bridge.master_clock()}),
        )
    }

    fn handle_bus_write(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let Some(addr) = param_u32(params, "addr") else {
            return RpcResponse::error(id, INVALID_PARAMS, "Missing 'addr' parameter".to_string());
        };
        let Some(data) = param_u32(params, "data") else {
            return RpcResponse::error(id, INVALID_PARAMS, "Missing 'data' parameter".to_string());
        };
        let strb = param_u32(params, "strb").map_or(Strobe::ALL, |s| Strobe::new(s as u8));

        let bridge = match self.require_bridge(&id) {
            Ok(b) => b,
            Err(e) => return e,
        };
        match bridge.bus_write(addr, data, strb) {
            Ok(resp) => RpcResponse::success(
                id,
                serde_json::json!({"resp": resp_name(resp.is_okay()), "code": resp.bits()}),
            ),
            Err(e) => RpcResponse::error(id, SERVER_ERROR, e),
        }
    }

    fn handle_bus_read(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let Some(addr) = param_u32(params, "addr") else {
            return RpcResponse::error(id, INVALID_PARAMS, "Missing 'addr' parameter".to_string());
        };

        let bridge = match self.require_bridge(&id) {
            Ok(b) => b,
            Err(e) => return e,
        };
        match bridge.bus_read(addr) {
            Ok(beat) => RpcResponse::success(
                id,
                serde_json::json!({
                    "data": beat.data,
                    "hex": format!("{:#010X}", beat.data),
                    "resp": resp_name(beat.resp.is_okay()),
                    "code": beat.resp.bits(),
                }),
            ),
            Err(e) => RpcResponse::error(id, SERVER_ERROR, e),
        }
    }

    fn handle_set_send_enable(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let Some(enabled) = params.get("enabled").and_then(|v| v.as_bool()) else {
            return RpcResponse::error(
                id,
                INVALID_PARAMS,
                "Missing 'enabled' parameter".to_string(),
            );
        };
        match self.require_bridge(&id) {
            Ok(bridge) => {
                bridge.set_send_enable(enabled);
                RpcResponse::success(id, serde_json::json!({"enabled": enabled}))
            }
            Err(e) => e,
        }
    }

    fn handle_peer_send(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let bytes: Option<Vec<u8>> = params
            .get("bytes")
            .and_then(|v| v.as_array())
            .and_then(|arr| {
                arr.iter()
                    .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect()
            });
        let Some(bytes) = bytes else {
            return RpcResponse::error(
                id,
                INVALID_PARAMS,
                "'bytes' must be an array of values 0-255".to_string(),
            );
        };

        match self.require_bridge(&id) {
            Ok(bridge) => {
                bridge.peer_mut().send(&bytes);
                RpcResponse::success(
                    id,
                    serde_json::json!({"queued": bytes.len(), "pending": bridge.peer().pending()}),
                )
            }
            Err(e) => e,
        }
    }

    fn handle_peer_received(&mut self, id: JsonValue) -> RpcResponse {
        match self.require_bridge(&id) {
            Ok(bridge) => {
                let bytes = bridge.peer_mut().take_received();
                RpcResponse::success(id, serde_json::json!({"bytes": bytes}))
            }
            Err(e) => e,
        }
    }

    fn handle_rx_words(&mut self, id: JsonValue) -> RpcResponse {
        match self.require_bridge(&id) {
            Ok(bridge) => {
                let words = bridge.take_rx_words();
                RpcResponse::success(id, serde_json::json!({"words": words}))
            }
            Err(e) => e,
        }
    }

    fn handle_query(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let Some(path) = params.get("path").and_then(|v| v.as_str()) else {
            return RpcResponse::error(id, INVALID_PARAMS, "Missing 'path' parameter".to_string());
        };

        let bridge = match self.require_bridge(&id) {
            Ok(b) => b,
            Err(e) => return e,
        };
        match bridge.query(path) {
            Some(value) => RpcResponse::success(
                id,
                serde_json::json!({"path": path, "value": observable_to_json(&value)}),
            ),
            None => RpcResponse::error(id, INVALID_PARAMS, format!("Unknown query path: {path}")),
        }
    }

    fn handle_query_paths(&mut self, id: JsonValue) -> RpcResponse {
        match self.require_bridge(&id) {
            Ok(bridge) => {
                let paths = bridge.query_paths();
                RpcResponse::success(id, serde_json::json!({"paths": paths}))
            }
            Err(e) => e,
        }
    }
}

impl Default for McpServer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Accept a number or a hex string such as `"0x04"`.
fn param_u32(params: &JsonValue, key: &str) -> Option<u32> {
    let value = params.get(key)?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    let text = value.as_str()?;
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn resp_name(okay: bool) -> &'static str {
    if okay { "OKAY" } else { "SLVERR" }
}

fn observable_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Bool(v) => serde_json::json!(v),
        Value::U8(v) => serde_json::json!(v),
        Value::U32(v) => serde_json::json!(v),
        Value::U64(v) => serde_json::json!(v),
        Value::String(v) => serde_json::json!(v),
        Value::Array(v) => JsonValue::Array(v.iter().map(observable_to_json).collect()),
    }
}
