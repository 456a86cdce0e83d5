//! MCP tool definitions and request handling
//!
//! This module defines all available tools and handles MCP protocol messages.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use sentinel_core::AgentInput;

use crate::error::{validate_wallet, SentinelError};
use crate::orchestrator::SharedOrchestrator;

// =============================================================================
// MCP Protocol Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

// =============================================================================
// Sentinel Tools
// =============================================================================

/// Tool handler for wallet risk analysis
pub struct SentinelTools {
    orchestrator: SharedOrchestrator,
}

impl SentinelTools {
    pub fn new(orchestrator: SharedOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Get all available tools
    pub fn get_tools(&self) -> Vec<Tool> {
        let input_schema = json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "object",
                    "description": "Analysis request: wallet_signals, protocol_health, market_volatility and metadata (request_id, request_type, urgency)"
                }
            },
            "required": ["input"]
        });

        vec![
            Tool {
                name: "sentinel_health".to_string(),
                description: "Check the health status of the Sentinel service and its escalation backend".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            Tool {
                name: "sentinel_analyze_wallet".to_string(),
                description: "Run the full risk pipeline for a lending-protocol wallet: deterministic scoring, decision mapping and, for ambiguous or high-stakes cases, escalated reasoning. Returns NO_ACTION, MONITOR, REQUEST_SEVERITY_ANALYSIS or ENFORCE_ACTION with confidence, reasoning, recommendations and flags.".to_string(),
                input_schema: input_schema.clone(),
            },
            Tool {
                name: "sentinel_score_wallet".to_string(),
                description: "Deterministic stage only: risk score (0-100), per-factor breakdown and the mapped decision, without escalation.".to_string(),
                input_schema,
            },
        ]
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: &Value) -> Result<Value, String> {
        match name {
            "sentinel_health" => {
                let reasoner = self.orchestrator.reasoner();
                Ok(json!({
                    "status": "healthy",
                    "version": env!("CARGO_PKG_VERSION"),
                    "escalation": {
                        "assessor": reasoner.assessor_name(),
                        "cache_enabled": reasoner.cache().is_some(),
                        "cached_verdicts": reasoner.cache().map(|c| c.entry_count()).unwrap_or(0)
                    }
                }))
            }

            "sentinel_analyze_wallet" => {
                let input = parse_input(args).map_err(|e| e.to_string())?;
                let output = self.orchestrator.analyze(&input).await;
                serde_json::to_value(output.to_report()).map_err(|e| e.to_string())
            }

            "sentinel_score_wallet" => {
                let input = parse_input(args).map_err(|e| e.to_string())?;
                let assessment = self.orchestrator.score(&input);
                serde_json::to_value(assessment).map_err(|e| e.to_string())
            }

            _ => Err(format!("Unknown tool: {}", name)),
        }
    }
}

fn parse_input(args: &Value) -> Result<AgentInput, SentinelError> {
    let raw = args
        .get("input")
        .ok_or_else(|| SentinelError::InvalidParameter("Missing input parameter".into()))?;
    let input: AgentInput = serde_json::from_value(raw.clone())?;
    validate_wallet(&input.wallet_signals.wallet_address)?;
    Ok(input)
}

// =============================================================================
// MCP Protocol Handlers
// =============================================================================

fn handle_initialize(_params: &Value) -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": "sentinel-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn handle_list_tools(tools: &SentinelTools) -> Value {
    json!({
        "tools": tools.get_tools()
    })
}

async fn handle_call_tool(tools: &SentinelTools, params: &Value) -> Value {
    let name = params["name"].as_str().unwrap_or("");
    let args = &params["arguments"];

    match tools.execute(name, args).await {
        Ok(result) => {
            json!({
                "content": [{
                    "type": "text",
                    "text": serde_json::to_string_pretty(&result).unwrap_or_default()
                }]
            })
        }
        Err(e) => {
            tracing::warn!(tool = %name, error = %e, "Tool call failed");
            json!({
                "content": [{
                    "type": "text",
                    "text": format!("Error: {}", e)
                }],
                "isError": true
            })
        }
    }
}

/// Handle an incoming MCP request
pub async fn handle_request(
    tools: &SentinelTools,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let result = match request.method.as_str() {
        "initialize" => Some(handle_initialize(&request.params)),
        "initialized" | "notifications/initialized" => None,
        "tools/list" => Some(handle_list_tools(tools)),
        "tools/call" => Some(handle_call_tool(tools, &request.params).await),
        "notifications/cancelled" => None,
        _ => {
            return Some(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                }),
            });
        }
    };

    result.map(|r| JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: request.id,
        result: Some(r),
        error: None,
    })
}
