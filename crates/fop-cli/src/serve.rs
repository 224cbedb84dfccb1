//! # Tool Server
//!
//! Line-based JSON protocol on stdin/stdout for assistant integrations:
//! one request object per input line, one response object per output line.
//!
//! ```text
//! {"method":"tools/list"}
//! {"method":"tools/call","params":{"name":"verify_chain","arguments":{"lot_number":"LOT-..."}}}
//! ```
//!
//! A successful call answers `{"content":[{"type":"text","text":<pretty JSON>}]}`;
//! any failure answers `{"error": <message>}`. Blank lines are skipped. Every
//! tool is read-only except `run_fraud_checks`, which appends anomaly
//! receipts.

use std::io::{BufRead, Write};

use anyhow::Result;
use fop_audit::{chain_summary, qr_payload, run_fraud_checks_for_lot, verify_lot};
use fop_core::FopConfig;
use fop_ledger::{Ledger, ReceiptFilter};
use serde::Deserialize;
use serde_json::{json, Value};

/// Names of the tools served, in listing order.
pub const TOOL_NAMES: [&str; 5] = [
    "query_receipts",
    "verify_chain",
    "get_summary",
    "generate_qr",
    "run_fraud_checks",
];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LotArguments {
    lot_number: String,
}

/// Tool descriptors with their JSON input schemas.
pub fn tool_descriptors() -> Value {
    let lot_schema = |description: &str| {
        json!({
            "type": "object",
            "properties": {
                "lot_number": {"type": "string", "description": description},
            },
            "required": ["lot_number"],
        })
    };
    json!([
        {
            "name": "query_receipts",
            "description": "Search fish oil supply chain receipts by type, lot number, or batch ID",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "receipt_type": {
                        "type": "string",
                        "enum": ["catch", "processing", "testing", "encapsulation", "distribution", "anomaly"],
                        "description": "Filter by receipt type",
                    },
                    "lot_number": {"type": "string", "description": "Filter by lot number"},
                    "batch_id": {"type": "string", "description": "Filter by batch ID"},
                },
            },
        },
        {
            "name": "verify_chain",
            "description": "Verify the full 5-receipt supply chain for a fish oil lot number. Returns chain validity, all receipts, and any verification errors.",
            "inputSchema": lot_schema("The lot number to verify"),
        },
        {
            "name": "get_summary",
            "description": "Get a consumer-friendly summary of supply chain verification for a lot number",
            "inputSchema": lot_schema("The lot number to summarize"),
        },
        {
            "name": "generate_qr",
            "description": "Generate a QR code payload (JSON) for a fish oil lot number",
            "inputSchema": lot_schema("The lot number for QR code"),
        },
        {
            "name": "run_fraud_checks",
            "description": "Run fraud detection algorithms (yield anomaly, label fraud, cold chain degradation) on a lot's receipt chain",
            "inputSchema": lot_schema("The lot number to check for fraud"),
        },
    ])
}

fn error(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

/// Answer one decoded request.
pub fn handle_request(request: &Value, config: &FopConfig) -> Value {
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    match method {
        "tools/list" => json!({ "tools": tool_descriptors() }),
        "tools/call" => {
            let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
            let name = params.get("name").and_then(Value::as_str).unwrap_or("");
            let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
            if !TOOL_NAMES.contains(&name) {
                return error(format!("Unknown tool: {name}"));
            }
            match call_tool(name, arguments, config) {
                Ok(result) => match serde_json::to_string_pretty(&result) {
                    Ok(text) => json!({ "content": [{ "type": "text", "text": text }] }),
                    Err(e) => error(e.to_string()),
                },
                Err(e) => {
                    tracing::warn!(tool = name, error = %e, "tool call failed");
                    error(e.to_string())
                }
            }
        }
        other => error(format!("Unknown method: {other}")),
    }
}

fn call_tool(name: &str, arguments: Value, config: &FopConfig) -> Result<Value> {
    let ledger = Ledger::new(&config.ledger.ledger_path);
    tracing::debug!(tool = name, "tool call");
    let value = match name {
        "query_receipts" => {
            let filter: ReceiptFilter = serde_json::from_value(arguments)?;
            serde_json::to_value(ledger.query(&filter)?)?
        }
        "verify_chain" => {
            let args: LotArguments = serde_json::from_value(arguments)?;
            serde_json::to_value(verify_lot(&args.lot_number, &ledger)?)?
        }
        "get_summary" => {
            let args: LotArguments = serde_json::from_value(arguments)?;
            serde_json::to_value(chain_summary(&verify_lot(&args.lot_number, &ledger)?))?
        }
        "generate_qr" => {
            let args: LotArguments = serde_json::from_value(arguments)?;
            let summary = chain_summary(&verify_lot(&args.lot_number, &ledger)?);
            Value::String(qr_payload(&summary, &config.verification_base_url)?)
        }
        "run_fraud_checks" => {
            let args: LotArguments = serde_json::from_value(arguments)?;
            serde_json::to_value(run_fraud_checks_for_lot(&args.lot_number, &config.ledger)?)?
        }
        other => anyhow::bail!("Unknown tool: {other}"),
    };
    Ok(value)
}

/// Answer one raw input line. `None` for a blank line.
pub fn handle_line(line: &str, config: &FopConfig) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match serde_json::from_str::<Value>(line) {
        Ok(request) => handle_request(&request, config),
        Err(_) => error("Invalid JSON"),
    })
}

/// Serve requests from `input` until end of stream.
pub fn serve<R: BufRead, W: Write>(input: R, mut output: W, config: &FopConfig) -> Result<u8> {
    tracing::info!(ledger = %config.ledger.ledger_path.display(), "tool server listening on stdin");
    for line in input.lines() {
        let line = line?;
        if let Some(response) = handle_line(&line, config) {
            serde_json::to_writer(&mut output, &response)?;
            writeln!(output)?;
            output.flush()?;
        }
    }
    Ok(crate::EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fop_core::LedgerConfig;

    fn config(dir: &tempfile::TempDir) -> FopConfig {
        FopConfig {
            ledger: LedgerConfig::new(dir.path().join("receipts.jsonl"), "t"),
            ..FopConfig::default()
        }
    }

    #[test]
    fn lists_five_tools() {
        let dir = tempfile::tempdir().unwrap();
        let resp = handle_request(&json!({"method": "tools/list"}), &config(&dir));
        let tools = resp["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, TOOL_NAMES);
        assert_eq!(tools[1]["inputSchema"]["required"], json!(["lot_number"]));
    }

    #[test]
    fn query_on_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let resp = handle_request(
            &json!({"method": "tools/call", "params": {"name": "query_receipts", "arguments": {}}}),
            &config(&dir),
        );
        assert_eq!(resp["content"][0]["type"], "text");
        assert_eq!(resp["content"][0]["text"], "[]");
    }

    #[test]
    fn verify_unknown_lot_returns_report() {
        let dir = tempfile::tempdir().unwrap();
        let resp = handle_request(
            &json!({"method": "tools/call", "params": {"name": "verify_chain", "arguments": {"lot_number": "LOT-X"}}}),
            &config(&dir),
        );
        let text = resp["content"][0]["text"].as_str().unwrap();
        let report: Value = serde_json::from_str(text).unwrap();
        assert_eq!(report["chain_valid"], false);
        assert_eq!(report["errors"][0], "No distribution receipt found for lot LOT-X");
    }

    #[test]
    fn errors() {
        let dir = tempfile::tempdir().unwrap();
        let c = config(&dir);
        assert_eq!(
            handle_request(&json!({"method": "ping"}), &c),
            json!({"error": "Unknown method: ping"})
        );
        assert_eq!(
            handle_request(&json!({"method": "tools/call", "params": {"name": "rm"}}), &c),
            json!({"error": "Unknown tool: rm"})
        );
        let missing = handle_request(
            &json!({"method": "tools/call", "params": {"name": "get_summary", "arguments": {}}}),
            &c,
        );
        assert!(missing["error"].as_str().unwrap().contains("lot_number"));
        let fraud = handle_request(
            &json!({"method": "tools/call", "params": {"name": "run_fraud_checks", "arguments": {"lot_number": "LOT-X"}}}),
            &c,
        );
        assert_eq!(fraud["error"], "STRUCTURAL: No receipts found for lot LOT-X");
    }

    #[test]
    fn serve_skips_blank_lines_and_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let input = "{\"method\":\"tools/list\"}\n\n   \nnot json\n";
        let mut out = Vec::new();
        serve(input.as_bytes(), &mut out, &config(&dir)).unwrap();
        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0]["tools"].is_array());
        assert_eq!(lines[1], json!({"error": "Invalid JSON"}));
    }
}
