use std::fmt;
use std::str::FromStr;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CalcError;

/// サポートする四則演算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    /// 演算を実行する。未定義になるのはゼロ除算のみ。
    pub fn apply(&self, a: f64, b: f64) -> Result<f64, CalcError> {
        match self {
            Operation::Add => Ok(a + b),
            Operation::Subtract => Ok(a - b),
            Operation::Multiply => Ok(a * b),
            Operation::Divide => {
                // -0.0 も 0.0 と等しい
                if b == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                Ok(a / b)
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CalcError::UnknownOperation(s.to_string()))
    }
}

/// 演算結果のレスポンス。`error` フィールドの有無で成功と失敗を区別する。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success {
        operation: Operation,
        a: f64,
        b: f64,
        #[serde(serialize_with = "serialize_saturating")]
        result: f64,
    },
    Error {
        error: String,
    },
}

impl Envelope {
    pub fn result(&self) -> Option<f64> {
        match self {
            Envelope::Success { result, .. } => Some(*result),
            Envelope::Error { .. } => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// JSON は無限大を表現できないため、オーバーフローした結果は符号を保ったまま
/// `f64::MAX` に丸めて数値として書き出す。
fn serialize_saturating<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    let value = if value.is_infinite() {
        f64::MAX.copysign(*value)
    } else {
        *value
    };
    serializer.serialize_f64(value)
}

/// 演算を評価してレスポンスを組み立てる。エラーは呼び出し元へ伝播させずに
/// エラーレスポンスへ変換する。
pub fn evaluate(operation: Operation, a: f64, b: f64) -> Envelope {
    match operation.apply(a, b) {
        Ok(result) => Envelope::Success {
            operation,
            a,
            b,
            result,
        },
        Err(e) => Envelope::Error {
            error: e.to_string(),
        },
    }
}

pub fn add(a: f64, b: f64) -> Envelope {
    evaluate(Operation::Add, a, b)
}

pub fn subtract(a: f64, b: f64) -> Envelope {
    evaluate(Operation::Subtract, a, b)
}

pub fn multiply(a: f64, b: f64) -> Envelope {
    evaluate(Operation::Multiply, a, b)
}

pub fn divide(a: f64, b: f64) -> Envelope {
    evaluate(Operation::Divide, a, b)
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct OperandsRequest {
    #[schemars(description = "1つ目の数値（整数も可）")]
    pub a: f64,
    #[schemars(description = "2つ目の数値（整数も可）")]
    pub b: f64,
}

#[derive(Clone)]
pub struct CalculatorService {
    tool_router: ToolRouter<Self>,
}

impl Default for CalculatorService {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl CalculatorService {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    fn respond(operation: Operation, a: f64, b: f64) -> Result<CallToolResult, McpError> {
        tracing::debug!(%operation, a, b, "ツール呼び出し");

        let envelope = evaluate(operation, a, b);
        let json = envelope.to_json().map_err(|e| {
            McpError::internal_error(format!("レスポンスのシリアライズに失敗: {e}"), None)
        })?;

        match envelope.result() {
            Some(result) => {
                if result.is_infinite() {
                    tracing::warn!(%operation, a, b, "計算結果がオーバーフローしました");
                }
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            None => {
                tracing::warn!(%operation, a, b, "計算エラー: {}", json);
                Ok(CallToolResult::error(vec![Content::text(json)]))
            }
        }
    }

    #[tool(description = "2つの数値を足し算します（a + b）。結果をJSONで返します。")]
    pub fn add(
        &self,
        Parameters(OperandsRequest { a, b }): Parameters<OperandsRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::respond(Operation::Add, a, b)
    }

    #[tool(description = "2つの数値を引き算します（a - b）。結果をJSONで返します。")]
    pub fn subtract(
        &self,
        Parameters(OperandsRequest { a, b }): Parameters<OperandsRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::respond(Operation::Subtract, a, b)
    }

    #[tool(description = "2つの数値を掛け算します（a * b）。結果をJSONで返します。")]
    pub fn multiply(
        &self,
        Parameters(OperandsRequest { a, b }): Parameters<OperandsRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::respond(Operation::Multiply, a, b)
    }

    #[tool(
        description = "2つの数値を割り算します（a / b）。b が 0 の場合は error フィールドを持つJSONを返します。"
    )]
    pub fn divide(
        &self,
        Parameters(OperandsRequest { a, b }): Parameters<OperandsRequest>,
    ) -> Result<CallToolResult, McpError> {
        Self::respond(Operation::Divide, a, b)
    }
}

#[tool_handler]
impl ServerHandler for CalculatorService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "四則演算（add, subtract, multiply, divide）の計算機能を提供するMCPサーバです。2つの数値を受け取って計算結果をJSONで返します。"
                    .into(),
            ),
            ..Default::default()
        }
    }
}
