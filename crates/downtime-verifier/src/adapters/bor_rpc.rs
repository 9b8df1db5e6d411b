//! Bor JSON-RPC adapter: latest height and block author.

use super::http::{body_text, build_client, normalize_base_url};
use crate::domain::{BlockHeight, ProducerAddress};
use crate::error::RpcError;
use crate::ports::ChainReader;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";
const GET_AUTHOR: &str = "bor_getAuthor";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    #[serde(default)]
    number: String,
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_hex_u64(method: &'static str, value: &str) -> Result<u64, RpcError> {
    let invalid = || RpcError::InvalidHex {
        method,
        value: value.to_string(),
    };
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(invalid)?;
    u64::from_str_radix(digits, 16).map_err(|_| invalid())
}

/// JSON-RPC client for a Bor node.
pub struct BorRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl BorRpcClient {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_client(timeout)?,
            rpc_url: normalize_base_url(rpc_url),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Make a JSON-RPC call; `Ok(None)` when the result is absent or null.
    async fn call<P: Serialize + Send, R: DeserializeOwned + Send>(
        &self,
        method: &'static str,
        params: P,
    ) -> Result<Option<R>, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Transport {
                method,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                method,
                status: status.as_u16(),
                body: body_text(response).await,
            });
        }

        let rpc_response: JsonRpcResponse<R> =
            response.json().await.map_err(|e| RpcError::Decode {
                method,
                reason: e.to_string(),
            })?;

        if let Some(error) = rpc_response.error.filter(|e| !e.message.is_empty()) {
            return Err(RpcError::Remote {
                method,
                code: error.code,
                message: error.message,
            });
        }

        Ok(rpc_response.result)
    }
}

#[async_trait]
impl ChainReader for BorRpcClient {
    async fn latest_block_number(&self) -> Result<BlockHeight, RpcError> {
        let header: BlockHeader = self
            .call(GET_BLOCK_BY_NUMBER, json!(["latest", false]))
            .await?
            .ok_or(RpcError::MissingResult {
                method: GET_BLOCK_BY_NUMBER,
            })?;
        parse_hex_u64(GET_BLOCK_BY_NUMBER, &header.number)
    }

    async fn block_author(&self, height: BlockHeight) -> Result<ProducerAddress, RpcError> {
        let author: Option<String> = self
            .call(GET_AUTHOR, json!([format!("0x{:x}", height)]))
            .await?;
        match author {
            Some(raw) if !raw.trim().is_empty() => Ok(ProducerAddress::new(raw)),
            _ => Err(RpcError::EmptyAuthor { height }),
        }
    }
}
