use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Value};

pub(crate) mod erc20;

/// Block header as delivered by the node: height plus timestamp in ms epoch.
#[derive(Debug, Clone)]
pub(crate) struct BlockHeader {
    pub height: u64,
    pub timestamp: u64,
}

/// Minimal EVM JSON-RPC client covering the three methods the indexer needs.
/// Retries, if any, are the caller's business.
#[derive(Clone)]
pub(crate) struct RpcClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Deserialize, Debug)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RawHeader {
    number: String,
    timestamp: String,
}

impl RpcClient {
    pub(crate) fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }

    async fn call(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: RpcResponse = self
            .http
            .post(self.url.as_str())
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to deliver `{method}` request"))?
            .json()
            .await
            .with_context(|| format!("Failed to decode `{method}` response"))?;

        if let Some(err) = response.error {
            anyhow::bail!("RPC error for `{}`: {} (code {})", method, err.message, err.code);
        }
        response
            .result
            .with_context(|| format!("Empty result for `{method}`"))
    }

    /// Height of the most recent block the node knows about.
    pub(crate) async fn block_number(&self) -> anyhow::Result<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(
            result
                .as_str()
                .context("`eth_blockNumber` expected to return a hex quantity")?,
        )
    }

    pub(crate) async fn block_header(&self, height: u64) -> anyhow::Result<BlockHeader> {
        let result = self
            .call(
                "eth_getBlockByNumber",
                json!([format_quantity(height), false]),
            )
            .await?;
        if result.is_null() {
            anyhow::bail!("Block {} is not available on the RPC node", height);
        }
        let raw: RawHeader = serde_json::from_value(result)
            .with_context(|| format!("Failed to decode header of block {height}"))?;
        // The node reports seconds, the rest of the pipeline works in ms
        Ok(BlockHeader {
            height: parse_quantity(&raw.number)?,
            timestamp: parse_quantity(&raw.timestamp)? * 1000,
        })
    }

    /// Read-only contract call against the state at the given block height.
    pub(crate) async fn eth_call(
        &self,
        to: &str,
        data: &str,
        block_height: u64,
    ) -> anyhow::Result<String> {
        let result = self
            .call(
                "eth_call",
                json!([{"to": to, "data": data}, format_quantity(block_height)]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_owned)
            .context("`eth_call` expected to return hex data")
    }
}

pub(crate) fn parse_quantity(quantity: &str) -> anyhow::Result<u64> {
    let digits = quantity
        .strip_prefix("0x")
        .with_context(|| format!("`{quantity}` expected to be a 0x-prefixed hex quantity"))?;
    u64::from_str_radix(digits, 16)
        .with_context(|| format!("`{quantity}` expected to be a hex quantity"))
}

pub(crate) fn format_quantity(value: u64) -> String {
    format!("{value:#x}")
}
