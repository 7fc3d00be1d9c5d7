//! Read-only chain queries for status replies.

use crate::error::ChainError;

use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait ChainReader: Send + Sync + 'static {
    /// Balance of `address` in wei.
    async fn balance(&self, address: &str) -> Result<u128, ChainError>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u128, ChainError>;
}

/// Ethereum JSON-RPC over HTTP.
#[derive(Debug, Clone)]
pub struct JsonRpcChain {
    http: reqwest::Client,
    rpc_url: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl JsonRpcChain {
    pub fn new(http: reqwest::Client, rpc_url: impl Into<String>) -> Self {
        Self {
            http,
            rpc_url: rpc_url.into(),
        }
    }

    async fn call_quantity(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<u128, ChainError> {
        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| ChainError::InvalidQuantity("missing result".into()))?;
        parse_quantity(&result)
    }
}

#[async_trait]
impl ChainReader for JsonRpcChain {
    async fn balance(&self, address: &str) -> Result<u128, ChainError> {
        self.call_quantity("eth_getBalance", serde_json::json!([address, "latest"]))
            .await
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.call_quantity("eth_gasPrice", serde_json::json!([])).await
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(raw: &str) -> Result<u128, ChainError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidQuantity(raw.to_string()))?;
    if digits.is_empty() {
        return Err(ChainError::InvalidQuantity(raw.to_string()));
    }
    u128::from_str_radix(digits, 16).map_err(|_| ChainError::InvalidQuantity(raw.to_string()))
}

/// Wei rendered as ETH with four decimals.
pub fn format_eth(wei: u128) -> String {
    format_scaled(wei, 18, 4)
}

/// Wei rendered as gwei with two decimals.
pub fn format_gwei(wei: u128) -> String {
    format_scaled(wei, 9, 2)
}

fn format_scaled(value: u128, exponent: u32, decimals: u32) -> String {
    let unit = 10u128.pow(exponent);
    let step = 10u128.pow(exponent - decimals);
    // Round half up at the last displayed decimal.
    let rounded = value.saturating_add(step / 2) / step;
    let scale = 10u128.pow(decimals);
    format!(
        "{}.{:0width$}",
        rounded / scale,
        rounded % scale,
        width = decimals as usize
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_quantity("0x0").expect("zero"), 0);
        assert_eq!(parse_quantity("0x3b9aca00").expect("one gwei"), 1_000_000_000);
        assert!(parse_quantity("1234").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn formats_eth_with_four_decimals() {
        assert_eq!(format_eth(0), "0.0000");
        assert_eq!(format_eth(1_000_000_000_000_000_000), "1.0000");
        assert_eq!(format_eth(12_345_678_900_000_000), "0.0123");
        assert_eq!(format_eth(99_995_000_000_000), "0.0001");
    }

    #[test]
    fn formats_gwei_with_two_decimals() {
        assert_eq!(format_gwei(1_000_000_000), "1.00");
        assert_eq!(format_gwei(5_000_000), "0.01");
        assert_eq!(format_gwei(123_456_789_000), "123.46");
    }
}
