use anyhow::Context;

use super::RpcClient;

// First four bytes of the keccak-256 hash of the function signatures.
const BALANCE_OF_SELECTOR: &str = "70a08231";
const TOTAL_SUPPLY_SELECTOR: &str = "18160ddd";

/// Read-only handle to an ERC-20 contract at a fixed address.
#[derive(Clone)]
pub(crate) struct Erc20Contract {
    client: RpcClient,
    address: &'static str,
}

impl Erc20Contract {
    pub(crate) fn new(client: RpcClient, address: &'static str) -> Self {
        Self { client, address }
    }

    pub(crate) async fn balance_of(&self, holder: &str, block_height: u64) -> anyhow::Result<u128> {
        let data = encode_balance_of(holder)?;
        let word = self
            .client
            .eth_call(self.address, &data, block_height)
            .await
            .with_context(|| format!("Failed to query balanceOf({holder}) at block {block_height}"))?;
        decode_word(&word)
    }

    pub(crate) async fn total_supply(&self, block_height: u64) -> anyhow::Result<u128> {
        let data = format!("0x{TOTAL_SUPPLY_SELECTOR}");
        let word = self
            .client
            .eth_call(self.address, &data, block_height)
            .await
            .with_context(|| format!("Failed to query totalSupply at block {block_height}"))?;
        decode_word(&word)
    }
}

/// Selector plus the holder address left-padded to a 32-byte word.
fn encode_balance_of(holder: &str) -> anyhow::Result<String> {
    let stripped = holder
        .strip_prefix("0x")
        .with_context(|| format!("`{holder}` expected to be a 0x-prefixed address"))?;
    let raw = hex::decode(stripped).with_context(|| format!("`{holder}` is not valid hex"))?;
    anyhow::ensure!(raw.len() == 20, "`{}` is not a 20-byte address", holder);

    let mut data = format!("0x{BALANCE_OF_SELECTOR}");
    data.push_str(&"0".repeat(24));
    data.push_str(&hex::encode(raw));
    Ok(data)
}

/// Decodes a single 32-byte return word into a token amount. Values beyond
/// u128 are rejected rather than truncated.
fn decode_word(word: &str) -> anyhow::Result<u128> {
    let digits = word
        .strip_prefix("0x")
        .with_context(|| format!("`{word}` expected to be 0x-prefixed return data"))?;
    anyhow::ensure!(
        digits.len() == 64,
        "expected a 32-byte return word, got {} hex digits",
        digits.len()
    );
    let (high, low) = digits.split_at(32);
    anyhow::ensure!(
        high.bytes().all(|b| b == b'0'),
        "return word does not fit into u128: 0x{}",
        digits
    );
    u128::from_str_radix(low, 16).with_context(|| format!("`{word}` is not a hex amount"))
}
