use std::str::FromStr;

use anyhow::Context;
use bigdecimal::BigDecimal;

/// Supply components sampled from the token contract at a single block.
/// All values are scale-18 decimals derived from raw integer token units.
#[derive(Clone, Debug, PartialEq)]
pub struct CirculationFigures {
    pub total_supply: BigDecimal,
    pub reward: BigDecimal,
    pub phala_chain_bridge: BigDecimal,
    /// Sum of the current and legacy Khala bridge escrows.
    pub khala_chain_bridge: BigDecimal,
    pub sygma_bridge: BigDecimal,
    pub portal_bridge: BigDecimal,
    /// Total supply minus every non-circulating balance. A deficit is
    /// recorded as a negative value, not clamped.
    pub circulation: BigDecimal,
}

pub(crate) fn parse_decimal(value: &str, column: &str) -> anyhow::Result<BigDecimal> {
    BigDecimal::from_str(value).with_context(|| format!("`{column}` expected to be a decimal"))
}
