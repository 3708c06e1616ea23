use anyhow::Context;
use bigdecimal::BigDecimal;
use futures::try_join;
use num_bigint::BigInt;

use circulation_database::models::CirculationFigures;

use crate::chain::erc20::Erc20Contract;
use crate::chain::BlockHeader;

/// PHA token contract on Base mainnet.
pub(crate) const CONTRACT_ADDRESS: &str = "0x336C9297AFB7798c292E9f80d8e566b947f291f0";
pub(crate) const CONTRACT_DEPLOYED_AT: u64 = 12743284;

const REWARD_ADDRESS: &str = "0x4731bc41b3cca4c2883b8ebb68cb546d5b3b4dd6";
const PHALA_CHAIN_BRIDGE_ADDRESS: &str = "0xcd38b15a419491c7c1238b0659f65c755792e257";
const KHALA_CHAIN_BRIDGE_ADDRESS: &str = "0xeec0fb4913119567cdfc0c5fc2bf8f9f9b226c2d";
const KHALA_LEGACY_CHAIN_BRIDGE_ADDRESS: &str = "0x6ed3bc069cf4f87de05c04c352e8356492ec6efe";
const SYGMA_BRIDGE_ADDRESS: &str = "0xC832588193cd5ED2185daDA4A531e0B26eC5B830";
const PORTAL_BRIDGE_ADDRESS: &str = "0x3ee18B2214AFF97000D974cf647E7C347E8fa585";

/// Token amounts are fixed-point integers with 18 decimal places.
const TOKEN_DECIMALS: i64 = 18;

/// Source of circulation figures for a given block. Seam between the
/// snapshot machinery and the chain-query layer.
pub(crate) trait CirculationSource {
    async fn fetch_circulation(&self, block: &BlockHeader) -> anyhow::Result<CirculationFigures>;
}

/// Escrow balances of the two generations of the Khala chain bridge. Only
/// the sum counts against circulation.
struct KhalaBridgeBalances {
    current: u128,
    legacy: u128,
}

impl KhalaBridgeBalances {
    fn total(&self) -> anyhow::Result<u128> {
        self.current
            .checked_add(self.legacy)
            .context("Khala bridge balances overflow u128")
    }
}

impl CirculationSource for Erc20Contract {
    async fn fetch_circulation(&self, block: &BlockHeader) -> anyhow::Result<CirculationFigures> {
        let height = block.height;
        // Independent reads of the same block state, so they can run
        // concurrently; all of them must resolve before the figures exist.
        let (total_supply, reward, phala_chain_bridge, khala_current, khala_legacy, sygma_bridge, portal_bridge) = try_join!(
            self.total_supply(height),
            self.balance_of(REWARD_ADDRESS, height),
            self.balance_of(PHALA_CHAIN_BRIDGE_ADDRESS, height),
            self.balance_of(KHALA_CHAIN_BRIDGE_ADDRESS, height),
            self.balance_of(KHALA_LEGACY_CHAIN_BRIDGE_ADDRESS, height),
            self.balance_of(SYGMA_BRIDGE_ADDRESS, height),
            self.balance_of(PORTAL_BRIDGE_ADDRESS, height),
        )?;

        let khala_chain_bridge = KhalaBridgeBalances {
            current: khala_current,
            legacy: khala_legacy,
        };

        build_figures(
            total_supply,
            reward,
            phala_chain_bridge,
            khala_chain_bridge.total()?,
            sygma_bridge,
            portal_bridge,
        )
    }
}

/// circulation = total_supply - reward - phala - khala - sygma - portal.
/// Computed in signed arithmetic: if the non-circulating balances ever
/// exceed total supply the deficit is recorded, not clamped.
fn build_figures(
    total_supply: u128,
    reward: u128,
    phala_chain_bridge: u128,
    khala_chain_bridge: u128,
    sygma_bridge: u128,
    portal_bridge: u128,
) -> anyhow::Result<CirculationFigures> {
    let mut circulation = to_signed(total_supply)?;
    for balance in [
        reward,
        phala_chain_bridge,
        khala_chain_bridge,
        sygma_bridge,
        portal_bridge,
    ] {
        circulation = circulation
            .checked_sub(to_signed(balance)?)
            .context("non-circulating balances overflow i128")?;
    }

    Ok(CirculationFigures {
        total_supply: to_balance(total_supply),
        reward: to_balance(reward),
        phala_chain_bridge: to_balance(phala_chain_bridge),
        khala_chain_bridge: to_balance(khala_chain_bridge),
        sygma_bridge: to_balance(sygma_bridge),
        portal_bridge: to_balance(portal_bridge),
        circulation: BigDecimal::new(BigInt::from(circulation), TOKEN_DECIMALS),
    })
}

/// Raw integer token units scaled to a human-readable decimal, exactly.
fn to_balance(raw: u128) -> BigDecimal {
    BigDecimal::new(BigInt::from(raw), TOKEN_DECIMALS)
}

fn to_signed(raw: u128) -> anyhow::Result<i128> {
    i128::try_from(raw).context("balance does not fit into i128")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    const ONE: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn scales_raw_units_to_decimals() {
        assert_eq!(to_balance(0), BigDecimal::from(0));
        assert_eq!(to_balance(ONE), BigDecimal::from(1));
        assert_eq!(
            to_balance(1),
            BigDecimal::from_str("0.000000000000000001").unwrap()
        );
        assert_eq!(
            to_balance(1_234_567_890_123_456_789),
            BigDecimal::from_str("1.234567890123456789").unwrap()
        );
    }

    #[test]
    fn circulation_is_total_supply_minus_non_circulating() {
        let figures = build_figures(100 * ONE, 5 * ONE, 3 * ONE, 4 * ONE, 2 * ONE, ONE).unwrap();
        assert_eq!(figures.total_supply, BigDecimal::from(100));
        assert_eq!(figures.reward, BigDecimal::from(5));
        assert_eq!(figures.phala_chain_bridge, BigDecimal::from(3));
        assert_eq!(figures.khala_chain_bridge, BigDecimal::from(4));
        assert_eq!(figures.sygma_bridge, BigDecimal::from(2));
        assert_eq!(figures.portal_bridge, BigDecimal::from(1));
        assert_eq!(figures.circulation, BigDecimal::from(85));
    }

    #[test]
    fn deficit_is_surfaced_as_negative_circulation() {
        let figures = build_figures(10 * ONE, 11 * ONE, 0, 0, 0, 0).unwrap();
        assert_eq!(figures.circulation, BigDecimal::from(-1));
    }

    #[test]
    fn khala_bridge_components_are_summed() {
        let bridge = KhalaBridgeBalances {
            current: 3 * ONE,
            legacy: ONE,
        };
        assert_eq!(bridge.total().unwrap(), 4 * ONE);

        let saturated = KhalaBridgeBalances {
            current: u128::MAX,
            legacy: 1,
        };
        assert!(saturated.total().is_err());
    }
}
