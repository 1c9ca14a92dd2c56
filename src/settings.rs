use config::{Config, ConfigError, File};
use ethers::types::Address;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::env;

/// Ethereum mainnet WETH, the default connector asset.
pub static WETH: Lazy<Address> = Lazy::new(|| {
    "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
        .parse()
        .expect("mainnet WETH address")
});

/// Balancer V2 DAI/USDC/USDT stable pool.
pub static BALANCER_STABLE_3POOL_ID: Lazy<[u8; 32]> = Lazy::new(|| {
    pool_id_from_hex("06df3b2bbb68adc8b0e302443692037ed9f91b42000000000000000000000063")
});

/// Balancer V2 BAL/WETH 80/20 weighted pool.
pub static BALANCER_BAL_WETH_POOL_ID: Lazy<[u8; 32]> = Lazy::new(|| {
    pool_id_from_hex("5c6ee304399dbdb9c8ef030ab642b10820db8f56000200000000000000000014")
});

fn pool_id_from_hex(raw: &str) -> [u8; 32] {
    let mut id = [0u8; 32];
    let bytes = hex::decode(raw).expect("pool id hex literal");
    id.copy_from_slice(&bytes);
    id
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingSettings {
    /// Intermediate asset for connector-hop routes.
    #[serde(default = "default_connector")]
    pub connector: Address,
    /// Concentrated-liquidity fee tiers probed per pair, in pips.
    #[serde(default = "default_fee_tiers")]
    pub fee_tiers: Vec<u32>,
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u32,
}

fn default_connector() -> Address {
    *WETH
}
fn default_fee_tiers() -> Vec<u32> {
    vec![100, 500, 3000, 10000]
}
fn default_slippage_bps() -> u32 {
    50 // 0.5%
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            connector: default_connector(),
            fee_tiers: default_fee_tiers(),
            default_slippage_bps: default_slippage_bps(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeeSettings {
    #[serde(default = "default_v2_fee_bps")]
    pub uniswap_v2_bps: u32,
    #[serde(default = "default_v2_fee_bps")]
    pub sushiswap_bps: u32,
}

fn default_v2_fee_bps() -> u32 {
    30
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            uniswap_v2_bps: default_v2_fee_bps(),
            sushiswap_bps: default_v2_fee_bps(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PricerSettings {
    #[serde(default)]
    pub routing: RoutingSettings,
    #[serde(default)]
    pub fees: FeeSettings,
    #[serde(default)]
    pub log: LogSettings,
}

impl PricerSettings {
    /// Load from `Pricer.toml` when present, falling back to mainnet
    /// defaults, with the connector overridable via `PRICER_CONNECTOR`.
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("Pricer").required(false))
            .build()?;
        let mut settings: Self = s.try_deserialize()?;

        if let Ok(raw) = env::var("PRICER_CONNECTOR") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                if let Ok(addr) = trimmed.parse() {
                    settings.routing.connector = addr;
                }
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_mainnet_constants() {
        let settings = PricerSettings::default();
        assert_eq!(settings.routing.connector, *WETH);
        assert_eq!(settings.routing.fee_tiers, vec![100, 500, 3000, 10000]);
        assert_eq!(settings.fees.uniswap_v2_bps, 30);
    }

    #[test]
    fn well_known_pool_ids_decode() {
        // both literals end in their pool nonce, not zero padding
        assert_eq!(BALANCER_STABLE_3POOL_ID[31], 0x63);
        assert_eq!(BALANCER_BAL_WETH_POOL_ID[31], 0x14);
    }

    #[test]
    fn config_file_loading_is_optional() {
        let settings = PricerSettings::new().expect("defaults without a config file");
        assert!(!settings.routing.fee_tiers.is_empty());
    }
}
