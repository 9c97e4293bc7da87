//! Shared fixtures for governance integration tests.

#![allow(dead_code)]

use std::sync::Once;

use concord_governance::{GovernanceConfig, GovernanceDao, Role};
use concord_types::Address;
use tracing_subscriber::{fmt, EnvFilter};

pub const DAO: u8 = 0xD0;
pub const ADMIN: u8 = 0xA0;
pub const GUARDIAN: u8 = 0xB0;
pub const EXECUTOR: u8 = 0xE0;

/// Install a test-writer subscriber once. Filter with `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn addr(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

/// DAO on the testnet preset (60 s timelock) with one executor.
pub fn setup() -> GovernanceDao {
    setup_with(GovernanceConfig::testnet())
}

pub fn setup_with(config: GovernanceConfig) -> GovernanceDao {
    init_tracing();
    let mut dao = GovernanceDao::bootstrap(addr(DAO), config, addr(ADMIN), addr(GUARDIAN)).unwrap();
    dao.grant_role(addr(ADMIN), Role::Executor, addr(EXECUTOR)).unwrap();
    dao.drain_events();
    dao
}
