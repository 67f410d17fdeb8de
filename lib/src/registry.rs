use std::sync::{LazyLock, RwLock, RwLockWriteGuard};

use crate::params::{ChainParams, Network};

static MAIN: LazyLock<ChainParams> = LazyLock::new(ChainParams::main);
static TEST: LazyLock<ChainParams> = LazyLock::new(ChainParams::test);
static REGTEST: LazyLock<ChainParams> = LazyLock::new(ChainParams::regtest);
// The unit-test set is the one sanctioned mutable parameter set; it
// lives behind a lock so `ModifiableParams` can rewrite it in place.
static UNIT_TEST: LazyLock<RwLock<ChainParams>> =
    LazyLock::new(|| RwLock::new(ChainParams::unit_test()));

static CURRENT: RwLock<Option<Network>> = RwLock::new(None);

/// Activates the parameter set for `network`. All four sets are built,
/// and their genesis blocks verified, on the first call: a broken
/// genesis must abort startup, not the first block validation.
/// Selecting a different network later is a full context switch; the
/// engine reads parameters per call, so nothing from the old selection
/// survives.
pub fn select_network(network: Network) {
    LazyLock::force(&MAIN);
    LazyLock::force(&TEST);
    LazyLock::force(&REGTEST);
    LazyLock::force(&UNIT_TEST);
    *CURRENT.write().expect("BUG: selection lock poisoned") = Some(network);
}

/// Snapshot of the currently selected parameter set.
///
/// # Panics
///
/// If no network has been selected. Reading parameters before
/// `select_network` is a broken caller, not a runtime condition.
pub fn active_params() -> ChainParams {
    let network = CURRENT
        .read()
        .expect("BUG: selection lock poisoned")
        .expect("no network selected");
    params_for(network)
}

/// The network currently selected, if any.
pub fn active_network() -> Option<Network> {
    *CURRENT.read().expect("BUG: selection lock poisoned")
}

/// Pure lookup; does not touch the current selection.
pub fn params_for(network: Network) -> ChainParams {
    match network {
        Network::Main => MAIN.clone(),
        Network::Test => TEST.clone(),
        Network::Regtest => REGTEST.clone(),
        Network::UnitTest => UNIT_TEST
            .read()
            .expect("BUG: unit-test params lock poisoned")
            .clone(),
    }
}

/// Mutable view over the unit-test parameter set. The guard serializes
/// mutation against concurrent readers; hold it only as long as the
/// overrides take.
///
/// # Panics
///
/// Unless the active network is `UnitTest`. Production rule sets are
/// tamper-proof after construction.
pub fn modifiable_params() -> ModifiableParams {
    let current = active_network();
    assert_eq!(
        current,
        Some(Network::UnitTest),
        "modifiable params are only available on the unit-test network"
    );
    ModifiableParams {
        guard: UNIT_TEST
            .write()
            .expect("BUG: unit-test params lock poisoned"),
    }
}

/// Write access to the unit-test rule set, for test fixtures that need
/// to reshape halving, majority voting or the proof-of-work checks.
pub struct ModifiableParams {
    guard: RwLockWriteGuard<'static, ChainParams>,
}

impl ModifiableParams {
    pub fn set_halving_interval(&mut self, blocks: u64) {
        self.guard.set_halving_interval(blocks);
    }

    pub fn set_enforce_block_upgrade_majority(&mut self, blocks: u32) {
        self.guard.set_enforce_block_upgrade_majority(blocks);
    }

    pub fn set_reject_block_outdated_majority(&mut self, blocks: u32) {
        self.guard.set_reject_block_outdated_majority(blocks);
    }

    pub fn set_to_check_block_upgrade_majority(&mut self, blocks: u32) {
        self.guard.set_to_check_block_upgrade_majority(blocks);
    }

    pub fn set_default_consistency_checks(&mut self, on: bool) {
        self.guard.set_default_consistency_checks(on);
    }

    pub fn set_allow_min_difficulty_blocks(&mut self, on: bool) {
        self.guard.set_allow_min_difficulty_blocks(on);
    }

    pub fn set_skip_proof_of_work_check(&mut self, on: bool) {
        self.guard.set_skip_proof_of_work_check(on);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};

    use super::*;

    // The registry is process-global, so these tests have to run one
    // at a time. A should_panic test poisons the mutex on purpose.
    static SERIAL: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn selecting_a_network_activates_its_parameters() {
        let _guard = serial();
        select_network(Network::Main);
        assert_eq!(active_network(), Some(Network::Main));
        assert_eq!(active_params().network(), Network::Main);
        assert_eq!(active_params().default_port(), 8644);
    }

    #[test]
    fn switching_networks_is_a_full_context_switch() {
        let _guard = serial();
        select_network(Network::Main);
        select_network(Network::Regtest);
        assert_eq!(active_params().network(), Network::Regtest);
        assert_eq!(active_params().default_port(), 19_444);
        assert_eq!(active_params().pow_limit_bits(), 0x207fffff);
        select_network(Network::Main);
        assert_eq!(active_params().pow_limit_bits(), 0x1e0fffff);
    }

    #[test]
    fn params_for_never_changes_the_selection() {
        let _guard = serial();
        select_network(Network::Main);
        assert_eq!(params_for(Network::Regtest).network(), Network::Regtest);
        assert_eq!(params_for(Network::UnitTest).network(), Network::UnitTest);
        assert_eq!(active_network(), Some(Network::Main));
    }

    #[test]
    fn modifiable_params_rewrite_the_unit_test_set() {
        let _guard = serial();
        select_network(Network::UnitTest);
        {
            let mut params = modifiable_params();
            params.set_halving_interval(5);
            params.set_skip_proof_of_work_check(true);
            params.set_enforce_block_upgrade_majority(51);
        }
        let params = active_params();
        assert_eq!(params.halving_interval(), 5);
        assert!(params.skip_proof_of_work_check());
        assert_eq!(params.majority().enforce_block_upgrade, 51);
        // Restore the defaults for any test that runs after us.
        let mut params = modifiable_params();
        params.set_halving_interval(210_000);
        params.set_skip_proof_of_work_check(false);
        params.set_enforce_block_upgrade_majority(750);
    }

    #[test]
    #[should_panic(expected = "only available on the unit-test network")]
    fn modifiable_params_panic_off_the_unit_test_network() {
        let _guard = serial();
        select_network(Network::Main);
        let _ = modifiable_params();
    }
}
