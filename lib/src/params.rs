use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KingError;
use crate::sha256::Hash;
use crate::types::BlockHeader;
use crate::{U256, compact};

/// Named rule sets a node can run under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Main,
    Test,
    Regtest,
    UnitTest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
            Network::UnitTest => "unittest",
        };
        write!(f, "{id}")
    }
}

impl FromStr for Network {
    type Err = KingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Network::Main),
            "test" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            "unittest" => Ok(Network::UnitTest),
            other => Err(KingError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Timespan/spacing pair one retargeting era runs under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetargetRegime {
    /// how long one full retarget window should take, in seconds.
    pub target_timespan: u64,
    /// intended time between blocks, in seconds.
    pub target_spacing: u64,
}

impl RetargetRegime {
    /// Number of blocks between difficulty recalculations.
    pub const fn interval(&self) -> u64 {
        self.target_timespan / self.target_spacing
    }
}

/// Supermajority voting thresholds for block-version upgrades. Not
/// consulted by the consensus core itself, but part of every rule set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorityThresholds {
    pub enforce_block_upgrade: u32,
    pub reject_block_outdated: u32,
    pub to_check_block_upgrade: u32,
}

/// Known-good block hashes by height, plus metadata consumed by
/// sync-progress estimation. Lookup only; a checkpoint never shortcuts
/// validation beyond "the hash at this height must equal this value".
#[derive(Clone, Debug)]
pub struct CheckpointData {
    checkpoints: BTreeMap<u64, Hash>,
    last_checkpoint_time: u64,
    transactions_at_last_checkpoint: u64,
    transactions_per_day_after: f64,
}

impl CheckpointData {
    fn new(
        checkpoints: &[(u64, Hash)],
        last_checkpoint_time: u64,
        transactions_at_last_checkpoint: u64,
        transactions_per_day_after: f64,
    ) -> Self {
        CheckpointData {
            checkpoints: checkpoints.iter().copied().collect(),
            last_checkpoint_time,
            transactions_at_last_checkpoint,
            transactions_per_day_after,
        }
    }

    pub fn checkpoint_at(&self, height: u64) -> Option<Hash> {
        self.checkpoints.get(&height).copied()
    }

    /// A block passes if no checkpoint exists at its height or the hash
    /// matches the checkpointed one.
    pub fn verify_block(&self, height: u64, hash: Hash) -> bool {
        match self.checkpoint_at(height) {
            Some(expected) => expected == hash,
            None => true,
        }
    }

    pub fn last_checkpoint(&self) -> Option<(u64, Hash)> {
        self.checkpoints
            .last_key_value()
            .map(|(height, hash)| (*height, *hash))
    }

    pub fn last_checkpoint_time(&self) -> u64 {
        self.last_checkpoint_time
    }

    pub fn transactions_at_last_checkpoint(&self) -> u64 {
        self.transactions_at_last_checkpoint
    }

    pub fn transactions_per_day_after(&self) -> f64 {
        self.transactions_per_day_after
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

/// Genesis descriptor: the header to hash and the hash it must produce.
#[derive(Clone, Copy, Debug)]
pub struct GenesisBlock {
    pub header: BlockHeader,
    pub hash: Hash,
}

impl GenesisBlock {
    /// Hashes the descriptor with the same primitives the node uses for
    /// blocks and checks the baked-in value. A mismatch means the
    /// binary is internally inconsistent and must not run.
    fn verified(header: BlockHeader, expected: Hash) -> Self {
        let hash = header.hash();
        assert_eq!(hash, expected, "genesis hash mismatch");
        GenesisBlock { header, hash }
    }
}

/// Easiest allowed target on main, test and unittest: ~0 >> 20.
const POW_LIMIT: U256 = U256([
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0x0000_0fff_ffff_ffff,
]);

/// Regtest runs almost without difficulty: ~0 >> 1.
const POW_LIMIT_REGTEST: U256 = U256([
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0x7fff_ffff_ffff_ffff,
]);

// 9f1a0404a4cb7f5f10d19fcdcc2689176e004787c4eb0449175b2035c12e15e4
const GENESIS_HASH: Hash = Hash::from_words([
    0x175b_2035_c12e_15e4,
    0x6e00_4787_c4eb_0449,
    0x10d1_9fcd_cc26_8917,
    0x9f1a_0404_a4cb_7f5f,
]);

// 820d22693889692493d1c58687298853b2d1dcaa93e56c540986c1620da09b9c
const GENESIS_MERKLE_ROOT: Hash = Hash::from_words([
    0x0986_c162_0da0_9b9c,
    0xb2d1_dcaa_93e5_6c54,
    0x93d1_c586_8729_8853,
    0x820d_2269_3889_6924,
]);

// 850991bdd67628caf969389b37d5edcaeb8dff0103e121f4d6ca1b4fceddca1b
const GENESIS_HASH_REGTEST: Hash = Hash::from_words([
    0xd6ca_1b4f_cedd_ca1b,
    0xeb8d_ff01_03e1_21f4,
    0xf969_389b_37d5_edca,
    0x8509_91bd_d676_28ca,
]);

const GENESIS_TIME: u32 = 1_673_049_600; // Sat Jan 07 2023 00:00:00 GMT
const GENESIS_BITS: u32 = 0x1e7f_ffff;
const GENESIS_NONCE: u32 = 77_808;

const GENESIS_TIME_REGTEST: u32 = 1_673_048_800;
const GENESIS_BITS_REGTEST: u32 = 0x207f_ffff;
const GENESIS_NONCE_REGTEST: u32 = 2;

/// The retargeting regimes, in era order: the bootstrap regime, then
/// the 10-minute window, then the 5-minute window. The 2.5-minute
/// spacing gives intervals of 2016, 4 and 2 blocks.
const REGIMES: [RetargetRegime; 3] = [
    RetargetRegime {
        target_timespan: 7 * 24 * 60 * 60 / 2, // 3.5 days
        target_spacing: 5 * 60 / 2,            // 2.5 minutes
    },
    RetargetRegime {
        target_timespan: 10 * 60,
        target_spacing: 5 * 60 / 2,
    },
    RetargetRegime {
        target_timespan: 5 * 60,
        target_spacing: 5 * 60 / 2,
    },
];

const MAJORITY: MajorityThresholds = MajorityThresholds {
    enforce_block_upgrade: 750,
    reject_block_outdated: 950,
    to_check_block_upgrade: 1000,
};

const MAX_TIP_AGE: u64 = 90 * 24 * 60 * 60; // 90 days

const ALERT_KEY: &str = "043014c67b78f95c8964ba4f10bc83ce6dbee8d6afeb0570552e2f7562f83a5ae6cc937900545ab5c30a84565315d55107d5269e816c50e4080ca89dc2cc64e9c2";

const DNS_SEEDS: &[&str] = &[
    "king.odj.ru",
    "king1.odj.ru",
    "king2.odj.ru",
    "king3.odj.ru",
    "king4.odj.ru",
    "king5.odj.ru",
    "nodea.exip.net",
    "nodeb.exip.net",
    "nodec.exip.net",
    "nodes.exip.net",
    "node1.exip.net",
    "node2.exip.net",
    "node3.exip.net",
    "node4.exip.net",
    "node5.exip.net",
    "node.ladaco.info",
    "node1.ladaco.info",
    "node2.ladaco.info",
    "node3.ladaco.info",
];

fn genesis_header(time: u32, bits: u32, nonce: u32) -> BlockHeader {
    BlockHeader {
        version: 1,
        prev_block_hash: Hash::zero(),
        merkle_root: GENESIS_MERKLE_ROOT,
        time,
        bits,
        nonce,
    }
}

fn dns_seeds() -> Vec<String> {
    DNS_SEEDS.iter().map(|seed| seed.to_string()).collect()
}

/// An immutable bundle of consensus rules for one network. Construct
/// once per network and only read afterwards; only the unit-test
/// variant may be reshaped, through the registry's modifiable view.
#[derive(Clone, Debug)]
pub struct ChainParams {
    network: Network,
    magic: [u8; 4],
    default_port: u16,
    alert_key: Vec<u8>,
    pow_limit: U256,
    halving_interval: u64,
    majority: MajorityThresholds,
    regimes: [RetargetRegime; 3],
    max_tip_age: u64,
    miner_threads: u32,
    allow_min_difficulty_blocks: bool,
    skip_proof_of_work_check: bool,
    require_standard: bool,
    mining_requires_peers: bool,
    mine_blocks_on_demand: bool,
    default_consistency_checks: bool,
    enforce_v2_after_height: Option<u64>,
    genesis: GenesisBlock,
    dns_seeds: Vec<String>,
    fixed_seeds: Vec<SocketAddr>,
    checkpoints: CheckpointData,
}

impl ChainParams {
    /// The main network.
    pub fn main() -> Self {
        ChainParams {
            network: Network::Main,
            // Rarely used upper ASCII, not valid as UTF-8, and a large
            // 4-byte int at any alignment.
            magic: [0xfb, 0xc0, 0xb6, 0xdb],
            default_port: 8644,
            alert_key: hex::decode(ALERT_KEY).expect("BUG: alert key is valid hex"),
            pow_limit: POW_LIMIT,
            halving_interval: 210_000,
            majority: MAJORITY,
            regimes: REGIMES,
            max_tip_age: MAX_TIP_AGE,
            miner_threads: 0,
            allow_min_difficulty_blocks: true,
            skip_proof_of_work_check: false,
            require_standard: true,
            mining_requires_peers: true,
            mine_blocks_on_demand: false,
            default_consistency_checks: false,
            // v2 blocks enforced as of block 710k
            enforce_v2_after_height: Some(710_000),
            genesis: GenesisBlock::verified(
                genesis_header(GENESIS_TIME, GENESIS_BITS, GENESIS_NONCE),
                GENESIS_HASH,
            ),
            dns_seeds: dns_seeds(),
            fixed_seeds: Vec::new(),
            checkpoints: CheckpointData::new(&[(0, GENESIS_HASH)], 1_673_049_600, 0, 1152.0),
        }
    }

    /// The test network. Shares main's genesis and work rules; it is a
    /// separate deployment, not a separate rule book.
    pub fn test() -> Self {
        ChainParams {
            network: Network::Test,
            default_port: 9333,
            mining_requires_peers: true,
            checkpoints: CheckpointData::new(&[(0, GENESIS_HASH)], 1_673_049_600, 0, 576.0),
            ..Self::main()
        }
    }

    /// The regression-test network: near-zero difficulty, no seeds,
    /// blocks minted on demand.
    pub fn regtest() -> Self {
        ChainParams {
            network: Network::Regtest,
            magic: [0xfa, 0xbf, 0xb5, 0xda],
            default_port: 19_444,
            alert_key: hex::decode(ALERT_KEY).expect("BUG: alert key is valid hex"),
            pow_limit: POW_LIMIT_REGTEST,
            halving_interval: 150,
            majority: MAJORITY,
            regimes: REGIMES,
            max_tip_age: MAX_TIP_AGE,
            miner_threads: 1,
            allow_min_difficulty_blocks: true,
            skip_proof_of_work_check: false,
            require_standard: false,
            mining_requires_peers: false,
            mine_blocks_on_demand: true,
            default_consistency_checks: true,
            enforce_v2_after_height: None,
            genesis: GenesisBlock::verified(
                genesis_header(
                    GENESIS_TIME_REGTEST,
                    GENESIS_BITS_REGTEST,
                    GENESIS_NONCE_REGTEST,
                ),
                GENESIS_HASH_REGTEST,
            ),
            dns_seeds: Vec::new(),
            fixed_seeds: Vec::new(),
            checkpoints: CheckpointData::new(&[(0, GENESIS_HASH_REGTEST)], 0, 0, 0.0),
        }
    }

    /// The unit-test network: main's rules with the test conveniences
    /// flipped, and the only variant the registry will hand out a
    /// mutable view of.
    pub fn unit_test() -> Self {
        ChainParams {
            network: Network::UnitTest,
            default_port: 18_445,
            allow_min_difficulty_blocks: false,
            mining_requires_peers: false,
            mine_blocks_on_demand: true,
            default_consistency_checks: true,
            enforce_v2_after_height: None,
            dns_seeds: Vec::new(),
            fixed_seeds: Vec::new(),
            ..Self::main()
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn magic(&self) -> [u8; 4] {
        self.magic
    }

    pub fn default_port(&self) -> u16 {
        self.default_port
    }

    pub fn alert_key(&self) -> &[u8] {
        &self.alert_key
    }

    /// The easiest target any block may claim.
    pub fn pow_limit(&self) -> U256 {
        self.pow_limit
    }

    /// Compact encoding of the proof-of-work limit.
    pub fn pow_limit_bits(&self) -> u32 {
        compact::compress(self.pow_limit)
    }

    pub fn halving_interval(&self) -> u64 {
        self.halving_interval
    }

    pub fn majority(&self) -> MajorityThresholds {
        self.majority
    }

    /// The retargeting regimes in era order.
    pub fn regimes(&self) -> &[RetargetRegime; 3] {
        &self.regimes
    }

    pub fn max_tip_age(&self) -> u64 {
        self.max_tip_age
    }

    pub fn miner_threads(&self) -> u32 {
        self.miner_threads
    }

    pub fn allow_min_difficulty_blocks(&self) -> bool {
        self.allow_min_difficulty_blocks
    }

    pub fn skip_proof_of_work_check(&self) -> bool {
        self.skip_proof_of_work_check
    }

    pub fn require_standard(&self) -> bool {
        self.require_standard
    }

    pub fn mining_requires_peers(&self) -> bool {
        self.mining_requires_peers
    }

    pub fn mine_blocks_on_demand(&self) -> bool {
        self.mine_blocks_on_demand
    }

    pub fn default_consistency_checks(&self) -> bool {
        self.default_consistency_checks
    }

    pub fn enforce_v2_after_height(&self) -> Option<u64> {
        self.enforce_v2_after_height
    }

    pub fn genesis(&self) -> &GenesisBlock {
        &self.genesis
    }

    pub fn dns_seeds(&self) -> &[String] {
        &self.dns_seeds
    }

    pub fn fixed_seeds(&self) -> &[SocketAddr] {
        &self.fixed_seeds
    }

    pub fn checkpoints(&self) -> &CheckpointData {
        &self.checkpoints
    }

    fn assert_mutable(&self) {
        assert_eq!(
            self.network,
            Network::UnitTest,
            "parameters are immutable outside the unit-test network"
        );
    }

    pub(crate) fn set_halving_interval(&mut self, blocks: u64) {
        self.assert_mutable();
        self.halving_interval = blocks;
    }

    pub(crate) fn set_enforce_block_upgrade_majority(&mut self, blocks: u32) {
        self.assert_mutable();
        self.majority.enforce_block_upgrade = blocks;
    }

    pub(crate) fn set_reject_block_outdated_majority(&mut self, blocks: u32) {
        self.assert_mutable();
        self.majority.reject_block_outdated = blocks;
    }

    pub(crate) fn set_to_check_block_upgrade_majority(&mut self, blocks: u32) {
        self.assert_mutable();
        self.majority.to_check_block_upgrade = blocks;
    }

    pub(crate) fn set_default_consistency_checks(&mut self, on: bool) {
        self.assert_mutable();
        self.default_consistency_checks = on;
    }

    pub(crate) fn set_allow_min_difficulty_blocks(&mut self, on: bool) {
        self.assert_mutable();
        self.allow_min_difficulty_blocks = on;
    }

    pub(crate) fn set_skip_proof_of_work_check(&mut self, on: bool) {
        self.assert_mutable();
        self.skip_proof_of_work_check = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_parameters_match_the_network_rules() {
        let params = ChainParams::main();
        assert_eq!(params.network(), Network::Main);
        assert_eq!(params.magic(), [0xfb, 0xc0, 0xb6, 0xdb]);
        assert_eq!(params.default_port(), 8644);
        assert_eq!(params.halving_interval(), 210_000);
        assert_eq!(params.pow_limit_bits(), 0x1e0fffff);
        assert_eq!(params.max_tip_age(), 90 * 24 * 60 * 60);
        assert!(params.allow_min_difficulty_blocks());
        assert!(!params.skip_proof_of_work_check());
        assert!(params.require_standard());
        assert_eq!(params.enforce_v2_after_height(), Some(710_000));
        assert_eq!(params.dns_seeds().len(), 19);
        assert_eq!(params.alert_key().len(), 65);
    }

    #[test]
    fn regime_intervals_derive_from_timespan_and_spacing() {
        let params = ChainParams::main();
        let intervals: Vec<u64> = params.regimes().iter().map(|r| r.interval()).collect();
        assert_eq!(intervals, vec![2016, 4, 2]);
        assert_eq!(params.regimes()[0].target_timespan, 302_400);
        assert_eq!(params.regimes()[0].target_spacing, 150);
    }

    #[test]
    fn genesis_hashes_verify_for_every_network() {
        assert_eq!(
            ChainParams::main().genesis().hash.to_string(),
            "9f1a0404a4cb7f5f10d19fcdcc2689176e004787c4eb0449175b2035c12e15e4"
        );
        assert_eq!(ChainParams::test().genesis().hash, GENESIS_HASH);
        assert_eq!(ChainParams::unit_test().genesis().hash, GENESIS_HASH);
        assert_eq!(
            ChainParams::regtest().genesis().hash.to_string(),
            "850991bdd67628caf969389b37d5edcaeb8dff0103e121f4d6ca1b4fceddca1b"
        );
    }

    #[test]
    fn regtest_relaxes_the_rules() {
        let params = ChainParams::regtest();
        assert_eq!(params.magic(), [0xfa, 0xbf, 0xb5, 0xda]);
        assert_eq!(params.default_port(), 19_444);
        assert_eq!(params.halving_interval(), 150);
        assert_eq!(params.pow_limit_bits(), 0x207fffff);
        assert!(!params.require_standard());
        assert!(params.mine_blocks_on_demand());
        assert!(params.dns_seeds().is_empty());
        assert!(params.fixed_seeds().is_empty());
    }

    #[test]
    fn unit_test_network_disables_min_difficulty_by_default() {
        let params = ChainParams::unit_test();
        assert_eq!(params.default_port(), 18_445);
        assert!(!params.allow_min_difficulty_blocks());
        assert!(params.mine_blocks_on_demand());
        // Everything else is main's rule book.
        assert_eq!(params.pow_limit(), ChainParams::main().pow_limit());
        assert_eq!(params.halving_interval(), 210_000);
    }

    #[test]
    fn checkpoints_look_up_by_height_only() {
        let params = ChainParams::main();
        let checkpoints = params.checkpoints();
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints.checkpoint_at(0), Some(GENESIS_HASH));
        assert_eq!(checkpoints.checkpoint_at(1), None);
        assert!(checkpoints.verify_block(0, GENESIS_HASH));
        assert!(!checkpoints.verify_block(0, Hash::zero()));
        // Heights without a checkpoint always pass.
        assert!(checkpoints.verify_block(42, Hash::zero()));
        assert_eq!(checkpoints.last_checkpoint(), Some((0, GENESIS_HASH)));
        assert_eq!(checkpoints.last_checkpoint_time(), 1_673_049_600);
        assert_eq!(checkpoints.transactions_per_day_after(), 1152.0);
        assert_eq!(
            ChainParams::test().checkpoints().transactions_per_day_after(),
            576.0
        );
    }

    #[test]
    fn network_names_round_trip() {
        for network in [
            Network::Main,
            Network::Test,
            Network::Regtest,
            Network::UnitTest,
        ] {
            assert_eq!(network.to_string().parse::<Network>().unwrap(), network);
        }
        assert!(matches!(
            "signet".parse::<Network>(),
            Err(KingError::UnknownNetwork(_))
        ));
    }

    #[test]
    #[should_panic(expected = "immutable outside the unit-test network")]
    fn production_parameters_reject_mutation() {
        ChainParams::main().set_skip_proof_of_work_check(true);
    }
}
