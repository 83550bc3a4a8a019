//! Consensus rule sets.

use crate::constants::{
    MAX_OPS_PER_SCRIPT, MAX_OPS_PER_SCRIPT_MAGNETIC, MAX_PUBKEYS_PER_MULTISIG,
    MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_SIZE, MAX_STACK_MEMORY_USAGE, MAX_STACK_SIZE,
};
use crate::num::ScriptNum;
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Script verification flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VerifyFlags: u32 {
        const NONE = 0;
        /// Evaluate P2SH subscripts (BIP16).
        const P2SH = 1 << 0;
        /// Passing a non-strict-DER signature or one with undefined hashtype
        /// to a checksig operation causes script failure.
        const STRICTENC = 1 << 1;
        /// Passing a non-strict-DER signature to a checksig operation causes
        /// script failure (BIP62 rule 1).
        const DERSIG = 1 << 2;
        /// Passing a non-strict-DER signature or one with S > order/2 to a
        /// checksig operation causes script failure (BIP62 rule 5).
        const LOW_S = 1 << 3;
        /// Verify dummy stack item consumed by CHECKMULTISIG is of zero-length.
        const NULLDUMMY = 1 << 4;
        /// Require minimal encodings for all push operations and numbers.
        const MINIMALDATA = 1 << 5;
        /// Discourage use of NOPs reserved for upgrades (NOP1, NOP3-10).
        const DISCOURAGE_UPGRADABLE_NOPS = 1 << 6;
        /// Require that only a single stack element remains after evaluation.
        const CLEANSTACK = 1 << 7;
        /// Verify CHECKLOCKTIMEVERIFY (BIP65).
        const CHECKLOCKTIMEVERIFY = 1 << 8;
        /// Signatures may, and under STRICTENC must, commit to the fork id.
        const ENABLESIGHASHFORKID = 1 << 9;
        /// Re-enable the splice and bitwise opcodes.
        const MONOLITH = 1 << 10;
        /// Raise the operation limit.
        const MAGNETIC = 1 << 11;
        /// Lift size limits and restore original OP_RETURN semantics.
        const GENESIS = 1 << 12;
        const CHRONICLE = 1 << 13;
    }
}

impl VerifyFlags {
    pub fn verify_p2sh(&self) -> bool {
        self.contains(Self::P2SH)
    }

    pub fn verify_strictenc(&self) -> bool {
        self.contains(Self::STRICTENC)
    }

    pub fn verify_dersig(&self) -> bool {
        self.contains(Self::DERSIG)
    }

    pub fn verify_low_s(&self) -> bool {
        self.contains(Self::LOW_S)
    }

    pub fn verify_nulldummy(&self) -> bool {
        self.contains(Self::NULLDUMMY)
    }

    pub fn verify_minimaldata(&self) -> bool {
        self.contains(Self::MINIMALDATA)
    }

    pub fn verify_discourage_upgradable_nops(&self) -> bool {
        self.contains(Self::DISCOURAGE_UPGRADABLE_NOPS)
    }

    pub fn verify_cleanstack(&self) -> bool {
        self.contains(Self::CLEANSTACK)
    }

    pub fn verify_locktime(&self) -> bool {
        self.contains(Self::CHECKLOCKTIMEVERIFY)
    }

    pub fn enable_sighash_forkid(&self) -> bool {
        self.contains(Self::ENABLESIGHASHFORKID)
    }

    /// Whether the opcodes re-enabled by the monolith upgrade are usable.
    pub fn monolith_opcodes(&self) -> bool {
        self.intersects(Self::MONOLITH | Self::MAGNETIC | Self::GENESIS | Self::CHRONICLE)
    }

    pub fn is_genesis(&self) -> bool {
        self.contains(Self::GENESIS)
    }
}

/// Protocol upgrades, in activation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Epoch {
    Legacy,
    P2sh,
    Bip66,
    Bip65,
    Uahf,
    Daa,
    Monolith,
    Magnetic,
    Genesis,
    Chronicle,
}

impl Epoch {
    pub const ALL: [Epoch; 10] = [
        Self::Legacy,
        Self::P2sh,
        Self::Bip66,
        Self::Bip65,
        Self::Uahf,
        Self::Daa,
        Self::Monolith,
        Self::Magnetic,
        Self::Genesis,
        Self::Chronicle,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::P2sh => "p2sh",
            Self::Bip66 => "bip66",
            Self::Bip65 => "bip65",
            Self::Uahf => "uahf",
            Self::Daa => "daa",
            Self::Monolith => "monolith",
            Self::Magnetic => "magnetic",
            Self::Genesis => "genesis",
            Self::Chronicle => "chronicle",
        }
    }

    /// Flags switched on by this upgrade alone.
    const fn activated(self) -> VerifyFlags {
        match self {
            Self::Legacy => VerifyFlags::NONE,
            Self::P2sh => VerifyFlags::P2SH,
            Self::Bip66 => VerifyFlags::DERSIG,
            Self::Bip65 => VerifyFlags::CHECKLOCKTIMEVERIFY,
            Self::Uahf => VerifyFlags::STRICTENC.union(VerifyFlags::ENABLESIGHASHFORKID),
            Self::Daa => VerifyFlags::LOW_S,
            Self::Monolith => VerifyFlags::MONOLITH,
            Self::Magnetic => VerifyFlags::MAGNETIC
                .union(VerifyFlags::NULLDUMMY)
                .union(VerifyFlags::CLEANSTACK),
            Self::Genesis => VerifyFlags::GENESIS,
            Self::Chronicle => VerifyFlags::CHRONICLE,
        }
    }

    /// All flags in force once this upgrade is active.
    pub fn flags(self) -> VerifyFlags {
        Self::ALL
            .iter()
            .take_while(|epoch| **epoch <= self)
            .fold(VerifyFlags::NONE, |acc, epoch| acc | epoch.activated())
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown epoch `{0}`, expected one of: legacy, p2sh, bip66, bip65, uahf, daa, monolith, magnetic, genesis, chronicle")]
pub struct UnknownEpoch(String);

impl FromStr for Epoch {
    type Err = UnknownEpoch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|epoch| epoch.name() == lower)
            .ok_or_else(|| UnknownEpoch(s.to_string()))
    }
}

/// An immutable, named bundle of verification flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleSet {
    name: &'static str,
    flags: VerifyFlags,
}

impl RuleSet {
    pub const fn new(name: &'static str, flags: VerifyFlags) -> Self {
        Self { name, flags }
    }

    /// Consensus rules in force from `epoch` on.
    pub fn for_epoch(epoch: Epoch) -> Self {
        Self::new(epoch.name(), epoch.flags())
    }

    pub fn legacy() -> Self {
        Self::for_epoch(Epoch::Legacy)
    }

    pub fn monolith() -> Self {
        Self::for_epoch(Epoch::Monolith)
    }

    pub fn genesis() -> Self {
        Self::for_epoch(Epoch::Genesis)
    }

    pub fn chronicle() -> Self {
        Self::for_epoch(Epoch::Chronicle)
    }

    /// Adds the standardness flags relay policy applies on top of consensus.
    pub fn with_policy(self) -> Self {
        Self {
            name: self.name,
            flags: self.flags | VerifyFlags::MINIMALDATA | VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn flags(&self) -> VerifyFlags {
        self.flags
    }

    pub fn contains(&self, flags: VerifyFlags) -> bool {
        self.flags.contains(flags)
    }

    pub fn is_superset_of(&self, other: &RuleSet) -> bool {
        self.flags.contains(other.flags)
    }

    pub fn limits(&self) -> ScriptLimits {
        ScriptLimits::from_flags(&self.flags)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::chronicle()
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.name, self.flags)
    }
}

/// How the combined size of the main and alt stacks is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackBound {
    /// Maximum number of items.
    Depth(usize),
    /// Maximum memory usage, each item costing its length plus a fixed overhead.
    Memory(u64),
}

/// Numeric bounds of script execution, derived from the verification flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    pub max_script_size: usize,
    pub max_element_size: usize,
    pub max_ops: u64,
    pub max_num_size: usize,
    pub max_pubkeys_per_multisig: usize,
    pub stack: StackBound,
}

impl ScriptLimits {
    pub fn from_flags(flags: &VerifyFlags) -> Self {
        if flags.is_genesis() {
            return Self {
                max_script_size: usize::MAX,
                max_element_size: usize::MAX,
                max_ops: u64::MAX,
                max_num_size: ScriptNum::GENESIS_MAX_NUM_SIZE,
                max_pubkeys_per_multisig: i32::MAX as usize,
                stack: StackBound::Memory(MAX_STACK_MEMORY_USAGE),
            };
        }

        let max_ops = if flags.contains(VerifyFlags::MAGNETIC) {
            MAX_OPS_PER_SCRIPT_MAGNETIC
        } else {
            MAX_OPS_PER_SCRIPT
        };

        Self {
            max_script_size: MAX_SCRIPT_SIZE,
            max_element_size: MAX_SCRIPT_ELEMENT_SIZE,
            max_ops,
            max_num_size: ScriptNum::MAX_NUM_SIZE,
            max_pubkeys_per_multisig: MAX_PUBKEYS_PER_MULTISIG,
            stack: StackBound::Depth(MAX_STACK_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_cumulative() {
        for pair in Epoch::ALL.windows(2) {
            let older = RuleSet::for_epoch(pair[0]);
            let newer = RuleSet::for_epoch(pair[1]);
            assert!(
                newer.is_superset_of(&older),
                "{newer} must contain every flag of {older}"
            );
            assert_ne!(newer.flags(), older.flags(), "{newer} adds nothing over {older}");
        }
    }

    #[test]
    fn every_consensus_flag_is_reached() {
        let all = RuleSet::chronicle().with_policy().flags();
        assert_eq!(all, VerifyFlags::all());
        assert_eq!(RuleSet::legacy().flags(), VerifyFlags::NONE);
    }

    #[test]
    fn monolith_opcodes_enabled_from_monolith_on() {
        for epoch in Epoch::ALL {
            assert_eq!(
                epoch.flags().monolith_opcodes(),
                epoch >= Epoch::Monolith,
                "{epoch}"
            );
        }
    }

    #[test]
    fn epoch_names_round_trip() {
        for epoch in Epoch::ALL {
            assert_eq!(epoch.to_string().parse::<Epoch>(), Ok(epoch));
        }
        assert_eq!("Genesis".parse::<Epoch>(), Ok(Epoch::Genesis));
        assert!("segwit".parse::<Epoch>().is_err());
    }

    #[test]
    fn limits_follow_epochs() {
        let legacy = RuleSet::legacy().limits();
        assert_eq!(legacy.max_ops, 201);
        assert_eq!(legacy.max_element_size, 520);
        assert_eq!(legacy.max_num_size, 4);
        assert_eq!(legacy.stack, StackBound::Depth(1000));

        assert_eq!(RuleSet::for_epoch(Epoch::Magnetic).limits().max_ops, 500);

        let genesis = RuleSet::genesis().limits();
        assert_eq!(genesis.max_ops, u64::MAX);
        assert_eq!(genesis.max_element_size, usize::MAX);
        assert_eq!(genesis.max_num_size, 750_000);
        assert_eq!(genesis.stack, StackBound::Memory(100_000_000));
    }
}
