use crate::commands::disasm::Disasm;
use crate::commands::eval::Eval;
use crate::commands::sighash::Sighash;
use crate::commands::verify::Verify;
use clap::Parser;
use svscript::{Epoch, RuleSet};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid transaction: {0}")]
    Transaction(#[from] bitcoin::consensus::encode::Error),
    #[error(transparent)]
    Parse(#[from] svscript::ParseError),
    #[error(transparent)]
    Script(#[from] svscript::Error),
    #[error(transparent)]
    SigHash(#[from] svscript::SigHashError),
    #[error("input {index} out of range, transaction has {inputs} inputs")]
    InputOutOfRange { index: usize, inputs: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Decodes a hex string, with or without the `0x` prefix.
pub fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let input = input.trim();
    let input = input.strip_prefix("0x").unwrap_or(input);
    Ok(hex::decode(input)?)
}

/// Rule selection shared by the commands running scripts.
#[derive(Debug, Clone, clap::Args)]
pub struct RuleParams {
    /// Evaluate under the consensus rules of this network upgrade.
    ///
    /// One of legacy, p2sh, bip66, bip65, uahf, daa, monolith, magnetic,
    /// genesis, chronicle.
    #[arg(long, value_name = "EPOCH", default_value = "chronicle")]
    pub rules: Epoch,

    /// Add the standardness flags enforced by relay policy.
    #[arg(long)]
    pub policy: bool,
}

impl RuleParams {
    pub fn rule_set(&self) -> RuleSet {
        let rules = RuleSet::for_epoch(self.rules);
        if self.policy {
            rules.with_policy()
        } else {
            rules
        }
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Print the opcodes of a script.
    Disasm(Disasm),

    /// Run a script from an empty stack without a spending transaction.
    Eval(Eval),

    /// Verify a transaction input against the script it spends.
    Verify(Verify),

    /// Compute the signature digests of a transaction input.
    Sighash(Sighash),
}

#[derive(Debug, Parser)]
#[clap(version, about = "Bitcoin SV script toolkit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Parse and run command line arguments.
pub fn run() -> Result<()> {
    let Cli { command } = Cli::parse();

    match command {
        Command::Disasm(cmd) => cmd.run(),
        Command::Eval(cmd) => cmd.run(),
        Command::Verify(cmd) => cmd.run(),
        Command::Sighash(cmd) => cmd.run(),
    }
}
