use crate::cli::{Result, decode_hex};
use bitcoin::Transaction;
use bitcoin::hashes::Hash;
use svscript::SigHashType;
use svscript::sighash::{fork_id_signature_hash, legacy_signature_hash};

fn parse_hash_type(input: &str) -> std::result::Result<SigHashType, String> {
    let value = match input.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse::<u32>(),
    };
    value
        .map(SigHashType::from_u32)
        .map_err(|err| format!("invalid hash type {input}: {err}"))
}

#[derive(Debug, clap::Args)]
pub struct Sighash {
    /// Hex encoded spending transaction.
    #[arg(long, value_name = "HEX")]
    tx: String,

    /// Index of the input being signed.
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    input: usize,

    /// Value of the spent output in satoshis, committed to by fork-id digests.
    #[arg(long, value_name = "SATOSHIS", default_value_t = 0)]
    amount: u64,

    /// Hex encoded script code being signed.
    #[arg(long, value_name = "HEX")]
    script_code: String,

    /// Hash type, decimal or `0x` prefixed hex.
    #[arg(long, value_name = "TYPE", value_parser = parse_hash_type, default_value = "0x41")]
    hash_type: SigHashType,
}

impl Sighash {
    pub fn run(self) -> Result<()> {
        let tx: Transaction = bitcoin::consensus::deserialize(&decode_hex(&self.tx)?)?;
        let script_code = decode_hex(&self.script_code)?;

        let legacy = legacy_signature_hash(&tx, self.input, &script_code, self.hash_type)?;
        let fork_id =
            fork_id_signature_hash(&tx, self.input, &script_code, self.amount, self.hash_type)?;

        println!("hash type: {}", self.hash_type);
        println!("legacy:    {}", hex::encode(legacy.to_byte_array()));
        println!("fork-id:   {}", hex::encode(fork_id.to_byte_array()));

        Ok(())
    }
}
