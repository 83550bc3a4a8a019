use crate::cli::{Error, Result, RuleParams, decode_hex};
use bitcoin::Transaction;
use svscript::{TransactionSignatureChecker, verify_script};

#[derive(Debug, clap::Args)]
pub struct Verify {
    /// Hex encoded spending transaction.
    #[arg(long, value_name = "HEX")]
    tx: String,

    /// Index of the input to verify.
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    input: usize,

    /// Value of the spent output in satoshis.
    #[arg(long, value_name = "SATOSHIS", default_value_t = 0)]
    amount: u64,

    /// Hex encoded locking script of the spent output.
    #[arg(long, value_name = "HEX")]
    script_pubkey: String,

    #[clap(flatten)]
    rule_params: RuleParams,
}

impl Verify {
    pub fn run(self) -> Result<()> {
        let tx: Transaction = bitcoin::consensus::deserialize(&decode_hex(&self.tx)?)?;
        let script_pubkey = decode_hex(&self.script_pubkey)?;
        let rules = self.rule_params.rule_set();

        let txin = tx.input.get(self.input).ok_or(Error::InputOutOfRange {
            index: self.input,
            inputs: tx.input.len(),
        })?;

        let checker = TransactionSignatureChecker::new(&tx, self.input, self.amount);

        verify_script(
            txin.script_sig.as_bytes(),
            &script_pubkey,
            &rules.flags(),
            &checker,
        )?;

        println!(
            "{}:{} is valid under {rules}",
            tx.compute_txid(),
            self.input
        );

        Ok(())
    }
}
