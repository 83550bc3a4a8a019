use crate::cli::{Result, RuleParams, decode_hex};
use svscript::{NoSignatureCheck, execute};

#[derive(Debug, clap::Args)]
pub struct Eval {
    /// Hex encoded script.
    #[arg(index = 1)]
    script: String,

    #[clap(flatten)]
    pub rule_params: RuleParams,
}

impl Eval {
    pub fn run(self) -> Result<()> {
        let script = decode_hex(&self.script)?;
        let rules = self.rule_params.rule_set();

        tracing::info!("Evaluating {} byte script under {rules}", script.len());

        let outcome = execute(&script, &rules, &NoSignatureCheck)?;

        println!("success: {}", outcome.success);
        println!("stack ({} items, top first):", outcome.stack.len());
        for (depth, item) in outcome.stack.iter().rev().enumerate() {
            println!(
                "{depth:>4}  {:?} {:?}  {item}",
                item.kind(),
                item.provenance()
            );
        }

        Ok(())
    }
}
