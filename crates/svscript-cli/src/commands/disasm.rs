use crate::cli::{Result, decode_hex};
use svscript::Program;

#[derive(Debug, clap::Args)]
pub struct Disasm {
    /// Hex encoded script.
    #[arg(index = 1)]
    script: String,
}

impl Disasm {
    pub fn run(self) -> Result<()> {
        let program = Program::parse(&decode_hex(&self.script)?)?;

        println!("{program}");
        println!();

        for chunk in program.chunks() {
            match chunk.payload() {
                Some(data) if !data.is_empty() => {
                    println!("{:>6}  {} {}", chunk.offset(), chunk.opcode(), hex::encode(data))
                }
                _ => println!("{:>6}  {}", chunk.offset(), chunk.opcode()),
            }
        }

        Ok(())
    }
}
