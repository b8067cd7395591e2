use anyhow::{Context, Result};
use mark::{Document, Options};
use std::io::{self, Read};
use std::{env, fs};

/// Reads markdown on stdin and prints HTML. An optional argument names a JSON
/// options file.
fn main() -> Result<()> {
    env_logger::init();

    let options = match env::args().nth(1) {
        Some(path) => {
            let config = fs::read_to_string(&path)
                .with_context(|| format!("failed to read options file {path}"))?;
            serde_json::from_str::<Options>(&config)
                .with_context(|| format!("invalid options in {path}"))?
        }
        None => Options::default(),
    };

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    print!("{}", Document::new(&input, options).render());
    Ok(())
}
