//! Command-line front end: decode a VAG file to WAV, or dump its tags.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use vagstream::{
    export_to_wav, probe, read_metadata, HostServices, ProbeResult, VagSession,
};

fn print_usage(program: &str) {
    eprintln!("Usage: {program} <input.vag> [output.wav]");
    eprintln!("       {program} --tags <input.vag>");
    eprintln!();
    eprintln!("Decodes PlayStation VAG / PS-ADPCM audio to a 16-bit WAV file.");
    eprintln!("With --tags, prints the file's metadata as JSON instead.");
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("vagstream", String::as_str);

    match args.get(1).map(String::as_str) {
        Some("--tags") => {
            let Some(input) = args.get(2) else {
                print_usage(program);
                bail!("missing input file");
            };
            let services = HostServices::local();
            let tags = read_metadata(input, &services)?;
            println!("{}", serde_json::to_string_pretty(&tags)?);
            Ok(())
        }
        Some(input) => {
            let output = args
                .get(2)
                .cloned()
                .unwrap_or_else(|| derive_output_name(input));

            let data: Arc<[u8]> = std::fs::read(input)
                .with_context(|| format!("failed to read '{input}'"))?
                .into();
            if probe(&data[..data.len().min(64)], Some(input), data.len() as u64)
                == ProbeResult::Unsupported
            {
                bail!("'{input}' does not look like a VAG/PS-ADPCM file");
            }

            let mut session = VagSession::new();
            session.open(data, 1)?;
            let format = session.format();
            println!(
                "Decoding {input} ({} Hz{}) -> {output}",
                format.sample_rate,
                session
                    .header()
                    .filter(|h| !h.name.is_empty())
                    .map_or(String::new(), |h| format!(", \"{}\"", h.name))
            );
            export_to_wav(&mut session, &output)?;
            println!("Done.");
            Ok(())
        }
        None => {
            print_usage(program);
            bail!("missing input file");
        }
    }
}

fn derive_output_name(input: &str) -> String {
    match input.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.wav"),
        _ => format!("{input}.wav"),
    }
}

fn main() -> ExitCode {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
