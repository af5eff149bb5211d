//! Write the gateway's OpenAPI document as pretty JSON
//!
//! Usage:
//!   export_openapi                        # stdout
//!   export_openapi --output openapi.json  # file

use anyhow::Context;
use utoipa::OpenApi;

use money_transfer::gateway::openapi::ApiDoc;

fn main() -> anyhow::Result<()> {
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .context("Failed to serialize OpenAPI document")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [flag, path] if flag == "--output" => {
            std::fs::write(path, &json).with_context(|| format!("Failed to write {path}"))?;
            eprintln!("OpenAPI document written to {path}");
        }
        [] => println!("{json}"),
        _ => anyhow::bail!("usage: export_openapi [--output <path>]"),
    }
    Ok(())
}
