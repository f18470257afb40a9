mod render;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use mikake_core::{DecodeError, ParsedHeader, PeImage, Strictness};

/// PE header introspection CLI
#[derive(Parser)]
#[command(
    name = "peinfo",
    about = "Inspect PE headers (stub, file header, optional header, flags)",
    version,
    author
)]
struct Cli {
    /// Path to binary file
    #[arg(required = true)]
    path: std::path::PathBuf,

    /// Print the selected part as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Fail if the headers carry any validation warning
    #[arg(long, global = true)]
    strict: bool,

    /// Fail if the machine type disagrees with the optional header layout
    #[arg(long, global = true)]
    check_machine: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Show everything
    Summary,
    /// Show the legacy MZ stub header
    Stub,
    /// Show the COFF file header
    FileHeader,
    /// Show the optional header
    OptionalHeader,
    /// List the data-directory table
    Directories,
    /// Show characteristic flags and the derived role
    Flags,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    log::debug!("decoding {}", cli.path.display());
    let image = match PeImage::open(&cli.path) {
        Ok(image) => image,
        Err(err) => {
            log::debug!("decode of {} failed: {err:#}", cli.path.display());
            // Unknown layouts still carry the file header; show it before failing.
            if let Some(partial) = err.downcast_ref::<DecodeError>().and_then(|e| e.partial()) {
                show(&cli, Command::FileHeader, partial)?;
            }
            return Err(err);
        }
    };

    let policy = if cli.strict {
        Strictness::Strict
    } else {
        Strictness::Warn
    };
    image.header.enforce(policy)?;

    if cli.check_machine && image.header.machine_matches_layout() == Some(false) {
        log::debug!(
            "machine check rejected {}: {:?} with {:?} layout",
            image.path,
            image.header.file_header.machine,
            image.header.optional_header.kind()
        );
        bail!(
            "machine {} does not match {} optional header",
            image.header.file_header.machine,
            image.header.optional_header.format_name()
        );
    }

    if !cli.json {
        let entry = image
            .entry_point()
            .map_or_else(|| "-".to_string(), |rva| format!("{rva:#x}"));
        println!(
            "{} ({} bytes, entry RVA {})",
            image.path.bold(),
            image.file_size,
            entry
        );
    }
    show(&cli, cli.command, &image.header)
}

fn show(cli: &Cli, command: Command, header: &ParsedHeader) -> Result<()> {
    if cli.json {
        let json = match command {
            Command::Summary => serde_json::to_string_pretty(header)?,
            Command::Stub => serde_json::to_string_pretty(&header.stub)?,
            Command::FileHeader => serde_json::to_string_pretty(&header.file_header)?,
            Command::OptionalHeader => serde_json::to_string_pretty(&header.optional_header)?,
            Command::Directories => {
                serde_json::to_string_pretty(&header.optional_header.data_directories())?
            }
            Command::Flags => serde_json::to_string_pretty(&header.classification)?,
        };
        println!("{json}");
        return Ok(());
    }

    match command {
        Command::Summary => {
            render::stub(header);
            render::file_header(header);
            render::optional_header(header);
            render::flags(header);
            render::warnings(header);
        }
        Command::Stub => render::stub(header),
        Command::FileHeader => render::file_header(header),
        Command::OptionalHeader => render::optional_header(header),
        Command::Directories => render::directories(header),
        Command::Flags => render::flags(header),
    }
    Ok(())
}
