use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use colored::Colorize;
use ps1mc::{load_config, Config, Error};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Manage PlayStation memory card images (.mcr, .gme, .vmp).
struct Args {
    /// config file to use instead of ./ps1mc.toml
    #[argh(option)]
    config: Option<PathBuf>,

    /// log debug output
    #[argh(switch, short = 'v')]
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    List(ListArgs),
    Export(ExportArgs),
    Import(ImportArgs),
    Delete(DeleteArgs),
    Format(FormatArgs),
    Check(CheckArgs),
    Icon(IconArgs),
    Ls(LsArgs),
    Cat(CatArgs),
}

#[derive(FromArgs)]
/// List the saves on a card.
#[argh(subcommand, name = "list")]
struct ListArgs {
    /// memory card image
    #[argh(positional)]
    card: PathBuf,

    /// print JSON instead of a table
    #[argh(switch)]
    json: bool,
}

#[derive(FromArgs)]
/// Write a save's raw bytes to a file.
#[argh(subcommand, name = "export")]
struct ExportArgs {
    /// memory card image
    #[argh(positional)]
    card: PathBuf,

    /// slot number or save filename
    #[argh(positional)]
    target: String,

    /// output file, defaults to the save's filename
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(FromArgs)]
/// Add a raw save file to a card.
#[argh(subcommand, name = "import")]
struct ImportArgs {
    /// memory card image
    #[argh(positional)]
    card: PathBuf,

    /// raw save file
    #[argh(positional)]
    save: PathBuf,

    /// filename to store the save under, defaults to the file's name
    #[argh(option)]
    name: Option<String>,

    /// write the card here instead of overwriting it
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(FromArgs)]
/// Remove a save from a card.
#[argh(subcommand, name = "delete")]
struct DeleteArgs {
    /// memory card image
    #[argh(positional)]
    card: PathBuf,

    /// slot number or save filename
    #[argh(positional)]
    target: String,

    /// write the card here instead of overwriting it
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(FromArgs)]
/// Write a blank raw card.
#[argh(subcommand, name = "format")]
struct FormatArgs {
    /// card file to create
    #[argh(positional)]
    output: PathBuf,
}

#[derive(FromArgs)]
/// Report directory inconsistencies. Exits non-zero if any are found.
#[argh(subcommand, name = "check")]
struct CheckArgs {
    /// memory card image
    #[argh(positional)]
    card: PathBuf,

    /// print the findings as JSON
    #[argh(switch)]
    json: bool,
}

#[derive(FromArgs)]
/// Render a save's icon to PNG.
#[argh(subcommand, name = "icon")]
struct IconArgs {
    /// memory card image
    #[argh(positional)]
    card: PathBuf,

    /// slot number or save filename
    #[argh(positional)]
    target: String,

    /// output PNG file
    #[argh(option, short = 'o')]
    output: PathBuf,

    /// integer upscale factor
    #[argh(option)]
    scale: Option<u32>,
}

#[derive(FromArgs)]
/// List a directory of the card's save tree.
#[argh(subcommand, name = "ls")]
struct LsArgs {
    /// memory card image
    #[argh(positional)]
    card: PathBuf,

    /// directory to list, defaults to the root
    #[argh(positional, default = "String::from(\"/\")")]
    path: String,
}

#[derive(FromArgs)]
/// Print a file of the card's save tree.
#[argh(subcommand, name = "cat")]
struct CatArgs {
    /// memory card image
    #[argh(positional)]
    card: PathBuf,

    /// file path inside the tree
    #[argh(positional)]
    path: String,

    /// write to this file instead of stdout
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode, Error> {
    let cwd = std::env::current_dir()?;
    let config: Config = load_config(args.config.as_deref(), &cwd)?;

    match args.command {
        Command::List(list) => {
            let card = ps1mc::open_card(&list.card, config.card)?;
            let listing = ps1mc::list_saves(&card);
            if list.json {
                println!("{}", ps1mc::to_json(&listing)?);
            } else {
                ps1mc::print_listing(&listing);
            }
        }
        Command::Export(export) => {
            ps1mc::export_save(&export.card, &export.target, export.output.as_deref(), &config)?;
        }
        Command::Import(import) => {
            ps1mc::import_save(
                &import.card,
                &import.save,
                import.name.as_deref(),
                import.output.as_deref(),
                &config,
            )?;
        }
        Command::Delete(delete) => {
            ps1mc::delete_save(&delete.card, &delete.target, delete.output.as_deref(), &config)?;
        }
        Command::Format(format) => ps1mc::format_card(&format.output)?,
        Command::Check(check) => {
            let report = ps1mc::check_card(&check.card, &config)?;
            if check.json {
                println!("{}", ps1mc::to_json(&report)?);
            } else {
                ps1mc::print_report(&report);
            }
            if !report.is_clean() {
                return Ok(ExitCode::from(2));
            }
        }
        Command::Icon(icon) => {
            ps1mc::export_icon(&icon.card, &icon.target, &icon.output, icon.scale, &config)?;
        }
        Command::Ls(ls) => {
            let entries = ps1mc::list_tree(&ls.card, &ls.path, &config)?;
            ps1mc::print_tree(&entries);
        }
        Command::Cat(cat) => {
            let bytes = ps1mc::read_tree_file(&cat.card, &cat.path, &config)?;
            match cat.output {
                Some(output) => std::fs::write(output, bytes)?,
                None => std::io::stdout().lock().write_all(&bytes)?,
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
