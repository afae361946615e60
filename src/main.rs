use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use clap::Subcommand;
use miette::IntoDiagnostic;
use miette::WrapErr;
use pascal_front::{Environment, Lexer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the lexemes of a source file, one per line.
    Tokenize { filename: PathBuf },
    /// Print the tree of the expression in a file.
    Parse { filename: PathBuf },
    /// Evaluate the expression in a file.
    Eval {
        filename: PathBuf,
        /// Variable binding such as `x=2.5`; repeat for more.
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_binding)]
        vars: Vec<(char, f64)>,
    },
}

fn parse_binding(s: &str) -> Result<(char, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    let mut chars = name.chars();
    let name = match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => c,
        _ => return Err(format!("variable names are single letters, got `{name}`")),
    };
    let value = value
        .parse()
        .map_err(|e| format!("bad value for `{name}`: {e}"))?;
    Ok((name, value))
}

fn read(filename: &Path) -> miette::Result<String> {
    fs::read_to_string(filename)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading `{}` failed", filename.display()))
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Tokenize { filename } => {
            let file_contents = read(&filename)?;
            for lexeme in Lexer::new(&file_contents) {
                println!("{lexeme} {:?}", lexeme.text(&file_contents));
            }
        }
        Commands::Parse { filename } => {
            let file_contents = read(&filename)?;
            let expression =
                pascal_front::Parser::new(filename.to_str(), file_contents.trim()).parse()?;
            println!("{expression}");
        }
        Commands::Eval { filename, vars } => {
            let file_contents = read(&filename)?;
            let expression =
                pascal_front::Parser::new(filename.to_str(), file_contents.trim()).parse()?;
            let environment: Environment = vars.into_iter().collect();
            let value = pascal_front::evaluate(&expression, &environment)?;
            println!("{value}");
        }
    }
    Ok(())
}
