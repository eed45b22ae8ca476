use std::path::Path;
use std::process::ExitCode;

use asm65::listing::{listing, symbol_rows};
use asm65::{Config, Error, FsProvider, Project, Syntax};
use color_print::cprintln;
use tracing::Level;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {author}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

const DEFAULT_CONFIG: &str = "asm65.yaml";

#[derive(Debug, clap::Parser)]
#[clap(author, version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input files, one module each
    #[clap(default_value = "main.s")]
    input: Vec<String>,

    /// Dialect: merlin, dasm, ca65, acme or lisa (detected when omitted)
    #[clap(short, long)]
    syntax: Option<Syntax>,

    /// Project file
    #[clap(short, long)]
    config: Option<String>,

    /// Dump the parsed listing
    #[clap(short, long)]
    dump: bool,

    /// Print the symbol table
    #[clap(long)]
    symbols: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[clap(short, long, default_value_t = Level::WARN)]
    log_level: Level,
}

fn main() -> ExitCode {
    use clap::Parser;

    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            cprintln!("<red,bold>error</>: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the project assembled without errors.
fn run(args: &Args) -> Result<bool, Error> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => Config::load(DEFAULT_CONFIG)?,
        None => Config::default(),
    };
    if let Some(syntax) = args.syntax {
        config.syntax = syntax;
    }

    let provider = FsProvider::new(config.include_dirs.clone());
    let mut project = Project::new(config);
    for path in &args.input {
        let idx = project.assemble(path, &provider)?;
        let module = &project.modules[idx];
        tracing::info!(
            "{}: {} ({} lines, {} symbols)",
            path,
            module.syntax,
            module.lines().len(),
            module.symbols().len()
        );
    }
    project.link();

    for module in &project.modules {
        if args.dump {
            for line in listing(module, &project.config) {
                println!("{}", line);
            }
        }
        if args.symbols {
            cprintln!("<blue,bold>symbols</>: {}", module.name);
            print!("{}", serde_yaml::to_string(&symbol_rows(module))?);
        }
    }

    let diagnostics = project.diagnostics();
    for diagnostic in &diagnostics {
        diagnostic.print();
    }
    let errors = diagnostics.iter().filter(|d| d.severity.is_error()).count();
    if errors > 0 {
        cprintln!("<red,bold>{} error(s)</>", errors);
    }
    Ok(errors == 0)
}
