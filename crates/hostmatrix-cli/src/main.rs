use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use hostmatrix_core::PivotReport;
use hostmatrix_error::MatrixError;
use hostmatrix_report::config::reports_dir_from_env;
use hostmatrix_report::logging::init_logging;
use hostmatrix_report::{
    ReportStore, ServiceConfig, pivot_report_file, pivot_stored_report, pivots_to_json,
    render_pivots_markdown, render_report_list,
};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Markdown,
}

impl OutputFormat {
    fn parse(value: &str) -> Result<Self, CliError> {
        match value {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(CliError::Usage(format!(
                "unknown format: {other} (expected json or markdown)"
            ))),
        }
    }
}

#[derive(Debug)]
enum Command {
    List {
        format: OutputFormat,
    },
    Pivot {
        id: String,
        format: OutputFormat,
        output_path: Option<PathBuf>,
    },
    RenderFile {
        path: PathBuf,
        format: OutputFormat,
        output_path: Option<PathBuf>,
    },
}

#[derive(Debug)]
struct CliConfig {
    reports_dir: Option<PathBuf>,
    verbose: bool,
    log_json: Option<PathBuf>,
    source_root: Option<PathBuf>,
    use_cache: bool,
    snippets: bool,
    command: Command,
}

#[derive(Debug)]
enum CliError {
    Help,
    Usage(String),
    Matrix(MatrixError),
}

impl From<MatrixError> for CliError {
    fn from(error: MatrixError) -> Self {
        Self::Matrix(error)
    }
}

fn print_help() {
    let help = "\
hostmatrix: pivot multi-host RSpec reports into host x test matrices

USAGE:
    hostmatrix [GLOBAL OPTIONS] <COMMAND> [OPTIONS]

COMMANDS:
    list                      List stored reports, newest first
    pivot <ID>                Pivot a stored report (e.g. nightly.json)
    render-file <PATH>        Pivot a report file outside the store

GLOBAL OPTIONS:
    --reports <DIR>           Reports directory (default: $HOSTMATRIX_REPORTS_DIR or ./reports)
    --verbose                 Debug-level logging on stderr
    --log-json <PATH>         Also write JSON-lines logs to PATH
    -h, --help                Show this help

COMMAND OPTIONS:
    --format <json|markdown>  Output format (default: json)
    --source-root <DIR>       Read spec sources for snippets from DIR
    --no-snippets             Do not attach source snippets to failures
    --no-cache                Ignore and do not write the .parsed cache (pivot)
    --output <PATH>           Write output to PATH (stdout when omitted)

EXIT CODES:
    0 success, 1 report not found, 2 usage, malformed input or I/O error
";
    println!("{help}");
}

fn take_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str, CliError> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| CliError::Usage(format!("{flag} requires a value")))
}

fn parse_args(args: &[String]) -> Result<CliConfig, CliError> {
    let mut reports_dir: Option<PathBuf> = None;
    let mut verbose = false;
    let mut log_json: Option<PathBuf> = None;
    let mut source_root: Option<PathBuf> = None;
    let mut use_cache = true;
    let mut snippets = true;
    let mut format = OutputFormat::Json;
    let mut output_path: Option<PathBuf> = None;
    let mut command_name: Option<String> = None;
    let mut positionals: Vec<String> = Vec::new();

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--reports" => {
                reports_dir = Some(PathBuf::from(take_value(args, &mut index, "--reports")?));
            }
            "--verbose" | "-v" => verbose = true,
            "--log-json" => {
                log_json = Some(PathBuf::from(take_value(args, &mut index, "--log-json")?));
            }
            "--format" => {
                format = OutputFormat::parse(take_value(args, &mut index, "--format")?)?;
            }
            "--source-root" => {
                source_root = Some(PathBuf::from(take_value(
                    args,
                    &mut index,
                    "--source-root",
                )?));
            }
            "--no-cache" => use_cache = false,
            "--no-snippets" => snippets = false,
            "--output" => {
                output_path = Some(PathBuf::from(take_value(args, &mut index, "--output")?));
            }
            "-h" | "--help" => {
                print_help();
                return Err(CliError::Help);
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(CliError::Usage(format!("unknown option: {flag}")));
            }
            word => {
                if command_name.is_none() {
                    command_name = Some(word.to_owned());
                } else {
                    positionals.push(word.to_owned());
                }
            }
        }
        index += 1;
    }

    let Some(command_name) = command_name else {
        return Err(CliError::Usage(
            "missing command (expected list, pivot or render-file)".to_owned(),
        ));
    };

    let command = match (command_name.as_str(), positionals.as_slice()) {
        ("list", []) => Command::List { format },
        ("pivot", [id]) => Command::Pivot {
            id: id.clone(),
            format,
            output_path,
        },
        ("render-file", [path]) => Command::RenderFile {
            path: PathBuf::from(path),
            format,
            output_path,
        },
        ("list", _) => {
            return Err(CliError::Usage("list takes no arguments".to_owned()));
        }
        ("pivot", _) => {
            return Err(CliError::Usage("pivot requires exactly one <ID>".to_owned()));
        }
        ("render-file", _) => {
            return Err(CliError::Usage(
                "render-file requires exactly one <PATH>".to_owned(),
            ));
        }
        (unknown, _) => {
            return Err(CliError::Usage(format!("unknown command: {unknown}")));
        }
    };

    Ok(CliConfig {
        reports_dir,
        verbose,
        log_json,
        source_root,
        use_cache,
        snippets,
        command,
    })
}

fn render(title: &str, pivots: &[PivotReport], format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => pivots_to_json(pivots)?,
        OutputFormat::Markdown => render_pivots_markdown(title, pivots),
    })
}

fn emit(payload: &str, output_path: Option<&Path>) -> Result<(), CliError> {
    match output_path {
        Some(path) => {
            std::fs::write(path, payload).map_err(MatrixError::from)?;
            info!(path = %path.display(), bytes = payload.len(), "output written");
        }
        None => println!("{payload}"),
    }
    Ok(())
}

fn run(args: &[String]) -> Result<(), CliError> {
    let cli = parse_args(args)?;
    let _log_guard =
        init_logging(cli.verbose, cli.log_json.as_deref()).map_err(MatrixError::from)?;

    let mut service = ServiceConfig {
        reports_dir: reports_dir_from_env(cli.reports_dir),
        source_root: cli.source_root,
        use_cache: cli.use_cache,
        ..ServiceConfig::default()
    };
    service.options.snippets = cli.snippets;
    debug!(reports = %service.reports_dir.display(), "configuration resolved");

    match cli.command {
        Command::List { format } => {
            let store = ReportStore::open(&service.reports_dir)?;
            let entries = store.list()?;
            let payload = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&entries)
                    .map_err(|error| MatrixError::serialization(error.to_string()))?,
                OutputFormat::Markdown => render_report_list(&entries),
            };
            emit(&payload, None)
        }
        Command::Pivot {
            id,
            format,
            output_path,
        } => {
            let store = ReportStore::open(&service.reports_dir)?;
            let load = pivot_stored_report(&store, &id, &service)?;
            debug!(
                reports = %store.root().display(),
                report = %id,
                cache = ?load.cache,
                role_sets = load.pivots.len(),
                "pivoted"
            );
            emit(&render(&id, &load.pivots, format)?, output_path.as_deref())
        }
        Command::RenderFile {
            path,
            format,
            output_path,
        } => {
            let pivots = pivot_report_file(&path, &service)?;
            let title = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |name| {
                    name.to_string_lossy().into_owned()
                });
            emit(&render(&title, &pivots, format)?, output_path.as_deref())
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(()) | Err(CliError::Help) => ExitCode::SUCCESS,
        Err(CliError::Usage(message)) => {
            eprintln!("ERROR hostmatrix: {message}");
            eprintln!("run `hostmatrix --help` for usage");
            ExitCode::from(2)
        }
        Err(CliError::Matrix(error)) => {
            eprintln!("ERROR hostmatrix: {error}");
            ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(2))
        }
    }
}
