use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info, warn};

use tabgrid::fileio::{self, FileIO};
use tabgrid::{ExportOptions, Grid, GridConfig, GridError};

struct Args {
    file_path: PathBuf,
    delimiter: Option<u8>,
    schema: Option<PathBuf>,
    config: Option<PathBuf>,
    scroll: (f64, f64),
    viewport: (f64, f64),
    export: bool,
}

/// Parse command line arguments
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut file_path: Option<PathBuf> = None;
    let mut delimiter = None;
    let mut schema = None;
    let mut config = None;
    let mut scroll = (0.0, 0.0);
    let mut viewport = (1280.0, 720.0);
    let mut export = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--delimiter" => {
                delimiter = Some(parse_delimiter(&value_for(&args, i)));
                i += 2;
            }
            "-s" | "--schema" => {
                schema = Some(PathBuf::from(value_for(&args, i)));
                i += 2;
            }
            "-c" | "--config" => {
                config = Some(PathBuf::from(value_for(&args, i)));
                i += 2;
            }
            "--scroll" => {
                scroll = parse_pair(&args[i], &value_for(&args, i));
                i += 2;
            }
            "--viewport" => {
                viewport = parse_pair(&args[i], &value_for(&args, i));
                i += 2;
            }
            "--export" => {
                export = true;
                i += 1;
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                std::process::exit(1);
            }
            _ => {
                file_path = Some(PathBuf::from(&args[i]));
                i += 1;
            }
        }
    }

    let Some(file_path) = file_path else {
        print_help();
        std::process::exit(1);
    };
    Args { file_path, delimiter, schema, config, scroll, viewport, export }
}

fn value_for(args: &[String], i: usize) -> String {
    match args.get(i + 1) {
        Some(v) => v.clone(),
        None => {
            eprintln!("Error: {} requires an argument", args[i]);
            std::process::exit(1);
        }
    }
}

/// Parse a delimiter string into a byte
fn parse_delimiter(s: &str) -> u8 {
    match s.to_lowercase().as_str() {
        "comma" | "," => b',',
        "tab" | "\\t" | "\t" => b'\t',
        "semicolon" | ";" => b';',
        "pipe" | "|" => b'|',
        _ if s.len() == 1 => s.as_bytes()[0],
        _ => {
            eprintln!("Invalid delimiter: '{}'. Use comma, tab, semicolon, pipe, or a single character.", s);
            std::process::exit(1);
        }
    }
}

/// Parse "X,Y" into a pair of non-negative numbers
fn parse_pair(flag: &str, s: &str) -> (f64, f64) {
    let parsed = s
        .split_once(',')
        .and_then(|(a, b)| Some((a.trim().parse::<f64>().ok()?, b.trim().parse::<f64>().ok()?)));
    match parsed {
        Some((a, b)) if a >= 0.0 && b >= 0.0 => (a, b),
        _ => {
            eprintln!("Error: {} expects two non-negative numbers like 0,250", flag);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    eprintln!("tabgrid - Inspect a dataset through the headless grid core");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    tabgrid [OPTIONS] <FILE>");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -d, --delimiter <DELIM>  Set the field delimiter (comma, tab, semicolon, pipe, or char)");
    eprintln!("    -s, --schema <FILE>      Column schema as TOML [[columns]] tables");
    eprintln!("    -c, --config <FILE>      Grid config as TOML");
    eprintln!("    --scroll <X,Y>           Scroll offset in pixels (default 0,0)");
    eprintln!("    --viewport <W,H>         Widget size in pixels, headers included (default 1280,720)");
    eprintln!("    --export                 Print the validated rows as JSON");
    eprintln!("    -h, --help               Print this help message");
    eprintln!();
    eprintln!("Without --schema every column is read as text, named after the header row.");
}

fn run(args: Args) -> Result<(), GridError> {
    let config = match &args.config {
        Some(path) => GridConfig::from_file(path)?,
        None => GridConfig::default(),
    };

    let file_io = FileIO::new(args.file_path.clone(), args.delimiter);
    let loaded = file_io.load_records()?;
    for warning in &loaded.warnings {
        warn!("{}", warning);
    }

    let schema = match &args.schema {
        Some(path) => fileio::load_schema(path)?,
        None => fileio::infer_schema(&loaded.headers)?,
    };
    for key in schema.keys().filter(|k| !loaded.headers.iter().any(|h| h == k)) {
        warn!("column '{}' is not in the file header", key);
    }

    let mut grid = Grid::with_records(schema, loaded.records, config);
    grid.set_viewport(args.scroll.0, args.scroll.1, args.viewport.0, args.viewport.1);

    let dims = grid.dimensions();
    let invalid = grid.row_count() - grid.export(ExportOptions { skip_invalid: true, ..Default::default() }).len();
    println!("file:      {} (delimiter: {})", file_io.file_path.display(), file_io.delimiter_name());
    println!("rows:      {} ({} invalid)", grid.row_count(), invalid);
    println!("columns:   {}", grid.col_count());
    println!("extents:   {:.0} x {:.0}", dims.cols.total(), dims.rows.total());

    let range = grid.visible_range();
    let describe = |span: Option<tabgrid::dimension::IndexSpan>| match span {
        Some(s) => format!("{}..={}", s.first, s.last),
        None => "none".to_string(),
    };
    println!("visible:   rows {}, columns {}", describe(range.rows), describe(range.cols));

    if args.export {
        let rows = grid.export(ExportOptions { include_shadow: true, ..Default::default() });
        let json = serde_json::to_string_pretty(&rows).map_err(std::io::Error::from)?;
        println!("{}", json);
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    info!("tabgrid started");

    match run(parse_args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
