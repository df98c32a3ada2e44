//! Tabula CLI
//!
//! Command-line tool for inspecting, converting, sorting and merging tabular
//! documents.

use chrono::Local;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tabula_core::{
    detect, load_file, merge_tables, save, save_file, scan_directory, Error, FieldRange, Format,
    FormatChoice, LoadOptions, Loaded, MatchQuery, SaveOptions, Table, Unmatched,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Tabular document converter", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that reads a document
#[derive(clap::Args)]
struct Input {
    /// Document to read
    file: PathBuf,

    /// Input format (auto, dex, dat, ddx, dob, csv)
    #[arg(long, default_value = "auto")]
    from: FormatChoice,

    /// Tag that opens a tagged-text record
    #[arg(long)]
    start_tag: Option<String>,
}

impl Input {
    fn load(&self) -> tabula_core::Result<Loaded> {
        let options = LoadOptions {
            format: self.from,
            start_tag: self.start_tag.clone(),
        };
        load_file(&self.file, &options)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Report the format of a document
    Detect {
        /// Documents to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print a table
    Show {
        #[command(flatten)]
        input: Input,

        /// Maximum number of records to display
        #[arg(short, long)]
        limit: Option<usize>,

        /// Fields to display (comma-separated)
        #[arg(short, long)]
        fields: Option<String>,

        /// Dump the whole table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert a document to another format
    Convert {
        #[command(flatten)]
        input: Input,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (dex, dat, ddx, dob, csv, tex or json); defaults to the output extension
        #[arg(long)]
        to: Option<String>,

        /// Fields to write, in order (comma-separated)
        #[arg(short, long)]
        fields: Option<String>,

        /// JSON file with load and save options
        #[arg(long)]
        config: Option<PathBuf>,

        /// Append a local timestamp to the output file name
        #[arg(long)]
        stamp: bool,
    },

    /// Merge a second document into the first on key fields
    Merge {
        /// Document whose fields come first
        base: PathBuf,

        /// Document merged into the base
        incoming: PathBuf,

        /// Key field (repeat for compound keys)
        #[arg(short, long, required = true)]
        key: Vec<String>,

        /// Drop incoming records that match nothing
        #[arg(long)]
        intersect: bool,

        /// Output file path; prints the table when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sort records by one field
    Sort {
        #[command(flatten)]
        input: Input,

        /// Field to sort by
        #[arg(long)]
        field: String,

        /// Largest first
        #[arg(long)]
        descending: bool,

        /// Compare numerically when the field parses as numbers
        #[arg(long)]
        numeric: bool,

        /// Output file path; prints the table when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find records by field values
    Search {
        #[command(flatten)]
        input: Input,

        /// field=value pairs (repeat to match more fields or values)
        #[arg(required = true, value_parser = parse_term)]
        terms: Vec<(String, String)>,

        /// Match values that contain the target, in any field
        #[arg(long)]
        partial: bool,

        /// Output file path; prints the matches when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Keep records whose numeric fields fall within bounds
    Filter {
        #[command(flatten)]
        input: Input,

        /// field:min:max bounds (repeat for more fields)
        #[arg(short, long, required = true, value_parser = parse_range)]
        range: Vec<FieldRange>,

        /// Output file path; prints the table when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Scan directories for documents
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// List every document found
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Contents of a `--config` file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    load: LoadOptions,
    save: SaveOptions,
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> tabula_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Detect { files } => cmd_detect(&files),
        Commands::Show {
            input,
            limit,
            fields,
            json,
        } => cmd_show(&input, limit, fields.as_deref(), json),
        Commands::Convert {
            input,
            output,
            to,
            fields,
            config,
            stamp,
        } => cmd_convert(&input, &output, to.as_deref(), fields.as_deref(), config.as_deref(), stamp),
        Commands::Merge {
            base,
            incoming,
            key,
            intersect,
            output,
        } => cmd_merge(&base, &incoming, &key, intersect, output.as_deref()),
        Commands::Sort {
            input,
            field,
            descending,
            numeric,
            output,
        } => cmd_sort(&input, &field, descending, numeric, output.as_deref()),
        Commands::Search {
            input,
            terms,
            partial,
            output,
        } => cmd_search(&input, &terms, partial, output.as_deref()),
        Commands::Filter { input, range, output } => cmd_filter(&input, &range, output.as_deref()),
        Commands::Scan { root, verbose } => cmd_scan(&root, verbose),
    }
}

fn parse_term(s: &str) -> Result<(String, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", s))?;
    Ok((field.trim().to_string(), value.to_string()))
}

fn parse_range(s: &str) -> Result<FieldRange, String> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(max), Some(min), Some(field)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected field:min:max, got '{}'", s));
    };
    let bound = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", v))
    };
    Ok(FieldRange::new(field.trim(), bound(min)?, bound(max)?))
}

fn split_fields(fields: &str) -> Vec<String> {
    fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

fn report(path: &Path, loaded: &Loaded) -> tabula_core::Result<()> {
    eprintln!(
        "Loaded {} ({}): {} fields, {} records",
        path.display(),
        loaded.format,
        loaded.table.column_count(),
        loaded.table.record_count()?
    );
    if !loaded.warnings.is_empty() {
        eprintln!("  {} warning(s)", loaded.warnings.len());
    }
    Ok(())
}

/// Write to `output` in the format its extension names, or print
fn emit(table: &Table, output: Option<&Path>) -> tabula_core::Result<()> {
    match output {
        Some(path) => {
            let format = save_file(table, path, None, &SaveOptions::default())?;
            println!(
                "Wrote {} records to {} ({})",
                table.record_count()?,
                path.display(),
                format
            );
        }
        None => print_table(table, None, None)?,
    }
    Ok(())
}

fn print_table(table: &Table, limit: Option<usize>, fields: Option<&[String]>) -> tabula_core::Result<()> {
    let count = table.record_count()?;
    let display: Vec<&String> = match fields {
        Some(fields) => {
            for field in fields {
                table.column(field)?;
            }
            fields.iter().collect()
        }
        None => table.columns.iter().collect(),
    };
    let show_unassigned = fields.is_none() && table.has_unassigned();

    let mut header: Vec<&str> = display.iter().map(|f| f.as_str()).collect();
    if show_unassigned {
        header.push(tabula_core::UNASSIGNED_COLUMN);
    }
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    let row_limit = limit.unwrap_or(count).min(count);
    for record in 0..row_limit {
        let mut values: Vec<String> = display
            .iter()
            .map(|field| table.value(field, record).unwrap_or_default().replace('\n', " "))
            .collect();
        if show_unassigned {
            values.push(table.unassigned[record].replace('\n', " "));
        }
        println!("{}", values.join("\t"));
    }

    if count > row_limit {
        println!("... ({} more records)", count - row_limit);
    }
    Ok(())
}

fn cmd_detect(files: &[PathBuf]) -> tabula_core::Result<()> {
    for file in files {
        let content = std::fs::read(file).map_err(|e| Error::FileRead {
            path: file.clone(),
            source: e,
        })?;
        println!("{}: {}", file.display(), describe_format(file, &content)?);
    }
    Ok(())
}

/// Format a file would load as, falling back to readable extensions the
/// way `load_file` does
fn describe_format(path: &Path, content: &[u8]) -> tabula_core::Result<String> {
    match detect(content) {
        Ok((format, warning)) => {
            let note = if warning.is_some() { " (ambiguous)" } else { "" };
            Ok(format!("{}{}", format, note))
        }
        Err(Error::FormatUnrecognized) => {
            match Format::from_path(path).filter(|f| f.is_readable()) {
                Some(format) => Ok(format!("{} (by extension)", format)),
                None => Ok("unrecognized".to_string()),
            }
        }
        Err(e) => Err(e),
    }
}

fn cmd_show(input: &Input, limit: Option<usize>, fields: Option<&str>, json: bool) -> tabula_core::Result<()> {
    let loaded = input.load()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&loaded.table)?);
        return Ok(());
    }

    report(&input.file, &loaded)?;
    let fields = fields.map(split_fields);
    print_table(&loaded.table, limit, fields.as_deref())
}

fn stamped(path: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d+%H%M");
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    };
    path.with_file_name(name)
}

fn cmd_convert(
    input: &Input,
    output: &Path,
    to: Option<&str>,
    fields: Option<&str>,
    config: Option<&Path>,
    stamp: bool,
) -> tabula_core::Result<()> {
    let mut config = match config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            serde_json::from_str(&text)?
        }
        None => Config::default(),
    };
    if input.from != FormatChoice::Auto {
        config.load.format = input.from;
    }
    if input.start_tag.is_some() {
        config.load.start_tag = input.start_tag.clone();
    }
    if let Some(fields) = fields {
        config.save.fields = Some(split_fields(fields));
    }

    let loaded = load_file(&input.file, &config.load)?;
    report(&input.file, &loaded)?;

    let output = if stamp { stamped(output) } else { output.to_path_buf() };
    let target = match to {
        Some(name) => name.trim().to_ascii_lowercase(),
        None => output
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .ok_or_else(|| Error::UnknownFormat(output.display().to_string()))?,
    };

    tracing::debug!(output = %output.display(), target = %target, "converting");

    if target == "json" {
        let table = match &config.save.fields {
            Some(fields) => loaded.table.select(fields)?,
            None => loaded.table,
        };
        std::fs::write(&output, serde_json::to_string_pretty(&table)?)?;
        println!("Wrote {} as JSON", output.display());
        return Ok(());
    }

    let format: Format = target.parse()?;
    std::fs::write(&output, save(&loaded.table, format, &config.save)?)?;
    println!("Wrote {} ({})", output.display(), format);
    Ok(())
}

fn cmd_merge(
    base: &Path,
    incoming: &Path,
    keys: &[String],
    intersect: bool,
    output: Option<&Path>,
) -> tabula_core::Result<()> {
    let options = LoadOptions::default();
    let base_loaded = load_file(base, &options)?;
    report(base, &base_loaded)?;
    let incoming_loaded = load_file(incoming, &options)?;
    report(incoming, &incoming_loaded)?;

    let unmatched = if intersect { Unmatched::Skip } else { Unmatched::Add };
    let merged = merge_tables(&base_loaded.table, &incoming_loaded.table, keys, unmatched)?;
    eprintln!(
        "Merged on {}: {} records",
        keys.join(", "),
        merged.record_count()?
    );
    emit(&merged, output)
}

fn cmd_sort(
    input: &Input,
    field: &str,
    descending: bool,
    numeric: bool,
    output: Option<&Path>,
) -> tabula_core::Result<()> {
    let loaded = input.load()?;
    report(&input.file, &loaded)?;

    let mut table = loaded.table;
    if numeric {
        table.numerize();
    }
    table.sort_records(field, descending)?;
    emit(&table, output)
}

fn cmd_search(
    input: &Input,
    terms: &[(String, String)],
    partial: bool,
    output: Option<&Path>,
) -> tabula_core::Result<()> {
    let loaded = input.load()?;
    report(&input.file, &loaded)?;

    let mut query = MatchQuery::new();
    for (field, value) in terms {
        query.add(field.as_str(), value.as_str());
    }
    let records = if partial {
        loaded.table.search_records(&query)?
    } else {
        loaded.table.matching_records(&query)?
    };
    eprintln!("{} matching record(s)", records.len());

    let mut table = loaded.table;
    table.shrink(&records)?;
    emit(&table, output)
}

fn cmd_filter(input: &Input, ranges: &[FieldRange], output: Option<&Path>) -> tabula_core::Result<()> {
    let loaded = input.load()?;
    report(&input.file, &loaded)?;

    let mut table = loaded.table;
    table.numerize();
    let records = table.records_in_ranges(ranges)?;
    eprintln!("{} record(s) within bounds", records.len());

    table.shrink(&records)?;
    emit(&table, output)
}

fn cmd_scan(roots: &[PathBuf], verbose: bool) -> tabula_core::Result<()> {
    let result = scan_directory(roots)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();
    println!("Found {} documents", result.documents.len());
    for (extension, count) in result.counts() {
        println!("  .{}: {}", extension, count);
    }

    if verbose {
        println!();
        for document in &result.documents {
            println!("  {} [{}]", document.path.display(), document.format);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_term() {
        assert_eq!(
            parse_term("color=red=ish").unwrap(),
            ("color".to_string(), "red=ish".to_string())
        );
        assert!(parse_term("color").is_err());
    }

    #[test]
    fn test_parse_range() {
        let range = parse_range("x:-1.5:2").unwrap();
        assert_eq!(range, FieldRange::new("x", -1.5, 2.0));
        assert!(parse_range("x:1").is_err());
        assert!(parse_range("x:a:2").is_err());
    }

    #[test]
    fn test_describe_format() {
        let csv = describe_format(Path::new("a.csv"), b"x,y\n1,2\n").unwrap();
        assert_eq!(csv, format!("{} (by extension)", Format::Delimited));

        let tex = describe_format(Path::new("report.tex"), b"\\begin{document}\n").unwrap();
        assert_eq!(tex, "unrecognized");

        let dex = describe_format(Path::new("report.tex"), b"++ a\n1\n++\n").unwrap();
        assert_eq!(dex, Format::Indexed.to_string());
    }

    #[test]
    fn test_stamped_keeps_extension() {
        let path = stamped(Path::new("out/points.csv"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("points_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "points_YYYYMMDD+HHMM.csv".len());
        assert_eq!(path.parent(), Some(Path::new("out")));
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_json::from_str(r#"{"save": {"fields": ["a"]}}"#).unwrap();
        assert_eq!(config.load, LoadOptions::default());
        assert_eq!(config.save.fields, Some(vec!["a".to_string()]));
    }
}
