use clap::{Parser, Subcommand};
use sensorview::data::{downsample, ingest, Table};
use sensorview::nav::{Preset, SystemClock, TimeNavigator, TimeRange};
use sensorview::session::{SensorCatalog, SeriesFilter, SessionAddress};
use sensorview::source::{CancelToken, DataSource, LoadStatus, Loader, MemorySource, QueryRequest};
use sensorview::{Selection, ViewConfig};
use sensorview_tools::{format_time, init_logging, write_csv, ViewOpts};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "sv-tool",
    version,
    about = "Ingest, query and window large time-indexed sensor data"
)]
struct Cli {
    #[command(flatten)]
    view: ViewOpts,

    /// Log debug output to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a delimited file and summarise it
    Ingest {
        /// Delimited file with a header row
        file: PathBuf,

        /// Write the downsampled result as CSV to this path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Write the downsampled result to a timestamped file
        #[arg(long, conflicts_with = "output")]
        save: bool,

        /// Seconds to wait for ingestion
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Query a file through the in-memory data source and print CSV
    Query {
        file: PathBuf,

        /// Range start, seconds since the epoch
        #[arg(long, requires = "end", allow_negative_numbers = true)]
        start: Option<f64>,

        /// Range end, seconds since the epoch
        #[arg(long, requires = "start", allow_negative_numbers = true)]
        end: Option<f64>,

        /// Window ending now (15m, 1h, 6h, 24h, 7d, live)
        #[arg(short = 'p', long, conflicts_with_all = ["start", "end"])]
        preset: Option<Preset>,

        /// Comma-separated series ids, or NONE
        #[arg(short = 's', long)]
        sensors: Option<String>,

        /// Glob over /group/sensor paths (repeatable)
        #[arg(short = 'f', long = "filter")]
        filters: Vec<String>,

        /// Sensor catalog JSON ({"group": ["sensor", ...]})
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Print times as RFC 3339 dates
        #[arg(long)]
        dates: bool,
    },

    /// Print the lines of a text file that a viewport would show
    Window {
        file: PathBuf,

        /// Scroll offset in lines
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Viewport height in lines
        #[arg(long, default_value_t = 20)]
        height: u32,

        /// Stick to the end of the file
        #[arg(long)]
        follow: bool,
    },

    /// Encode or decode a session address
    Address {
        #[command(subcommand)]
        command: AddressCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AddressCommand {
    /// Build a query string from a selection and range
    Encode {
        /// Comma-separated series ids; omit for all, NONE for none
        #[arg(short = 's', long)]
        sensors: Option<String>,

        #[arg(long, requires = "end", allow_negative_numbers = true)]
        start: Option<f64>,

        #[arg(long, requires = "start", allow_negative_numbers = true)]
        end: Option<f64>,
    },
    /// Show the selection and range a query string describes
    Decode { query: String },
}

fn default_output_path() -> PathBuf {
    PathBuf::from(
        chrono::Local::now()
            .format("sensorview.%Y%m%d-%H%M%S.csv")
            .to_string(),
    )
}

fn parse_selection(sensors: Option<&str>) -> Selection {
    sensors.map(Selection::parse_list).unwrap_or_default()
}

fn load_table(file: &Path, config: &ViewConfig) -> Result<Table, String> {
    Table::read(file, config.delimiter).map_err(|e| format!("{}: {e}", file.display()))
}

fn ingest_file(
    config: &ViewConfig,
    file: PathBuf,
    output: Option<PathBuf>,
    save: bool,
    timeout: u64,
) -> Result<(), String> {
    let mut loader = Loader::new(MemorySource::default());
    loader.ingest_path(&file, config.delimiter);
    match loader.wait(Duration::from_secs(timeout)) {
        LoadStatus::Ready { .. } => {}
        LoadStatus::Failed { error, .. } => return Err(format!("{}: {error}", file.display())),
        _ => return Err(format!("{}: ingestion timed out", file.display())),
    }

    let buffer = loader.current();
    if let Some(stats) = loader.stats() {
        println!("file:          {}", file.display());
        println!(
            "time column:   {}",
            stats.time_column.as_deref().unwrap_or("-")
        );
        println!("rows:          {}", stats.rows);
        println!("skipped rows:  {}", stats.skipped_rows);
        println!("absent cells:  {}", stats.absent_cells);
    }
    println!("points:        {}", buffer.len());
    if let Some((start, end)) = buffer.time_span() {
        println!(
            "span:          {} .. {}",
            format_time(start, true),
            format_time(end, true)
        );
    }
    println!("series:        {}", buffer.series_count());
    for (id, values) in buffer.iter() {
        let absent = values.iter().filter(|r| r.is_absent()).count();
        println!("  {id:<24} {} present, {absent} absent", values.len() - absent);
    }

    let output = output.or_else(|| save.then(default_output_path));
    if let Some(path) = output {
        let reduced = downsample(&buffer, config.display_width);
        let file = File::create(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        let mut out = BufWriter::new(file);
        write_csv(&mut out, &reduced, ',', false)
            .and_then(|_| out.flush())
            .map_err(|e| format!("{}: {e}", path.display()))?;
        println!("wrote {} points to {}", reduced.len(), path.display());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn query(
    config: &ViewConfig,
    file: PathBuf,
    start: Option<f64>,
    end: Option<f64>,
    preset: Option<Preset>,
    sensors: Option<String>,
    filters: Vec<String>,
    catalog: Option<PathBuf>,
    dates: bool,
) -> Result<(), String> {
    let buffer = ingest(&load_table(&file, config)?);

    let mut selection = parse_selection(sensors.as_deref());
    if !filters.is_empty() {
        let catalog = match catalog {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .map_err(|e| format!("{}: {e}", path.display()))?;
                SensorCatalog::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))?
            }
            None => {
                let mut catalog = SensorCatalog::default();
                catalog.insert("data", buffer.series_ids().map(str::to_string).collect());
                catalog
            }
        };
        let filters = filters
            .iter()
            .map(|f| SeriesFilter::new(f))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?;
        let mut ids: Vec<String> = match &selection {
            Selection::Ids(ids) => ids.iter().cloned().collect(),
            _ => vec![],
        };
        ids.extend(catalog.expand(&filters));
        selection = Selection::ids(ids);
    }

    let Some(series_ids) = selection.query_ids() else {
        tracing::info!("empty selection");
        return Ok(());
    };

    let mut request = QueryRequest::new(config.display_width).with_series(series_ids);
    let mut navigator = TimeNavigator::with_config(SystemClock, config);
    let range = match (start, end, preset) {
        (Some(start), Some(end), _) => navigator
            .zoom_to(start, end)
            .map(|e| e.bounds())
            .ok_or_else(|| format!("invalid range {start} .. {end}"))
            .map(Some)?,
        (_, _, Some(preset)) => Some(navigator.set_preset(preset).bounds()),
        _ => None,
    };
    if let Some((start, end)) = range {
        request = request.with_range(start, end);
    }
    tracing::debug!(query = %request.to_query_string(), "querying");

    let result = MemorySource::new(buffer)
        .fetch(&request, &CancelToken::new())
        .map_err(|e| e.to_string())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_csv(&mut out, &result, ',', dates).map_err(|e| e.to_string())
}

fn window(
    config: &ViewConfig,
    file: PathBuf,
    offset: u64,
    height: u32,
    follow: bool,
) -> Result<(), String> {
    let text = fs::read_to_string(&file).map_err(|e| format!("{}: {e}", file.display()))?;
    let lines: Vec<&str> = text.lines().collect();

    let mut viewport = sensorview::view::SequenceViewport::new(1)
        .with_overscan(config.overscan)
        .with_viewport_extent(height);
    viewport.extend(lines.len());
    if follow {
        viewport.set_follow(true);
    } else {
        viewport.scroll_to(offset);
    }

    let (Some(visible), Some(rendered)) = (viewport.visible_items(), viewport.visible_range())
    else {
        eprintln!("{}: empty", file.display());
        return Ok(());
    };
    eprintln!(
        "lines {}..={} of {} (rendered {}..={})",
        visible.first + 1,
        visible.last + 1,
        lines.len(),
        rendered.first + 1,
        rendered.last + 1
    );
    let width = (visible.last + 1).to_string().len();
    for i in visible.indices() {
        println!("{:>width$} {}", i + 1, lines[i]);
    }
    Ok(())
}

fn address(config: &ViewConfig, command: AddressCommand) -> Result<(), String> {
    match command {
        AddressCommand::Encode {
            sensors,
            start,
            end,
        } => {
            let range = match (start, end) {
                (Some(start), Some(end)) => {
                    TimeRange::fixed(start, end).map_err(|e| e.to_string())?
                }
                _ => TimeRange::Live,
            };
            let address = SessionAddress::new(parse_selection(sensors.as_deref()), range);
            println!("{}", address.encode(config.address_selection_limit));
        }
        AddressCommand::Decode { query } => {
            let address = SessionAddress::decode(&query);
            match &address.selection {
                Selection::All => println!("sensors: all"),
                Selection::None => println!("sensors: none"),
                Selection::Ids(ids) => {
                    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                    println!("sensors: {}", ids.join(", "));
                }
            }
            match address.range {
                TimeRange::Live => println!("range:   live"),
                TimeRange::Fixed { start, end } => println!(
                    "range:   {} .. {}",
                    format_time(start, true),
                    format_time(end, true)
                ),
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match cli.view.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Ingest {
            file,
            output,
            save,
            timeout,
        } => ingest_file(&config, file, output, save, timeout),
        Commands::Query {
            file,
            start,
            end,
            preset,
            sensors,
            filters,
            catalog,
            dates,
        } => query(
            &config, file, start, end, preset, sensors, filters, catalog, dates,
        ),
        Commands::Window {
            file,
            offset,
            height,
            follow,
        } => window(&config, file, offset, height, follow),
        Commands::Address { command } => address(&config, command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
