mod config;
mod draw;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{debug, info};
use nanostab_gate::{AccessGate, FileSecretStore, GateError, GateState};
use nanostab_lib::{
    plot::{Figure, PlotBackend},
    query::{display_fields, resolve_file_reference},
    schema::{find_parameter, test_parameter_schema, IMAGE_SERIES_TEST},
    session::{Session, View},
    Dataset, Selection,
};
use serde::Serialize;
use serde_json::json;
use std::{
    io::{self, BufRead},
    path::{Path, PathBuf},
};

use crate::{config::Config, draw::PngBackend};

#[derive(Parser)]
#[command(
    name = "nanostab",
    version,
    about = "Browse nanoparticle stability measurements by batch, week, buffer and test"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset JSON document (overrides the configured path)
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Coordinate selectors shared by the data commands.
#[derive(Args, Clone)]
struct SelectionArgs {
    #[arg(long, default_value = "1")]
    batch: String,
    #[arg(long, default_value = "1")]
    week: String,
    #[arg(long, default_value = "buffer 1")]
    buffer: String,
    #[arg(long, default_value = "UVVIS")]
    test: String,
}

impl SelectionArgs {
    fn selection(&self) -> Selection {
        Selection::new(&self.batch, &self.week, &self.buffer, &self.test)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SeriesKind {
    /// Parameter over every week of a batch/buffer
    Trend,
    /// Parameter across every buffer of a batch/week
    Compare,
}

#[derive(Subcommand)]
enum Commands {
    /// Unlock the dataset with the shared password (read from stdin when omitted)
    Login {
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the remembered password
    Logout,
    /// Report whether the dataset is unlocked
    Status,
    /// List batches
    Batches,
    /// List weeks recorded for a batch
    Weeks {
        #[arg(long, default_value = "1")]
        batch: String,
    },
    /// List buffers recorded for a batch and week
    Buffers {
        #[arg(long, default_value = "1")]
        batch: String,
        #[arg(long, default_value = "1")]
        week: String,
    },
    /// List test types recorded for a batch, week and buffer
    Tests {
        #[command(flatten)]
        sel: SelectionArgs,
        /// Include the image-series test type
        #[arg(long)]
        with_images: bool,
    },
    /// List cell types of the image-series test
    Cells {
        #[command(flatten)]
        sel: SelectionArgs,
    },
    /// Numeric parameters of a test type
    Params {
        #[arg(long, default_value = "UVVIS")]
        test: String,
    },
    /// Show the record at a coordinate
    Record {
        #[command(flatten)]
        sel: SelectionArgs,
        /// Join file references with the asset root
        #[arg(long)]
        resolve: bool,
    },
    /// Resolve the image of one cell type
    Image {
        #[command(flatten)]
        sel: SelectionArgs,
        #[arg(long)]
        cell_type: String,
        #[arg(long)]
        resolve: bool,
    },
    /// Track a parameter over weeks
    Track {
        #[command(flatten)]
        sel: SelectionArgs,
        #[arg(long)]
        param: String,
    },
    /// Compare a parameter across buffers for one week
    Compare {
        #[command(flatten)]
        sel: SelectionArgs,
        #[arg(long)]
        param: String,
    },
    /// Change between the earliest and latest observed week
    Stats {
        #[command(flatten)]
        sel: SelectionArgs,
        #[arg(long)]
        param: String,
    },
    /// Trend analysis: series plus change stats (parameter defaults to the test's first)
    Trends {
        #[command(flatten)]
        sel: SelectionArgs,
        #[arg(long)]
        param: Option<String>,
    },
    /// Write a trend or comparison series to CSV
    Export {
        #[command(flatten)]
        sel: SelectionArgs,
        #[arg(long)]
        param: String,
        #[arg(long, value_enum, default_value = "trend")]
        kind: SeriesKind,
        #[arg(long)]
        out: PathBuf,
    },
    /// Render a trend or comparison series to PNG via plotters
    Plot {
        #[command(flatten)]
        sel: SelectionArgs,
        #[arg(long)]
        param: String,
        #[arg(long, value_enum, default_value = "trend")]
        kind: SeriesKind,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let mut config = match &cli.config {
        Some(path) => config::read_config(path)?,
        None => Config::default(),
    };
    if let Some(dataset) = cli.dataset.clone() {
        config.dataset = Some(dataset);
    }
    debug!("dataset path {}", config.dataset_path().display());

    let mut gate = open_gate(&config)?;
    match cli.command {
        Commands::Login { password } => return cmd_login(&mut gate, password),
        Commands::Logout => {
            gate.logout()?;
            println!("{}", json!({ "state": "unauthenticated" }));
            return Ok(());
        }
        Commands::Status => {
            let state = gate.start()?;
            println!("{}", json!({ "state": state_name(state) }));
            return Ok(());
        }
        command => {
            if gate.start()? != GateState::Authenticated {
                bail!("dataset is locked; run `nanostab login` first");
            }
            let dataset = Dataset::load(&config.dataset_path())?;
            run_query(command, dataset, &config)?;
        }
    }
    Ok(())
}

fn open_gate(config: &Config) -> Result<AccessGate<FileSecretStore>> {
    let store = match &config.gate.secret_dir {
        Some(dir) => FileSecretStore::new(dir),
        None => FileSecretStore::from_env().context("locating the gate directory")?,
    };
    debug!("gate secret stored under {}", store.dir().display());
    Ok(match &config.gate.expected_digest {
        Some(digest) => AccessGate::with_digest(store, digest.as_str()),
        None => AccessGate::new(store),
    })
}

fn state_name(state: GateState) -> &'static str {
    match state {
        GateState::Unauthenticated => "unauthenticated",
        GateState::Checking => "checking",
        GateState::Authenticated => "authenticated",
    }
}

fn cmd_login(gate: &mut AccessGate<FileSecretStore>, password: Option<String>) -> Result<()> {
    let candidate = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    match gate.submit(&candidate) {
        Ok(()) => {
            info!("gate unlocked");
            println!("{}", json!({ "state": state_name(gate.state()) }));
            Ok(())
        }
        Err(GateError::Mismatch) => Err(anyhow!("incorrect password")),
        Err(err) => Err(err.into()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn run_query(command: Commands, dataset: Dataset, config: &Config) -> Result<()> {
    match command {
        Commands::Batches => print_json(&dataset.list_batches()),
        Commands::Weeks { batch } => print_json(&dataset.list_weeks(&batch)),
        Commands::Buffers { batch, week } => print_json(&dataset.list_buffers(&batch, &week)),
        Commands::Tests { sel, with_images } => {
            let tests = if with_images {
                dataset.list_tests_with_images(&sel.batch, &sel.week, &sel.buffer)
            } else {
                dataset.list_tests(&sel.batch, &sel.week, &sel.buffer)
            };
            print_json(&tests)
        }
        Commands::Cells { sel } => {
            print_json(&dataset.list_image_categories(&sel.batch, &sel.week, &sel.buffer))
        }
        Commands::Params { test } => print_json(test_parameter_schema(&test)),
        Commands::Record { sel, resolve } => cmd_record(&dataset, &sel, resolve, config),
        Commands::Image {
            sel,
            cell_type,
            resolve,
        } => {
            let path = dataset
                .resolve_image_path(&sel.batch, &sel.week, &sel.buffer, &cell_type)
                .map(|path| asset_path(config, path, resolve));
            print_json(&json!({ "cell_type": cell_type, "path": path }))
        }
        Commands::Track { sel, param } => {
            print_json(&dataset.track_over_weeks(&sel.batch, &sel.buffer, &sel.test, &param))
        }
        Commands::Compare { sel, param } => print_json(&dataset.compare_across_buffers(
            &sel.batch, &sel.week, &sel.test, &param,
        )),
        Commands::Stats { sel, param } => {
            print_json(&dataset.change_stats(&sel.batch, &sel.buffer, &sel.test, &param))
        }
        Commands::Trends { sel, param } => {
            let mut session = Session::with_selection(dataset, sel.selection());
            if let Some(param) = param {
                session.set_parameter(param);
            }
            print_json(&session.trend_report())
        }
        Commands::Export {
            sel,
            param,
            kind,
            out,
        } => cmd_export(&dataset, &sel, &param, kind, &out),
        Commands::Plot {
            sel,
            param,
            kind,
            out,
        } => cmd_plot(dataset, &sel, &param, kind, &out),
        Commands::Login { .. } | Commands::Logout | Commands::Status => {
            unreachable!("gate commands are handled before the dataset loads")
        }
    }
}

fn asset_path(config: &Config, path: &str, resolve: bool) -> String {
    if resolve {
        config.asset_root().join(path).to_string_lossy().to_string()
    } else {
        path.to_string()
    }
}

fn cmd_record(dataset: &Dataset, sel: &SelectionArgs, resolve: bool, config: &Config) -> Result<()> {
    let selection = sel.selection();
    let Some(record) = selection.record(dataset) else {
        return print_json(&json!({ "selection": selection, "record": null }));
    };
    if selection.test == IMAGE_SERIES_TEST {
        let images: Vec<_> = dataset
            .list_image_categories(&sel.batch, &sel.week, &sel.buffer)
            .into_iter()
            .map(|cell_type| {
                let path = dataset
                    .resolve_image_path(&sel.batch, &sel.week, &sel.buffer, &cell_type)
                    .map(|path| asset_path(config, path, resolve));
                json!({ "cell_type": cell_type, "path": path })
            })
            .collect();
        return print_json(&json!({ "selection": selection, "images": images }));
    }
    let file = resolve_file_reference(record).map(|path| asset_path(config, path, resolve));
    print_json(&json!({
        "selection": selection,
        "fields": display_fields(record, &selection.test),
        "file": file,
    }))
}

fn cmd_export(
    dataset: &Dataset,
    sel: &SelectionArgs,
    param: &str,
    kind: SeriesKind,
    out: &Path,
) -> Result<()> {
    // Header written by hand so an empty series still yields a valid file.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(out)
        .with_context(|| format!("creating {}", out.display()))?;
    let rows = match kind {
        SeriesKind::Trend => {
            writer.write_record(["week", "value"])?;
            let points = dataset.track_over_weeks(&sel.batch, &sel.buffer, &sel.test, param);
            for point in &points {
                writer.serialize(point)?;
            }
            points.len()
        }
        SeriesKind::Compare => {
            writer.write_record(["buffer", "value"])?;
            let points = dataset.compare_across_buffers(&sel.batch, &sel.week, &sel.test, param);
            for point in &points {
                writer.serialize(point)?;
            }
            points.len()
        }
    };
    writer.flush()?;
    info!("wrote {} rows to {}", rows, out.display());
    print_json(&json!({ "rows": rows, "out": out }))
}

fn cmd_plot(
    dataset: Dataset,
    sel: &SelectionArgs,
    param: &str,
    kind: SeriesKind,
    out: &Path,
) -> Result<()> {
    let parameter = find_parameter(&sel.test, param)
        .ok_or_else(|| anyhow!("test {} has no parameter {}", sel.test, param))?;
    let mut session = Session::with_selection(dataset, sel.selection());
    session.set_parameter(param);
    let figure: Option<&Figure> = match kind {
        SeriesKind::Trend => {
            session.prepare(View::Trend);
            session.trend_figure()
        }
        SeriesKind::Compare => {
            session.prepare(View::Comparison);
            session.comparison_figure()
        }
    };
    let figure = figure.ok_or_else(|| {
        anyhow!(
            "no {} data for {} at the selected coordinate",
            parameter.label,
            sel.test
        )
    })?;
    PngBackend::new(out).draw(figure)?;
    print_json(&json!({ "out": out }))
}
