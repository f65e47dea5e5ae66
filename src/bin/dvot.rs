use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use drone_vo_tracker::app::App;
use drone_vo_tracker::config::{CalibrationMode, TrackerConfig};
use drone_vo_tracker::io::{object_to_json, save_export};
use drone_vo_tracker::upload::{HttpService, UploadFile, UploadState, is_archive};
use drone_vo_tracker::visualization::log_charts;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Parser)]
#[command(version, about, author)]
struct DvotCli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a zip of drone images and inspect the returned trajectory
    Upload(UploadArgs),
    /// Ask the odometry service whether it is up
    Health(ServiceArgs),
}

#[derive(Args)]
struct ServiceArgs {
    /// JSON config file
    #[arg(long)]
    config: Option<String>,

    /// Service origin, e.g. http://localhost:8000
    #[arg(long)]
    service_url: Option<String>,
}

#[derive(Args)]
struct UploadArgs {
    /// zip archive with the image sequence
    archive: PathBuf,

    #[command(flatten)]
    service: ServiceArgs,

    #[arg(long)]
    focal_length: Option<f64>,

    #[arg(long)]
    center_x: Option<f64>,

    #[arg(long)]
    center_y: Option<f64>,

    /// Attach the calibration to the upload request
    #[arg(long)]
    send_calibration: bool,

    /// Also produce the feature matching quality plot
    #[arg(long)]
    show_features: bool,

    /// Save drone_trajectory.csv into the output directory
    #[arg(long)]
    export_csv: bool,

    /// Save plotly figure JSON into the output directory
    #[arg(long)]
    plot_json: bool,

    /// Save a rerun recording, e.g. trajectory.rrd
    #[arg(long)]
    rerun_save: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn load_config(args: &ServiceArgs) -> drone_vo_tracker::Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_json_file(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(url) = &args.service_url {
        config.service_url = url.clone();
    }
    Ok(config)
}

async fn health(args: ServiceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args)?;
    config.validate()?;
    let service = HttpService::from_config(&config)?;
    let status = service.health().await?;
    println!("{}: {}", config.service_url, status);
    Ok(())
}

async fn upload(args: UploadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.service)?;
    if let Some(f) = args.focal_length {
        config.calibration.focal_length = f;
    }
    if let Some(cx) = args.center_x {
        config.calibration.center_x = cx;
    }
    if let Some(cy) = args.center_y {
        config.calibration.center_y = cy;
    }
    if args.send_calibration {
        config.calibration_mode = CalibrationMode::Forward;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    config.validate()?;

    if !is_archive(&args.archive) {
        return Err(format!("{} is not a .zip archive", args.archive.display()).into());
    }
    let file = UploadFile::from_path(&args.archive)?;

    let mut app = App::new(HttpService::from_config(&config)?, &config);
    if args.show_features {
        app.toggle_features();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
    spinner.set_message("Processing images... Please wait");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let state = app.choose_file(Some(&file)).await.clone();
    spinner.finish_and_clear();

    let trajectory = match state {
        UploadState::Ready(t) => t,
        UploadState::Error(message) => return Err(message.into()),
        other => return Err(format!("upload ended in state {}", other.name()).into()),
    };

    println!("frames: {}", trajectory.len());
    println!("path length: {:.3}", trajectory.path_length());
    if let Some(c) = trajectory.mean_confidence() {
        println!("mean confidence: {:.1}%", c * 100.0);
    }
    if let Some((lo, hi)) = trajectory.bounds() {
        println!("bounds: {:.2?} .. {:.2?}", lo.to_array(), hi.to_array());
    }

    let Some(charts) = app.charts() else {
        return Ok(());
    };
    if args.plot_json {
        std::fs::create_dir_all(&config.output_dir)?;
        object_to_json(
            &config.output_dir.join("trajectory_plot.json"),
            &charts.trajectory.to_plotly(),
        )?;
        if let Some(quality) = &charts.quality {
            object_to_json(&config.output_dir.join("quality_plot.json"), &quality.to_plotly())?;
        }
    }
    if let Some(path) = &args.rerun_save {
        let recording = rerun::RecordingStreamBuilder::new("drone_vo_tracker").save(path)?;
        log_charts(&recording, "/trajectory", &charts)?;
        log::info!("rerun recording saved to {}", path.display());
    }
    if args.export_csv {
        if let Some(export) = app.export_csv()? {
            let path = save_export(&config.output_dir, &export)?;
            println!("exported {}", path.display());
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = DvotCli::parse();
    match cli.command {
        Commands::Upload(args) => upload(args).await,
        Commands::Health(args) => health(args).await,
    }
}
