//! Track Undistortion Tool
//!
//! Remove lens distortion from a pose-tracking keypoint table using an
//! intrinsic camera calibration.
//!
//! Usage:
//!   cargo run --bin undistort_tracks -- -t tracks.csv -c camera.json -f frame.png -o out.csv

use clap::Parser;
use std::path::PathBuf;
use track_undistort::io::{calibration, frame, table};
use track_undistort::{Resolution, TrackUndistorter};

#[derive(Parser)]
#[command(author, version, about = "Remove lens distortion from pose-tracking keypoint tables")]
struct Cli {
    /// Keypoint track table (.csv or .json)
    #[arg(short = 't', long)]
    tracks: PathBuf,

    /// Intrinsic calibration file (.json, .yaml, or .yml)
    #[arg(short = 'c', long)]
    calib: PathBuf,

    /// Reference frame image, read only for its pixel dimensions
    #[arg(short = 'f', long, conflicts_with_all = ["width", "height"])]
    frame: Option<PathBuf>,

    /// Frame width in pixels (alternative to --frame)
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Frame height in pixels (alternative to --frame)
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Column of the crop's top-left corner in the calibrated frame
    #[arg(long, default_value_t = 0)]
    offset_col: u32,

    /// Row of the crop's top-left corner in the calibrated frame
    #[arg(long, default_value_t = 0)]
    offset_row: u32,

    /// Output table path (.csv or .json)
    #[arg(short = 'o', long)]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Track Undistortion Tool");
    println!("=======================");
    println!("Tracks: {:?}", cli.tracks);
    println!("Calibration: {:?}", cli.calib);
    println!("Output: {:?}", cli.output);
    println!();

    let size = match (&cli.frame, cli.width, cli.height) {
        (Some(path), _, _) => frame::reference_frame_size(path)?,
        (None, Some(width), Some(height)) => Resolution { width, height },
        _ => return Err("either --frame or both --width and --height are required".into()),
    };
    println!("✓ Frame size: {}x{}", size.width, size.height);

    let loaded = calibration::load_calibration(&cli.calib)?;
    let mut model = loaded.into_camera(size)?;
    println!("✓ Loaded {:?} calibration", model.lens());
    let intrinsics = model.intrinsics();
    println!(
        "  fx={:.2}, fy={:.2}, cx={:.2}, cy={:.2}",
        intrinsics.fx, intrinsics.fy, intrinsics.cx, intrinsics.cy
    );

    if cli.offset_col > 0 || cli.offset_row > 0 {
        model = model.with_crop_offset(cli.offset_col, cli.offset_row);
        println!(
            "✓ Applied crop offset ({}, {})",
            cli.offset_col, cli.offset_row
        );
    }

    let tracks = table::read_track_table(&cli.tracks)?;
    println!(
        "✓ Loaded {} keypoints x {} frames (scorer: {})",
        tracks.keypoints.len(),
        tracks.n_frames(),
        tracks.scorer
    );

    println!("⏳ Undistorting keypoint tracks...");
    let undistorted = TrackUndistorter::new(model).run(&tracks)?;

    table::write_track_table(&cli.output, &undistorted)?;
    println!("✓ Saved undistorted tracks to: {:?}", cli.output);
    println!();
    println!("✅ Done!");

    Ok(())
}
