// Copyright 2023 Viktor Reusch
//
// This file is part of kml_gpx_convert.
//
// kml_gpx_convert is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// kml_gpx_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with kml_gpx_convert. If not, see <https://www.gnu.org/licenses/>.

//! Command-line interface for the KML-to-GPX converter.

use std::{path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser};
use log::LevelFilter;

use kml_gpx_convert::{convert_file, Options, PointLabels};

/// Convert the track of a KML file into a GPX 1.0 file.
///
/// The output is written next to the input with `.gpx` appended.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// KML file with a placemark containing a line-string.
    input: PathBuf,

    /// Do not name track points by their position.
    #[arg(long)]
    no_labels: bool,

    /// Log more details. Repeat for more output.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn options(&self) -> Options {
        Options {
            point_labels: if self.no_labels {
                PointLabels::Unlabeled
            } else {
                PointLabels::Sequential
            },
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .init();

    match convert_file(&args.input, &args.options()) {
        Ok(report) => {
            println!(
                "Read: {}, number of coordinates: {}",
                report.name.as_deref().unwrap_or_default(),
                report.points
            );
            println!("Wrote output file: {}", report.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Conversion failed with: {err}");
            ExitCode::FAILURE
        }
    }
}
