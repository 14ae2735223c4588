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

//! Library for converting a [KML](https://developers.google.com/kml) track to
//! [GPX](https://www.topografix.com/gpx.asp).
//!
//! The KML document must contain a placemark with a line-string. Its
//! coordinates become the points of a single GPX 1.0 track segment.
//!
//! See [`convert`] for streams and [`convert_file`] for files.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::info;
use tempfile::NamedTempFile;
use thiserror::Error;

pub mod coordinate;
pub mod source;
pub mod track;

pub use coordinate::{parse_coordinates, Coordinate, CoordinateError};
pub use source::{decode, DecodeError, SourceDocument};
pub use track::{write_gpx, PointLabels, Track, TrackPoint};

/// Extension appended to the input path to name the output file.
const OUTPUT_EXTENSION: &str = "gpx";

/// Error returned from the conversion functions.
#[derive(Error, Debug)]
pub enum Error {
    /// The input file could not be read.
    #[error("unable to open input file {}: {source}", path.display())]
    InputRead { path: PathBuf, source: io::Error },
    /// The input is not a usable KML document.
    #[error("unable to parse KML: {0}")]
    Decode(#[from] DecodeError),
    /// The line-string coordinates are malformed.
    #[error("unable to parse coordinates in KML: {0}")]
    Coordinates(#[from] CoordinateError),
    /// GPX writing failed.
    #[error("writing GPX failed: {0}")]
    Emit(#[from] xml::writer::Error),
    /// The output file could not be created.
    #[error("unable to create output file {}: {source}", path.display())]
    OutputCreate { path: PathBuf, source: io::Error },
    /// The output file could not be written.
    #[error("unable to write output file {}: {source}", path.display())]
    OutputWrite { path: PathBuf, source: io::Error },
}

/// Conversion settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub point_labels: PointLabels,
}

/// Summary of a successful [`convert_file`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Path of the written GPX file.
    pub output: PathBuf,
    /// Name of the converted track.
    pub name: Option<String>,
    /// Number of track points written.
    pub points: usize,
}

/// Read a KML document from `source` and build the GPX track.
pub fn read_track(source: impl Read, options: &Options) -> Result<Track, Error> {
    let document = decode(source)?;
    let coords = parse_coordinates(&document.coordinates)?;
    info!(
        "read placemark {:?} with {} coordinates",
        document.name,
        coords.len()
    );

    Ok(Track::from_coordinates(
        document.name,
        &coords,
        options.point_labels,
    ))
}

/// Write `track` as a complete GPX file to `sink`.
pub fn write_track(track: &Track, sink: impl Write) -> Result<(), Error> {
    write_gpx(track, sink)?;
    Ok(())
}

/// Read a KML file and write a GPX file.
///
/// A complete KML file is read from `source`. The converted track is written
/// as a complete GPX file to `sink`.
///
/// Nothing is written to `sink` unless the KML was read successfully.
///
/// # Example
/// ```
/// # use kml_gpx_convert::{convert, Options};
/// #
/// let source = r#"
/// <kml xmlns="http://earth.google.com/kml/2.2">
///     <Document><Placemark>
///         <name>Hike</name>
///         <LineString><coordinates>-122.1,47.6,0 -122.2,47.7,0</coordinates></LineString>
///     </Placemark></Document>
/// </kml>
/// "#;
/// let mut sink = vec![];
///
/// convert(source.as_bytes(), &mut sink, &Options::default()).expect("conversion failed");
///
/// let gpx = String::from_utf8(sink).expect("GPX data is not valid UTF-8");
/// assert!(gpx.contains("<gpx"));
/// assert!(gpx.contains(r#"lat="47.6" lon="-122.1""#));
/// assert!(gpx.contains("Hike"));
/// ```
pub fn convert(source: impl Read, sink: impl Write, options: &Options) -> Result<(), Error> {
    let track = read_track(source, options)?;
    write_track(&track, sink)
}

/// Name of the GPX file written for `input`.
///
/// The extension is appended, so `track.kml` becomes `track.kml.gpx`.
pub fn output_path(input: impl AsRef<Path>) -> PathBuf {
    let mut path = input.as_ref().as_os_str().to_owned();
    path.push(".");
    path.push(OUTPUT_EXTENSION);
    path.into()
}

/// Convert the KML file at `input` into a GPX file next to it.
///
/// The output is named by [`output_path`]. It is fully rendered in memory and
/// then moved into place, so a failed conversion never leaves a partial file
/// behind. The output gets the same permissions as the input.
pub fn convert_file(input: impl AsRef<Path>, options: &Options) -> Result<Report, Error> {
    let input = input.as_ref();
    let read_error = |source| Error::InputRead {
        path: input.to_path_buf(),
        source,
    };
    let source = fs::read(input).map_err(read_error)?;
    let permissions = fs::metadata(input).map_err(read_error)?.permissions();

    let track = read_track(source.as_slice(), options)?;
    let gpx = write_gpx(&track, vec![])?;

    let output = output_path(input);
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|source| Error::OutputCreate {
        path: output.clone(),
        source,
    })?;
    file.write_all(&gpx)
        .and_then(|()| file.as_file().set_permissions(permissions))
        .map_err(|source| Error::OutputWrite {
            path: output.clone(),
            source,
        })?;
    file.persist(&output).map_err(|err| Error::OutputWrite {
        path: output.clone(),
        source: err.error,
    })?;
    info!("wrote {} bytes to {}", gpx.len(), output.display());

    Ok(Report {
        output,
        name: track.name,
        points: track.points.len(),
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    const HIKE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://earth.google.com/kml/2.2">
<Document>
 <Placemark>
  <name>Hike</name>
  <LineString>
   <coordinates>-122.1,47.6,0 -122.2,47.7,0</coordinates>
  </LineString>
 </Placemark>
</Document>
</kml>
"#;

    #[test]
    fn appends_extension() {
        assert_eq!(output_path("track.kml"), PathBuf::from("track.kml.gpx"));
        assert_eq!(
            output_path("/tmp/runs/day 1"),
            PathBuf::from("/tmp/runs/day 1.gpx")
        );
    }

    #[test]
    fn reads_track_with_labels() {
        let track = read_track(HIKE.as_bytes(), &Options::default()).unwrap();
        assert_eq!(track.name.as_deref(), Some("Hike"));
        assert_eq!(track.points.len(), 2);
        assert_eq!(track.points[1].lat, 47.7);
        assert_eq!(track.points[1].lon, -122.2);
        assert_eq!(track.points[1].name.as_deref(), Some("2"));
    }

    #[test]
    fn reads_track_without_labels() {
        let options = Options {
            point_labels: PointLabels::Unlabeled,
        };
        let track = read_track(HIKE.as_bytes(), &options).unwrap();
        assert!(track.points.iter().all(|p| p.name.is_none()));
    }

    #[test]
    fn failed_conversion_writes_nothing() {
        let kml = HIKE.replace("-122.2,47.7,0", "-122.2,47.7");
        let mut sink = vec![];
        let err = convert(kml.as_bytes(), &mut sink, &Options::default()).unwrap_err();
        assert!(matches!(err, Error::Coordinates(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn write_failure_is_emit_error() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let track = read_track(HIKE.as_bytes(), &Options::default()).unwrap();
        let err = write_track(&track, Closed).unwrap_err();
        assert!(matches!(err, Error::Emit(_)));
    }

    #[test]
    fn converts_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("track.kml");
        fs::write(&input, HIKE).unwrap();

        let report = convert_file(&input, &Options::default()).unwrap();
        assert_eq!(report.output, dir.path().join("track.kml.gpx"));
        assert_eq!(report.name.as_deref(), Some("Hike"));
        assert_eq!(report.points, 2);

        let gpx = fs::read_to_string(&report.output).unwrap();
        let parsed = gpx::read(gpx.as_bytes()).unwrap();
        assert_eq!(parsed.tracks[0].segments[0].points.len(), 2);

        // Only the input and the output remain, no temporary files.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn output_keeps_input_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let input = dir.path().join("track.kml");
        fs::write(&input, HIKE).unwrap();
        fs::set_permissions(&input, fs::Permissions::from_mode(0o644)).unwrap();

        let report = convert_file(&input, &Options::default()).unwrap();
        let mode = fs::metadata(&report.output).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn missing_input_is_read_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("missing.kml");

        let err = convert_file(&input, &Options::default()).unwrap_err();
        assert!(matches!(err, Error::InputRead { ref path, .. } if *path == input));
        assert!(!output_path(&input).exists());
    }

    #[test]
    fn invalid_input_leaves_no_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("broken.kml");
        fs::write(&input, "<kml><Document>").unwrap();

        let err = convert_file(&input, &Options::default()).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn replaces_existing_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("track.kml");
        fs::write(&input, HIKE).unwrap();
        fs::write(output_path(&input), "stale").unwrap();

        convert_file(&input, &Options::default()).unwrap();
        let gpx = fs::read_to_string(output_path(&input)).unwrap();
        assert!(gpx.contains("<trkseg>"));
    }
}
