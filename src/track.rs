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

//! GPX 1.0 output model and serializer.

use std::io::Write;

use xml::{
    common::XmlVersion,
    writer::{self, EmitterConfig, EventWriter, XmlEvent},
};

use crate::coordinate::Coordinate;

/// Namespace of the `<gpx>` root element.
const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/0";
/// Value of the `version` attribute.
const GPX_VERSION: &str = "1.0";
/// Value of the `creator` attribute.
pub const CREATOR: &str = "kml_gpx_convert";
/// Indentation used for nested elements.
const INDENT: &str = " ";

/// Whether every track point gets a `<name>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointLabels {
    /// Name points "1", "2", ... in track order.
    #[default]
    Sequential,
    /// Emit points without names.
    Unlabeled,
}

/// A single point of the output track segment.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
}

/// A GPX track with exactly one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: Option<String>,
    pub points: Vec<TrackPoint>,
}

impl Track {
    /// Build a track from parsed KML `coords`, keeping their order.
    pub fn from_coordinates(
        name: Option<String>,
        coords: &[Coordinate],
        labels: PointLabels,
    ) -> Self {
        let points = coords
            .iter()
            .enumerate()
            .map(|(i, coord)| TrackPoint {
                lat: coord.lat,
                lon: coord.lon,
                name: match labels {
                    PointLabels::Sequential => Some((i + 1).to_string()),
                    PointLabels::Unlabeled => None,
                },
            })
            .collect();

        Self { name, points }
    }
}

/// Serialize `track` as a complete GPX 1.0 document into `sink`.
///
/// The document starts with an XML declaration and ends with a newline.
pub fn write_gpx<W: Write>(track: &Track, sink: W) -> writer::Result<W> {
    let mut writer = EmitterConfig::new()
        .perform_indent(true)
        .indent_string(INDENT)
        .create_writer(sink);

    writer.write(XmlEvent::StartDocument {
        version: XmlVersion::Version10,
        encoding: Some("UTF-8"),
        standalone: None,
    })?;
    writer.write(
        XmlEvent::start_element("gpx")
            .default_ns(GPX_NAMESPACE)
            .attr("version", GPX_VERSION)
            .attr("creator", CREATOR),
    )?;
    writer.write(XmlEvent::start_element("trk"))?;
    if let Some(ref name) = track.name {
        write_text_element(&mut writer, "name", name)?;
    }

    writer.write(XmlEvent::start_element("trkseg"))?;
    for point in &track.points {
        write_point(&mut writer, point)?;
    }
    writer.write(XmlEvent::end_element())?; // trkseg

    writer.write(XmlEvent::end_element())?; // trk
    writer.write(XmlEvent::end_element())?; // gpx

    let mut sink = writer.into_inner();
    writeln!(sink)?;
    Ok(sink)
}

/// Write a single `<trkpt>`.
fn write_point<W: Write>(writer: &mut EventWriter<W>, point: &TrackPoint) -> writer::Result<()> {
    let lat = point.lat.to_string();
    let lon = point.lon.to_string();
    writer.write(
        XmlEvent::start_element("trkpt")
            .attr("lat", &lat)
            .attr("lon", &lon),
    )?;
    if let Some(ref name) = point.name {
        write_text_element(writer, "name", name)?;
    }
    writer.write(XmlEvent::end_element())
}

/// Write `<tag>text</tag>`.
fn write_text_element<W: Write>(
    writer: &mut EventWriter<W>,
    tag: &str,
    text: &str,
) -> writer::Result<()> {
    writer.write(XmlEvent::start_element(tag))?;
    writer.write(XmlEvent::characters(text))?;
    writer.write(XmlEvent::end_element())
}
