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

//! Decoding of the KML track dialect.
//!
//! Only the parts needed for a track are extracted: the name of the first
//! placemark and the raw text of its line-string coordinates.

use std::io::Read;

use log::debug;
use thiserror::Error;
use xml::reader::{EventReader, XmlEvent};

/// Local name of the KML root element.
const ROOT: &str = "kml";
/// Element paths below which the track placemark may appear.
const PLACEMARK_PARENTS: &[&[&str]] = &[&[ROOT], &[ROOT, "Document"]];
/// Paths relative to the placemark.
const NAME_PATH: &[&str] = &["name"];
const COORDINATES_PATH: &[&str] = &["LineString", "coordinates"];

/// The parts of a KML document relevant for conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Name of the placemark, trimmed. `None` if missing or blank.
    pub name: Option<String>,
    /// Unparsed content of the line-string's `<coordinates>` element.
    pub coordinates: String,
}

/// Error returned from [`decode`].
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed XML: {0}")]
    Xml(#[from] xml::reader::Error),
    #[error("root element is <{found}> instead of <kml>")]
    NotKml { found: String },
    #[error("no {0} element found")]
    Missing(&'static str),
}

/// Decode a KML document from `source`.
///
/// The track is taken from the first `Placemark` located directly below
/// `<kml>` or `<kml><Document>`. Any further placemarks are ignored.
pub fn decode(source: impl Read) -> Result<SourceDocument, DecodeError> {
    let mut path: Vec<String> = vec![];
    // Depth of the selected placemark element, once found.
    let mut placemark: Option<usize> = None;
    let mut placemark_closed = false;
    let mut name: Option<String> = None;
    let mut coordinates: Option<String> = None;

    for event in EventReader::new(source) {
        match event? {
            XmlEvent::StartElement { name: tag, .. } => {
                if path.is_empty() {
                    if tag.local_name != ROOT {
                        return Err(DecodeError::NotKml {
                            found: tag.local_name,
                        });
                    }
                    debug!("KML namespace: {:?}", tag.namespace);
                }

                let below_parent = PLACEMARK_PARENTS
                    .iter()
                    .any(|parent| same_path(&path, parent));
                if tag.local_name == "Placemark" && below_parent {
                    if placemark.is_none() {
                        placemark = Some(path.len() + 1);
                    } else {
                        debug!("ignoring additional placemark at depth {}", path.len() + 1);
                    }
                }

                path.push(tag.local_name);

                if !placemark_closed && below_placemark(&path, placemark, COORDINATES_PATH) {
                    coordinates.get_or_insert_with(String::new);
                }
            }
            XmlEvent::EndElement { .. } => {
                if placemark == Some(path.len()) {
                    placemark_closed = true;
                }
                path.pop();
            }
            XmlEvent::Characters(text) | XmlEvent::CData(text) | XmlEvent::Whitespace(text) => {
                if placemark_closed {
                    continue;
                }
                if below_placemark(&path, placemark, NAME_PATH) {
                    name.get_or_insert_with(String::new).push_str(&text);
                } else if below_placemark(&path, placemark, COORDINATES_PATH) {
                    coordinates
                        .get_or_insert_with(String::new)
                        .push_str(&text);
                }
            }
            _ => {}
        }
    }

    if placemark.is_none() {
        return Err(DecodeError::Missing("Placemark"));
    }
    let coordinates = coordinates.ok_or(DecodeError::Missing("LineString/coordinates"))?;
    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(SourceDocument { name, coordinates })
}

/// Check whether `path` equals `expected`.
fn same_path(path: &[String], expected: &[&str]) -> bool {
    path.iter().map(String::as_str).eq(expected.iter().copied())
}

/// Check whether `path` leads to `expected` below the placemark at depth
/// `placemark`.
fn below_placemark(path: &[String], placemark: Option<usize>, expected: &[&str]) -> bool {
    match placemark {
        Some(depth) if path.len() >= depth => same_path(&path[depth..], expected),
        _ => false,
    }
}
