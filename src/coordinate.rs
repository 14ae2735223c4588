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

//! Parser for the text of a KML `<coordinates>` element.
//!
//! A line-string stores its path as whitespace-separated tuples of the form
//! `lon,lat,index`.

use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// A single parsed coordinate tuple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Third tuple field. Treated as a positional marker only.
    pub index: i64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

/// Error returned from [`parse_coordinates`].
///
/// `position` is the 1-based number of the offending tuple.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate string contains no tuples")]
    Empty,
    #[error("tuple {position} `{token}` has {found} fields instead of 3")]
    FieldCount {
        position: usize,
        token: String,
        found: usize,
    },
    #[error("tuple {position} `{token}` has an invalid {field}: {source}")]
    InvalidNumber {
        position: usize,
        token: String,
        field: &'static str,
        source: ParseFloatError,
    },
    #[error("tuple {position} `{token}` has a non-finite {field}")]
    NonFinite {
        position: usize,
        token: String,
        field: &'static str,
    },
    #[error("tuple {position} `{token}` has an invalid index: {source}")]
    InvalidIndex {
        position: usize,
        token: String,
        source: ParseIntError,
    },
}

/// Parse the content of a KML `<coordinates>` element.
///
/// The records are returned in input order. Values are passed through
/// verbatim, so there is no range check on longitude or latitude. Only `NaN`
/// and infinities are rejected. The first malformed tuple aborts parsing.
///
/// # Example
/// ```
/// # use kml_gpx_convert::coordinate::parse_coordinates;
/// #
/// let coords = parse_coordinates("-122.1,47.6,0 -122.2,47.7,0").unwrap();
/// assert_eq!(coords.len(), 2);
/// assert_eq!(coords[1].lon, -122.2);
/// assert_eq!(coords[1].lat, 47.7);
/// ```
pub fn parse_coordinates(text: &str) -> Result<Vec<Coordinate>, CoordinateError> {
    let coords = text
        .split_whitespace()
        .enumerate()
        .map(|(i, token)| parse_tuple(i + 1, token))
        .collect::<Result<Vec<_>, _>>()?;

    if coords.is_empty() {
        return Err(CoordinateError::Empty);
    }
    Ok(coords)
}

fn parse_tuple(position: usize, token: &str) -> Result<Coordinate, CoordinateError> {
    let fields: Vec<&str> = token.split(',').collect();
    let [lon, lat, index] = fields[..] else {
        return Err(CoordinateError::FieldCount {
            position,
            token: token.to_string(),
            found: fields.len(),
        });
    };

    let float = |value: &str, field: &'static str| -> Result<f64, CoordinateError> {
        let number = value
            .parse::<f64>()
            .map_err(|source| CoordinateError::InvalidNumber {
                position,
                token: token.to_string(),
                field,
                source,
            })?;
        if !number.is_finite() {
            return Err(CoordinateError::NonFinite {
                position,
                token: token.to_string(),
                field,
            });
        }
        Ok(number)
    };

    Ok(Coordinate {
        lon: float(lon, "longitude")?,
        lat: float(lat, "latitude")?,
        index: index
            .parse()
            .map_err(|source| CoordinateError::InvalidIndex {
                position,
                token: token.to_string(),
                source,
            })?,
    })
}
