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

//! This is a WASM wrapper for `kml_gpx_convert`.

use kml_gpx_convert::{Options, PointLabels};
use wasm_bindgen::{prelude::wasm_bindgen, JsError};

/// This wraps `kml_gpx_convert::convert` for interfacing with JS.
///
/// Track points are named by their position if `label_points` is set.
#[wasm_bindgen]
pub fn convert(source: &[u8], label_points: bool) -> Result<Box<[u8]>, JsError> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let options = Options {
        point_labels: if label_points {
            PointLabels::Sequential
        } else {
            PointLabels::Unlabeled
        },
    };
    let mut sink = vec![];
    kml_gpx_convert::convert(source, &mut sink, &options)?;
    Ok(sink.into_boxed_slice())
}
