/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */
#![doc = include_str!("../doc/odin_nexrad.md")]

use std::{env, path::{Path, PathBuf}};
use chrono::NaiveDateTime;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};
use odin_common::{datetime::parse_naive_utc_datetime, fs::{filepath_contents, first_existing_file}};

mod errors;
pub use errors::{OdinNexradError, Result, op_failed};

pub mod timestamp;
pub use timestamp::{IdentifierFormat, TimeLayout, TimestampExtractor};

pub mod resolver;
pub use resolver::{resolve, resolve_windowed, search_windows, SearchWindow, TimestampedIdentifier, WindowSpan};

pub mod archive;
pub use archive::{find_closest, list_timestamped, RadarArchive, VolumeSource};

pub mod aws;
pub use aws::{AwsArchive, AwsArchiveConfig};

pub mod thredds;
pub use thredds::{ThreddsArchive, ThreddsArchiveConfig};

pub mod sweep;
pub use sweep::{GateGrid, SweepField};

pub mod decode;
pub use decode::{NetcdfSweepDecoder, SweepDecoder, VolumeDecoder};

pub mod level2;
pub use level2::{Level2Config, Level2SweepDecoder};

pub mod render;
pub use render::{ColorTable, MapExtent, MapPlot, PngRenderer, RenderConfig, Renderer};

/* #region configuration ****************************************************************************/

pub const CONFIG_FILE: &str = "nexrad.ron";

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct NexradConfig {
    /// 4 letter ICAO code of the radar station (e.g. "KJAX")
    pub station: String,
    /// number of windows to search, starting with the one that contains the target time
    pub search_windows: usize,
    /// index of the sweep (elevation scan) within the volume
    pub sweep: usize,
    pub aws: AwsArchiveConfig,
    pub thredds: ThreddsArchiveConfig,
    pub level2: Level2Config,
    pub render: RenderConfig,
}

impl Default for NexradConfig {
    fn default()->Self {
        NexradConfig {
            station: "KJAX".to_string(),
            search_windows: 2,
            sweep: 0,
            aws: AwsArchiveConfig::default(),
            thredds: ThreddsArchiveConfig::default(),
            level2: Level2Config::default(),
            render: RenderConfig::default(),
        }
    }
}

pub fn load_config_path<C,P> (path: P)->Result<C> where C: DeserializeOwned, P: AsRef<Path> {
    let data = filepath_contents( &path)?;
    Ok( ron::de::from_bytes( data.as_slice())? )
}

/// the base dirs we look for `configs/odin_nexrad/nexrad.ron`: `$ODIN_HOME` and `~/.odin`
pub fn config_base_dirs ()->Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(odin_home) = env::var("ODIN_HOME") {
        dirs.push( PathBuf::from(odin_home));
    }
    if let Ok(usr_home) = env::var("HOME") {
        dirs.push( Path::new( &usr_home).join(".odin"));
    }
    dirs
}

/// load the config from an explicit path, or the first config file found in [`config_base_dirs`].
/// If there is none we use the built-in defaults
pub fn load_config (path: Option<&Path>)->Result<NexradConfig> {
    if let Some(path) = path {
        info!("loading config {:?}", path);
        return load_config_path( path)
    }

    if let Some(path) = first_existing_file( &config_base_dirs(), &["configs", "odin_nexrad"], CONFIG_FILE) {
        info!("loading config {:?}", path);
        load_config_path( &path)
    } else {
        debug!("no {CONFIG_FILE} found, using defaults");
        Ok( NexradConfig::default() )
    }
}

/// value parser for target times entered on the command line
pub fn parse_target_time (s: &str)->std::result::Result<NaiveDateTime,String> {
    parse_naive_utc_datetime(s).ok_or_else(|| format!("invalid date/time '{s}' (use e.g. 2024-09-01T12:00:00Z)"))
}

/// where we store the map if there is no explicit output path
pub fn default_output_path (station: &str)->PathBuf {
    PathBuf::from( format!("{}_radar_reflectivity.png", station.to_uppercase()))
}

/* #endregion configuration */

/* #region pipeline *********************************************************************************/

/// what to retrieve and how to render it
#[derive(Debug,Clone)]
pub struct SweepRequest {
    pub target: NaiveDateTime,
    pub search_windows: usize,
    pub sweep: usize,
    pub render: RenderConfig,
}

impl SweepRequest {
    pub fn new (config: &NexradConfig, target: NaiveDateTime)->Self {
        SweepRequest { target, search_windows: config.search_windows, sweep: config.sweep, render: config.render.clone() }
    }
}

#[derive(Debug,Clone)]
pub struct SweepMap {
    pub resolved: TimestampedIdentifier,
    pub output: PathBuf,
}

/// the end-to-end sequence: resolve the closest volume, fetch it, decode the requested sweep and render it
pub async fn get_sweep_map<A,D,R> (archive: &A, decoder: &D, renderer: &R, request: &SweepRequest)->Result<SweepMap>
    where A: RadarArchive, D: SweepDecoder, R: Renderer
{
    let resolved = find_closest( archive, &request.target, request.search_windows).await?;

    let sweep = {
        let source = archive.fetch( &resolved.id).await?;
        let result = decoder.decode( &source, request.sweep);
        debug!("releasing {source}");
        drop(source); // also if decoding failed
        result?
    };

    let stats = sweep.value_stats();
    info!("{} valid {} values in [{:.1}, {:.1}] {}", stats.n, sweep.field_name, stats.min, stats.max, sweep.units);

    let plot = MapPlot::from_sweep( &sweep, &request.render);
    let output = renderer.render( &plot)?;

    Ok( SweepMap { resolved, output } )
}

/* #endregion pipeline */
