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

//! retrieve the NEXRAD volume closest to a given time (default is now), and render the reflectivity of one
//! of its sweeps as a map around the station

use std::path::{Path, PathBuf};
use anyhow::Result;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use odin_common::datetime::naive_utc_now;
use odin_nexrad::{
    get_sweep_map, load_config, default_output_path, parse_target_time,
    AwsArchive, NexradConfig, PngRenderer, SweepMap, SweepRequest, ThreddsArchive, VolumeDecoder
};

#[derive(Subcommand, Debug, Clone, Copy)]
enum Archive {
    /// NOAA Level II archive on AWS S3
    Aws,
    /// Unidata THREDDS server (remote OPeNDAP access)
    Thredds,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = "render the NEXRAD reflectivity sweep closest to a given time")]
struct Args {
    /// pathname of the NexradConfig to use (default is configs/odin_nexrad/nexrad.ron in $ODIN_HOME or ~/.odin)
    #[arg(long)]
    config: Option<PathBuf>,

    /// radar station (e.g. KJAX)
    #[arg(short, long)]
    station: Option<String>,

    /// target date/time in UTC (e.g. 2024-09-01T12:00:00Z), default is now
    #[arg(short, long, value_parser = parse_target_time)]
    date: Option<NaiveDateTime>,

    /// number of windows to search
    #[arg(short, long)]
    windows: Option<usize>,

    /// index of sweep within the volume
    #[arg(long)]
    sweep: Option<usize>,

    /// pathname of the output image (default is <station>_radar_reflectivity.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// open the output image with the system viewer
    #[arg(long)]
    show: bool,

    #[command(subcommand)]
    archive: Archive,
}

fn main()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))) // use RUST_LOG to change
        .init();

    let args = Args::parse();

    let mut config = load_config( args.config.as_deref())?;
    if let Some(station) = &args.station { config.station = station.to_uppercase() }
    if let Some(windows) = args.windows { config.search_windows = windows }
    if let Some(sweep) = args.sweep { config.sweep = sweep }

    let target = args.date.unwrap_or_else( naive_utc_now);
    let output = args.output.clone().unwrap_or_else(|| default_output_path( &config.station));

    // everything is sequential, no need for a multi-threaded runtime
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let map = rt.block_on( run( args.archive, &config, target, &output))?;

    println!("{} -> {}", map.resolved, map.output.display());
    if args.show {
        open::that( &map.output)?;
    }

    Ok(())
}

async fn run (archive: Archive, config: &NexradConfig, target: NaiveDateTime, output: &Path)->odin_nexrad::Result<SweepMap> {
    let request = SweepRequest::new( config, target);
    let decoder = VolumeDecoder::new( config.level2.clone()); // Level II archives (AWS) or netCDF (THREDDS)
    let renderer = PngRenderer::new( &config.render, output)?;

    match archive {
        Archive::Aws => {
            let archive = AwsArchive::new( config.aws.clone(), &config.station).await?;
            get_sweep_map( &archive, &decoder, &renderer, &request).await
        }
        Archive::Thredds => {
            let archive = ThreddsArchive::new( config.thredds.clone(), &config.station)?;
            get_sweep_map( &archive, &decoder, &renderer, &request).await
        }
    }
}
