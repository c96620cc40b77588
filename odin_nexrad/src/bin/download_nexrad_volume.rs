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

//! this application serves both as a test for the AWS listing/resolution functions and as a tool to obtain raw
//! NEXRAD Level II volumes (e.g. for external decoders or archives)

use std::path::PathBuf;
use anyhow::Result;
use chrono::NaiveDateTime;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use odin_common::datetime::{fmt_signed_hms, naive_utc_now};
use odin_nexrad::{
    find_closest, list_timestamped, load_config, parse_target_time, resolve, search_windows,
    AwsArchive, RadarArchive
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "download the NEXRAD Level II volume closest to a given time from AWS")]
struct Args {
    /// pathname of the NexradConfig to use
    #[arg(long)]
    config: Option<PathBuf>,

    /// radar station (e.g. KJAX)
    #[arg(short, long)]
    station: Option<String>,

    /// target date/time in UTC (e.g. 2024-09-01T12:00:00Z), default is now
    #[arg(short, long, value_parser = parse_target_time)]
    date: Option<NaiveDateTime>,

    /// number of days to search
    #[arg(short, long)]
    windows: Option<usize>,

    /// only list the volumes of the searched days with their offsets from the target
    #[arg(short, long)]
    list: bool,

    /// directory to store the volume in
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

fn main()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = load_config( args.config.as_deref())?;
    if let Some(station) = &args.station { config.station = station.to_uppercase() }
    if let Some(windows) = args.windows { config.search_windows = windows }
    let target = args.date.unwrap_or_else( naive_utc_now);

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    rt.block_on( async {
        let archive = AwsArchive::new( config.aws.clone(), &config.station).await?;

        if args.list {
            let windows = search_windows( &target, archive.window_span(), config.search_windows);
            let volumes = list_timestamped( &archive, &windows).await?;
            let closest = resolve( volumes.iter().map(|v| v.id.as_str()), &target, |id| archive.extractor().extract(id));

            println!("{} {} volumes for target {}:", volumes.len(), archive.station(), target);
            for v in &volumes {
                let mark = if closest.as_ref().map(|c| c.id == v.id).unwrap_or(false) { "*" } else { " " };
                println!("{} {}  {}", mark, fmt_signed_hms( &v.offset_from( &target)), v.id);
            }

        } else {
            let resolved = find_closest( &archive, &target, config.search_windows).await?;
            let path = archive.store( &resolved.id, &args.dir).await?;
            println!("{} ({}) -> {}", resolved.id, fmt_signed_hms( &resolved.offset_from( &target)), path.display());
        }

        Ok::<(), odin_nexrad::OdinNexradError>(())
    })?;

    Ok(())
}
