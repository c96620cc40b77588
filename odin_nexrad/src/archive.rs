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

use std::{fmt, future::Future, path::Path};
use chrono::NaiveDateTime;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    errors::Result,
    resolver::{resolve_windowed, search_windows, SearchWindow, TimestampedIdentifier, WindowSpan},
    timestamp::TimestampExtractor,
};

/// where the bytes of a fetched volume can be read from.
/// Local volumes are scoped temp files that are removed when the VolumeSource is dropped, which includes
/// all error paths of its user. Remote volumes are accessed through OPeNDAP and don't hold local resources
#[derive(Debug)]
pub enum VolumeSource {
    Local(NamedTempFile),
    Remote(String),
}

impl VolumeSource {
    /// the path or URL that has to be passed to decoders
    pub fn location (&self)->String {
        match self {
            VolumeSource::Local(file) => file.path().to_string_lossy().to_string(),
            VolumeSource::Remote(url) => url.clone()
        }
    }

    pub fn local_path (&self)->Option<&Path> {
        match self {
            VolumeSource::Local(file) => Some(file.path()),
            VolumeSource::Remote(_) => None
        }
    }
}

impl fmt::Display for VolumeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeSource::Local(file) => write!(f, "file {:?}", file.path()),
            VolumeSource::Remote(url) => write!(f, "url {url}")
        }
    }
}

/// abstraction for a radar data archive. Implementors are bound to a single station and provide the
/// listing and fetch capabilities, resolution and decoding are done by the caller
pub trait RadarArchive {
    fn name (&self)->&str;

    /// the station all identifiers of this archive refer to
    fn station (&self)->&str;

    /// the time granularity by which this archive has to be listed
    fn window_span (&self)->WindowSpan;

    /// the extractor that maps identifiers of this archive to scan times
    fn extractor (&self)->&TimestampExtractor;

    /// the complete listing for the given window (pagination is handled internally).
    /// Identifiers can still include files that don't match the extractor
    fn list (&self, window: &SearchWindow)->impl Future<Output=Result<Vec<String>>>;

    fn fetch (&self, id: &str)->impl Future<Output=Result<VolumeSource>>;
}

/// find the identifier of `archive` that is closest to `target`, starting with the window that contains `target`
/// and then searching `window_count-1` progressively older windows. The target itself is not shifted, i.e.
/// fallback windows yield the scan closest to the original target
pub async fn find_closest<A: RadarArchive> (archive: &A, target: &NaiveDateTime, window_count: usize)->Result<TimestampedIdentifier> {
    let windows = search_windows( target, archive.window_span(), window_count);
    let extractor = archive.extractor();
    debug!("resolving {} identifiers of {} archive for {}", extractor.format(), archive.name(), target);

    resolve_windowed( archive.station(), &windows, target,
        |id| extractor.extract(id),
        |window| async move { archive.list( &window).await }
    ).await
}

/// all matching identifiers of the given windows together with their timestamps, in listing order
pub async fn list_timestamped<A: RadarArchive> (archive: &A, windows: &[SearchWindow])->Result<Vec<TimestampedIdentifier>> {
    let extractor = archive.extractor();
    let mut list: Vec<TimestampedIdentifier> = Vec::new();

    for window in windows {
        for id in archive.list( window).await? {
            if let Some(timestamp) = extractor.extract( &id) {
                list.push( TimestampedIdentifier { id, timestamp });
            }
        }
    }

    Ok(list)
}
