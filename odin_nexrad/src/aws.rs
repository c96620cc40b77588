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

//! the NOAA NEXRAD Level II archive on AWS S3 (`s3://noaa-nexrad-level2/YYYY/MM/DD/<STATION>/..`)

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use odin_common::{fs::{ensure_writable_dir, key_basename}, s3::{create_s3_client, download_s3_object, list_s3_keys, S3Client}};

use crate::{
    archive::{RadarArchive, VolumeSource},
    errors::{op_failed, Result},
    resolver::{SearchWindow, WindowSpan},
    timestamp::{IdentifierFormat, TimestampExtractor},
};

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct AwsArchiveConfig {
    pub region: String,
    pub bucket: String,
}

impl Default for AwsArchiveConfig {
    fn default()->Self {
        AwsArchiveConfig {
            region: "us-east-1".to_string(),
            bucket: "noaa-nexrad-level2".to_string(),
        }
    }
}

/// the object key prefix that lists all objects of a station for the day of the given window
pub fn aws_key_prefix (station: &str, window: &SearchWindow)->String {
    format!("{}/{}/", window.start.format("%Y/%m/%d"), station.to_uppercase())
}

pub struct AwsArchive {
    config: AwsArchiveConfig,
    station: String,
    client: S3Client,
    extractor: TimestampExtractor,
}

impl AwsArchive {
    pub async fn new (config: AwsArchiveConfig, station: &str)->Result<Self> {
        let station = station.to_uppercase();
        let extractor = TimestampExtractor::new( IdentifierFormat::aws_level2( &station))?;
        let client = create_s3_client( config.region.clone()).await?;

        Ok( AwsArchive { config, station, client, extractor } )
    }

    pub fn bucket (&self)->&str { &self.config.bucket }

    /// download the object for `key` into `dir` under its original (basename) file name. This is not scoped,
    /// the file is supposed to be kept by the caller
    pub async fn store (&self, key: &str, dir: &Path)->Result<PathBuf> {
        ensure_writable_dir( dir)?;
        let path = dir.join( key_basename(key));

        // download into a temp file in the same dir first so that we never leave partial volumes behind
        let mut file = NamedTempFile::new_in( dir)?;
        let len = download_s3_object( &self.client, &self.config.bucket, key, file.as_file_mut()).await?;
        if len == 0 {
            return Err( op_failed( format!("empty object {key}")))
        }
        file.persist( &path).map_err(|e| e.error)?;

        info!("{} kB saved to {:?}", len / 1024, path);
        Ok(path)
    }
}

impl RadarArchive for AwsArchive {
    fn name (&self)->&str { "aws" }

    fn station (&self)->&str { &self.station }

    fn window_span (&self)->WindowSpan { WindowSpan::Day }

    fn extractor (&self)->&TimestampExtractor { &self.extractor }

    async fn list (&self, window: &SearchWindow)->Result<Vec<String>> {
        let prefix = aws_key_prefix( &self.station, window);
        debug!("listing s3://{}/{}", self.config.bucket, prefix);

        Ok( list_s3_keys( &self.client, &self.config.bucket, &prefix).await? )
    }

    async fn fetch (&self, id: &str)->Result<VolumeSource> {
        info!("downloading s3://{}/{} ..", self.config.bucket, id);

        let mut file = NamedTempFile::new()?;
        let len = download_s3_object( &self.client, &self.config.bucket, id, file.as_file_mut()).await?;
        debug!("{} bytes downloaded to {:?}", len, file.path());

        Ok( VolumeSource::Local(file) )
    }
}
