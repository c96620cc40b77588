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

//! support functions for (public) AWS S3 buckets

use std::{fmt::Debug, io::Write};
use thiserror::Error;
use aws_sdk_s3::Client;
use aws_config::{Region,meta::region::RegionProviderChain};

pub type S3Client = Client;

pub type Result<T> = std::result::Result<T, OdinS3Error>;

#[derive(Error,Debug)]
pub enum OdinS3Error {
    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("AWS S3 get object error {0}")]
    AWSS3ObjectError( #[from] aws_smithy_runtime_api::client::result::SdkError<aws_sdk_s3::operation::get_object::GetObjectError, aws_smithy_runtime_api::http::Response>),

    #[error("AWS S3 list object error {0}")]
    AWSS3ListObjectError( #[from] aws_smithy_runtime_api::client::result::SdkError<aws_sdk_s3::operation::list_objects::ListObjectsError, aws_smithy_runtime_api::http::Response>),

    #[error("AWS byte stream download error {0}")]
    AWSByteStreamError( #[from] aws_smithy_types::byte_stream::error::Error),

    #[error("No object key error")]
    NoObjectKeyError(),
}

/// create S3 Client for given region. Note this client does not sign requests, i.e. it can only be used
/// for public buckets such as the NOAA open data archives
pub async fn create_s3_client (region: String) -> Result<Client> {
    let region_provider = RegionProviderChain::first_try( Region::new( region));
    let aws_config = aws_config::from_env().no_credentials().region(region_provider).load().await; // anonymous access
    Ok( Client::new(&aws_config) )
}

/// retrieve the keys of all objects for given bucket/prefix. S3 returns at most 1000 objects per response so we
/// follow the marker of truncated responses until we have the complete listing.
/// If there is no error this always returns a `Vec<String>` but it might be empty (if there were no matching objects)
pub async fn list_s3_keys (client: &Client, bucket: &str, prefix: &str) -> Result<Vec<String>> {
    let mut keys: Vec<String> = Vec::new();
    let mut marker: Option<String> = None;

    loop {
        let mut builder = client.list_objects().bucket(bucket).prefix(prefix);
        if let Some(key) = &marker {
            builder = builder.marker(key);
        }
        let result = builder.send().await?;

        for o in result.contents() {
            if let Some(key) = o.key() {
                keys.push( key.to_string());
            }
        }

        if result.is_truncated().unwrap_or(false) {
            // next_marker is only set if a delimiter was specified - otherwise continue from the last key
            let next = result.next_marker().map(|s| s.to_string()).or_else(|| keys.last().cloned());
            if next.is_none() || next == marker { break }
            marker = next;
        } else {
            break
        }
    }

    Ok(keys)
}

/// download the object with the given key and write its content to `out` (e.g. a temp file).
/// Returns the number of bytes written
pub async fn download_s3_object (client: &Client, bucket: &str, key: &str, out: &mut impl Write) -> Result<u64> {
    if key.is_empty() { return Err( OdinS3Error::NoObjectKeyError()) }

    let mut object = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await?;

    let mut len: u64 = 0;
    while let Some(bytes) = object.body.try_next().await? {
        out.write_all(&bytes)?;
        len += bytes.len() as u64;
    }
    out.flush()?;

    Ok(len)
}
