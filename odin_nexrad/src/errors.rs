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

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OdinNexradError>;

#[derive(Error,Debug)]
pub enum OdinNexradError {
    /// none of the searched windows had a matching volume. This is terminal
    #[error("no radar data found for station {station} in {windows}")]
    NoDataFound { station: String, windows: String },

    #[error("invalid identifier format {0}")]
    InvalidFormat(String),

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("S3 error {0}")]
    S3Error( #[from] odin_common::s3::OdinS3Error),

    #[error("http error {0}")]
    HttpError( #[from] reqwest::Error),

    #[error("catalog error {0}")]
    CatalogError(String),

    #[error("netCDF error {0}")]
    NetcdfError( #[from] netcdf::Error),

    #[error("decode error {0}")]
    DecodeError(String),

    #[error("unsupported volume format {0}")]
    UnsupportedFormat(String),

    #[error("image error {0}")]
    ImageError( #[from] image::ImageError),

    #[error("invalid font {0}")]
    FontError( #[from] ab_glyph::InvalidFont),

    #[error("GeoJSON error {0}")]
    GeoJsonError( #[from] geojson::Error),

    #[error("config error {0}")]
    ConfigError( #[from] ron::error::SpannedError),

    #[error("regex error {0}")]
    RegexError( #[from] regex::Error),

    /// a generic error
    #[error("operation failed {0}")]
    OpFailed(String)
}

pub fn op_failed (msg: impl ToString)->OdinNexradError {
    OdinNexradError::OpFailed(msg.to_string())
}

pub fn decode_error (msg: impl ToString)->OdinNexradError {
    OdinNexradError::DecodeError(msg.to_string())
}

pub fn catalog_error (msg: impl ToString)->OdinNexradError {
    OdinNexradError::CatalogError(msg.to_string())
}
