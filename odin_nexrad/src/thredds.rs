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

//! NEXRAD Level II volumes served by a THREDDS data server. Listings come from the per station/day
//! `catalog.xml`, volumes are not downloaded but opened remotely through OPeNDAP

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use odin_common::if_let;

use crate::{
    archive::{RadarArchive, VolumeSource},
    errors::{catalog_error, op_failed, Result},
    resolver::{SearchWindow, WindowSpan},
    timestamp::{IdentifierFormat, TimestampExtractor},
};

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct ThreddsArchiveConfig {
    /// catalog URL with `${station}` and `${yyyyMMdd}` variables
    pub catalog_url_pattern: String,
    /// prefix for dataset urlPaths to obtain OPeNDAP access URLs
    pub opendap_base: String,
}

impl Default for ThreddsArchiveConfig {
    fn default()->Self {
        ThreddsArchiveConfig {
            catalog_url_pattern: "https://thredds.ucar.edu/thredds/catalog/nexrad/level2/${station}/${yyyyMMdd}/catalog.xml".to_string(),
            opendap_base: "https://thredds.ucar.edu/thredds/dodsC/".to_string(),
        }
    }
}

/// a leaf dataset entry of a THREDDS catalog
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct CatalogDataset {
    pub name: String,
    pub url_path: String,
}

lazy_static! {
    static ref DATASET_RE: Regex = Regex::new(r"<dataset\s([^>]*)>").unwrap();
    static ref NAME_RE: Regex = Regex::new(r#"\bname\s*=\s*"([^"]*)""#).unwrap();
    static ref URL_PATH_RE: Regex = Regex::new(r#"\burlPath\s*=\s*"([^"]*)""#).unwrap();
}

/// extract all datasets that have a `urlPath` from a catalog XML document. Container datasets
/// (without urlPath) are skipped
pub fn parse_catalog_datasets (xml: &str)->Vec<CatalogDataset> {
    let mut list = Vec::new();

    for cap in DATASET_RE.captures_iter(xml) {
        let attrs = &cap[1];
        if_let! {
            Some(name) = NAME_RE.captures(attrs),
            Some(url_path) = URL_PATH_RE.captures(attrs) => {
                list.push( CatalogDataset { name: unescape_xml( &name[1]), url_path: unescape_xml( &url_path[1]) });
            }
        }
    }

    list
}

// catalog names and paths don't normally contain entities but we don't want to choke on them
fn unescape_xml (s: &str)->String {
    if s.contains('&') {
        s.replace("&lt;", "<").replace("&gt;", ">").replace("&quot;", "\"").replace("&apos;", "'").replace("&amp;", "&")
    } else {
        s.to_string()
    }
}

/// the catalog URL for the station and the day of the window start
pub fn catalog_url (pattern: &str, station: &str, window: &SearchWindow)->String {
    pattern
        .replace("${station}", &station.to_uppercase())
        .replace("${yyyyMMdd}", &window.start.format("%Y%m%d").to_string())
}

pub fn opendap_url (base: &str, url_path: &str)->String {
    if base.ends_with('/') || url_path.starts_with('/') {
        format!("{base}{url_path}")
    } else {
        format!("{base}/{url_path}")
    }
}

pub struct ThreddsArchive {
    config: ThreddsArchiveConfig,
    station: String,
    client: Client,
    extractor: TimestampExtractor,
}

impl ThreddsArchive {
    pub fn new (config: ThreddsArchiveConfig, station: &str)->Result<Self> {
        let station = station.to_uppercase();
        let extractor = TimestampExtractor::new( IdentifierFormat::thredds_level2( &station))?;
        let client = Client::new();

        Ok( ThreddsArchive { config, station, client, extractor } )
    }

    async fn get_catalog (&self, url: &str)->Result<String> {
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::OK => Ok( response.text().await? ),
            StatusCode::NOT_FOUND => Ok( String::new() ), // no catalog (yet) for this day
            status => Err( catalog_error( format!("catalog request {url} failed with code {}", status.as_str())))
        }
    }

    /// the datasets of the window's day catalog that fall into the window
    pub fn window_datasets (&self, datasets: Vec<CatalogDataset>, window: &SearchWindow)->Vec<CatalogDataset> {
        datasets.into_iter()
            .filter( |ds| self.extractor.extract( &ds.name).map( |t| window.contains(&t)).unwrap_or(false))
            .collect()
    }
}

impl RadarArchive for ThreddsArchive {
    fn name (&self)->&str { "thredds" }

    fn station (&self)->&str { &self.station }

    fn window_span (&self)->WindowSpan { WindowSpan::Hour }

    fn extractor (&self)->&TimestampExtractor { &self.extractor }

    /// the listing consists of dataset urlPaths, which end in the dataset name
    async fn list (&self, window: &SearchWindow)->Result<Vec<String>> {
        let url = catalog_url( &self.config.catalog_url_pattern, &self.station, window);
        debug!("retrieving catalog {url}");

        let xml = self.get_catalog( &url).await?;
        let datasets = parse_catalog_datasets( &xml);
        let n_day = datasets.len();
        let datasets = self.window_datasets( datasets, window);
        debug!("{} of {} catalog datasets in {}", datasets.len(), n_day, window);

        Ok( datasets.into_iter().map(|ds| ds.url_path).collect() )
    }

    async fn fetch (&self, id: &str)->Result<VolumeSource> {
        if id.is_empty() { return Err( op_failed("empty dataset path")) }

        let url = opendap_url( &self.config.opendap_base, id);
        info!("accessing {url}");
        Ok( VolumeSource::Remote(url) )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns="http://www.unidata.ucar.edu/namespaces/thredds/InvCatalog/v1.0" name="KJAX/20240901" version="1.0.1">
  <service name="OPENDAP" serviceType="OPENDAP" base="/thredds/dodsC/"/>
  <dataset name="KJAX/20240901" ID="nexrad/level2/KJAX/20240901">
    <metadata inherited="true"><serviceName>OPENDAP</serviceName></metadata>
    <dataset name="Level2_KJAX_20240901_1302.ar2v" ID="nexrad/level2/KJAX/20240901/Level2_KJAX_20240901_1302.ar2v"
             urlPath="nexrad/level2/KJAX/20240901/Level2_KJAX_20240901_1302.ar2v">
      <dataSize units="Mbytes">5.1</dataSize>
    </dataset>
    <dataset urlPath="nexrad/level2/KJAX/20240901/Level2_KJAX_20240901_1258.ar2v" name="Level2_KJAX_20240901_1258.ar2v">
      <dataSize units="Mbytes">5.0</dataSize>
    </dataset>
    <dataset name="Level2_KJAX_20240901_1204.ar2v" urlPath="nexrad/level2/KJAX/20240901/Level2_KJAX_20240901_1204.ar2v"/>
  </dataset>
</catalog>"#;

    #[test]
    fn test_parse_catalog() {
        let ds = parse_catalog_datasets( CATALOG);
        assert_eq!( ds.len(), 3);
        assert_eq!( ds[0].name, "Level2_KJAX_20240901_1302.ar2v");
        assert_eq!( ds[1].url_path, "nexrad/level2/KJAX/20240901/Level2_KJAX_20240901_1258.ar2v");
        assert!( parse_catalog_datasets("").is_empty());
    }

    #[test]
    fn test_window_filter() {
        let archive = ThreddsArchive::new( ThreddsArchiveConfig::default(), "kjax").unwrap();
        let t = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap().and_hms_opt(12, 50, 0).unwrap();
        let w = SearchWindow::containing( &t, WindowSpan::Hour);

        let ds = archive.window_datasets( parse_catalog_datasets( CATALOG), &w);
        let names: Vec<&str> = ds.iter().map(|d| d.name.as_str()).collect();
        assert_eq!( names, vec!["Level2_KJAX_20240901_1258.ar2v", "Level2_KJAX_20240901_1204.ar2v"]);
    }

    #[test]
    fn test_urls() {
        let cfg = ThreddsArchiveConfig::default();
        let t = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap().and_hms_opt(0, 10, 0).unwrap();
        let w = SearchWindow::containing( &t, WindowSpan::Hour).previous(); // 23Z of previous day

        assert_eq!( catalog_url( &cfg.catalog_url_pattern, "kjax", &w),
                    "https://thredds.ucar.edu/thredds/catalog/nexrad/level2/KJAX/20240901/catalog.xml");
        assert_eq!( opendap_url( &cfg.opendap_base, "nexrad/level2/KJAX/20240901/Level2_KJAX_20240901_2358.ar2v"),
                    "https://thredds.ucar.edu/thredds/dodsC/nexrad/level2/KJAX/20240901/Level2_KJAX_20240901_2358.ar2v");
        assert_eq!( opendap_url( "http://host/dodsC", "a/b.ar2v"), "http://host/dodsC/a/b.ar2v");
    }
}
