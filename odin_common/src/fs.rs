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

use std::fs::{self,File};
use std::io::{self,Read,ErrorKind};
use std::path::{Path,PathBuf};

type Result<T> = std::result::Result<T,std::io::Error>;

/// the last '/' separated element of an object key or URL path. Unlike `Path::file_name` this does not depend
/// on platform path separators, which is what we need for S3 keys and catalog urlPaths
pub fn key_basename (key: &str)->&str {
    match key.rfind('/') {
        Some(idx) => &key[idx+1..],
        None => key
    }
}

/// check if dir pathname exists and is writable, try to create dir otherwise
pub fn ensure_writable_dir (path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        let md = fs::metadata(path)?;
        if md.permissions().readonly() {
            Err( io::Error::new( ErrorKind::PermissionDenied, format!("output_dir {:?} not writable", path)))
        } else {
            Ok(())
        }

    } else {
        fs::create_dir_all(path)
    }
}

/// make sure the parent dir of a file pathname exists (e.g. before we write an output file)
pub fn ensure_parent_dir (path: impl AsRef<Path>) -> io::Result<()> {
    match path.as_ref().parent() {
        Some(dir) if !dir.as_os_str().is_empty() => ensure_writable_dir(dir),
        _ => Ok(())
    }
}

pub fn filepath_contents <P: AsRef<Path>> (path: &P) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut contents: Vec<u8> = Vec::with_capacity(len as usize);
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

/// read the first `n` bytes of a file, which is mostly used to check magic numbers. Returns less if the file is shorter
pub fn file_prefix <P: AsRef<Path>> (path: &P, n: usize) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut buf: Vec<u8> = Vec::with_capacity(n);
    file.take(n as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// return the first existing file of `<dir>/<sub_dirs..>/<filename>` for the given base dirs
pub fn first_existing_file (base_dirs: &[PathBuf], sub_dirs: &[&str], filename: &str) -> Option<PathBuf> {
    for base in base_dirs {
        let mut path = base.clone();
        for d in sub_dirs { path.push(d) }
        path.push(filename);
        if path.is_file() { return Some(path) }
    }
    None
}
