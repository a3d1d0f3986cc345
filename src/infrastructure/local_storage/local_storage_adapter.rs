// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Filesystem-backed object storage: `<root>/<bucket>/<path>`.
//!
//! Writes go to a `.partial` sibling that is renamed into place on
//! `close`, so a reader never sees a half-written object. Writer options
//! have no filesystem equivalent and are only logged.

use crate::domain::errors::{ExportError, Result};
use crate::ports::storage_port::{ObjectWriter, StoragePort, WriterOptions};
use async_trait::async_trait;
use log::debug;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct LocalStorageAdapter {
    base: PathBuf,
}

impl LocalStorageAdapter {
    pub fn new(root: impl AsRef<Path>, bucket: &str) -> Self {
        Self {
            base: root.as_ref().join(bucket.trim_end_matches('/')),
        }
    }

    pub fn object_path(&self, path: &str) -> PathBuf {
        self.base.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StoragePort for LocalStorageAdapter {
    async fn open_writer(&self, path: &str, options: WriterOptions) -> Result<Box<dyn ObjectWriter>> {
        let target = self.object_path(path);
        let display = target.display().to_string();
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ExportError::sink(display.as_str(), e))?;
        }
        let mut partial = target.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        let file = File::create(&partial).map_err(|e| ExportError::sink(display.as_str(), e))?;
        debug!("Writing {} ({:?})", display, options);

        Ok(Box::new(LocalObjectWriter {
            target,
            partial,
            out: BufWriter::new(file),
        }))
    }
}

pub struct LocalObjectWriter {
    target: PathBuf,
    partial: PathBuf,
    out: BufWriter<File>,
}

impl Write for LocalObjectWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[async_trait]
impl ObjectWriter for LocalObjectWriter {
    async fn close(self: Box<Self>) -> Result<()> {
        let LocalObjectWriter { target, partial, out } = *self;
        let display = target.display().to_string();
        let file = out
            .into_inner()
            .map_err(|e| ExportError::sink(display.as_str(), e.error()))?;
        file.sync_all()
            .map_err(|e| ExportError::sink(display.as_str(), e))?;
        fs::rename(&partial, &target).map_err(|e| ExportError::sink(display.as_str(), e))?;
        Ok(())
    }
}
