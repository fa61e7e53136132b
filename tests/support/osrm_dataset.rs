//! Downloads and preprocesses an OSRM road graph for container tests.
//!
//! The extract is cached under the data root and reused across runs.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Region extract published by Geofabrik, e.g. "asia/pakistan".
#[derive(Debug, Clone)]
pub struct Region {
    pub path: &'static str,
}

impl Region {
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("region")
    }

    fn pbf_url(&self) -> String {
        format!("https://download.geofabrik.de/{}-latest.osm.pbf", self.path)
    }
}

pub const PAKISTAN: Region = Region { path: "asia/pakistan" };

#[derive(Debug)]
pub enum DatasetError {
    Io(io::Error),
    Http(reqwest::Error),
    Docker(String),
}

impl From<io::Error> for DatasetError {
    fn from(err: io::Error) -> Self {
        DatasetError::Io(err)
    }
}

impl From<reqwest::Error> for DatasetError {
    fn from(err: reqwest::Error) -> Self {
        DatasetError::Http(err)
    }
}

/// A prepared MLD dataset on disk.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub data_dir: PathBuf,
    pub graph_file: String,
}

impl Dataset {
    pub fn prepare(region: &Region, data_root: &Path) -> Result<Self, DatasetError> {
        let data_dir = if data_root.is_absolute() {
            data_root.join(region.name())
        } else {
            std::env::current_dir()?.join(data_root).join(region.name())
        };
        fs::create_dir_all(&data_dir)?;

        let pbf_file = format!("{}-latest.osm.pbf", region.name());
        let graph_file = format!("{}-latest.osrm", region.name());

        let pbf_path = data_dir.join(&pbf_file);
        if !pbf_path.exists() {
            download(&region.pbf_url(), &pbf_path)?;
        }

        let graph = data_dir.join(&graph_file);
        if !graph.exists() {
            osrm_tool(&data_dir, &["osrm-extract", "-p", "/opt/car.lua", &format!("/data/{pbf_file}")])?;
        }
        if !partitioned(&graph) {
            osrm_tool(&data_dir, &["osrm-partition", &format!("/data/{graph_file}")])?;
            osrm_tool(&data_dir, &["osrm-customize", &format!("/data/{graph_file}")])?;
        }

        Ok(Self { data_dir, graph_file })
    }
}

fn download(url: &str, dest: &Path) -> Result<(), DatasetError> {
    let bytes = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    let partial = dest.with_extension("part");
    let mut writer = BufWriter::new(File::create(&partial)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    fs::rename(partial, dest)?;
    Ok(())
}

fn partitioned(graph: &Path) -> bool {
    ["osrm.partition", "osrm.cells", "osrm.mldgr"]
        .iter()
        .all(|ext| graph.with_extension(ext).exists())
}

fn osrm_tool(data_dir: &Path, args: &[&str]) -> Result<(), DatasetError> {
    let status = Command::new("docker")
        .args(["run", "--rm", "-t", "-v"])
        .arg(format!("{}:/data", data_dir.display()))
        .arg("osrm/osrm-backend")
        .args(args)
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(DatasetError::Docker(format!("{} exited with {status}", args[0])))
    }
}
