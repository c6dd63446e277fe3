use std::fs;
use std::io::Write;

use camino::Utf8Path;

use crate::chart::ChartSet;
use crate::error::ReportError;

pub struct YamlWriter;

impl YamlWriter {
    pub fn to_string(charts: &ChartSet) -> Result<String, ReportError> {
        serde_yaml::to_string(charts).map_err(|err| ReportError::Yaml(err.to_string()))
    }

    /// Writes `charts` to `path` through a temp file in the same directory.
    pub fn write_to_file(path: &Utf8Path, charts: &ChartSet) -> Result<(), ReportError> {
        let content = Self::to_string(charts)?;

        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| ReportError::Filesystem(err.to_string()))?;

        let mut temp = tempfile::Builder::new()
            .prefix("obis-charts")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| ReportError::Filesystem(err.to_string()))?;
        temp.write_all(content.as_bytes())
            .map_err(|err| ReportError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| ReportError::Filesystem(format!("write {path}: {}", err.error)))?;
        Ok(())
    }

    pub fn read_from_file(path: &Utf8Path) -> Result<ChartSet, ReportError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| ReportError::Filesystem(format!("read {path}: {err}")))?;
        serde_yaml::from_str(&content).map_err(|err| ReportError::Yaml(err.to_string()))
    }
}
