// src/utils/worksheet.rs: job parameter tables for the workflow generator

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use log::info;

use crate::config::defs::{Pipeline, GENERATED_DIR};
use crate::utils::file::mkdir;

/// A row type whose fields map one-to-one onto worksheet columns.
pub trait WorksheetRecord {
    /// Parameter names, in column order.
    const FIELDS: &'static [&'static str];

    /// Values in the order of `FIELDS`.
    fn values(&self) -> Vec<String>;
}

/// Header plus rows of equal width, one row per job instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Worksheet {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Worksheet {
    pub fn new(header: Vec<String>) -> Self {
        Worksheet { header, rows: Vec::new() }
    }

    pub fn from_records<R: WorksheetRecord>(records: &[R]) -> Self {
        let header = R::FIELDS.iter().map(|f| f.to_string()).collect();
        let rows = records.iter().map(|r| r.values()).collect();
        Worksheet { header, rows }
    }

    /// Builds a worksheet from columns whose first cell is the header.
    pub fn from_columns(columns: &[Vec<String>]) -> Result<Self> {
        let height = columns.first().map_or(0, |c| c.len());
        if height == 0 {
            return Err(anyhow!("Worksheet columns must start with a header"));
        }
        if let Some(bad) = columns.iter().find(|c| c.len() != height) {
            return Err(anyhow!(
                "Column {} has {} cells, expected {}",
                bad.first().map(String::as_str).unwrap_or(""),
                bad.len(),
                height
            ));
        }

        let mut sheet = Worksheet::new(columns.iter().map(|c| c[0].clone()).collect());
        for i in 1..height {
            sheet.push_row(columns.iter().map(|c| c[i].clone()).collect())?;
        }
        Ok(sheet)
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.header.len() {
            return Err(anyhow!(
                "Row has {} values but the worksheet has {} columns",
                row.len(),
                self.header.len()
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Comma separated, one line per row, no quoting.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for line in std::iter::once(&self.header).chain(self.rows.iter()) {
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        info!("Saving worksheet file: {}", path.display());
        fs::write(path, self.to_csv())
    }
}

/// `generated/<pipeline>_<run_id>`, relative to the root directory.
pub fn generated_dir_name(pipeline: Pipeline, run_id: &str) -> PathBuf {
    Path::new(GENERATED_DIR).join(format!("{}_{}", pipeline.name(), run_id))
}

/// Location of the worksheet of a run. The containing directory is created if needed.
pub fn worksheet_path(root: &Path, pipeline: Pipeline, run_id: &str) -> io::Result<PathBuf> {
    let dir = root.join(generated_dir_name(pipeline, run_id));
    mkdir(&dir, true)?;
    Ok(dir.join(format!("worksheet_{}.csv", run_id)))
}

/// Writes the worksheet holding the root directory of all files and tools.
pub fn write_root_worksheet(root: &Path, pipeline: Pipeline, run_id: &str) -> io::Result<PathBuf> {
    let dir = root.join(generated_dir_name(pipeline, run_id));
    mkdir(&dir, true)?;
    let path = dir.join(format!("root_{}.csv", run_id));
    fs::write(&path, format!("root\n{}\n", root.display()))?;
    Ok(path)
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Pair {
        name: &'static str,
        size: usize,
    }

    impl WorksheetRecord for Pair {
        const FIELDS: &'static [&'static str] = &["name", "size"];

        fn values(&self) -> Vec<String> {
            vec![self.name.to_string(), self.size.to_string()]
        }
    }

    fn column(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_columns_are_transposed() -> Result<()> {
        let sheet = Worksheet::from_columns(&[column(&["a", "1", "2"]), column(&["b", "x", "y"])])?;
        assert_eq!(sheet.to_csv(), "a,b\n1,x\n2,y\n");
        assert_eq!(sheet.len(), 2);
        Ok(())
    }

    #[test]
    fn test_uneven_columns_rejected() {
        let result = Worksheet::from_columns(&[column(&["a", "1", "2"]), column(&["b", "x"])]);
        assert!(result.is_err());
        assert!(Worksheet::from_columns(&[]).is_err());
    }

    #[test]
    fn test_records() {
        let sheet = Worksheet::from_records(&[Pair { name: "chr1", size: 10 }, Pair { name: "chr2", size: 20 }]);
        assert_eq!(sheet.to_csv(), "name,size\nchr1,10\nchr2,20\n");

        let mut sheet = Worksheet::new(column(&["name", "size"]));
        assert!(sheet.push_row(column(&["only"])).is_err());
        assert!(sheet.is_empty());
        assert_eq!(sheet.to_csv(), "name,size\n");
    }

    #[test]
    fn test_locations() -> Result<()> {
        let root = tempdir()?;
        let path = worksheet_path(root.path(), Pipeline::Impute, "ab12cd34")?;
        assert_eq!(path, root.path().join("generated/impute_ab12cd34/worksheet_ab12cd34.csv"));
        assert!(path.parent().map_or(false, |p| p.is_dir()));
        // idempotent
        worksheet_path(root.path(), Pipeline::Impute, "ab12cd34")?;

        let root_sheet = write_root_worksheet(root.path(), Pipeline::Impute, "ab12cd34")?;
        let contents = fs::read_to_string(root_sheet)?;
        assert_eq!(contents, format!("root\n{}\n", root.path().display()));
        Ok(())
    }
}
