use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const DEFAULT_NODATA: f64 = -9999.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridHeader {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub header: GridHeader,
    pub values: Vec<f64>,
}

impl Grid {
    pub fn read(path: &Path) -> Result<Self, PipelineError> {
        let text = fs::read_to_string(path).map_err(|err| PipelineError::GridParse {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::parse(&text, path)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self, PipelineError> {
        let fail = |message: String| PipelineError::GridParse {
            path: path.display().to_string(),
            message,
        };

        let mut ncols = None;
        let mut nrows = None;
        let mut xllcorner = None;
        let mut yllcorner = None;
        let mut cellsize = None;
        let mut nodata = DEFAULT_NODATA;
        let mut values = Vec::new();

        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let Some(first) = parts.next() else {
                continue;
            };
            if first.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic()) {
                let key = first.to_ascii_lowercase();
                let raw = parts
                    .next()
                    .ok_or_else(|| fail(format!("missing value for {key}")))?;
                let value: f64 = raw
                    .parse()
                    .map_err(|_| fail(format!("bad value for {key}: {raw}")))?;
                match key.as_str() {
                    "ncols" => ncols = Some(value as usize),
                    "nrows" => nrows = Some(value as usize),
                    "xllcorner" => xllcorner = Some(value),
                    "yllcorner" => yllcorner = Some(value),
                    "cellsize" => cellsize = Some(value),
                    "nodata_value" => nodata = value,
                    _ => return Err(fail(format!("unknown header field {key}"))),
                }
            } else {
                for token in std::iter::once(first).chain(parts) {
                    values.push(
                        token
                            .parse()
                            .map_err(|_| fail(format!("bad cell value {token}")))?,
                    );
                }
            }
        }

        let header = GridHeader {
            ncols: ncols.ok_or_else(|| fail("missing ncols".to_string()))?,
            nrows: nrows.ok_or_else(|| fail("missing nrows".to_string()))?,
            xllcorner: xllcorner.ok_or_else(|| fail("missing xllcorner".to_string()))?,
            yllcorner: yllcorner.ok_or_else(|| fail("missing yllcorner".to_string()))?,
            cellsize: cellsize.ok_or_else(|| fail("missing cellsize".to_string()))?,
            nodata,
        };
        if values.len() != header.ncols * header.nrows {
            return Err(fail(format!(
                "expected {} cells, found {}",
                header.ncols * header.nrows,
                values.len()
            )));
        }
        Ok(Self { header, values })
    }

    pub fn to_ascii(&self) -> String {
        let header = &self.header;
        let mut out = format!(
            "ncols {}\nnrows {}\nxllcorner {}\nyllcorner {}\ncellsize {}\nNODATA_value {}\n",
            header.ncols, header.nrows, header.xllcorner, header.yllcorner, header.cellsize,
            header.nodata
        );
        for row in self.values.chunks(header.ncols) {
            let rendered: Vec<String> = row.iter().map(|value| value.to_string()).collect();
            out.push_str(&rendered.join(" "));
            out.push('\n');
        }
        out
    }
}
