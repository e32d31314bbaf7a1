use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::PipelineError;
use crate::grid::GridHeader;

// gzip stream: one JSON header line, then row-major cells as little-endian f64
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub header: GridHeader,
    pub values: Vec<f64>,
}

impl Raster {
    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        let fail = |message: String| PipelineError::Conversion {
            path: path.display().to_string(),
            message,
        };
        let file = File::create(path).map_err(|err| fail(err.to_string()))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        let header = serde_json::to_vec(&self.header).map_err(|err| fail(err.to_string()))?;
        encoder
            .write_all(&header)
            .and_then(|_| encoder.write_all(b"\n"))
            .map_err(|err| fail(err.to_string()))?;
        for value in &self.values {
            encoder
                .write_all(&value.to_le_bytes())
                .map_err(|err| fail(err.to_string()))?;
        }
        encoder.finish().map_err(|err| fail(err.to_string()))?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, PipelineError> {
        let fail = |message: String| PipelineError::Conversion {
            path: path.display().to_string(),
            message,
        };
        let file = File::open(path).map_err(|err| fail(err.to_string()))?;
        let mut decoder = GzDecoder::new(file);
        let mut bytes = Vec::new();
        decoder
            .read_to_end(&mut bytes)
            .map_err(|err| fail(err.to_string()))?;

        let split = bytes
            .iter()
            .position(|byte| *byte == b'\n')
            .ok_or_else(|| fail("missing raster header".to_string()))?;
        let header: GridHeader =
            serde_json::from_slice(&bytes[..split]).map_err(|err| fail(err.to_string()))?;
        let body = &bytes[split + 1..];
        if body.len() != header.ncols * header.nrows * 8 {
            return Err(fail(format!(
                "expected {} cell bytes, found {}",
                header.ncols * header.nrows * 8,
                body.len()
            )));
        }
        let values = body
            .chunks_exact(8)
            .map(|chunk| f64::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        Ok(Self { header, values })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn sample() -> Raster {
        Raster {
            header: GridHeader {
                ncols: 3,
                nrows: 2,
                xllcorner: -80.0,
                yllcorner: 35.0,
                cellsize: 0.5,
                nodata: -9999.0,
            },
            values: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
        }
    }

    #[test]
    fn write_read_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sample.tif");
        let raster = sample();
        raster.write(&path).unwrap();
        assert_eq!(Raster::read(&path).unwrap(), raster);
    }

    #[test]
    fn read_rejects_truncated_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("broken.tif");
        std::fs::write(&path, b"not gzip at all").unwrap();
        let err = Raster::read(&path).unwrap_err();
        assert_matches!(err, PipelineError::Conversion { .. });
    }
}
