use rayon::prelude::*;

use crate::error::PipelineError;

// wide for I/O-bound stages, narrow for raster algebra and dissolve
pub const WIDE_POOL: usize = 30;
pub const NARROW_POOL: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct StagePool {
    width: usize,
}

impl StagePool {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn run<I, O, F>(&self, inputs: Vec<I>, task: F) -> Result<Vec<O>, PipelineError>
    where
        I: Send,
        O: Send,
        F: Fn(I) -> O + Send + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.width)
            .build()
            .map_err(|err| PipelineError::Pool(err.to_string()))?;
        Ok(pool.install(|| inputs.into_par_iter().map(task).collect()))
    }
}
