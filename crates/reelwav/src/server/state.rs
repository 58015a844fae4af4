use reelwav_core::Pipeline;
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub scratch_root: PathBuf,
    pub keep_scratch: bool,
}

impl AppState {
    pub fn new(pipeline: Pipeline, scratch_root: PathBuf) -> Self {
        Self {
            pipeline,
            scratch_root,
            keep_scratch: false,
        }
    }

    pub fn keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }
}
