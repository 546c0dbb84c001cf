use std::path::PathBuf;

use tracing::warn;

use crate::{
    callbacks::dump_json, model::records::DispatchComparison,
    simulation::callback::FleetCallback,
};

/// Dumps every dispatch decision to `<dir>/<name>/<iteration>/dispatch.json`.
#[derive(Debug)]
pub struct DispatchLogCallback {
    dir: PathBuf,
    name: String,
    iteration: usize,
}

impl DispatchLogCallback {
    pub fn new(dir: PathBuf, name: impl Into<String>) -> Self {
        Self {
            dir,
            name: name.into(),
            iteration: 0,
        }
    }

    pub fn get_file(&self, filename: &str) -> PathBuf {
        let mut path = self.dir.clone();
        path.push(&self.name);
        path.push(format!("{}", self.iteration));
        path.push(filename);
        path
    }
}

impl FleetCallback for DispatchLogCallback {
    fn visit_dispatch(&mut self, comparison: &DispatchComparison) {
        let path = self.get_file("dispatch.json");
        if let Err(err) = dump_json(&path, comparison) {
            warn!(path = %path.display(), "failed to write dispatch log: {err:#}");
        }
        self.iteration += 1;
    }
}
