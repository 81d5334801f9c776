use std::{collections::BTreeSet, sync::Mutex};

use stacked_errors::Result;

use crate::{ContainerRuntime, RunSpec, RuntimeOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    BuildImage { image: String, context: String },
    RunContainer(RunSpec),
    StopContainer(String),
    RemoveContainer(String),
    RemoveImage(String),
}

/// A runtime that keeps container and image names in memory and records every
/// call. Launched containers keep running until stopped, and a second
/// container with a name in use fails the way a real runtime would.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    pub calls: Mutex<Vec<RuntimeCall>>,
    pub containers: Mutex<BTreeSet<String>>,
    pub images: Mutex<BTreeSet<String>>,
    /// If set, builds fail with this status
    pub build_failure: Option<i32>,
    /// If set, runs fail with this status
    pub run_failure: Option<i32>,
}

impl FakeRuntime {
    pub fn with_container(self, name: &str) -> Self {
        self.containers.lock().unwrap().insert(name.to_owned());
        self
    }

    pub fn with_image(self, image: &str) -> Self {
        self.images.lock().unwrap().insert(image.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn has_container(&self, name: &str) -> bool {
        self.containers.lock().unwrap().contains(name)
    }

    pub fn has_image(&self, image: &str) -> bool {
        self.images.lock().unwrap().contains(image)
    }

    fn record(&self, call: RuntimeCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn failure(status: i32, stderr: &str) -> RuntimeOutcome {
    RuntimeOutcome::Failure {
        status: Some(status),
        stderr: stderr.to_owned(),
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn build_image(&self, image: &str, context: &str) -> Result<RuntimeOutcome> {
        self.record(RuntimeCall::BuildImage {
            image: image.to_owned(),
            context: context.to_owned(),
        });
        if let Some(status) = self.build_failure {
            return Ok(failure(status, "failed to solve: process did not complete"))
        }
        self.images.lock().unwrap().insert(image.to_owned());
        Ok(RuntimeOutcome::Success)
    }

    async fn run_container(&self, spec: &RunSpec) -> Result<RuntimeOutcome> {
        self.record(RuntimeCall::RunContainer(spec.clone()));
        if let Some(status) = self.run_failure {
            return Ok(failure(status, "could not select device driver"))
        }
        if !self.has_image(&spec.image) {
            return Ok(failure(125, "Unable to find image locally"))
        }
        if !self.containers.lock().unwrap().insert(spec.name.clone()) {
            return Ok(failure(125, "Conflict. The container name is already in use"))
        }
        Ok(RuntimeOutcome::Success)
    }

    async fn stop_container(&self, name: &str) -> Result<RuntimeOutcome> {
        self.record(RuntimeCall::StopContainer(name.to_owned()));
        if self.has_container(name) {
            Ok(RuntimeOutcome::Success)
        } else {
            Ok(RuntimeOutcome::NotFound)
        }
    }

    async fn remove_container(&self, name: &str) -> Result<RuntimeOutcome> {
        self.record(RuntimeCall::RemoveContainer(name.to_owned()));
        if self.containers.lock().unwrap().remove(name) {
            Ok(RuntimeOutcome::Success)
        } else {
            Ok(RuntimeOutcome::NotFound)
        }
    }

    async fn remove_image(&self, image: &str) -> Result<RuntimeOutcome> {
        self.record(RuntimeCall::RemoveImage(image.to_owned()));
        if self.images.lock().unwrap().remove(image) {
            Ok(RuntimeOutcome::Success)
        } else {
            Ok(RuntimeOutcome::NotFound)
        }
    }
}
