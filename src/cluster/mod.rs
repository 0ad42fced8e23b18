use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;
use crate::types::TaskState;

pub mod rest;

pub use rest::HyperCoreClient;

/// Remote asynchronous operation as reported by the cluster.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub task_tag: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub progress_percent: i64,
    #[serde(default)]
    pub formatted_description: String,
    #[serde(default)]
    pub description_parameters: Vec<String>,
    #[serde(default)]
    pub formatted_message: String,
    #[serde(default)]
    pub message_parameters: Vec<serde_json::Value>,
    #[serde(default, rename = "createdUUID")]
    pub created_uuid: String,
}

impl Task {
    pub fn state(&self) -> TaskState {
        TaskState::parse(&self.state)
    }

    /// Pretty JSON for failure reports.
    pub fn detail(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Operations the scheduler needs from the cluster.
pub trait ClusterClient: Send + Sync {
    /// Non-transient VMs as `name -> uuid`, restricted to `tag` when given.
    fn list_vms(&self, tag: Option<&str>) -> Result<BTreeMap<String, String>, ClusterError>;

    /// Starts exporting a VM into `folder` on the share; returns the task tag.
    fn start_export(&self, vm_uuid: &str, folder: &str) -> Result<String, ClusterError>;

    /// Starts importing `folder` from the share as a new VM; returns the task tag.
    fn start_import(&self, new_vm_name: &str, folder: &str) -> Result<String, ClusterError>;

    fn poll_task(&self, task_tag: &str) -> Result<Task, ClusterError>;

    /// Streams `size` bytes of disk media named `filename`; returns the new disk's uuid.
    fn upload_disk(&self, filename: &str, size: u64, body: Box<dyn Read + Send>) -> Result<String, ClusterError>;
}
