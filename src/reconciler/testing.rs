//! In-memory fakes of the resource and operation services.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cloud::{Disk, Instance, InstanceStatus, Operation, OperationApi, OperationFailure};
use crate::config::{DiskSpec, DiskState, InstanceSpec, InstanceState};
use crate::error::{ConvergeError, Result, TransportError};
use crate::planner::{Action, DiffEngine, plan_disk, plan_instance};

use super::kind::{Page, ResourceApi};
use super::locator::name_filter;

fn not_found(target: String) -> ConvergeError {
    ConvergeError::Transport(TransportError::status(target, 404, "not found"))
}

fn pending(id: &str, key: &str, resource_id: &str) -> Operation {
    Operation {
        id: id.to_string(),
        done: false,
        metadata: Some(serde_json::json!({ (key): resource_id })),
        ..Operation::default()
    }
}

pub fn disk_spec(name: &str, state: DiskState, size: u64, labels: &[(&str, &str)]) -> DiskSpec {
    let mut spec: DiskSpec = serde_yaml::from_str(&format!(
        "name: {name}\nfolder_id: b1g\ntype_id: network-hdd\nzone_id: ru-central1-a\n"
    ))
    .expect("valid disk");
    spec.state = state;
    spec.size = Some(size);
    spec.labels = labels
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    spec
}

pub fn instance_spec(name: &str, state: InstanceState) -> InstanceSpec {
    let mut spec: InstanceSpec = serde_yaml::from_str(&format!(
        "name: {name}\nfolder_id: b1g\nzone_id: ru-central1-a\n\
         resources:\n  memory: 2147483648\n  cores: 2\n\
         boot_disk:\n  disk_name: boot-1\n\
         network_interfaces:\n  - subnet_id: e9b\n"
    ))
    .expect("valid instance");
    spec.state = state;
    spec
}

pub fn observed_disk(id: &str, name: &str, size: &str) -> Disk {
    Disk {
        id: id.to_string(),
        folder_id: String::from("b1g"),
        name: name.to_string(),
        size: size.to_string(),
        ..Disk::default()
    }
}

pub fn observed_instance(id: &str, name: &str, status: InstanceStatus) -> Instance {
    Instance {
        id: id.to_string(),
        folder_id: String::from("b1g"),
        name: name.to_string(),
        status,
        ..Instance::default()
    }
}

/// Disk service backed by a vector.
#[derive(Default)]
pub struct FakeDisks {
    disks: Mutex<Vec<Disk>>,
    calls: Mutex<Vec<&'static str>>,
    list_error: Mutex<Option<TransportError>>,
    next_id: AtomicUsize,
}

impl FakeDisks {
    pub fn insert(&self, disk: Disk) {
        self.disks.lock().expect("lock").push(disk);
    }

    pub fn fail_list(&self, error: TransportError) {
        *self.list_error.lock().expect("lock") = Some(error);
    }

    pub fn mutations(&self) -> Vec<&'static str> {
        self.calls.lock().expect("lock").clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().expect("lock").push(call);
    }
}

#[async_trait]
impl ResourceApi for FakeDisks {
    type Spec = DiskSpec;
    type Resource = Disk;

    const KIND: &'static str = "disk";
    const ID_METADATA_KEY: &'static str = "diskId";

    async fn list(&self, folder_id: &str, filter: &str) -> Result<Page<Disk>> {
        if let Some(error) = self.list_error.lock().expect("lock").take() {
            return Err(ConvergeError::Transport(error));
        }
        let items = self
            .disks
            .lock()
            .expect("lock")
            .iter()
            .filter(|d| d.folder_id == folder_id && name_filter(&d.name) == filter)
            .cloned()
            .collect();
        Ok(Page { items, has_more: false })
    }

    async fn get(&self, id: &str) -> Result<Disk> {
        self.disks
            .lock()
            .expect("lock")
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| not_found(format!("GET /disks/{id}")))
    }

    async fn create(&self, spec: &DiskSpec) -> Result<Operation> {
        self.record("create");
        let id = format!("d-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.insert(Disk {
            id: id.clone(),
            folder_id: spec.folder_id.clone(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            labels: spec.labels.clone(),
            size: spec.size.unwrap_or_default().to_string(),
            ..Disk::default()
        });
        Ok(pending("op-create", Self::ID_METADATA_KEY, &id))
    }

    async fn update(&self, id: &str, spec: &DiskSpec) -> Result<Operation> {
        self.record("update");
        let mut disks = self.disks.lock().expect("lock");
        let disk = disks
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| not_found(format!("PATCH /disks/{id}")))?;
        disk.description.clone_from(&spec.description);
        disk.labels.clone_from(&spec.labels);
        disk.size = spec.size.unwrap_or_default().to_string();
        Ok(pending("op-update", Self::ID_METADATA_KEY, id))
    }

    async fn delete(&self, id: &str) -> Result<Operation> {
        self.record("delete");
        self.disks.lock().expect("lock").retain(|d| d.id != id);
        Ok(pending("op-delete", Self::ID_METADATA_KEY, id))
    }

    fn plan(spec: &DiskSpec, observed: Option<&Disk>) -> Action {
        plan_disk(spec, observed)
    }

    fn diff(spec: &DiskSpec, observed: &Disk) -> Option<String> {
        Some(DiffEngine::new().render(spec, observed)).filter(|d| !d.is_empty())
    }
}

/// Instance service backed by a vector.
#[derive(Default)]
pub struct FakeInstances {
    instances: Mutex<Vec<Instance>>,
    calls: Mutex<Vec<&'static str>>,
    created: Mutex<Vec<InstanceSpec>>,
}

impl FakeInstances {
    pub fn insert(&self, instance: Instance) {
        self.instances.lock().expect("lock").push(instance);
    }

    pub fn mutations(&self) -> Vec<&'static str> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn created_specs(&self) -> Vec<InstanceSpec> {
        self.created.lock().expect("lock").clone()
    }

    fn transition(&self, call: &'static str, id: &str, status: InstanceStatus) -> Result<Operation> {
        self.calls.lock().expect("lock").push(call);
        let mut instances = self.instances.lock().expect("lock");
        let instance = instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found(format!("POST /instances/{id}:{call}")))?;
        instance.status = status;
        Ok(pending("op-power", Self::ID_METADATA_KEY, id))
    }
}

#[async_trait]
impl ResourceApi for FakeInstances {
    type Spec = InstanceSpec;
    type Resource = Instance;

    const KIND: &'static str = "instance";
    const ID_METADATA_KEY: &'static str = "instanceId";

    async fn list(&self, folder_id: &str, filter: &str) -> Result<Page<Instance>> {
        let items = self
            .instances
            .lock()
            .expect("lock")
            .iter()
            .filter(|i| i.folder_id == folder_id && name_filter(&i.name) == filter)
            .cloned()
            .collect();
        Ok(Page { items, has_more: false })
    }

    async fn get(&self, id: &str) -> Result<Instance> {
        self.instances
            .lock()
            .expect("lock")
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| not_found(format!("GET /instances/{id}")))
    }

    async fn create(&self, spec: &InstanceSpec) -> Result<Operation> {
        self.calls.lock().expect("lock").push("create");
        self.created.lock().expect("lock").push(spec.clone());
        let id = format!("i-{}", spec.name);
        self.insert(Instance {
            id: id.clone(),
            folder_id: spec.folder_id.clone(),
            name: spec.name.clone(),
            labels: spec.labels.clone(),
            status: InstanceStatus::Running,
            ..Instance::default()
        });
        Ok(pending("op-create", Self::ID_METADATA_KEY, &id))
    }

    async fn delete(&self, id: &str) -> Result<Operation> {
        self.calls.lock().expect("lock").push("delete");
        self.instances.lock().expect("lock").retain(|i| i.id != id);
        Ok(pending("op-delete", Self::ID_METADATA_KEY, id))
    }

    async fn start(&self, id: &str) -> Result<Operation> {
        self.transition("start", id, InstanceStatus::Running)
    }

    async fn stop(&self, id: &str) -> Result<Operation> {
        self.transition("stop", id, InstanceStatus::Stopped)
    }

    async fn restart(&self, id: &str) -> Result<Operation> {
        self.transition("restart", id, InstanceStatus::Running)
    }

    fn plan(spec: &InstanceSpec, observed: Option<&Instance>) -> Action {
        plan_instance(spec.state, observed.map(|i| i.status))
    }
}

/// Operation service that finishes every operation on the first poll.
///
/// Finished operations carry no metadata, so callers must fall back to the
/// metadata of the operation returned by the mutating call.
#[derive(Default)]
pub struct FakeOperations {
    failure: Option<OperationFailure>,
    polls: AtomicUsize,
}

impl FakeOperations {
    pub fn failing(code: i32, message: &str) -> Self {
        Self {
            failure: Some(OperationFailure {
                code,
                message: message.to_string(),
            }),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperationApi for FakeOperations {
    async fn get_operation(&self, operation_id: &str) -> Result<Operation> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(Operation {
            id: operation_id.to_string(),
            done: true,
            error: self.failure.clone(),
            metadata: Some(serde_json::Value::Object(serde_json::Map::new())),
            response: None,
            ..Operation::default()
        })
    }
}
