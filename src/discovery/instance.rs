use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::GROUP_KEY_DELIMITER;
use crate::utils::time::now_millis;
use crate::ApplicationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Up,
    Down,
    Starting,
    OutOfService,
    Unknown,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            InstanceStatus::Up => "UP",
            InstanceStatus::Down => "DOWN",
            InstanceStatus::Starting => "STARTING",
            InstanceStatus::OutOfService => "OUT_OF_SERVICE",
            InstanceStatus::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// What the server knows about this process.
///
/// `last_dirty_timestamp` only moves forward. The dirty mark is the
/// timestamp of the latest outstanding bump, or 0 when clean; clearing
/// succeeds only for the bump that is still outstanding.
#[derive(Debug)]
pub struct InstanceInfo {
    app_name: String,
    instance_id: String,
    host_name: String,
    port: u16,
    group_key: String,
    identify: String,
    client_base_path: Option<String>,
    status: RwLock<InstanceStatus>,
    last_updated_timestamp: AtomicU64,
    last_dirty_timestamp: AtomicU64,
    dirty_mark: AtomicU64,
}

impl InstanceInfo {
    pub fn new(
        app: &ApplicationConfig,
        host_name: &str,
        identify: &str,
    ) -> Self {
        let now = now_millis();
        Self {
            app_name: app.app_name.clone(),
            instance_id: format!("{}:{}:{}", host_name, app.app_name, app.port),
            host_name: host_name.to_string(),
            port: app.port,
            group_key: format!("{}{GROUP_KEY_DELIMITER}{}", app.item_id, app.namespace),
            identify: identify.to_string(),
            client_base_path: app.client_base_path.clone(),
            status: RwLock::new(InstanceStatus::Up),
            last_updated_timestamp: AtomicU64::new(now),
            last_dirty_timestamp: AtomicU64::new(now),
            dirty_mark: AtomicU64::new(0),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }

    pub fn identify(&self) -> &str {
        &self.identify
    }

    pub fn status(&self) -> InstanceStatus {
        *self.status.read()
    }

    pub fn set_status(
        &self,
        status: InstanceStatus,
    ) {
        let mut current = self.status.write();
        if *current != status {
            *current = status;
            self.last_updated_timestamp.store(now_millis(), Ordering::Release);
        }
    }

    pub fn last_dirty_timestamp(&self) -> u64 {
        self.last_dirty_timestamp.load(Ordering::Acquire)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_mark.load(Ordering::Acquire) != 0
    }

    /// Bumps `last_dirty_timestamp` to `max(now, previous + 1)` and publishes
    /// it as the outstanding dirty mark. Returns the bump.
    pub fn mark_dirty(&self) -> u64 {
        let now = now_millis();
        let mut previous = self.last_dirty_timestamp.load(Ordering::Acquire);
        let bumped = loop {
            let next = now.max(previous + 1);
            match self.last_dirty_timestamp.compare_exchange_weak(
                previous,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break next,
                Err(actual) => previous = actual,
            }
        };
        self.dirty_mark.fetch_max(bumped, Ordering::AcqRel);
        bumped
    }

    /// Clears the dirty mark if `observed` is still the outstanding one.
    pub fn clear_dirty(
        &self,
        observed: u64,
    ) -> bool {
        self.dirty_mark
            .compare_exchange(observed, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn register_request(&self) -> RegisterRequest<'_> {
        RegisterRequest {
            app_name: &self.app_name,
            host_name: &self.host_name,
            group_key: &self.group_key,
            port: self.port.to_string(),
            instance_id: &self.instance_id,
            ip_application_name: format!("{}:{}", self.host_name, self.port),
            client_base_path: self.client_base_path.as_deref(),
            callback_url: format!(
                "{}:{}{}",
                self.host_name,
                self.port,
                self.client_base_path.as_deref().unwrap_or_default()
            ),
            identify: &self.identify,
            status: self.status(),
            last_updated_timestamp: self.last_updated_timestamp.load(Ordering::Acquire),
            last_dirty_timestamp: self.last_dirty_timestamp(),
        }
    }

    pub(crate) fn renew_request(&self) -> RenewRequest<'_> {
        RenewRequest {
            app_name: &self.app_name,
            instance_id: &self.instance_id,
            last_dirty_timestamp: self.last_dirty_timestamp().to_string(),
            status: self.status().to_string(),
        }
    }

    /// The close notice identifies this process as `groupKey+identify`.
    pub(crate) fn close_request(&self) -> ClientCloseRequest<'_> {
        ClientCloseRequest {
            app_name: &self.app_name,
            instance_id: &self.instance_id,
            group_key: format!("{}{GROUP_KEY_DELIMITER}{}", self.group_key, self.identify),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterRequest<'a> {
    app_name: &'a str,
    host_name: &'a str,
    group_key: &'a str,
    port: String,
    instance_id: &'a str,
    ip_application_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_base_path: Option<&'a str>,
    #[serde(rename = "callBackUrl")]
    callback_url: String,
    identify: &'a str,
    status: InstanceStatus,
    last_updated_timestamp: u64,
    last_dirty_timestamp: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenewRequest<'a> {
    app_name: &'a str,
    instance_id: &'a str,
    last_dirty_timestamp: String,
    status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClientCloseRequest<'a> {
    app_name: &'a str,
    instance_id: &'a str,
    group_key: String,
}
