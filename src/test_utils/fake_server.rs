use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;

use crate::cache::GroupKey;
use crate::constants::CONFIG_CONTROLLER_PATH;
use crate::constants::HEALTH_CHECK_PATH;
use crate::constants::HEALTH_UP;
use crate::constants::LINE_SEPARATOR;
use crate::constants::LISTENER_PATH;
use crate::constants::LONG_PULLING_TIMEOUT;
use crate::constants::LONG_PULLING_TIMEOUT_NO_HANGUP;
use crate::constants::NOT_FOUND_CODE;
use crate::constants::WORD_SEPARATOR;
use crate::HttpAgent;
use crate::RestResult;
use crate::Result;
use crate::TransportError;

/// A probe as the server received it.
#[derive(Debug, Clone)]
pub struct RecordedProbe {
    pub headers: HashMap<String, String>,
    pub params: HashMap<String, String>,
}

impl RecordedProbe {
    pub fn no_hangup(&self) -> bool {
        self.headers.contains_key(LONG_PULLING_TIMEOUT_NO_HANGUP)
    }
}

/// In-memory control server behind the [`HttpAgent`] trait.
///
/// Probes are held until [`publish`](Self::publish) reports a change or the
/// requested hold time passes, unless the no-hangup header is present.
/// Discovery calls answer with scripted results, success by default.
#[derive(Default)]
pub struct FakeControlServer {
    parameters: Mutex<HashMap<GroupKey, Value>>,
    pending: Mutex<Vec<String>>,
    changed: Notify,
    probes: Mutex<Vec<RecordedProbe>>,
    fetches: AtomicUsize,
    fail_polls: AtomicBool,
    fail_fetches: AtomicBool,
    discovery_calls: Mutex<Vec<(String, Value)>>,
    discovery_script: Mutex<VecDeque<Result<RestResult>>>,
}

impl FakeControlServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a definition without announcing it.
    pub fn put(
        &self,
        group_key: &GroupKey,
        parameter: Value,
    ) {
        self.parameters.lock().insert(group_key.clone(), parameter);
    }

    /// Stores a definition and reports it changed to the held probe.
    pub fn publish(
        &self,
        group_key: &GroupKey,
        parameter: Value,
    ) {
        self.put(group_key, parameter);
        self.announce(&format!(
            "{}{WORD_SEPARATOR}{}{WORD_SEPARATOR}{}",
            group_key.key(),
            group_key.group(),
            group_key.namespace()
        ));
    }

    /// Reports a raw changed-key line.
    pub fn announce(
        &self,
        line: &str,
    ) {
        self.pending.lock().push(line.to_string());
        self.changed.notify_one();
    }

    pub fn set_fail_polls(
        &self,
        fail: bool,
    ) {
        self.fail_polls.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_fetches(
        &self,
        fail: bool,
    ) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn probes(&self) -> Vec<RecordedProbe> {
        self.probes.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn script_discovery(
        &self,
        result: Result<RestResult>,
    ) {
        self.discovery_script.lock().push_back(result);
    }

    pub fn discovery_calls(&self) -> Vec<(String, Value)> {
        self.discovery_calls.lock().clone()
    }

    fn take_pending(&self) -> String {
        let lines = std::mem::take(&mut *self.pending.lock());
        lines
            .into_iter()
            .map(|line| format!("{line}{LINE_SEPARATOR}"))
            .collect()
    }
}

#[async_trait]
impl HttpAgent for FakeControlServer {
    async fn post_by_config(
        &self,
        path: &str,
        headers: HashMap<String, String>,
        params: HashMap<String, String>,
        read_timeout: Duration,
    ) -> Result<RestResult> {
        assert_eq!(path, LISTENER_PATH);
        let probe = RecordedProbe { headers, params };
        let no_hangup = probe.no_hangup();
        let hold = probe
            .headers
            .get(LONG_PULLING_TIMEOUT)
            .and_then(|ms| ms.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(read_timeout);
        self.probes.lock().push(probe);

        if self.fail_polls.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout {
                url: path.to_string(),
                duration: read_timeout,
            }
            .into());
        }

        let hang = !no_hangup && self.pending.lock().is_empty();
        if hang {
            let _ = tokio::time::timeout(hold, self.changed.notified()).await;
        }
        let changed = self.take_pending();
        Ok(RestResult::success(Some(Value::String(urlencoding::encode(&changed).into_owned()))))
    }

    async fn get_by_config(
        &self,
        path: &str,
        _headers: HashMap<String, String>,
        params: HashMap<String, String>,
        read_timeout: Duration,
    ) -> Result<RestResult> {
        if path == HEALTH_CHECK_PATH {
            return Ok(RestResult::success(Some(Value::String(HEALTH_UP.to_string()))));
        }
        assert_eq!(path, CONFIG_CONTROLLER_PATH);
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout {
                url: path.to_string(),
                duration: read_timeout,
            }
            .into());
        }

        let lookup = GroupKey::new(
            params.get("namespace").cloned().unwrap_or_default(),
            params.get("itemId").cloned().unwrap_or_default(),
            params.get("tpId").cloned().unwrap_or_default(),
        )?;
        match self.parameters.lock().get(&lookup) {
            Some(parameter) => Ok(RestResult::success(Some(parameter.clone()))),
            None => Ok(RestResult::failure(NOT_FOUND_CODE, "thread pool not found")),
        }
    }

    async fn post_by_discovery(
        &self,
        path: &str,
        body: Value,
    ) -> Result<RestResult> {
        self.discovery_calls.lock().push((path.to_string(), body));
        self.discovery_script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(RestResult::success(None)))
    }
}
