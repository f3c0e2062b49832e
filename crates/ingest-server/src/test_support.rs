//! Test doubles shared by the unit test modules.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ingest_store::EventStore;
use ingest_types::{ErrorKind, Event, Reading, RequestContext, ServiceError, ValueType};
use serde_json::Value;

/// Builds a minimal valid event whose device name drives [`FakeStore`].
pub fn event_for(device: &str) -> Event {
    Event {
        id: String::new(),
        device_name: device.to_string(),
        profile_name: "profile".to_string(),
        source_name: "source".to_string(),
        origin: 1,
        readings: vec![Reading {
            id: String::new(),
            origin: 1,
            device_name: device.to_string(),
            resource_name: "resource".to_string(),
            profile_name: "profile".to_string(),
            value_type: ValueType::Int32,
            value: "1".to_string(),
            binary_value: None,
            media_type: String::new(),
            units: String::new(),
        }],
        tags: BTreeMap::new(),
    }
}

/// Scripted [`EventStore`].
///
/// `add_event` keys its behaviour on the event's device name and assigns
/// `id-<device>` on success. `event_by_id` serves events registered with
/// [`FakeStore::with_event`] and reports everything else as missing.
#[derive(Default)]
pub struct FakeStore {
    add_failures: HashMap<String, ServiceError>,
    delays: HashMap<String, Duration>,
    panics: HashSet<String>,
    events: HashMap<String, Event>,
    lookup_failures: HashMap<String, ServiceError>,
    add_calls: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, device: &str, err: ServiceError) -> Self {
        self.add_failures.insert(device.to_string(), err);
        self
    }

    pub fn delayed(mut self, device: &str, delay: Duration) -> Self {
        self.delays.insert(device.to_string(), delay);
        self
    }

    pub fn panicking(mut self, device: &str) -> Self {
        self.panics.insert(device.to_string());
        self
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.insert(event.id.clone(), event);
        self
    }

    pub fn lookup_failing(mut self, id: &str, err: ServiceError) -> Self {
        self.lookup_failures.insert(id.to_string(), err);
        self
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }
}

impl EventStore for FakeStore {
    fn add_event(&self, event: Event, _ctx: &RequestContext) -> Result<String, ServiceError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        let device = event.device_name;
        if let Some(delay) = self.delays.get(&device) {
            std::thread::sleep(*delay);
        }
        if self.panics.contains(&device) {
            panic!("scripted store panic for {device}");
        }
        match self.add_failures.get(&device) {
            Some(err) => Err(err.clone()),
            None => Ok(format!("id-{device}")),
        }
    }

    fn event_by_id(&self, id: &str, _ctx: &RequestContext) -> Result<Event, ServiceError> {
        if let Some(err) = self.lookup_failures.get(id) {
            return Err(err.clone());
        }
        self.events.get(id).cloned().ok_or_else(|| {
            ServiceError::new(
                ErrorKind::EntityDoesNotExist,
                format!("event with id {id} does not exist"),
            )
        })
    }
}

/// A writer that captures output to a shared buffer.
#[derive(Clone, Default)]
struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl std::io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap();
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// JSON log lines captured during [`capture_logs`].
#[derive(Debug)]
pub struct CapturedLogs {
    lines: Vec<Value>,
}

impl CapturedLogs {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of entries at `level` (`"ERROR"`, `"DEBUG"`, ...).
    pub fn count(&self, level: &str) -> usize {
        self.lines.iter().filter(|l| l["level"] == level).count()
    }

    /// Message text of the entries at `level`.
    pub fn messages(&self, level: &str) -> Vec<String> {
        self.lines
            .iter()
            .filter(|l| l["level"] == level)
            .filter_map(|l| l["fields"]["message"].as_str().map(str::to_string))
            .collect()
    }
}

/// Runs `f` on the current thread with a capturing JSON subscriber at TRACE.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
    let writer = CaptureWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);

    let output = String::from_utf8_lossy(&writer.buffer.lock().unwrap()).to_string();
    let lines = output
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).expect("log line should be JSON"))
        .collect();

    (result, CapturedLogs { lines })
}
