// In-process simulated lighting daemon.
//
// Backs `kind = "memory"` configuration entries (with `demo = true` it
// seeds a small showcase of devices) and serves as the fixture for the
// broker's own tests: it can be taken offline, slowed down, told to fail
// writes, and it keeps the most recent state changes and frames it receives.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::debug;

use crate::Backend;
use crate::effects;
use crate::error::Error;
use crate::types::{
    Frame, MatrixDimensions, ParameterValue, RawDeviceDescriptor, RawZone, RawZoneState,
    StateChange,
};

/// How many state changes and frames are kept for inspection.
pub const HISTORY_LIMIT: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record<T>(history: &Mutex<VecDeque<T>>, entry: T) {
    let mut history = lock(history);
    if history.len() == HISTORY_LIMIT {
        history.pop_front();
    }
    history.push_back(entry);
}

/// A backend whose "hardware" lives in memory.
pub struct MemoryBackend {
    id: String,
    devices: Mutex<IndexMap<String, RawDeviceDescriptor>>,
    online: AtomicBool,
    latency: Duration,
    concurrent: bool,
    broken_matrix: HashSet<String>,
    broken_state: HashSet<String>,
    discover_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    frames: Mutex<VecDeque<(String, Frame)>>,
    state_changes: Mutex<VecDeque<(String, StateChange)>>,
}

struct InFlight<'a>(&'a MemoryBackend);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryBackend {
    // ── Construction ─────────────────────────────────────────────────

    /// An online backend with no devices.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            devices: Mutex::new(IndexMap::new()),
            online: AtomicBool::new(true),
            latency: Duration::ZERO,
            concurrent: true,
            broken_matrix: HashSet::new(),
            broken_state: HashSet::new(),
            discover_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            frames: Mutex::new(VecDeque::new()),
            state_changes: Mutex::new(VecDeque::new()),
        }
    }

    /// A backend seeded with a keyboard, a mouse and a mousemat.
    ///
    /// The mouse advertises a matrix it cannot actually draw.
    pub fn demo(id: impl Into<String>) -> Self {
        Self::new(id)
            .with_device(demo_keyboard())
            .with_device(demo_mouse())
            .with_device(demo_mousemat())
            .fail_matrix_for("mouse-0001")
    }

    pub fn with_device(self, device: RawDeviceDescriptor) -> Self {
        self.insert_device(device);
        self
    }

    /// Add response latency to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Declare whether overlapping requests are tolerated.
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Make `draw_matrix` fail for `uid` even though it reports a matrix.
    pub fn fail_matrix_for(mut self, uid: impl Into<String>) -> Self {
        self.broken_matrix.insert(uid.into());
        self
    }

    /// Make `set_state` fail for `uid`.
    pub fn fail_state_for(mut self, uid: impl Into<String>) -> Self {
        self.broken_state.insert(uid.into());
        self
    }

    // ── Runtime controls ─────────────────────────────────────────────

    /// Simulate the daemon starting or stopping.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn insert_device(&self, device: RawDeviceDescriptor) {
        lock(&self.devices).insert(device.uid.clone(), device);
    }

    pub fn remove_device(&self, uid: &str) -> Option<RawDeviceDescriptor> {
        lock(&self.devices).shift_remove(uid)
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn discover_count(&self) -> usize {
        self.discover_count.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// The last [`HISTORY_LIMIT`] frames drawn, oldest first.
    pub fn frames(&self) -> Vec<(String, Frame)> {
        lock(&self.frames).iter().cloned().collect()
    }

    /// The last [`HISTORY_LIMIT`] state changes applied, oldest first.
    pub fn state_changes(&self) -> Vec<(String, StateChange)> {
        lock(&self.state_changes).iter().cloned().collect()
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn enter(&self) -> Result<InFlight<'_>, Error> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::unavailable(&self.id, "daemon is not running"));
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(self);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(guard)
    }

    fn device(&self, uid: &str) -> Result<RawDeviceDescriptor, Error> {
        lock(&self.devices)
            .get(uid)
            .cloned()
            .ok_or_else(|| Error::not_found(&self.id, uid))
    }
}

fn apply_change(state: &mut RawZoneState, change: &StateChange) {
    if change.is_brightness() {
        if let Some(ParameterValue::Integer(level)) = change.parameter {
            state.brightness = Some(level);
        }
        return;
    }
    state.effect = Some(change.effect.clone());
    state.parameter.clone_from(&change.parameter);
    state.colours = change.colours.iter().map(|c| c.to_hex()).collect();
}

#[async_trait]
impl Backend for MemoryBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn probe(&self) -> Result<(), Error> {
        self.enter().await.map(drop)
    }

    async fn discover(&self) -> Result<Vec<RawDeviceDescriptor>, Error> {
        let _call = self.enter().await?;
        self.discover_count.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.devices).values().cloned().collect())
    }

    async fn get_device(&self, uid: &str) -> Result<RawDeviceDescriptor, Error> {
        let _call = self.enter().await?;
        self.device(uid)
    }

    async fn set_state(&self, uid: &str, change: &StateChange) -> Result<(), Error> {
        let _call = self.enter().await?;
        if self.broken_state.contains(uid) {
            return Err(Error::device(&self.id, uid, "device did not acknowledge"));
        }

        let mut devices = lock(&self.devices);
        let device = devices
            .get_mut(uid)
            .ok_or_else(|| Error::not_found(&self.id, uid))?;

        if device.zones.is_empty() {
            apply_change(&mut device.state, change);
        } else {
            let zone = device
                .zones
                .iter_mut()
                .find(|z| z.id == change.zone)
                .ok_or_else(|| Error::device(&self.id, uid, format!("no zone {}", change.zone)))?;
            apply_change(&mut zone.state, change);
        }
        drop(devices);

        debug!(
            backend = %self.id,
            uid,
            effect = %change.effect,
            zone = %change.zone,
            "state applied"
        );
        record(&self.state_changes, (uid.to_owned(), change.clone()));
        Ok(())
    }

    async fn get_matrix(&self, uid: &str) -> Result<MatrixDimensions, Error> {
        let _call = self.enter().await?;
        self.device(uid)?
            .matrix
            .ok_or_else(|| Error::unsupported(&self.id, uid, "matrix"))
    }

    async fn draw_matrix(&self, uid: &str, frame: &Frame) -> Result<(), Error> {
        let _call = self.enter().await?;
        let dims = self
            .device(uid)?
            .matrix
            .ok_or_else(|| Error::unsupported(&self.id, uid, "matrix"))?;

        if self.broken_matrix.contains(uid) {
            return Err(Error::device(&self.id, uid, "setKeyRow rejected by hardware"));
        }
        if frame.dimensions() != dims {
            return Err(Error::device(
                &self.id,
                uid,
                format!(
                    "frame is {}x{}, device is {}x{}",
                    frame.rows, frame.cols, dims.rows, dims.cols
                ),
            ));
        }

        record(&self.frames, (uid.to_owned(), frame.clone()));
        Ok(())
    }

    fn supports_concurrent_requests(&self) -> bool {
        self.concurrent
    }
}

// ── Demo devices ─────────────────────────────────────────────────────

fn lit(effect: &str, colour: &str) -> RawZoneState {
    RawZoneState {
        effect: Some(effect.to_owned()),
        parameter: None,
        colours: vec![colour.to_owned()],
        brightness: Some(100),
    }
}

fn demo_keyboard() -> RawDeviceDescriptor {
    RawDeviceDescriptor {
        uid: "kbd-0001".into(),
        name: "Razer BlackWidow Chroma".into(),
        serial: Some("PM1234567890".into()),
        form_factor: Some("keyboard".into()),
        zones: vec![
            RawZone {
                id: "main".into(),
                label: Some("Keyboard".into()),
                effects: vec![
                    effects::none(),
                    effects::static_colour(),
                    effects::spectrum(),
                    effects::wave(),
                    effects::breath(),
                    effects::reactive(),
                    effects::brightness(),
                ],
                state: lit("static", "#00ff00"),
            },
            RawZone {
                id: "logo".into(),
                label: Some("Logo".into()),
                effects: vec![
                    effects::none(),
                    effects::static_colour(),
                    effects::spectrum(),
                    effects::breath(),
                    effects::brightness(),
                ],
                state: lit("static", "#ffffff"),
            },
        ],
        matrix: Some(MatrixDimensions::new(6, 22)),
        keyboard_layout: Some("en_GB".into()),
        firmware: Some("v1.2".into()),
        ..RawDeviceDescriptor::default()
    }
}

fn demo_mouse() -> RawDeviceDescriptor {
    let zone_effects = || {
        vec![
            effects::none(),
            effects::static_colour(),
            effects::spectrum(),
            effects::breath(),
            effects::brightness(),
        ]
    };
    RawDeviceDescriptor {
        uid: "mouse-0001".into(),
        name: "Razer DeathAdder Elite".into(),
        serial: Some("PM0987654321".into()),
        form_factor: Some("mouse".into()),
        zones: vec![
            RawZone {
                id: "logo".into(),
                label: Some("Logo".into()),
                effects: zone_effects(),
                state: lit("static", "#00ff00"),
            },
            RawZone {
                id: "scroll".into(),
                label: Some("Scroll Wheel".into()),
                effects: zone_effects(),
                state: lit("spectrum", "#000000"),
            },
        ],
        matrix: Some(MatrixDimensions::new(1, 2)),
        firmware: Some("v0.9".into()),
        ..RawDeviceDescriptor::default()
    }
}

fn demo_mousemat() -> RawDeviceDescriptor {
    RawDeviceDescriptor {
        uid: "mat-0001".into(),
        name: "Razer Firefly".into(),
        form_factor: Some("mousemat".into()),
        effects: vec![
            effects::none(),
            effects::static_colour(),
            effects::spectrum(),
            effects::wave(),
            effects::breath(),
            effects::gradient(),
            effects::brightness(),
        ],
        state: lit("spectrum", "#000000"),
        matrix: Some(MatrixDimensions::new(1, 15)),
        ..RawDeviceDescriptor::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::Rgb;

    #[tokio::test]
    async fn offline_backend_is_unavailable() {
        let backend = MemoryBackend::demo("mem");
        backend.set_online(false);
        let err = backend.discover().await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.backend(), "mem");
        assert_eq!(backend.discover_count(), 0);
    }

    #[tokio::test]
    async fn set_state_is_visible_on_rediscovery() {
        let backend = MemoryBackend::demo("mem");
        let change = StateChange {
            zone: "logo".into(),
            effect: "static".into(),
            parameter: None,
            colours: vec![Rgb::new(255, 0, 0)],
        };
        backend.set_state("kbd-0001", &change).await.unwrap();

        let device = backend.get_device("kbd-0001").await.unwrap();
        assert_eq!(device.zones[1].state.colours, vec!["#FF0000".to_owned()]);
        assert_eq!(backend.state_changes().len(), 1);
    }

    #[tokio::test]
    async fn misreported_matrix_fails_on_draw() {
        let backend = MemoryBackend::demo("mem");
        let dims = backend.get_matrix("mouse-0001").await.unwrap();
        let err = backend
            .draw_matrix("mouse-0001", &Frame::new(dims).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DeviceCommunication { .. }));
        assert!(backend.frames().is_empty());
    }

    #[tokio::test]
    async fn history_keeps_only_recent_entries() {
        let backend = MemoryBackend::demo("mem");
        let dims = backend.get_matrix("mat-0001").await.unwrap();
        let mut frame = Frame::new(dims).unwrap();
        for i in 0..=HISTORY_LIMIT {
            frame.fill(Rgb::new(0, 0, u8::try_from(i).unwrap()));
            backend.draw_matrix("mat-0001", &frame).await.unwrap();
        }

        let frames = backend.frames();
        assert_eq!(frames.len(), HISTORY_LIMIT);
        assert_eq!(frames[0].1.get(0, 0), Some(Rgb::new(0, 0, 1)));
        assert_eq!(frames[HISTORY_LIMIT - 1].1, frame);
    }

    #[tokio::test]
    async fn unknown_device_is_not_found() {
        let backend = MemoryBackend::demo("mem");
        assert!(backend.get_device("nope").await.unwrap_err().is_not_found());
    }
}
