// Copyright 2025 SkyLink ACARS Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SimConnect adapter for Microsoft Flight Simulator.
//!
//! SimConnect is not reentrant and has thread affinity: the thread that
//! opened the handle must perform every subsequent call. This adapter pins
//! all SDK work (open, data-definition registration, the 1 Hz request
//! ticker, the dispatch spin and close) to one dedicated OS thread. The
//! rest of the process only talks to that thread through a stop channel, a
//! one-shot open-result channel, and the shared snapshot cell.
//!
//! Incoming records are a packed sequence of IEEE-754 doubles in the order
//! of [`DATA_DEFINITION`], followed by one 256-byte NUL-terminated title.
//! The title must stay last: a byte-sized field anywhere earlier would
//! misalign every double behind it. Decoding walks the buffer with a
//! bounds-checked cursor rather than casting it to a struct.

// The record table and decoder only have a runtime caller on Windows.
#![cfg_attr(not(windows), allow(dead_code))]

use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use log::debug;

use super::{AdapterError, SimAdapter, SnapshotCell};
use crate::model::{FlightData, TransponderState, ENGINE_SLOTS};

#[cfg(windows)]
const OPEN_RESULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// One field of the composite data definition.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldDef {
    /// Simulation variable name, indexed where applicable ("TURB ENG N1:2").
    pub var: &'static str,
    /// Unit requested from the SDK; conversion happens sim-side.
    pub unit: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Float64,
    String256,
}

impl FieldKind {
    fn size(self) -> usize {
        match self {
            Self::Float64 => 8,
            Self::String256 => 256,
        }
    }
}

macro_rules! f64_field {
    ($var:expr, $unit:expr) => {
        FieldDef { var: $var, unit: $unit, kind: FieldKind::Float64 }
    };
}

/// The composite data definition registered after open. Registration order
/// is the record layout; [`decode_record`] walks the same order.
pub(crate) const DATA_DEFINITION: &[FieldDef] = &[
    f64_field!("PLANE LATITUDE", "degrees"),
    f64_field!("PLANE LONGITUDE", "degrees"),
    f64_field!("PLANE ALTITUDE", "feet"),
    f64_field!("PLANE ALT ABOVE GROUND", "feet"),
    f64_field!("PLANE PITCH DEGREES", "degrees"),
    f64_field!("PLANE BANK DEGREES", "degrees"),
    f64_field!("PLANE HEADING DEGREES TRUE", "degrees"),
    f64_field!("PLANE HEADING DEGREES MAGNETIC", "degrees"),
    f64_field!("VERTICAL SPEED", "feet per minute"),
    f64_field!("AIRSPEED INDICATED", "knots"),
    f64_field!("AIRSPEED TRUE", "knots"),
    f64_field!("GROUND VELOCITY", "knots"),
    f64_field!("G FORCE", "gforce"),
    f64_field!("NUMBER OF ENGINES", "number"),
    f64_field!("GENERAL ENG COMBUSTION:1", "bool"),
    f64_field!("TURB ENG N1:1", "percent"),
    f64_field!("TURB ENG N2:1", "percent"),
    f64_field!("GENERAL ENG THROTTLE LEVER POSITION:1", "percent"),
    f64_field!("GENERAL ENG MIXTURE LEVER POSITION:1", "percent"),
    f64_field!("GENERAL ENG PROPELLER LEVER POSITION:1", "percent"),
    f64_field!("GENERAL ENG COMBUSTION:2", "bool"),
    f64_field!("TURB ENG N1:2", "percent"),
    f64_field!("TURB ENG N2:2", "percent"),
    f64_field!("GENERAL ENG THROTTLE LEVER POSITION:2", "percent"),
    f64_field!("GENERAL ENG MIXTURE LEVER POSITION:2", "percent"),
    f64_field!("GENERAL ENG PROPELLER LEVER POSITION:2", "percent"),
    f64_field!("GENERAL ENG COMBUSTION:3", "bool"),
    f64_field!("TURB ENG N1:3", "percent"),
    f64_field!("TURB ENG N2:3", "percent"),
    f64_field!("GENERAL ENG THROTTLE LEVER POSITION:3", "percent"),
    f64_field!("GENERAL ENG MIXTURE LEVER POSITION:3", "percent"),
    f64_field!("GENERAL ENG PROPELLER LEVER POSITION:3", "percent"),
    f64_field!("GENERAL ENG COMBUSTION:4", "bool"),
    f64_field!("TURB ENG N1:4", "percent"),
    f64_field!("TURB ENG N2:4", "percent"),
    f64_field!("GENERAL ENG THROTTLE LEVER POSITION:4", "percent"),
    f64_field!("GENERAL ENG MIXTURE LEVER POSITION:4", "percent"),
    f64_field!("GENERAL ENG PROPELLER LEVER POSITION:4", "percent"),
    f64_field!("SIM ON GROUND", "bool"),
    f64_field!("STALL WARNING", "bool"),
    f64_field!("OVERSPEED WARNING", "bool"),
    f64_field!("SIMULATION RATE", "number"),
    f64_field!("COM ACTIVE FREQUENCY:1", "MHz"),
    f64_field!("COM ACTIVE FREQUENCY:2", "MHz"),
    f64_field!("NAV ACTIVE FREQUENCY:1", "MHz"),
    f64_field!("NAV ACTIVE FREQUENCY:2", "MHz"),
    f64_field!("NAV OBS:1", "degrees"),
    f64_field!("NAV OBS:2", "degrees"),
    f64_field!("TRANSPONDER CODE:1", "Bco16"),
    f64_field!("TRANSPONDER STATE:1", "enum"),
    f64_field!("AUTOPILOT MASTER", "bool"),
    f64_field!("AUTOPILOT HEADING LOCK DIR", "degrees"),
    f64_field!("AUTOPILOT ALTITUDE LOCK VAR", "feet"),
    f64_field!("AUTOPILOT VERTICAL HOLD VAR", "feet per minute"),
    f64_field!("AUTOPILOT AIRSPEED HOLD VAR", "knots"),
    f64_field!("AUTOPILOT APPROACH HOLD", "bool"),
    f64_field!("AUTOPILOT NAV1 LOCK", "bool"),
    f64_field!("KOHLSMAN SETTING HG:1", "inHg"),
    f64_field!("LIGHT BEACON", "bool"),
    f64_field!("LIGHT STROBE", "bool"),
    f64_field!("LIGHT LANDING", "bool"),
    f64_field!("ELEVATOR POSITION", "position"),
    f64_field!("AILERON POSITION", "position"),
    f64_field!("RUDDER POSITION", "position"),
    f64_field!("FLAPS HANDLE PERCENT", "percent"),
    f64_field!("SPOILERS HANDLE POSITION", "percent"),
    f64_field!("GEAR HANDLE POSITION", "bool"),
    f64_field!("ZULU TIME", "seconds"),
    f64_field!("ZULU DAY OF MONTH", "number"),
    f64_field!("ZULU MONTH OF YEAR", "number"),
    f64_field!("ZULU YEAR", "number"),
    f64_field!("LOCAL TIME", "seconds"),
    f64_field!("APU SWITCH", "bool"),
    f64_field!("APU PCT RPM", "percent"),
    f64_field!("APU GENERATOR SWITCH", "bool"),
    f64_field!("APU GENERATOR ACTIVE", "bool"),
    f64_field!("INTERACTIVE POINT OPEN:0", "percent over 100"),
    f64_field!("INTERACTIVE POINT OPEN:1", "percent over 100"),
    f64_field!("INTERACTIVE POINT OPEN:2", "percent over 100"),
    f64_field!("INTERACTIVE POINT OPEN:3", "percent over 100"),
    f64_field!("INTERACTIVE POINT OPEN:4", "percent over 100"),
    f64_field!("TOTAL WEIGHT", "pounds"),
    f64_field!("FUEL TOTAL QUANTITY WEIGHT", "pounds"),
    FieldDef { var: "TITLE", unit: "", kind: FieldKind::String256 },
];

/// Total record size in bytes.
pub(crate) fn record_len() -> usize {
    DATA_DEFINITION.iter().map(|f| f.kind.size()).sum()
}

/// Decode a string field: bytes up to the first NUL, lossily as UTF-8.
pub(crate) fn trim_at_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Bounds-checked sequential reader over a raw record buffer.
struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn f64(&mut self) -> Result<f64, AdapterError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    fn bool(&mut self) -> Result<bool, AdapterError> {
        Ok(self.f64()? != 0.0)
    }

    fn string256(&mut self) -> Result<String, AdapterError> {
        Ok(trim_at_nul(self.take(256)?))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], AdapterError> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.buf.len());
        let Some(end) = end else {
            return Err(AdapterError::OpenFailed(format!(
                "truncated record: {} bytes, wanted {}",
                self.buf.len(),
                self.pos + n
            )));
        };
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// Decode one raw record into a snapshot. The read order matches
/// [`DATA_DEFINITION`] exactly.
pub(crate) fn decode_record(buf: &[u8]) -> Result<FlightData, AdapterError> {
    let mut r = RecordReader::new(&buf[..buf.len().min(record_len())]);
    let mut snap = FlightData::default();

    snap.position.latitude = r.f64()?;
    snap.position.longitude = r.f64()?;
    snap.position.altitude = r.f64()?;
    snap.position.altitude_agl = r.f64()?;

    snap.attitude.pitch = r.f64()?;
    snap.attitude.roll = r.f64()?;
    snap.attitude.heading_true = r.f64()?;
    snap.attitude.heading_mag = r.f64()?;
    snap.attitude.vertical_speed = r.f64()?;
    snap.attitude.ias = r.f64()?;
    snap.attitude.tas = r.f64()?;
    snap.attitude.ground_speed = r.f64()?;
    snap.attitude.g_force = r.f64()?;

    let engine_count = r.f64()?.clamp(0.0, ENGINE_SLOTS as f64) as usize;
    for (index, engine) in snap.engines.iter_mut().enumerate() {
        engine.exists = index < engine_count;
        engine.running = r.bool()?;
        engine.n1 = r.f64()?;
        engine.n2 = r.f64()?;
        engine.throttle = r.f64()?;
        engine.mixture = r.f64()?;
        engine.propeller = r.f64()?;
        if !engine.exists {
            *engine = Default::default();
        }
    }

    snap.sensors.on_ground = r.bool()?;
    snap.sensors.stall_warning = r.bool()?;
    snap.sensors.overspeed_warning = r.bool()?;
    snap.sensors.simulation_rate = r.f64()?;

    snap.radios.com1 = r.f64()?;
    snap.radios.com2 = r.f64()?;
    snap.radios.nav1 = r.f64()?;
    snap.radios.nav2 = r.f64()?;
    snap.radios.nav1_obs = r.f64()?;
    snap.radios.nav2_obs = r.f64()?;
    snap.radios.transponder_code = r.f64()?.max(0.0) as u32;
    snap.radios.transponder_state = TransponderState::from_mode(r.f64()?.max(0.0) as u32);

    snap.autopilot.master = r.bool()?;
    snap.autopilot.heading = r.f64()?;
    snap.autopilot.altitude = r.f64()?;
    snap.autopilot.vertical_speed = r.f64()?;
    snap.autopilot.speed = r.f64()?;
    snap.autopilot.approach_hold = r.bool()?;
    snap.autopilot.nav_lock = r.bool()?;

    snap.altimeter = r.f64()?;

    snap.lights.beacon = r.bool()?;
    snap.lights.strobe = r.bool()?;
    snap.lights.landing = r.bool()?;

    snap.controls.elevator = r.f64()?;
    snap.controls.aileron = r.f64()?;
    snap.controls.rudder = r.f64()?;
    snap.controls.flaps = r.f64()?;
    snap.controls.spoilers = r.f64()?;
    snap.controls.gear_down = r.bool()?;

    snap.sim_time.zulu_seconds = r.f64()?;
    snap.sim_time.zulu_day = r.f64()?.max(0.0) as u32;
    snap.sim_time.zulu_month = r.f64()?.max(0.0) as u32;
    snap.sim_time.zulu_year = r.f64()?.max(0.0) as u32;
    snap.sim_time.local_seconds = r.f64()?;

    snap.apu.switch_on = r.bool()?;
    snap.apu.rpm = r.f64()?;
    snap.apu.generator_switch = r.bool()?;
    snap.apu.generator_active = r.bool()?;

    for door in &mut snap.doors {
        door.open = r.f64()?;
    }

    snap.weight.total = r.f64()?;
    snap.weight.fuel = r.f64()?;

    snap.aircraft_name = r.string256()?;
    debug_assert_eq!(r.remaining(), 0);

    Ok(snap)
}

struct Worker {
    stop_tx: SyncSender<()>,
    handle: JoinHandle<()>,
}

/// Adapter for the SimConnect SDK.
///
/// On non-Windows builds the SDK is absent and `open` always fails with
/// [`AdapterError::Unavailable`], which lets auto-mode fall through to the
/// X-Plane adapter.
pub struct SimConnectAdapter {
    cache: Arc<SnapshotCell>,
    worker: Mutex<Option<Worker>>,
}

impl std::fmt::Debug for SimConnectAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimConnectAdapter").finish_non_exhaustive()
    }
}

impl Default for SimConnectAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SimConnectAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Arc::new(SnapshotCell::default()),
            worker: Mutex::new(None),
        }
    }
}

impl SimAdapter for SimConnectAdapter {
    #[cfg(windows)]
    fn open(&self) -> Result<(), AdapterError> {
        use std::sync::mpsc;

        self.close();

        let (stop_tx, stop_rx) = mpsc::sync_channel(1);
        let (open_tx, open_rx) = mpsc::sync_channel(1);
        let cache = Arc::clone(&self.cache);

        let handle = std::thread::Builder::new()
            .name("simconnect-dispatch".to_string())
            .spawn(move || dispatch::run(&cache, &stop_rx, &open_tx))
            .map_err(|e| AdapterError::OpenFailed(e.to_string()))?;

        match open_rx.recv_timeout(OPEN_RESULT_TIMEOUT) {
            Ok(Ok(())) => {
                *self.worker.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some(Worker { stop_tx, handle });
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                let _ = stop_tx.try_send(());
                let _ = handle.join();
                Err(AdapterError::OpenFailed(
                    "timed out waiting for SimConnect open".to_string(),
                ))
            }
        }
    }

    #[cfg(not(windows))]
    fn open(&self) -> Result<(), AdapterError> {
        Err(AdapterError::Unavailable(
            "SimConnect is only available on Windows".to_string(),
        ))
    }

    fn close(&self) {
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker {
            let _ = worker.stop_tx.try_send(());
            if worker.handle.join().is_err() {
                debug!("SimConnect dispatch thread panicked during close");
            }
        }
        self.cache.clear();
    }

    fn name(&self) -> &'static str {
        "SimConnect"
    }

    fn latest(&self) -> Result<FlightData, AdapterError> {
        self.cache.latest()
    }

    fn last_received(&self) -> Option<Instant> {
        self.cache.last_received()
    }
}

impl Drop for SimConnectAdapter {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(windows)]
mod dispatch {
    //! Everything in this module runs on the pinned dispatch thread. No
    //! other thread may touch the SimConnect handle.

    use std::sync::mpsc::{Receiver, SyncSender, TryRecvError};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use log::warn;

    use super::ffi;
    use super::{decode_record, record_len, AdapterError, FieldKind, DATA_DEFINITION};
    use crate::adapter::SnapshotCell;

    const DEFINE_ID: u32 = 1;
    const REQUEST_ID: u32 = 1;
    const REQUEST_INTERVAL: Duration = Duration::from_secs(1);
    const IDLE_SLEEP: Duration = Duration::from_millis(5);

    pub(super) fn run(
        cache: &Arc<SnapshotCell>,
        stop_rx: &Receiver<()>,
        open_tx: &SyncSender<Result<(), AdapterError>>,
    ) {
        let handle = match open_and_register() {
            Ok(handle) => {
                let _ = open_tx.send(Ok(()));
                handle
            }
            Err(err) => {
                let _ = open_tx.send(Err(err));
                return;
            }
        };

        let mut last_request: Option<Instant> = None;
        loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            if last_request.is_none_or(|t| t.elapsed() >= REQUEST_INTERVAL) {
                // SAFETY: the handle was opened on this thread and is only
                // used here until close.
                let hr = unsafe {
                    ffi::SimConnect_RequestDataOnSimObjectType(
                        handle,
                        REQUEST_ID,
                        DEFINE_ID,
                        0,
                        ffi::SIMCONNECT_SIMOBJECT_TYPE_USER,
                    )
                };
                if hr < 0 {
                    warn!("SimConnect request failed: {hr:#x}");
                }
                last_request = Some(Instant::now());
            }

            let mut recv: *mut ffi::Recv = std::ptr::null_mut();
            let mut size: u32 = 0;
            // SAFETY: same-thread dispatch; pointers are written by the SDK
            // and only read when the call reports success.
            let hr = unsafe { ffi::SimConnect_GetNextDispatch(handle, &mut recv, &mut size) };
            if hr < 0 || recv.is_null() {
                // Negative codes mean "nothing to read", never fatal.
                std::thread::sleep(IDLE_SLEEP);
                continue;
            }

            // SAFETY: the SDK guarantees `recv` points at `size` valid bytes
            // for the duration of this iteration.
            let (id, payload) = unsafe {
                let id = (*recv).id;
                let payload_offset = std::mem::offset_of!(ffi::RecvSimobjectData, data);
                let payload = if size as usize > payload_offset {
                    std::slice::from_raw_parts(
                        recv.cast::<u8>().add(payload_offset),
                        size as usize - payload_offset,
                    )
                } else {
                    &[][..]
                };
                (id, payload)
            };

            match id {
                ffi::SIMCONNECT_RECV_ID_SIMOBJECT_DATA_BYTYPE => {
                    if payload.len() >= record_len() {
                        match decode_record(payload) {
                            Ok(snapshot) => cache.publish(snapshot),
                            Err(err) => warn!("failed to decode SimConnect record: {err}"),
                        }
                    }
                }
                ffi::SIMCONNECT_RECV_ID_EXCEPTION => {
                    // SAFETY: id identifies the concrete receive struct.
                    let code = unsafe { (*recv.cast::<ffi::RecvException>()).exception };
                    warn!("SimConnect exception {code}");
                }
                _ => {}
            }
        }

        // SAFETY: close on the same thread that opened the handle.
        unsafe {
            let _ = ffi::SimConnect_Close(handle);
        }
    }

    fn open_and_register() -> Result<*mut std::ffi::c_void, AdapterError> {
        let name = std::ffi::CString::new("skylink-acars")
            .map_err(|e| AdapterError::OpenFailed(e.to_string()))?;
        let mut handle: *mut std::ffi::c_void = std::ptr::null_mut();

        // SAFETY: out-pointer call; the handle is only considered valid when
        // the SDK reports success.
        let hr = unsafe {
            ffi::SimConnect_Open(
                &mut handle,
                name.as_ptr(),
                std::ptr::null_mut(),
                0,
                std::ptr::null_mut(),
                0,
            )
        };
        if hr < 0 || handle.is_null() {
            return Err(AdapterError::OpenFailed(format!(
                "SimConnect_Open returned {hr:#x}; is the simulator running?"
            )));
        }

        for field in DATA_DEFINITION {
            let var = std::ffi::CString::new(field.var)
                .map_err(|e| AdapterError::OpenFailed(e.to_string()))?;
            let unit = std::ffi::CString::new(field.unit)
                .map_err(|e| AdapterError::OpenFailed(e.to_string()))?;
            let datum_type = match field.kind {
                FieldKind::Float64 => ffi::SIMCONNECT_DATATYPE_FLOAT64,
                FieldKind::String256 => ffi::SIMCONNECT_DATATYPE_STRING256,
            };
            // SAFETY: same-thread registration against a live handle.
            let hr = unsafe {
                ffi::SimConnect_AddToDataDefinition(
                    handle,
                    DEFINE_ID,
                    var.as_ptr(),
                    if field.unit.is_empty() {
                        std::ptr::null()
                    } else {
                        unit.as_ptr()
                    },
                    datum_type,
                    0.0,
                    ffi::SIMCONNECT_UNUSED,
                )
            };
            if hr < 0 {
                // SAFETY: releasing the handle we just opened on this thread.
                unsafe {
                    let _ = ffi::SimConnect_Close(handle);
                }
                return Err(AdapterError::OpenFailed(format!(
                    "AddToDataDefinition({}) returned {hr:#x}",
                    field.var
                )));
            }
        }

        Ok(handle)
    }
}

#[cfg(windows)]
mod ffi {
    //! Minimal raw surface of SimConnect.dll. Only the entry points the
    //! dispatch thread needs.

    use std::ffi::{c_char, c_void};

    pub type HResult = i32;

    pub const SIMCONNECT_UNUSED: u32 = 0xFFFF_FFFF;
    pub const SIMCONNECT_SIMOBJECT_TYPE_USER: u32 = 0;
    pub const SIMCONNECT_DATATYPE_FLOAT64: u32 = 4;
    pub const SIMCONNECT_DATATYPE_STRING256: u32 = 11;
    pub const SIMCONNECT_RECV_ID_EXCEPTION: u32 = 1;
    pub const SIMCONNECT_RECV_ID_SIMOBJECT_DATA_BYTYPE: u32 = 9;

    #[repr(C)]
    pub struct Recv {
        pub size: u32,
        pub version: u32,
        pub id: u32,
    }

    #[repr(C)]
    pub struct RecvException {
        pub base: Recv,
        pub exception: u32,
        pub send_id: u32,
        pub index: u32,
    }

    /// Header of a SIMOBJECT_DATA response; `data` is the first DWORD of the
    /// packed record payload.
    #[repr(C)]
    pub struct RecvSimobjectData {
        pub base: Recv,
        pub request_id: u32,
        pub object_id: u32,
        pub define_id: u32,
        pub flags: u32,
        pub entry_number: u32,
        pub out_of: u32,
        pub define_count: u32,
        pub data: u32,
    }

    #[link(name = "SimConnect")]
    extern "system" {
        pub fn SimConnect_Open(
            handle: *mut *mut c_void,
            name: *const c_char,
            hwnd: *mut c_void,
            user_event_win32: u32,
            event_handle: *mut c_void,
            config_index: u32,
        ) -> HResult;

        pub fn SimConnect_Close(handle: *mut c_void) -> HResult;

        pub fn SimConnect_AddToDataDefinition(
            handle: *mut c_void,
            define_id: u32,
            datum_name: *const c_char,
            units_name: *const c_char,
            datum_type: u32,
            epsilon: f32,
            datum_id: u32,
        ) -> HResult;

        pub fn SimConnect_RequestDataOnSimObjectType(
            handle: *mut c_void,
            request_id: u32,
            define_id: u32,
            radius_meters: u32,
            object_type: u32,
        ) -> HResult;

        pub fn SimConnect_GetNextDispatch(
            handle: *mut c_void,
            recv: *mut *mut Recv,
            size: *mut u32,
        ) -> HResult;
    }
}
