//! State gateway: last reported object states plus binary recording.
//!
//! The gateway is the one place entity state leaves the engine. Every
//! tick the engine reports one [`ObjectState`] per entity; the gateway
//! keeps the latest state per id and, when a [`Recorder`] is attached,
//! appends every report to a recording file. [`Replay`] reads such a
//! file back for offline analysis and for the determinism tests.
//!
//! # File format
//!
//! A recording starts with the magic `RSHW`, a little-endian `u32`
//! format version, and three length-prefixed UTF-8 strings: the RFC 3339
//! creation timestamp, the road-network file path, and the scene-graph
//! file path. After the header follow fixed 76-byte records, one per
//! reported state, in report order:
//!
//! | offset | type       | field                         |
//! |--------|------------|-------------------------------|
//! | 0      | `i32`      | entity id                     |
//! | 4      | `i32`      | model id                      |
//! | 8      | `i32`      | external control flag (0/1)   |
//! | 12     | `f32`      | simulation timestamp          |
//! | 16     | `[u8; 32]` | entity name, NUL padded       |
//! | 48     | `6 × f32`  | x, y, z, h, p, r              |
//! | 72     | `f32`      | speed                         |
//!
//! All numbers are little-endian.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;
use roadshow_types::{EntityId, RoadCoord, WorldPose};
use tracing::{info, warn};

use crate::error::RecordError;

/// First four bytes of every recording file.
pub const RECORD_MAGIC: [u8; 4] = *b"RSHW";

/// Format version this build writes and understands.
pub const RECORD_VERSION: u32 = 1;

/// Size of the NUL-padded name field.
const NAME_BYTES: usize = 32;

/// Longest name a record can carry; the padding keeps one NUL.
const NAME_MAX: usize = 31;

/// Size of one fixed state record.
const RECORD_BYTES: usize = 76;

/// One entity's reported state at one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectState {
    /// The entity.
    pub id: EntityId,
    /// Entity name; truncated to 31 bytes in recordings.
    pub name: String,
    /// Numeric model id from the vehicle definition.
    pub model_id: i32,
    /// The entity is under external control.
    pub external: bool,
    /// Simulation time of the report in seconds.
    pub timestamp: f64,
    /// World pose.
    pub pose: WorldPose,
    /// Road coordinates; not part of the recording format.
    pub road: RoadCoord,
    /// Forward speed in m/s.
    pub speed: f64,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn encode_record(state: &ObjectState) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RECORD_BYTES);
    buf.extend_from_slice(&(state.id.index() as i32).to_le_bytes());
    buf.extend_from_slice(&state.model_id.to_le_bytes());
    buf.extend_from_slice(&i32::from(state.external).to_le_bytes());
    buf.extend_from_slice(&(state.timestamp as f32).to_le_bytes());

    let mut name = [0u8; NAME_BYTES];
    for (dst, src) in name.iter_mut().zip(state.name.bytes().take(NAME_MAX)) {
        *dst = src;
    }
    buf.extend_from_slice(&name);

    for value in [
        state.pose.x,
        state.pose.y,
        state.pose.z,
        state.pose.h,
        state.pose.p,
        state.pose.r,
        state.speed,
    ] {
        buf.extend_from_slice(&(value as f32).to_le_bytes());
    }
    buf
}

/// Split a fixed-size chunk off the front of the input.
fn take<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], RecordError> {
    let (head, rest) = input.split_first_chunk::<N>().ok_or(RecordError::Truncated)?;
    *input = rest;
    Ok(*head)
}

fn take_f32(input: &mut &[u8]) -> Result<f64, RecordError> {
    Ok(f64::from(f32::from_le_bytes(take(input)?)))
}

fn read_string(input: &mut &[u8]) -> Result<String, RecordError> {
    let len = u32::from_le_bytes(take(input)?);
    let len = usize::try_from(len).map_err(|_| RecordError::Truncated)?;
    let (head, rest) = input.split_at_checked(len).ok_or(RecordError::Truncated)?;
    *input = rest;
    String::from_utf8(head.to_vec()).map_err(|_| RecordError::BadHeaderString)
}

fn write_string(writer: &mut impl Write, value: &str) -> Result<(), RecordError> {
    let len = u32::try_from(value.len()).map_err(|_| RecordError::BadHeaderString)?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

#[allow(clippy::cast_sign_loss)]
fn decode_record(input: &mut &[u8]) -> Result<ObjectState, RecordError> {
    let id = i32::from_le_bytes(take(input)?);
    let model_id = i32::from_le_bytes(take(input)?);
    let external = i32::from_le_bytes(take(input)?) != 0;
    let timestamp = take_f32(input)?;

    let name_raw: [u8; NAME_BYTES] = take(input)?;
    let name_len = name_raw.iter().position(|&b| b == 0).unwrap_or(NAME_BYTES);
    let name = String::from_utf8(name_raw.get(..name_len).unwrap_or_default().to_vec())
        .map_err(|_| RecordError::BadHeaderString)?;

    let pose = WorldPose {
        x: take_f32(input)?,
        y: take_f32(input)?,
        z: take_f32(input)?,
        h: take_f32(input)?,
        p: take_f32(input)?,
        r: take_f32(input)?,
    };
    let speed = take_f32(input)?;

    Ok(ObjectState {
        id: EntityId::new(id.max(0) as u32),
        name,
        model_id,
        external,
        timestamp,
        pose,
        road: RoadCoord::default(),
        speed,
    })
}

/// Appends reported states to a recording file.
#[derive(Debug)]
pub struct Recorder {
    writer: std::io::BufWriter<File>,
}

impl Recorder {
    /// Create a recording file and write its header.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when the file cannot be created or the
    /// header cannot be written.
    pub fn create(path: &Path, odr_path: &str, scene_path: &str) -> Result<Self, RecordError> {
        let mut writer = std::io::BufWriter::new(File::create(path)?);
        writer.write_all(&RECORD_MAGIC)?;
        writer.write_all(&RECORD_VERSION.to_le_bytes())?;
        write_string(&mut writer, &Utc::now().to_rfc3339())?;
        write_string(&mut writer, odr_path)?;
        write_string(&mut writer, scene_path)?;
        info!(path = %path.display(), "recording object states");
        Ok(Self { writer })
    }

    /// Append one state record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Io`] when the write fails.
    pub fn record(&mut self, state: &ObjectState) -> Result<(), RecordError> {
        self.writer.write_all(&encode_record(state))?;
        Ok(())
    }

    /// Flush buffered records to disk.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Io`] when the flush fails.
    pub fn finish(mut self) -> Result<(), RecordError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Header of a recording file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayHeader {
    /// Format version the file was written with.
    pub version: u32,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Road-network file path recorded at creation.
    pub odr_path: String,
    /// Scene-graph file path recorded at creation.
    pub scene_path: String,
}

/// A recording file read back into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    /// File header.
    pub header: ReplayHeader,
    /// All state records in report order.
    pub records: Vec<ObjectState>,
}

impl Replay {
    /// Read and parse a recording file.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] for I/O failures or a malformed file.
    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;
        Self::parse(&bytes)
    }

    /// Parse a recording from memory.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when the magic, version, header, or any
    /// record is malformed or truncated.
    pub fn parse(mut input: &[u8]) -> Result<Self, RecordError> {
        let magic: [u8; 4] = take(&mut input)?;
        if magic != RECORD_MAGIC {
            return Err(RecordError::BadMagic);
        }
        let version = u32::from_le_bytes(take(&mut input)?);
        if version != RECORD_VERSION {
            return Err(RecordError::UnsupportedVersion(version));
        }
        let header = ReplayHeader {
            version,
            created_at: read_string(&mut input)?,
            odr_path: read_string(&mut input)?,
            scene_path: read_string(&mut input)?,
        };

        let mut records = Vec::new();
        while !input.is_empty() {
            records.push(decode_record(&mut input)?);
        }
        Ok(Self { header, records })
    }
}

/// Latest reported state per entity, with optional recording.
#[derive(Debug, Default)]
pub struct Gateway {
    states: BTreeMap<EntityId, ObjectState>,
    recorder: Option<Recorder>,
}

impl Gateway {
    /// Gateway without a recorder.
    pub const fn new() -> Self {
        Self {
            states: BTreeMap::new(),
            recorder: None,
        }
    }

    /// Attach a recorder; subsequent reports are appended to it.
    pub fn attach_recorder(&mut self, recorder: Recorder) {
        self.recorder = Some(recorder);
    }

    /// Report one entity state for this tick.
    ///
    /// A failing recorder is dropped with a diagnostic; the simulation
    /// keeps running unrecorded.
    pub fn report_object(&mut self, state: ObjectState) {
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(error) = recorder.record(&state) {
                warn!(%error, "recording failed, dropping the recorder");
                self.recorder = None;
            }
        }
        self.states.insert(state.id, state);
    }

    /// Latest reported state for an entity.
    pub fn object(&self, id: EntityId) -> Option<&ObjectState> {
        self.states.get(&id)
    }

    /// All latest states in entity-id order.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectState> {
        self.states.values()
    }

    /// Number of entities with a reported state.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no state has been reported yet.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Detach and flush the recorder, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Io`] when the final flush fails.
    pub fn finish_recording(&mut self) -> Result<(), RecordError> {
        if let Some(recorder) = self.recorder.take() {
            recorder.finish()?;
        }
        Ok(())
    }
}
