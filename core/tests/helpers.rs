// Copyright (c) 2022-2023 The MobileCoin Foundation

#![allow(unused)]

use std::{cell::Cell, collections::VecDeque};

use log::{debug, LevelFilter};
use miniz_oxide::deflate::compress_to_vec_zlib;
use rand::{rngs::StdRng, Rng, SeedableRng};

use ota_core::engine::{Channel, Driver, Ui};
use ota_proto::{
    image::AppDescriptor, ErrorCode, Method, OtaParams, Params, Reply, ReplyBody, Request, Source,
    MAX_FRAME_SIZE,
};

pub fn setup() {
    let _ = simplelog::SimpleLogger::init(LevelFilter::Debug, Default::default());
}

/// In-memory partitions
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Part {
    Ota0,
    Ota1,
}

#[derive(Debug)]
pub struct MemHandle(Part);

/// Partition driver double recording writes and lifecycle calls
#[derive(Debug)]
pub struct MemDriver {
    pub running: Part,
    pub next: Option<Part>,
    pub running_desc: Option<AppDescriptor>,
    pub burned: u32,

    pub fail_begin: bool,
    pub fail_write_at: Option<usize>,
    pub fail_end: bool,
    pub fail_boot: bool,

    pub descriptions_read: Cell<usize>,
    pub begun: usize,
    pub writes: Vec<usize>,
    pub image: Vec<u8>,
    pub ended: bool,
    pub aborted: bool,
    pub boot: Option<Part>,
    pub restarted: bool,
}

impl MemDriver {
    pub fn new(current_version: &str, burned: u32) -> Self {
        Self {
            running: Part::Ota0,
            next: Some(Part::Ota1),
            running_desc: Some(descriptor(current_version, burned)),
            burned,
            fail_begin: false,
            fail_write_at: None,
            fail_end: false,
            fail_boot: false,
            descriptions_read: Cell::new(0),
            begun: 0,
            writes: vec![],
            image: vec![],
            ended: false,
            aborted: false,
            boot: None,
            restarted: false,
        }
    }
}

impl Driver for MemDriver {
    type Partition = Part;
    type Handle = MemHandle;
    type Error = &'static str;

    fn running_partition(&self) -> Part {
        self.running
    }

    fn partition_description(&self, _p: Part) -> Result<AppDescriptor, Self::Error> {
        self.descriptions_read.set(self.descriptions_read.get() + 1);
        self.running_desc.clone().ok_or("no descriptor")
    }

    fn next_update_partition(&self) -> Option<Part> {
        self.next
    }

    fn secure_version(&self) -> u32 {
        self.burned
    }

    fn begin(&mut self, p: Part, _image_size: usize) -> Result<MemHandle, Self::Error> {
        if self.fail_begin {
            return Err("begin failed");
        }
        self.begun += 1;
        Ok(MemHandle(p))
    }

    fn write(&mut self, _h: &mut MemHandle, data: &[u8]) -> Result<(), Self::Error> {
        if self.fail_write_at == Some(self.writes.len()) {
            return Err("write failed");
        }
        self.writes.push(data.len());
        self.image.extend_from_slice(data);
        Ok(())
    }

    fn end(&mut self, _h: MemHandle) -> Result<(), Self::Error> {
        if self.fail_end {
            return Err("validate failed");
        }
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self, _h: MemHandle) {
        self.aborted = true;
    }

    fn set_boot_partition(&mut self, p: Part) -> Result<(), Self::Error> {
        if self.fail_boot {
            return Err("set boot failed");
        }
        self.boot = Some(p);
        Ok(())
    }

    fn restart(&mut self) {
        self.restarted = true;
    }
}

/// Decoded reply
#[derive(Clone, PartialEq, Debug)]
pub struct Sent {
    pub source: Source,
    pub id: String,
    pub error: Option<(ErrorCode, String, Option<Vec<u8>>)>,
}

impl Sent {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.0)
    }

    pub fn message(&self) -> &str {
        self.error.as_ref().map(|e| e.1.as_str()).unwrap_or("")
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.error.as_ref().and_then(|e| e.2.as_deref())
    }
}

/// Channel double replaying scripted frames and recording replies
#[derive(Default)]
pub struct ScriptedChannel {
    pub inbound: VecDeque<Vec<u8>>,
    pub sent: Vec<Sent>,
}

impl ScriptedChannel {
    pub fn push(&mut self, source: Source, req: Request) {
        let mut b = vec![0u8; MAX_FRAME_SIZE + 128];
        let n = req.encode_frame(source, &mut b).unwrap();
        self.inbound.push_back(b[..n].to_vec());
    }

    /// Queue compressed data as `ota_data` frames of the provided sizes
    pub fn push_chunks(&mut self, source: Source, data: &[u8], sizes: &[usize]) {
        let mut offset = 0;
        for (i, n) in sizes.iter().enumerate() {
            let id = format!("d{i}");
            let c = &data[offset..offset + n];
            self.push(source, Request::new(&id, Method::OtaData, Params::Bytes(c)));
            offset += n;
        }
        assert_eq!(offset, data.len(), "chunk sizes must cover data");
    }

    pub fn push_complete(&mut self, source: Source) {
        self.push(source, Request::new("done", Method::OtaComplete, Params::None));
    }

    pub fn find(&self, id: &str) -> Option<&Sent> {
        self.sent.iter().find(|s| s.id == id)
    }
}

impl Channel for ScriptedChannel {
    type Error = &'static str;

    fn recv(&mut self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let f = self.inbound.pop_front().ok_or("channel closed")?;
        if f.len() > buff.len() {
            return Err("frame too large");
        }
        buff[..f.len()].copy_from_slice(&f);
        Ok(f.len())
    }

    fn send(&mut self, source: Source, data: &[u8]) -> Result<(), Self::Error> {
        let r = Reply::decode(data).map_err(|_| "bad reply")?;
        debug!("reply: {:?}", r);

        let error = match r.body {
            ReplyBody::Result(_) => None,
            ReplyBody::Error {
                code,
                message,
                data,
            } => Some((code, message.to_string(), data.map(|d| d.to_vec()))),
        };

        self.sent.push(Sent {
            source,
            id: r.id.to_string(),
            error,
        });
        Ok(())
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum UiEvent {
    Message(String),
    Versions(String, String),
    Button(bool),
    ProgressStart,
    Progress(usize, usize),
    Error(String),
    Delay(u32),
}

/// UI double recording screens, with a preset button response
pub struct RecordingUi {
    pub accept: bool,
    pub events: Vec<UiEvent>,
}

impl RecordingUi {
    pub fn new(accept: bool) -> Self {
        Self {
            accept,
            events: vec![],
        }
    }

    pub fn count(&self, f: impl Fn(&UiEvent) -> bool) -> usize {
        self.events.iter().filter(|e| f(e)).count()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Error(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Ui for RecordingUi {
    fn message(&mut self, text: &str) {
        self.events.push(UiEvent::Message(text.to_string()));
    }

    fn show_versions(&mut self, current: &str, new: &str) {
        self.events
            .push(UiEvent::Versions(current.to_string(), new.to_string()));
    }

    fn wait_button(&mut self) -> bool {
        self.events.push(UiEvent::Button(self.accept));
        self.accept
    }

    fn progress_start(&mut self, _title: &str, _label: &str) {
        self.events.push(UiEvent::ProgressStart);
    }

    fn progress(&mut self, total: usize, current: usize) {
        self.events.push(UiEvent::Progress(total, current));
    }

    fn await_error(&mut self, status: &str) {
        self.events.push(UiEvent::Error(status.to_string()));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.events.push(UiEvent::Delay(ms));
    }
}

pub fn descriptor(version: &str, secure_version: u32) -> AppDescriptor {
    let mut d = AppDescriptor {
        secure_version,
        ..Default::default()
    };
    d.version.push_str(version).unwrap();
    d.project_name.push_str("jade").unwrap();
    d
}

/// Build a firmware image of `size` bytes with a valid header
pub fn firmware(version: &str, secure_version: u32, size: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);

    // Low entropy filler so images compress well
    let mut image: Vec<u8> = (0..size).map(|_| rng.gen_range(0..16u8)).collect();

    descriptor(version, secure_version)
        .encode_image_header(&mut image)
        .unwrap();

    image
}

pub fn compress(image: &[u8]) -> Vec<u8> {
    compress_to_vec_zlib(image, 6)
}

/// Split `len` bytes into chunks of `size` bytes
pub fn even_chunks(len: usize, size: usize) -> Vec<usize> {
    let mut v = vec![size; len / size];
    if len % size != 0 {
        v.push(len % size);
    }
    v
}

/// Start request for an update
pub fn ota_request(fwsize: usize, cmpsize: usize) -> Request<'static> {
    Request::new(
        "start",
        Method::Ota,
        Params::Ota(OtaParams::new(fwsize as u32, cmpsize as u32)),
    )
}
