//! Streaming the regions to another process over TCP.
//!
//! Every record is a frame: its payload length as a little endian `u32`
//! followed by the payload, whose first byte is the record tag. Integers are
//! little endian, pixels are the raw [PixelRenderResult] bytes of the sender,
//! so both ends must share the float layout.
//!
//! The [RemoteSink] sends records and, for the two queries, reads one reply.
//! The [RemoteHost] accepts a connection and forwards the records to a local
//! [Sink].

use std::{
    io::{self, BufReader, BufWriter, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};

use crate::{engine::tile::Tile, engine::CancelToken, renderer::PixelRenderResult};

use super::Sink;

/// Frames larger than this are rejected as corrupted
const MAX_FRAME_LEN: usize = 1 << 30;

const BEGIN_RENDER: u8 = 1;
const BEGIN_REGION: u8 = 2;
const WRITE_REGION: u8 = 3;
const END_RENDER: u8 = 4;
const QUERY_RESOLUTION: u8 = 5;
const POLL_CANCEL: u8 = 6;
const RESOLUTION: u8 = 0x81;
const CANCEL: u8 = 0x82;

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    BeginRender { width: u32, height: u32 },
    BeginRegion(Tile),
    WriteRegion(Tile, Vec<PixelRenderResult>),
    EndRender,
    QueryResolution,
    PollCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// `(0, 0)` when the host has no preference
    Resolution(u32, u32),
    Cancel(bool),
}

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn write_frame(w: &mut impl Write, payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(invalid_data(format!("frame of {} bytes is too large", payload.len())));
    }
    w.write_all(&(payload.len() as u32).to_le_bytes())?;
    w.write_all(payload)
}

/// `None` when the stream ends cleanly before a new frame
fn read_frame(r: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut len = [0; 4];
    match r.read_exact(&mut len) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_le_bytes(len) as usize;
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(invalid_data(format!("invalid frame length {len}")));
    }
    let mut payload = vec![0; len];
    r.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Reads little endian `u32`s from the front of a payload
struct Cursor<'a>(&'a [u8]);

impl Cursor<'_> {
    fn u32(&mut self) -> io::Result<u32> {
        let Some((head, tail)) = self.0.split_first_chunk::<4>() else {
            return Err(invalid_data("truncated record"));
        };
        self.0 = tail;
        Ok(u32::from_le_bytes(*head))
    }

    fn tile(&mut self) -> io::Result<Tile> {
        let tile = Tile {
            x_start: self.u32()?,
            x_end: self.u32()?,
            y_start: self.u32()?,
            y_end: self.u32()?,
        };
        if tile.x_start > tile.x_end || tile.y_start > tile.y_end {
            return Err(invalid_data(format!("malformed tile {tile:?}")));
        }
        Ok(tile)
    }

    fn finish(self) -> io::Result<()> {
        if !self.0.is_empty() {
            return Err(invalid_data(format!("{} trailing bytes", self.0.len())));
        }
        Ok(())
    }
}

fn push_tile(payload: &mut Vec<u8>, tile: &Tile) {
    for v in [tile.x_start, tile.x_end, tile.y_start, tile.y_end] {
        payload.extend_from_slice(&v.to_le_bytes());
    }
}

impl Record {
    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        let mut payload = vec![];
        match self {
            Record::BeginRender { width, height } => {
                payload.push(BEGIN_RENDER);
                payload.extend_from_slice(&width.to_le_bytes());
                payload.extend_from_slice(&height.to_le_bytes());
            }
            Record::BeginRegion(tile) => {
                payload.push(BEGIN_REGION);
                push_tile(&mut payload, tile);
            }
            Record::WriteRegion(tile, pixels) => {
                payload.reserve(17 + std::mem::size_of_val(pixels.as_slice()));
                payload.push(WRITE_REGION);
                push_tile(&mut payload, tile);
                payload.extend_from_slice(bytemuck::cast_slice(pixels));
            }
            Record::EndRender => payload.push(END_RENDER),
            Record::QueryResolution => payload.push(QUERY_RESOLUTION),
            Record::PollCancel => payload.push(POLL_CANCEL),
        }
        write_frame(w, &payload)
    }

    pub fn read_from(r: &mut impl Read) -> io::Result<Option<Self>> {
        let Some(payload) = read_frame(r)? else {
            return Ok(None);
        };
        let mut cursor = Cursor(&payload[1..]);
        let record = match payload[0] {
            BEGIN_RENDER => Record::BeginRender {
                width: cursor.u32()?,
                height: cursor.u32()?,
            },
            BEGIN_REGION => Record::BeginRegion(cursor.tile()?),
            WRITE_REGION => {
                let tile = cursor.tile()?;
                let bytes = std::mem::take(&mut cursor.0);
                let expected = tile
                    .width()
                    .checked_mul(tile.height())
                    .and_then(|n| n.checked_mul(std::mem::size_of::<PixelRenderResult>()))
                    .ok_or_else(|| invalid_data(format!("region {tile:?} is too large")))?;
                if bytes.len() != expected {
                    return Err(invalid_data(format!(
                        "region {tile:?} carries {} bytes instead of {expected}",
                        bytes.len()
                    )));
                }
                Record::WriteRegion(tile, bytemuck::pod_collect_to_vec(bytes))
            }
            END_RENDER => Record::EndRender,
            QUERY_RESOLUTION => Record::QueryResolution,
            POLL_CANCEL => Record::PollCancel,
            tag => return Err(invalid_data(format!("unknown record tag {tag}"))),
        };
        cursor.finish()?;
        Ok(Some(record))
    }
}

impl Reply {
    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        let mut payload = vec![];
        match *self {
            Reply::Resolution(width, height) => {
                payload.push(RESOLUTION);
                payload.extend_from_slice(&width.to_le_bytes());
                payload.extend_from_slice(&height.to_le_bytes());
            }
            Reply::Cancel(cancel) => {
                payload.push(CANCEL);
                payload.push(cancel as u8);
            }
        }
        write_frame(w, &payload)
    }

    pub fn read_from(r: &mut impl Read) -> io::Result<Self> {
        let payload = read_frame(r)?.ok_or_else(|| invalid_data("connection closed before the reply"))?;
        let mut cursor = Cursor(&payload[1..]);
        let reply = match payload[0] {
            RESOLUTION => Reply::Resolution(cursor.u32()?, cursor.u32()?),
            CANCEL => {
                let Some((&flag, tail)) = cursor.0.split_first() else {
                    return Err(invalid_data("truncated record"));
                };
                cursor.0 = tail;
                Reply::Cancel(flag != 0)
            }
            tag => return Err(invalid_data(format!("unknown reply tag {tag}"))),
        };
        cursor.finish()?;
        Ok(reply)
    }
}

/// Sends the regions to a [RemoteHost]
pub struct RemoteSink {
    name: String,
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    poll_interval: Duration,
    last_poll: Option<Instant>,
    canceling: bool,
}

impl RemoteSink {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).context("connecting to the remote host")?;
        let name = match stream.peer_addr() {
            Ok(peer) => format!("remote {peer}"),
            Err(_) => "remote".to_owned(),
        };
        stream.set_nodelay(true)?;
        Ok(Self {
            name,
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
            poll_interval: Duration::from_millis(100),
            last_poll: None,
            canceling: false,
        })
    }

    /// Minimum delay between two cancellation polls of the host
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn send(&mut self, record: &Record) -> Result<()> {
        record
            .write_to(&mut self.writer)
            .with_context(|| format!("sending {}", record_name(record)))
    }

    fn request(&mut self, record: &Record) -> Result<Reply> {
        self.send(record)?;
        self.writer.flush()?;
        Reply::read_from(&mut self.reader).context("reading the reply of the remote host")
    }

    /// Resolution requested by the host, if any
    pub fn query_resolution(&mut self) -> Result<Option<(u32, u32)>> {
        match self.request(&Record::QueryResolution)? {
            Reply::Resolution(0, _) | Reply::Resolution(_, 0) => Ok(None),
            Reply::Resolution(width, height) => Ok(Some((width, height))),
            reply => bail!("unexpected reply {reply:?} to a resolution query"),
        }
    }

    fn poll_cancel(&mut self) -> Result<bool> {
        match self.request(&Record::PollCancel)? {
            Reply::Cancel(cancel) => Ok(cancel),
            reply => bail!("unexpected reply {reply:?} to a cancellation poll"),
        }
    }
}

fn record_name(record: &Record) -> &'static str {
    match record {
        Record::BeginRender { .. } => "begin render",
        Record::BeginRegion(_) => "begin region",
        Record::WriteRegion(..) => "region",
        Record::EndRender => "end render",
        Record::QueryResolution => "resolution query",
        Record::PollCancel => "cancellation poll",
    }
}

impl Sink for RemoteSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_render(&mut self, (width, height): (u32, u32)) -> Result<()> {
        self.canceling = false;
        self.last_poll = None;
        self.send(&Record::BeginRender { width, height })
    }

    fn begin_region(&mut self, tile: &Tile) -> Result<()> {
        self.send(&Record::BeginRegion(*tile))
    }

    fn write_region(&mut self, tile: &Tile, pixels: &[PixelRenderResult]) -> Result<()> {
        self.send(&Record::WriteRegion(*tile, pixels.to_vec()))?;
        self.writer.flush()?;
        Ok(())
    }

    fn end_render(&mut self) -> Result<()> {
        self.send(&Record::EndRender)?;
        self.writer.flush()?;
        Ok(())
    }

    fn is_canceling(&mut self) -> bool {
        if self.canceling {
            return true;
        }
        if self
            .last_poll
            .is_some_and(|last| last.elapsed() < self.poll_interval)
        {
            return false;
        }
        self.last_poll = Some(Instant::now());
        match self.poll_cancel() {
            Ok(cancel) => self.canceling = cancel,
            Err(e) => log::warn!("could not poll {} for cancellation: {e:#}", self.name),
        }
        self.canceling
    }
}

/// What a [RemoteHost] received from one connection
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostSummary {
    pub renders: usize,
    pub regions: usize,
}

/// Receiving end of a [RemoteSink]
pub struct RemoteHost {
    listener: TcpListener,
    resolution: Option<(u32, u32)>,
    cancel: CancelToken,
}

impl RemoteHost {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).context("binding the remote host")?,
            resolution: None,
            cancel: CancelToken::new(),
        })
    }

    /// Resolution answered to resolution queries
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Some((width, height));
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Cancelling it makes the next cancellation poll of the sender succeed
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Accept one connection and forward its records to `sink` until the
    /// sender disconnects
    pub fn serve(&self, sink: &mut dyn Sink) -> Result<HostSummary> {
        let (stream, peer) = self.listener.accept().context("accepting a connection")?;
        log::info!("remote renderer connected from {peer}");
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);
        let mut summary = HostSummary::default();

        while let Some(record) = Record::read_from(&mut reader)? {
            match record {
                Record::BeginRender { width, height } => {
                    summary.renders += 1;
                    sink.begin_render((width, height))?;
                }
                Record::BeginRegion(tile) => sink.begin_region(&tile)?,
                Record::WriteRegion(tile, pixels) => {
                    summary.regions += 1;
                    sink.write_region(&tile, &pixels)?;
                }
                Record::EndRender => sink.end_render()?,
                Record::QueryResolution => {
                    let (width, height) = self.resolution.unwrap_or((0, 0));
                    Reply::Resolution(width, height).write_to(&mut writer)?;
                    writer.flush()?;
                }
                Record::PollCancel => {
                    let cancel = self.cancel.is_cancelled() || sink.is_canceling();
                    Reply::Cancel(cancel).write_to(&mut writer)?;
                    writer.flush()?;
                }
            }
        }
        log::info!("remote renderer {peer} disconnected");
        Ok(summary)
    }
}
