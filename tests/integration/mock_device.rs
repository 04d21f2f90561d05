//! In-memory controller for integration tests.
//!
//! A pair of byte pipes stands in for the serial link. The device side
//! runs on its own thread, decodes every request frame and answers it
//! through a script closure, so the gateway sees exactly the byte stream
//! a real controller would produce.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use linkmux::Gateway;
use linkmux::app::events::LinkEvent;
use linkmux::app::ports::EventSink;
use linkmux::config::LinkConfig;
use linkmux::rpc::codec::{FrameDecoder, encode_frame};
use linkmux::rpc::schema::{
    DigitalCommand, McuAction, ProfileCommand, Request, Response, ResponseCode, decode_request,
    encode_response,
};
use linkmux::rpc::transport::Transport;

/// How long a read waits for bytes before reporting an empty read.
const READ_WAIT: Duration = Duration::from_millis(20);

// ── Pipe ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct Pipe {
    buf: Mutex<VecDeque<u8>>,
    ready: Condvar,
}

impl Pipe {
    fn push(&self, data: &[u8]) {
        self.buf.lock().unwrap().extend(data);
        self.ready.notify_all();
    }

    fn pull(&self, out: &mut [u8]) -> usize {
        let guard = self.buf.lock().unwrap();
        let (mut guard, _) = self
            .ready
            .wait_timeout_while(guard, READ_WAIT, |b| b.is_empty())
            .unwrap();
        let n = out.len().min(guard.len());
        for (slot, byte) in out.iter_mut().zip(guard.drain(..n)) {
            *slot = byte;
        }
        n
    }
}

/// One end of a duplex in-memory link.
#[derive(Clone)]
pub struct PipeEnd {
    rx: Arc<Pipe>,
    tx: Arc<Pipe>,
}

impl Transport for PipeEnd {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        Ok(self.rx.pull(buf))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        self.tx.push(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

/// Host end and device end of a fresh link.
pub fn link() -> (PipeEnd, PipeEnd) {
    let host_to_device = Arc::new(Pipe::default());
    let device_to_host = Arc::new(Pipe::default());
    (
        PipeEnd {
            rx: Arc::clone(&device_to_host),
            tx: Arc::clone(&host_to_device),
        },
        PipeEnd {
            rx: host_to_device,
            tx: device_to_host,
        },
    )
}

// ── Device ────────────────────────────────────────────────────

pub type Script = Box<dyn FnMut(&Request) -> Vec<Response> + Send>;

/// Handle onto a running mock controller. Dropping it stops the thread.
pub struct MockDevice {
    end: PipeEnd,
    requests: Arc<Mutex<Vec<Request>>>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

#[allow(dead_code)]
impl MockDevice {
    pub fn spawn(end: PipeEnd, mut script: Script) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let mut io = end.clone();
        let log = Arc::clone(&requests);
        let flag = Arc::clone(&stop);
        let join = thread::spawn(move || {
            let mut decoder = FrameDecoder::new(1024);
            let mut buf = [0u8; 64];
            while !flag.load(Ordering::Acquire) {
                let n = io.read(&mut buf).unwrap();
                for frame in decoder.feed(&buf[..n]) {
                    let request = decode_request(&frame).expect("host sent a malformed request");
                    log.lock().unwrap().push(request.clone());
                    for response in script(&request) {
                        io.write(&wire(&response)).unwrap();
                    }
                }
            }
        });

        Self {
            end,
            requests,
            stop,
            join: Some(join),
        }
    }

    /// Push an unsolicited response to the host.
    pub fn send(&self, response: &Response) {
        self.end.tx.push(&wire(response));
    }

    pub fn ack(&self, profile_id: u8) {
        self.send(&Response::new(ResponseCode::Ack, profile_id, vec![]));
    }

    pub fn data(&self, profile_id: u8, payload: &[u8]) {
        self.send(&Response::new(ResponseCode::Data, profile_id, payload.to_vec()));
    }

    /// Push raw bytes, framed or not.
    pub fn raw(&self, bytes: &[u8]) {
        self.end.tx.push(bytes);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Block until at least `count` requests have arrived.
    pub fn wait_for_requests(&self, count: usize, timeout: Duration) -> Vec<Request> {
        let deadline = Instant::now() + timeout;
        loop {
            let seen = self.requests();
            if seen.len() >= count || Instant::now() >= deadline {
                return seen;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

pub fn wire(response: &Response) -> Vec<u8> {
    encode_frame(&encode_response(response).unwrap()).unwrap()
}

// ── Scripts ───────────────────────────────────────────────────

pub const FIRMWARE_VERSION: &str = "1.4.0";
/// Two 7-bit groups with the MSB set: 4096 bytes free.
pub const RAM_REPORT: [u8; 2] = [0x80, 0xa0];
pub const COLOR_REPORT: [u8; 3] = [200, 10, 40];
/// 300 cm, big-endian.
pub const DISTANCE_REPORT: [u8; 2] = [0x01, 0x2c];

/// ACK every request, then complete it with the payload a healthy
/// controller would send.
pub fn firmware(request: &Request) -> Vec<Response> {
    let id = request.profile_id();
    let ack = Response::new(ResponseCode::Ack, id, vec![]);
    let data = |payload: &[u8]| Response::new(ResponseCode::Data, id, payload.to_vec());

    let payload: Vec<u8> = match request {
        Request::Registration(_) => vec![],
        Request::Action(action) => match &action.command {
            ProfileCommand::Digital(DigitalCommand::Read) => vec![2],
            ProfileCommand::Digital(_) => vec![],
            ProfileCommand::Uart(cmd) => format!("OK {}", cmd.command).into_bytes(),
            ProfileCommand::ColorRead => COLOR_REPORT.to_vec(),
            ProfileCommand::UltrasonicMeasure => DISTANCE_REPORT.to_vec(),
            ProfileCommand::Step(_) => vec![],
            ProfileCommand::Mcu(McuAction::Version) => FIRMWARE_VERSION.as_bytes().to_vec(),
            ProfileCommand::Mcu(McuAction::Ram) => RAM_REPORT.to_vec(),
            ProfileCommand::Mcu(McuAction::Reset) => vec![],
        },
    };
    vec![ack, data(&payload)]
}

// ── Event recording ───────────────────────────────────────────

/// Keeps every event, unbounded.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LinkEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<LinkEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Poll until an event matching `pred` has been recorded.
    pub fn wait_for(&self, timeout: Duration, pred: impl Fn(&LinkEvent) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.events().iter().any(&pred) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &LinkEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

/// Short waits so timeout paths finish quickly.
pub fn test_config() -> LinkConfig {
    LinkConfig {
        ack_timeout_ms: 500,
        registration_timeout_ms: 500,
        completion_timeout_ms: 1000,
        read_buf_size: 32,
        ..LinkConfig::default()
    }
}

pub struct Harness {
    pub gateway: Gateway<PipeEnd>,
    pub device: MockDevice,
    pub events: Arc<RecordingSink>,
}

pub fn harness(script: Script) -> Harness {
    harness_with(&test_config(), script)
}

pub fn harness_with(config: &LinkConfig, script: Script) -> Harness {
    let (host, device_end) = link();
    let events = Arc::new(RecordingSink::default());
    let sink: Arc<dyn EventSink> = events.clone();
    let gateway = Gateway::start(host.clone(), host, config, sink).unwrap();
    Harness {
        gateway,
        device: MockDevice::spawn(device_end, script),
        events,
    }
}
