//! Threaded runtime wiring the engine to its transports (`std` only).
//!
//! Two long-lived workers cooperate over a bounded channel of pre-encoded
//! frames:
//!
//! - the **sender** drains the channel and performs the two-phase
//!   prepare/write send against whichever transport the current
//!   [`NetMode`] selects;
//! - the **receiver** blocks on the active transport for one framed
//!   packet, dispatches it through the shared [`Engine`] (which may queue
//!   acknowledgments back onto the channel), then sleeps a fixed interval
//!   before polling again.
//!
//! Send failures are never retried and never surfaced to the caller that
//! queued the frame; they are only logged. Both workers honor an explicit
//! shutdown signal so the runtime can be torn down deterministically.

use crate::engine::{Driver, Engine, FrameSink, QUEUE_DEPTH};
use crate::error::Error;
use crate::packet::{ConnectParams, Frame, MAX_FRAME_SIZE, QoS};
use crate::transport::{LinkState, ModeSource, NetMode, Transport};
use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

impl FrameSink for SyncSender<Frame> {
    fn push(&mut self, frame: Frame) -> Result<(), Error> {
        self.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => Error::QueueFull,
            TrySendError::Disconnected(_) => Error::NotConnected,
        })
    }
}

/// Timing knobs for the two workers.
///
/// The defaults suit a real link: a one second receive bound, one second
/// between dispatch iterations and a 200 ms queue poll. Tests shrink them
/// for fast teardown.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Upper bound passed to [`Transport::receive`].
    pub receive_timeout: Duration,
    /// Sleep between receiver iterations, regardless of outcome.
    pub dispatch_interval: Duration,
    /// How often the sender re-checks the shutdown flag while the queue
    /// is idle.
    pub queue_poll: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_secs(1),
            dispatch_interval: Duration::from_secs(1),
            queue_poll: Duration::from_millis(200),
        }
    }
}

/// Engine plus its two worker threads.
///
/// Application operations lock the shared engine, so attach/detach are
/// serialized against the receiver's dispatch.
#[derive(Debug)]
pub struct Runtime<D, W, C, M>
where
    D: Driver + Send + 'static,
    W: Transport + Send + 'static,
    C: Transport + Send + 'static,
    M: ModeSource + Send + Sync + 'static,
{
    engine: Arc<Mutex<Engine<D, SyncSender<Frame>>>>,
    wifi: Arc<Mutex<W>>,
    cellular: Arc<Mutex<C>>,
    mode: Arc<M>,
    link: Arc<LinkState>,
    shutdown: Arc<AtomicBool>,
    sender: Option<JoinHandle<()>>,
    receiver: Option<JoinHandle<()>>,
}

impl<D, W, C, M> Runtime<D, W, C, M>
where
    D: Driver + Send + 'static,
    W: Transport + Send + 'static,
    C: Transport + Send + 'static,
    M: ModeSource + Send + Sync + 'static,
{
    /// Spawn the sender and receiver workers around a fresh engine.
    pub fn start(wifi: W, cellular: C, mode: M, config: RuntimeConfig) -> Self {
        let (tx, rx) = mpsc::sync_channel::<Frame>(QUEUE_DEPTH);
        let engine = Arc::new(Mutex::new(Engine::new(tx)));
        let wifi = Arc::new(Mutex::new(wifi));
        let cellular = Arc::new(Mutex::new(cellular));
        let mode = Arc::new(mode);
        let link = Arc::new(LinkState::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let sender = {
            let wifi = Arc::clone(&wifi);
            let cellular = Arc::clone(&cellular);
            let mode = Arc::clone(&mode);
            let link = Arc::clone(&link);
            let shutdown = Arc::clone(&shutdown);
            let poll = config.queue_poll;
            thread::spawn(move || sender_loop(rx, wifi, cellular, mode, link, shutdown, poll))
        };

        let receiver = {
            let engine = Arc::clone(&engine);
            let wifi = Arc::clone(&wifi);
            let cellular = Arc::clone(&cellular);
            let mode = Arc::clone(&mode);
            let shutdown = Arc::clone(&shutdown);
            let config = config.clone();
            thread::spawn(move || receiver_loop(engine, wifi, cellular, mode, shutdown, config))
        };

        Self {
            engine,
            wifi,
            cellular,
            mode,
            link,
            shutdown,
            sender: Some(sender),
            receiver: Some(receiver),
        }
    }

    fn engine_mut(&self) -> MutexGuard<'_, Engine<D, SyncSender<Frame>>> {
        lock_or_recover(&self.engine)
    }

    /// Attach a driver; replaces any previously attached one.
    pub fn attach(&self, driver: D) {
        self.engine_mut().attach(driver);
    }

    /// Detach the driver; all event slots become no-ops.
    pub fn detach(&self) {
        self.engine_mut().detach();
    }

    /// Open the broker TCP connection on the currently selected transport.
    pub fn connect_server(&self, link_id: u8, host: &str, port: u16) -> Result<(), Error> {
        match self.mode.net_mode() {
            NetMode::Wifi => lock_or_recover(&self.wifi).connect(link_id, host, port),
            NetMode::Cellular => lock_or_recover(&self.cellular).connect(link_id, host, port),
        }
    }

    /// Queue a CONNECT packet.
    pub fn connect(&self, params: &ConnectParams<'_>) -> Result<(), Error> {
        self.engine_mut().connect(params)
    }

    /// Queue a PUBLISH packet, returning the identifier used when `qos`
    /// is above at-most-once.
    pub fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        dup: bool,
        qos: QoS,
        retain: bool,
    ) -> Result<Option<u16>, Error> {
        self.engine_mut().publish(topic, payload, dup, qos, retain)
    }

    /// Queue a SUBSCRIBE packet, returning the identifier used.
    pub fn subscribe(&self, topic: &str, qos: QoS) -> Result<u16, Error> {
        self.engine_mut().subscribe(topic, qos)
    }

    /// Queue an UNSUBSCRIBE packet, returning the identifier used.
    pub fn unsubscribe(&self, topic: &str) -> Result<u16, Error> {
        self.engine_mut().unsubscribe(topic)
    }

    /// Queue a PUBREL packet completing an outbound QoS 2 exchange.
    pub fn pubrel(&self, id: u16) -> Result<(), Error> {
        self.engine_mut().pubrel(id)
    }

    /// Queue a PINGREQ packet.
    pub fn pingreq(&self) -> Result<(), Error> {
        self.engine_mut().pingreq()
    }

    /// Queue a DISCONNECT packet.
    pub fn disconnect(&self) -> Result<(), Error> {
        self.engine_mut().disconnect()
    }

    /// Record that the transport reported its link up.
    pub fn notify_link_up(&self, id: u8) {
        self.link.notify_link_up(id);
    }

    /// Record that the transport reported its link down.
    pub fn notify_link_down(&self) {
        self.link.notify_link_down();
    }

    /// Signal both workers and join them.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.shutdown.swap(true, Ordering::Relaxed) {
            return;
        }
        if let Some(handle) = self.sender.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.receiver.take() {
            let _ = handle.join();
        }
    }
}

impl<D, W, C, M> Drop for Runtime<D, W, C, M>
where
    D: Driver + Send + 'static,
    W: Transport + Send + 'static,
    C: Transport + Send + 'static,
    M: ModeSource + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

/// Shared, atomically switchable mode selector for devices that change
/// network backends at runtime.
#[derive(Debug, Clone, Default)]
pub struct ModeSwitch {
    cellular: Arc<AtomicBool>,
}

impl ModeSwitch {
    /// A selector starting in the given mode.
    pub fn new(mode: NetMode) -> Self {
        Self {
            cellular: Arc::new(AtomicBool::new(mode == NetMode::Cellular)),
        }
    }

    /// Switch the mode. Callers must not switch while a frame is in
    /// flight; the engine does not defend against it.
    pub fn set(&self, mode: NetMode) {
        self.cellular
            .store(mode == NetMode::Cellular, Ordering::Relaxed);
    }
}

impl ModeSource for ModeSwitch {
    fn net_mode(&self) -> NetMode {
        if self.cellular.load(Ordering::Relaxed) {
            NetMode::Cellular
        } else {
            NetMode::Wifi
        }
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn sender_loop<W, C, M>(
    rx: Receiver<Frame>,
    wifi: Arc<Mutex<W>>,
    cellular: Arc<Mutex<C>>,
    mode: Arc<M>,
    link: Arc<LinkState>,
    shutdown: Arc<AtomicBool>,
    poll: Duration,
) where
    W: Transport,
    C: Transport,
    M: ModeSource,
{
    while !shutdown.load(Ordering::Relaxed) {
        match rx.recv_timeout(poll) {
            Ok(frame) => transmit(&frame, mode.net_mode(), &wifi, &cellular, &link),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn transmit<W, C>(
    frame: &Frame,
    mode: NetMode,
    wifi: &Mutex<W>,
    cellular: &Mutex<C>,
    link: &LinkState,
) where
    W: Transport,
    C: Transport,
{
    let Some(link_id) = link.active() else {
        warn!("dropping {} byte frame: no active link", frame.len());
        return;
    };
    let result = match mode {
        NetMode::Wifi => send_on(&mut *lock_or_recover(wifi), link_id, frame),
        NetMode::Cellular => send_on(&mut *lock_or_recover(cellular), link_id, frame),
    };
    if let Err(err) = result {
        warn!("transmit of {} bytes failed: {:?}", frame.len(), err);
    }
}

fn send_on<T: Transport>(transport: &mut T, link_id: u8, frame: &Frame) -> Result<(), Error> {
    transport.prepare_send(link_id, frame.len())?;
    transport.write(frame.as_bytes())
}

fn receiver_loop<D, W, C, M>(
    engine: Arc<Mutex<Engine<D, SyncSender<Frame>>>>,
    wifi: Arc<Mutex<W>>,
    cellular: Arc<Mutex<C>>,
    mode: Arc<M>,
    shutdown: Arc<AtomicBool>,
    config: RuntimeConfig,
) where
    D: Driver,
    W: Transport,
    C: Transport,
    M: ModeSource,
{
    let mut buf = [0u8; MAX_FRAME_SIZE];
    while !shutdown.load(Ordering::Relaxed) {
        let received = match mode.net_mode() {
            NetMode::Wifi => lock_or_recover(&wifi).receive(&mut buf, config.receive_timeout),
            NetMode::Cellular => {
                lock_or_recover(&cellular).receive(&mut buf, config.receive_timeout)
            }
        };
        match received {
            Ok((_link_id, len)) => {
                // malformed frames are logged and dropped, never fatal here
                if let Err(err) = lock_or_recover(&engine).dispatch(&buf[..len]) {
                    warn!("dropping inbound frame: {:?}", err);
                }
            }
            Err(Error::Timeout) => {}
            Err(err) => warn!("receive failed: {:?}", err),
        }
        thread::sleep(config.dispatch_interval);
    }
}
