//! # mqlink - embedded MQTT protocol engine
//!
//! The client-side engine of a lightweight publish/subscribe protocol
//! (MQTT 3.1.1) for resource-constrained control devices. The crate covers
//! the protocol core only: wire-format encoding and decoding, the
//! packet-identifier handshakes behind QoS 1 and QoS 2 delivery, the
//! dispatch of inbound frames to handlers, and the bounded-queue
//! producer/consumer structure that moves frames to and from a transport.
//!
//! Transport backends (WiFi or cellular modem command interfaces), their
//! connection management and board bring-up live outside this crate and
//! plug in through the narrow [`transport::Transport`] contract.
//!
//! ## Architecture
//!
//! - [`codec`]: remaining-length varint and bounds-checked byte cursors
//! - [`packet`]: frame buffer, packet builders and parsers
//! - [`engine`]: driver registry, outbound queue, dispatch and QoS
//!   handshake logic
//! - [`transport`]: the transport contract and network-mode selection
//! - [`runtime`]: threaded sender/receiver workers (`std` feature)
//!
//! ## Usage
//!
//! The core is `no_std` and allocation-free; a polling application drives
//! an [`engine::Engine`] over an in-memory [`engine::FrameQueue`]:
//!
//! ```rust
//! use mqlink::engine::{Driver, Engine, FrameQueue};
//! use mqlink::packet::{ConnectParams, QoS};
//!
//! struct App;
//! impl Driver for App {
//!     fn publish(&mut self, topic: &str, payload: &[u8]) {
//!         let _ = (topic, payload);
//!     }
//! }
//!
//! let mut engine = Engine::new(FrameQueue::new());
//! engine.attach(App);
//! engine
//!     .connect(&ConnectParams {
//!         client_id: Some("control-unit-7"),
//!         clean_session: true,
//!         keep_alive_seconds: 60,
//!         ..Default::default()
//!     })
//!     .unwrap();
//! engine.subscribe("cmd/unit7", QoS::AtLeastOnce).unwrap();
//!
//! // hand queued frames to the transport
//! while let Some(frame) = engine.outbound_mut().pop() {
//!     let _bytes = frame.as_bytes();
//! }
//! ```
//!
//! With the `std` feature, [`runtime::Runtime`] runs the same engine
//! behind two worker threads and a bounded channel, selecting the active
//! transport per operation from the current network mode.
//!
//! ## Delivery semantics
//!
//! Inbound QoS 1 publishes are acknowledged with PUBACK and QoS 2
//! publishes with PUBREC automatically; an inbound PUBREL is answered
//! with PUBCOMP before the application is notified. On the publisher
//! side the engine deliberately does **not** answer PUBREC with an
//! automatic PUBREL: the application completes that handshake through
//! [`engine::Engine::pubrel`]. No retransmission timers exist at this
//! layer.
//!
//! ## Optional features
//!
//! - `std`: the threaded runtime and `log`-based tracing
//! - `defmt`: defmt formatting for error types on embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod codec;
pub mod engine;
pub mod error;
pub mod packet;

#[cfg(feature = "std")]
pub mod runtime;

pub mod transport;
