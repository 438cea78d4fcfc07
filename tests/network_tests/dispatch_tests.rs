//! Tests for Dispatcher and InboundMessage
//!
//! These tests verify:
//! - Handlers run in registration order
//! - Closures and trait objects both work as handlers
//! - Text decoding of payloads
//! - Dispatch from several threads at once

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use consolerelay::network::{Dispatcher, InboundMessage, MessageHandler};
use parking_lot::Mutex;

// =============================================================================
// Helper Functions
// =============================================================================

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

fn message(payload: &'static [u8]) -> InboundMessage {
    InboundMessage::new(peer(), Bytes::from_static(payload))
}

struct CountingHandler {
    count: AtomicUsize,
}

impl MessageHandler for CountingHandler {
    fn on_message(&self, _message: &InboundMessage) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// InboundMessage Tests
// =============================================================================

#[test]
fn test_text_decodes_utf8() {
    let msg = message("say héllo\n".as_bytes());
    assert_eq!(msg.text(), "say héllo\n");
}

#[test]
fn test_text_replaces_invalid_utf8() {
    let msg = message(b"ab\xffcd");
    assert_eq!(msg.text(), "ab\u{FFFD}cd");
    assert_eq!(&msg.payload[..], b"ab\xffcd");
}

// =============================================================================
// Dispatcher Tests
// =============================================================================

#[test]
fn test_empty_dispatcher_is_noop() {
    let dispatcher = Dispatcher::new();

    assert!(dispatcher.is_empty());
    dispatcher.dispatch(&message(b"ignored"));
}

#[test]
fn test_handlers_called_in_registration_order() {
    let dispatcher = Dispatcher::new();
    let calls = Arc::new(Mutex::new(Vec::new()));

    for name in ["first", "second", "third"] {
        let calls = Arc::clone(&calls);
        dispatcher.register(Arc::new(move |_: &InboundMessage| calls.lock().push(name)));
    }

    dispatcher.dispatch(&message(b"x"));

    assert_eq!(dispatcher.len(), 3);
    assert_eq!(*calls.lock(), vec!["first", "second", "third"]);
}

#[test]
fn test_every_handler_sees_full_payload() {
    let dispatcher = Dispatcher::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..2 {
        let seen = Arc::clone(&seen);
        dispatcher.register(Arc::new(move |m: &InboundMessage| seen.lock().push(m.payload.clone())));
    }

    dispatcher.dispatch(&message(b"whitelist add steve\n"));

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|p| &p[..] == b"whitelist add steve\n"));
}

#[test]
fn test_trait_object_handler() {
    let dispatcher = Dispatcher::new();
    let handler = Arc::new(CountingHandler {
        count: AtomicUsize::new(0),
    });
    dispatcher.register(handler.clone());

    dispatcher.dispatch(&message(b"a"));
    dispatcher.dispatch(&message(b"b"));

    assert_eq!(handler.count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_handler_can_register_another() {
    let dispatcher = Arc::new(Dispatcher::new());
    let inner_calls = Arc::new(AtomicUsize::new(0));

    {
        let dispatcher_ref = Arc::clone(&dispatcher);
        let inner_calls = Arc::clone(&inner_calls);
        dispatcher.register(Arc::new(move |_: &InboundMessage| {
            let inner_calls = Arc::clone(&inner_calls);
            dispatcher_ref.register(Arc::new(move |_: &InboundMessage| {
                inner_calls.fetch_add(1, Ordering::SeqCst);
            }));
        }));
    }

    dispatcher.dispatch(&message(b"one"));
    assert_eq!(dispatcher.len(), 2);
    assert_eq!(inner_calls.load(Ordering::SeqCst), 0);

    dispatcher.dispatch(&message(b"two"));
    assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_dispatch() {
    let dispatcher = Arc::new(Dispatcher::new());
    let handler = Arc::new(CountingHandler {
        count: AtomicUsize::new(0),
    });
    dispatcher.register(handler.clone());

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                for _ in 0..100 {
                    dispatcher.dispatch(&message(b"tick"));
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(handler.count.load(Ordering::SeqCst), 800);
}
