//! Update session state machine.
//!
//! [`UpdateSession`] is the per-attempt core: it owns header parsing, redirect
//! handling, body streaming into the firmware writer, completion detection,
//! and the close-path classification of the terminal outcome. The machine is
//! pure and synchronous; it never touches the network. The driver feeds it
//! connect/receive/close notifications and obeys the returned directives.
//!
//! One session value spans a whole redirect chain: a redirect detaches the
//! machine from the current connection ([`SessionState::Redirecting`]) and the
//! driver rebinds the same value to the next one. Every fatal condition
//! converges on [`UpdateSession::on_close`], which reports the outcome at most
//! once.

use bytes::{Buf, BytesMut};
use tracing::{debug, error, info, warn};

use super::outcome::{
    UpdateOutcome, MSG_CONNECT_FAILED, MSG_INVALID_STATUS, MSG_LENGTH_REQUIRED, MSG_NOT_MODIFIED,
    MSG_TOO_MANY_REDIRECTS, MSG_UPDATE_APPLIED, MSG_UPDATE_FAILED, RESULT_APPLIED,
    RESULT_CONNECT_FAILED, RESULT_FAILED, RESULT_NOT_MODIFIED,
};
use super::state::SessionState;
use crate::config::SessionOptions;
use crate::http::{parse_head, BodySize, HeadParse};
use crate::transport::TransportError;
use crate::writer::FirmwareWriter;

/// Redirect hops allowed within one session before it fails.
pub const MAX_REDIRECT_HOPS: u32 = 10;

/// What the driver must do after feeding a receive notification in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDirective {
    /// Nothing to do; keep pumping events.
    Continue,
    /// Tear the connection down now; the close notification completes the
    /// session.
    CloseNow,
    /// Drop the current connection and dial the session's new target URL.
    Redirect,
}

/// State machine for one update attempt.
pub struct UpdateSession {
    target_url: String,
    state: SessionState,
    /// Declared image size; `None` until the response head has been parsed.
    /// Set at most once.
    expected_size: Option<u64>,
    /// `0` unset, positive success, negative failure.
    result_code: i32,
    /// First recorded reason; later ones never overwrite it.
    status_message: Option<String>,
    reboot_required: bool,
    finalized: bool,
    released: bool,
    redirect_hops: u32,
    buffer: BytesMut,
    writer: Box<dyn FirmwareWriter>,
    options: SessionOptions,
}

impl UpdateSession {
    /// Create a session targeting `url`, streaming into `writer`.
    pub fn new(
        url: impl Into<String>,
        writer: Box<dyn FirmwareWriter>,
        options: SessionOptions,
    ) -> Self {
        Self {
            target_url: url.into(),
            state: SessionState::Connecting,
            expected_size: None,
            result_code: 0,
            status_message: None,
            reboot_required: true,
            finalized: false,
            released: false,
            redirect_hops: 0,
            buffer: BytesMut::new(),
            writer,
            options,
        }
    }

    /// Current target URL (replaced on each redirect).
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Per-attempt options carried into the writer.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Declared image size, once the head has been parsed.
    pub fn expected_size(&self) -> Option<u64> {
        self.expected_size
    }

    /// Redirects followed so far.
    pub fn redirect_hops(&self) -> u32 {
        self.redirect_hops
    }

    /// Feed the transport's connect outcome in.
    ///
    /// A connect error is only logged: no data will arrive, so the failure
    /// surfaces through the close notification.
    pub fn on_connect(&mut self, result: Result<(), TransportError>) {
        if self.state.is_detached() || self.state.is_terminal() {
            return;
        }
        match result {
            Ok(()) => {
                debug!(url = %self.target_url, "connected");
                self.state = SessionState::HeaderPending;
            }
            Err(error) => {
                error!(url = %self.target_url, %error, "connect error");
            }
        }
    }

    /// Feed a span of received bytes in.
    ///
    /// May be called repeatedly with partial data; the machine accumulates
    /// until a complete response head parses, then streams everything past the
    /// head into the writer.
    pub fn on_receive(&mut self, data: &[u8]) -> EventDirective {
        if self.state.is_detached() || self.state.is_terminal() {
            // Straggler from a superseded connection.
            return EventDirective::Continue;
        }
        self.buffer.extend_from_slice(data);

        if self.expected_size.is_none() {
            debug!(buffered = self.buffer.len(), "looking for response head");
            let head = match parse_head(&self.buffer) {
                HeadParse::Incomplete => return EventDirective::Continue,
                HeadParse::Complete(head) => head,
            };
            match head.status {
                200 => {
                    let size = match head.body_size {
                        BodySize::Known(size) => size,
                        BodySize::Unknown => {
                            error!("response has no usable content length");
                            self.note_status(MSG_LENGTH_REQUIRED);
                            return EventDirective::CloseNow;
                        }
                    };
                    debug!(size, "image size known");
                    self.expected_size = Some(size);
                    if let Err(error) = self.writer.begin(size) {
                        error!(%error, "writer rejected update start");
                        self.note_status(error.to_string());
                        return EventDirective::CloseNow;
                    }
                    // Exactly the head bytes are consumed; the rest is body.
                    self.buffer.advance(head.head_len);
                    self.state = SessionState::Streaming;
                }
                304 => {
                    info!(url = %self.target_url, "image not modified");
                    self.result_code = RESULT_NOT_MODIFIED;
                    self.reboot_required = false;
                    self.note_status(MSG_NOT_MODIFIED);
                    return EventDirective::CloseNow;
                }
                301 | 302 => {
                    if let Some(location) = head.location {
                        self.redirect_hops += 1;
                        if self.redirect_hops > MAX_REDIRECT_HOPS {
                            error!(hops = self.redirect_hops, "redirect limit exceeded");
                            self.note_status(MSG_TOO_MANY_REDIRECTS);
                            return EventDirective::CloseNow;
                        }
                        info!(status = head.status, location = %location, "following redirect");
                        self.target_url = location;
                        // Detached: the old connection's close is now a no-op.
                        self.state = SessionState::Redirecting;
                        return EventDirective::Redirect;
                    }
                    // A redirect without a Location is an invalid response.
                    self.fail_status(head.status);
                    return EventDirective::CloseNow;
                }
                status => {
                    self.fail_status(status);
                    return EventDirective::CloseNow;
                }
            }
        }

        if self.state == SessionState::Streaming {
            return self.drain_body();
        }
        EventDirective::Continue
    }

    /// Feed the close notification in.
    ///
    /// Returns the terminal outcome, or `None` when the close no longer
    /// concerns this session (detached by a redirect, or already reported).
    /// This is the single reporting point: every fatal condition converges
    /// here, and the outcome is produced at most once.
    pub fn on_close(&mut self) -> Option<UpdateOutcome> {
        if self.state.is_detached() || self.released {
            return None;
        }

        // The server may close right after the last byte, before another
        // receive notification could run the completion check.
        if self.writer.is_write_complete() {
            self.run_finalize();
        }

        let success = self.result_code > 0 || self.writer.is_update_finished();
        if !success {
            // Premature close, failed write, or unusable response.
            if self.status_message.is_none() {
                self.status_message = Some(MSG_UPDATE_FAILED.to_string());
            }
            if self.result_code == 0 {
                self.result_code = RESULT_FAILED;
            }
        }

        let outcome = UpdateOutcome {
            code: self.result_code,
            message: self.status_message.clone(),
            reboot: success && self.reboot_required && self.writer.is_reboot_required(),
        };
        if outcome.is_success() {
            info!(code = outcome.code, reboot = outcome.reboot, "update finished");
        } else {
            warn!(code = outcome.code, message = ?outcome.message, "update failed");
        }

        self.released = true;
        self.state = SessionState::Finished;
        Some(outcome)
    }

    /// Record that the connection attempt itself could not start.
    ///
    /// No connection exists, so no close notification will ever come; the
    /// session is released here instead.
    pub fn fail_connect(&mut self) -> UpdateOutcome {
        self.result_code = RESULT_CONNECT_FAILED;
        self.reboot_required = false;
        self.note_status(MSG_CONNECT_FAILED);
        self.released = true;
        self.state = SessionState::Finished;
        UpdateOutcome {
            code: self.result_code,
            message: self.status_message.clone(),
            reboot: false,
        }
    }

    /// Bind the session to its next connection after a redirect.
    pub fn rebind(&mut self) {
        self.buffer.clear();
        self.state = SessionState::Connecting;
    }

    /// Stream every buffered byte into the writer and check for completion.
    fn drain_body(&mut self) -> EventDirective {
        if !self.buffer.is_empty() {
            // The span is consumed up front: buffered bytes are never retried.
            let span = self.buffer.split();
            if let Err(error) = self.writer.write(&span) {
                error!(%error, "image write failed");
                self.note_status(error.to_string());
                return EventDirective::CloseNow;
            }
        }
        if self.writer.is_write_complete() {
            self.run_finalize();
            return EventDirective::CloseNow;
        }
        // More data still needed.
        EventDirective::Continue
    }

    /// Run the writer's finalize at most once per session.
    fn run_finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        match self.writer.finalize() {
            Ok(()) => {
                info!(bytes = self.writer.bytes_written(), "image accepted");
                self.result_code = RESULT_APPLIED;
                self.note_status(MSG_UPDATE_APPLIED);
            }
            Err(error) => {
                error!(%error, "image finalize failed");
                self.note_status(error.to_string());
            }
        }
    }

    /// Fail with a non-success HTTP status; the result magnitude is the
    /// status itself.
    fn fail_status(&mut self, status: u16) {
        warn!(status, "unexpected update response status");
        self.result_code = -i32::from(status);
        self.reboot_required = false;
        self.note_status(MSG_INVALID_STATUS);
    }

    /// Record a status reason; the first one observed wins.
    fn note_status(&mut self, message: impl Into<String>) {
        if self.status_message.is_none() {
            self.status_message = Some(message.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::tests::{FailOn, MockWriter, MockWriterHandle};

    const URL: &str = "http://a.example.com/fw.bin";

    fn session_with(writer: MockWriter) -> UpdateSession {
        UpdateSession::new(URL, Box::new(writer), SessionOptions::default())
    }

    fn connected() -> (UpdateSession, MockWriterHandle) {
        let (writer, handle) = MockWriter::new();
        let mut session = session_with(writer);
        session.on_connect(Ok(()));
        (session, handle)
    }

    fn response(status_line: &str, headers: &str, body: &[u8]) -> Vec<u8> {
        let mut raw = format!("HTTP/1.1 {status_line}\r\n{headers}\r\n").into_bytes();
        raw.extend_from_slice(body);
        raw
    }

    #[test]
    fn test_connect_success_enters_header_pending() {
        let (session, _) = connected();
        assert_eq!(session.state(), SessionState::HeaderPending);
    }

    #[test]
    fn test_connect_error_only_logs() {
        let (writer, _) = MockWriter::new();
        let mut session = session_with(writer);
        session.on_connect(Err(TransportError::Timeout));

        // Failure surfaces via the close notification.
        assert_eq!(session.state(), SessionState::Connecting);
        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_FAILED);
        assert_eq!(outcome.message.as_deref(), Some(MSG_UPDATE_FAILED));
        assert!(!outcome.reboot);
    }

    #[test]
    fn test_partial_head_waits_without_consuming() {
        let (mut session, handle) = connected();

        let raw = response("200 OK", "Content-Length: 4\r\n", b"BODY");
        let (first, rest) = raw.split_at(10);

        assert_eq!(session.on_receive(first), EventDirective::Continue);
        assert_eq!(session.state(), SessionState::HeaderPending);
        assert_eq!(session.expected_size(), None);
        assert!(handle.lock().unwrap().chunks.is_empty());

        assert_eq!(session.on_receive(rest), EventDirective::CloseNow);
        let state = handle.lock().unwrap();
        assert_eq!(state.expected, Some(4));
        assert_eq!(state.chunks, vec![b"BODY".to_vec()]);
        assert_eq!(state.finalize_calls, 1);
    }

    #[test]
    fn test_body_split_across_notifications() {
        let (mut session, handle) = connected();

        let head = response("200 OK", "Content-Length: 1024\r\n", &[]);
        assert_eq!(session.on_receive(&head), EventDirective::Continue);
        assert_eq!(session.state(), SessionState::Streaming);
        assert_eq!(session.expected_size(), Some(1024));

        assert_eq!(session.on_receive(&[0xAA; 600]), EventDirective::Continue);
        assert_eq!(session.on_receive(&[0xBB; 424]), EventDirective::CloseNow);

        {
            let state = handle.lock().unwrap();
            assert_eq!(state.chunks.len(), 2);
            assert_eq!(state.written, 1024);
            assert_eq!(state.finalize_calls, 1);
            assert!(state.finished);
        }

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_APPLIED);
        assert_eq!(outcome.message.as_deref(), Some(MSG_UPDATE_APPLIED));
        assert!(outcome.reboot);
    }

    #[test]
    fn test_zero_length_image_finalizes_immediately() {
        let (mut session, handle) = connected();

        let head = response("200 OK", "Content-Length: 0\r\n", &[]);
        assert_eq!(session.on_receive(&head), EventDirective::CloseNow);

        let state = handle.lock().unwrap();
        assert!(state.chunks.is_empty());
        assert_eq!(state.written, 0);
        assert_eq!(state.finalize_calls, 1);
        drop(state);

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_APPLIED);
    }

    #[test]
    fn test_not_modified_ignores_body_bytes() {
        let (mut session, handle) = connected();

        let raw = response("304 Not Modified", "Content-Length: 5\r\n", b"stale");
        assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_NOT_MODIFIED);
        assert_eq!(outcome.message.as_deref(), Some(MSG_NOT_MODIFIED));
        assert!(!outcome.reboot);
        // The writer is never involved.
        let state = handle.lock().unwrap();
        assert_eq!(state.expected, None);
        assert!(state.chunks.is_empty());
        assert_eq!(state.finalize_calls, 0);
    }

    #[test]
    fn test_error_status_negates_code() {
        for status in [404u16, 500, 403] {
            let (mut session, _) = connected();
            let raw = response(&format!("{status} Nope"), "Content-Length: 2\r\n", b"no");
            assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);

            let outcome = session.on_close().unwrap();
            assert_eq!(outcome.code, -i32::from(status));
            assert_eq!(outcome.message.as_deref(), Some(MSG_INVALID_STATUS));
            assert!(!outcome.reboot);
        }
    }

    #[test]
    fn test_unknown_length_never_reaches_writer() {
        let (mut session, handle) = connected();

        // Chunked transfer: no usable length, and the buffered bytes must not
        // be consumed as body.
        let raw = response(
            "200 OK",
            "Transfer-Encoding: chunked\r\n",
            b"4\r\nbody\r\n0\r\n\r\n",
        );
        assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);

        let state = handle.lock().unwrap();
        assert_eq!(state.expected, None);
        assert!(state.chunks.is_empty());
        drop(state);

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_FAILED);
        assert_eq!(outcome.message.as_deref(), Some(MSG_LENGTH_REQUIRED));
    }

    #[test]
    fn test_redirect_rebinds_same_session() {
        let (mut session, handle) = connected();

        let raw = response("302 Found", "Location: http://b.example.com/fw.bin\r\n", &[]);
        assert_eq!(session.on_receive(&raw), EventDirective::Redirect);
        assert_eq!(session.target_url(), "http://b.example.com/fw.bin");
        assert_eq!(session.state(), SessionState::Redirecting);
        assert_eq!(session.redirect_hops(), 1);

        // The old connection's close is a no-op.
        assert_eq!(session.on_close(), None);

        // Same session value proceeds against the new target.
        session.rebind();
        session.on_connect(Ok(()));
        let raw = response("200 OK", "Content-Length: 2\r\n", b"ok");
        assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_APPLIED);
        assert_eq!(handle.lock().unwrap().finalize_calls, 1);

        // Exactly one finish across the whole chain.
        assert_eq!(session.on_close(), None);
    }

    #[test]
    fn test_notifications_after_detach_are_ignored() {
        let (mut session, handle) = connected();

        let raw = response("301 Moved", "Location: http://b.example.com/fw.bin\r\n", &[]);
        assert_eq!(session.on_receive(&raw), EventDirective::Redirect);

        // Stragglers from the superseded connection must not mutate anything.
        assert_eq!(
            session.on_receive(b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\nX"),
            EventDirective::Continue
        );
        assert_eq!(session.on_close(), None);

        assert_eq!(session.state(), SessionState::Redirecting);
        assert_eq!(session.target_url(), "http://b.example.com/fw.bin");
        assert_eq!(session.expected_size(), None);
        assert!(handle.lock().unwrap().chunks.is_empty());
    }

    #[test]
    fn test_redirect_without_location_is_invalid_status() {
        let (mut session, _) = connected();

        let raw = response("301 Moved", "", &[]);
        assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, -301);
        assert_eq!(outcome.message.as_deref(), Some(MSG_INVALID_STATUS));
    }

    #[test]
    fn test_redirect_limit() {
        let (mut session, _) = connected();

        for hop in 0..MAX_REDIRECT_HOPS {
            let raw = response(
                "302 Found",
                &format!("Location: http://h{hop}.example.com/fw.bin\r\n"),
                &[],
            );
            assert_eq!(session.on_receive(&raw), EventDirective::Redirect);
            session.rebind();
            session.on_connect(Ok(()));
        }

        let raw = response("302 Found", "Location: http://last.example.com/fw.bin\r\n", &[]);
        assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_FAILED);
        assert_eq!(outcome.message.as_deref(), Some(MSG_TOO_MANY_REDIRECTS));
    }

    #[test]
    fn test_premature_close_is_failure() {
        let (mut session, _) = connected();

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_FAILED);
        assert_eq!(outcome.message.as_deref(), Some(MSG_UPDATE_FAILED));
        assert!(!outcome.reboot);
    }

    #[test]
    fn test_close_mid_body_is_failure() {
        let (mut session, handle) = connected();

        let raw = response("200 OK", "Content-Length: 1000\r\n", &[0xCC; 400]);
        assert_eq!(session.on_receive(&raw), EventDirective::Continue);

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_FAILED);
        assert_eq!(outcome.message.as_deref(), Some(MSG_UPDATE_FAILED));
        assert_eq!(handle.lock().unwrap().finalize_calls, 0);
    }

    #[test]
    fn test_close_runs_pending_finalize() {
        let (mut session, handle) = connected();

        let raw = response("200 OK", "Content-Length: 1000\r\n", &[0xCC; 400]);
        assert_eq!(session.on_receive(&raw), EventDirective::Continue);

        // The writer decides out of band that the image is complete (e.g. a
        // manifest-driven writer); the server closes before another receive.
        handle.lock().unwrap().force_complete = true;
        let outcome = session.on_close().unwrap();

        assert_eq!(outcome.code, RESULT_APPLIED);
        assert!(outcome.reboot);
        assert_eq!(handle.lock().unwrap().finalize_calls, 1);
    }

    #[test]
    fn test_write_error_fails_via_close_path() {
        let (writer, handle) = MockWriter::with_failure(FailOn::Write);
        let mut session = session_with(writer);
        session.on_connect(Ok(()));

        let raw = response("200 OK", "Content-Length: 4\r\n", b"BODY");
        assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_FAILED);
        assert_eq!(
            outcome.message.as_deref(),
            Some("image I/O failed: mock writer failure")
        );
        assert_eq!(handle.lock().unwrap().finalize_calls, 0);
    }

    #[test]
    fn test_begin_error_fails_via_close_path() {
        let (writer, handle) = MockWriter::with_failure(FailOn::Begin);
        let mut session = session_with(writer);
        session.on_connect(Ok(()));

        let raw = response("200 OK", "Content-Length: 4\r\n", b"BODY");
        assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);

        // The body bytes were never consumed as body.
        assert!(handle.lock().unwrap().chunks.is_empty());
        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_FAILED);
        assert_eq!(
            outcome.message.as_deref(),
            Some("image I/O failed: mock writer failure")
        );
    }

    #[test]
    fn test_finalize_error_is_not_retried_on_close() {
        let (writer, handle) = MockWriter::with_failure(FailOn::Finalize);
        let mut session = session_with(writer);
        session.on_connect(Ok(()));

        let raw = response("200 OK", "Content-Length: 4\r\n", b"BODY");
        assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);
        assert_eq!(handle.lock().unwrap().finalize_calls, 1);

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_FAILED);
        assert_eq!(
            outcome.message.as_deref(),
            Some("image I/O failed: mock writer failure")
        );
        // Still exactly one finalize attempt.
        assert_eq!(handle.lock().unwrap().finalize_calls, 1);
    }

    #[test]
    fn test_first_status_message_wins() {
        let (mut session, _) = connected();

        let raw = response("200 OK", "", &[]);
        assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);

        // The close path must not overwrite the earlier, more specific reason.
        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.message.as_deref(), Some(MSG_LENGTH_REQUIRED));
    }

    #[test]
    fn test_success_without_reboot_requirement() {
        let (writer, _) = MockWriter::no_reboot();
        let mut session = session_with(writer);
        session.on_connect(Ok(()));

        let raw = response("200 OK", "Content-Length: 2\r\n", b"ok");
        assert_eq!(session.on_receive(&raw), EventDirective::CloseNow);

        let outcome = session.on_close().unwrap();
        assert_eq!(outcome.code, RESULT_APPLIED);
        assert!(!outcome.reboot);
    }

    #[test]
    fn test_fail_connect_releases_immediately() {
        let (writer, _) = MockWriter::new();
        let mut session = session_with(writer);

        let outcome = session.fail_connect();
        assert_eq!(outcome.code, RESULT_CONNECT_FAILED);
        assert_eq!(outcome.message.as_deref(), Some(MSG_CONNECT_FAILED));
        assert!(!outcome.reboot);

        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(session.on_close(), None);
    }

    #[test]
    fn test_close_reports_at_most_once() {
        let (mut session, _) = connected();

        let raw = response("200 OK", "Content-Length: 2\r\n", b"ok");
        session.on_receive(&raw);

        assert!(session.on_close().is_some());
        assert_eq!(session.on_close(), None);
        assert_eq!(session.on_close(), None);
    }

    mod chunking {
        use super::*;
        use proptest::prelude::*;

        const BODY_LEN: usize = 200;

        fn full_response() -> Vec<u8> {
            let body: Vec<u8> = (0..BODY_LEN).map(|i| (i % 251) as u8).collect();
            response("200 OK", &format!("Content-Length: {BODY_LEN}\r\n"), &body)
        }

        fn response_len() -> usize {
            full_response().len()
        }

        proptest! {
            /// Any partition of the response into receive notifications
            /// writes the same body bytes and finalizes exactly once.
            #[test]
            fn test_chunking_is_invariant(
                cuts in prop::collection::btree_set(1..response_len(), 0..8)
            ) {
                let raw = full_response();
                let (writer, handle) = MockWriter::new();
                let mut session = session_with(writer);
                session.on_connect(Ok(()));

                let mut start = 0;
                let mut last = EventDirective::Continue;
                for cut in cuts.iter().copied().chain(std::iter::once(raw.len())) {
                    last = session.on_receive(&raw[start..cut]);
                    start = cut;
                }

                prop_assert_eq!(last, EventDirective::CloseNow);
                {
                    let state = handle.lock().unwrap();
                    prop_assert_eq!(state.written, BODY_LEN as u64);
                    let streamed: Vec<u8> = state.chunks.concat();
                    prop_assert_eq!(streamed, raw[raw.len() - BODY_LEN..].to_vec());
                    prop_assert_eq!(state.finalize_calls, 1);
                }

                let outcome = session.on_close().unwrap();
                prop_assert_eq!(outcome.code, RESULT_APPLIED);
            }
        }
    }
}
