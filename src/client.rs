//! Client session driver: the request/response cadence against one meter.
//!
//! One `MeterClient` owns the serial link, the frame receiver, and the
//! reading history for a single slave address. The caller polls it from
//! a cooperative loop at sub-second intervals; each poll sends the
//! periodic read request when one is due, then drains whatever response
//! bytes have arrived. Nothing in here is fatal: bad checksums, slave
//! exceptions, and receive stalls all heal on the next request cycle.

use std::time::{Duration, Instant};

use crate::buffer::{DEFAULT_CAPACITY, RecordRing};
use crate::error::Result;
use crate::pdu::ReadRequest;
use crate::receiver::{FrameReceiver, RxEvent};
use crate::registers::{
    POWER_REGISTER_COUNT, POWER_REGISTER_START, PROBE_REGISTER_COUNT, PROBE_REGISTER_START,
    PowerRecord,
};
use crate::transport::Wire;

/// Interval between periodic read requests.
pub const SEND_PERIOD: Duration = Duration::from_secs(1);

/// Factory default slave address of the JSY-MK-194T.
pub const DEFAULT_METER_ADDRESS: u8 = 0x01;

pub struct MeterClient<W: Wire> {
    wire: W,
    address: u8,
    receiver: FrameReceiver,
    history: RecordRing,
    last_send: Option<Instant>,
    epoch: Instant,
}

impl<W: Wire> MeterClient<W> {
    pub fn new(wire: W, address: u8) -> Self {
        Self::with_capacity(wire, address, DEFAULT_CAPACITY)
    }

    /// Builds a client keeping `capacity` readings of history.
    pub fn with_capacity(wire: W, address: u8, capacity: usize) -> Self {
        Self {
            wire,
            address,
            receiver: FrameReceiver::new(),
            history: RecordRing::new(capacity),
            last_send: None,
            epoch: Instant::now(),
        }
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// One-time startup: probes the identity/model registers.
    ///
    /// The probe response comes back through the normal receive path but
    /// never matches the measurement-block length, so the decoder drops
    /// it. It confirms on the wire that a slave is present; nothing is
    /// read out of it.
    pub async fn init(&mut self) -> Result<()> {
        let probe = ReadRequest::new(self.address, PROBE_REGISTER_START, PROBE_REGISTER_COUNT);
        tracing::debug!(address = self.address, "sending identity probe");
        self.wire.send(&probe.serialize()).await?;
        self.last_send = Some(Instant::now());
        Ok(())
    }

    /// One cooperative poll step: send the periodic request if due,
    /// then drain received bytes. Call at sub-second intervals.
    pub async fn poll(&mut self) -> Result<()> {
        self.poll_at(Instant::now()).await
    }

    async fn poll_at(&mut self, now: Instant) -> Result<()> {
        if self
            .last_send
            .is_none_or(|sent| now.duration_since(sent) > SEND_PERIOD)
        {
            let request =
                ReadRequest::new(self.address, POWER_REGISTER_START, POWER_REGISTER_COUNT);
            self.wire.send(&request.serialize()).await?;
            self.last_send = Some(now);
        }

        // Response bytes from an earlier request may still be arriving,
        // so the drain runs whether or not we just sent.
        self.drain(now).await?;
        self.receiver.check_timeout(now);
        Ok(())
    }

    async fn drain(&mut self, now: Instant) -> Result<()> {
        let mut byte = [0u8; 1];
        while !self.receiver.is_full() {
            let n = self.wire.recv(&mut byte).await?;
            if n == 0 {
                break;
            }
            match self.receiver.feed(byte[0], now) {
                None => {}
                Some(RxEvent::Frame(frame)) => self.dispatch(&frame, now),
                // Logged by the receiver; the periodic cycle re-polls.
                Some(RxEvent::Exception { .. }) => {}
                // A bad checksum ends this call's drain; whatever bytes
                // are still buffered wait for the next poll.
                Some(RxEvent::BadCrc) => break,
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, frame: &[u8], now: Instant) {
        let timestamp_us = now.duration_since(self.epoch).as_micros() as u64;
        if let Some(record) = PowerRecord::decode(frame, timestamp_us) {
            tracing::trace!(index = self.history.next_index(), "decoded meter reading");
            self.history.write(record);
        }
    }

    /// The most recent decoded reading, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&PowerRecord> {
        self.history.latest()
    }

    #[must_use]
    pub fn history(&self) -> &RecordRing {
        &self.history
    }

    /// How long ago `record` was decoded.
    #[must_use]
    pub fn age_of(&self, record: &PowerRecord) -> Duration {
        let now_us = self.epoch.elapsed().as_micros() as u64;
        Duration::from_micros(now_us.saturating_sub(record.timestamp_us))
    }
}
