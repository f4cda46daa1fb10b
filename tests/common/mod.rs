//! Simulated HC-SR04 wiring. All fakes share one simulated microsecond clock;
//! the echo line answers relative to the last trigger pulse.
//!
//! Delays and edge waits are [`Alarm`]s on that clock. When several are
//! pending at once (an edge raced against a timeout), the earliest one fires
//! and moves the clock, so a timeout beats an edge that comes later.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    convert::Infallible,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use embedded_hal_async::{delay::DelayNs, digital::Wait};

/// How the simulated sensor answers a trigger.
#[derive(Debug, Clone, Copy)]
pub enum Echo {
    /// Never raises the echo line.
    Silent,
    /// Raises the echo `delay_us` after the trigger falls, for `width_us`.
    Pulse { delay_us: u64, width_us: u64 },
    /// Raises the echo and never lowers it.
    StuckHigh { delay_us: u64 },
}

#[derive(Clone)]
pub struct Bench {
    now: Rc<Cell<u64>>,
    edges: Rc<RefCell<Vec<(u64, bool)>>>,
    echo: Rc<Cell<Echo>>,
    tail_until: Rc<Cell<Option<u64>>>,
    alarms: Rc<RefCell<Vec<u64>>>,
}

impl Bench {
    pub fn new(echo: Echo) -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            edges: Rc::new(RefCell::new(Vec::new())),
            echo: Rc::new(Cell::new(echo)),
            tail_until: Rc::new(Cell::new(None)),
            alarms: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Keep the echo line high until the absolute time `until`, the tail of a
    /// pulse that started before anything was triggered.
    pub fn with_tail(self, until: u64) -> Self {
        self.set_tail(until);
        self
    }

    pub fn set_tail(&self, until: u64) {
        self.tail_until.set(Some(until));
    }

    pub fn now(&self) -> u64 {
        self.now.get()
    }

    pub fn set_echo(&self, echo: Echo) {
        self.echo.set(echo);
    }

    /// Every level written to the trigger pin, with its timestamp.
    pub fn edges(&self) -> Vec<(u64, bool)> {
        self.edges.borrow().clone()
    }

    pub fn trigger(&self) -> FakeTrigger {
        FakeTrigger(self.clone())
    }

    pub fn echo(&self) -> FakeEcho {
        FakeEcho(self.clone())
    }

    pub fn delay(&self) -> FakeDelay {
        FakeDelay(self.clone())
    }

    pub fn clock(&self) -> impl FnMut() -> u64 {
        let now = self.now.clone();
        move || now.get()
    }

    fn advance(&self, us: u64) {
        self.now.set(self.now.get() + us);
    }

    fn alarm(&self, at: Option<u64>) -> Alarm {
        Alarm {
            bench: self.clone(),
            at,
            armed: false,
        }
    }

    /// Time at which the most recent trigger pulse went back low.
    fn last_trigger_fall(&self) -> Option<u64> {
        let edges = self.edges.borrow();
        let high = edges.iter().rposition(|&(_, level)| level)?;
        edges[high + 1..]
            .iter()
            .find(|&&(_, level)| !level)
            .map(|&(t, _)| t)
    }

    /// Stretches of time the echo line is high: the tail, if any, and the
    /// pulse answering the last trigger. Empty pulses are dropped.
    fn high_spans(&self) -> Vec<(u64, Option<u64>)> {
        let mut spans = Vec::new();
        if let Some(until) = self.tail_until.get() {
            spans.push((0, Some(until)));
        }
        if let Some(fired) = self.last_trigger_fall() {
            match self.echo.get() {
                Echo::Silent => {}
                Echo::Pulse { delay_us, width_us } => {
                    if width_us > 0 {
                        spans.push((fired + delay_us, Some(fired + delay_us + width_us)));
                    }
                }
                Echo::StuckHigh { delay_us } => spans.push((fired + delay_us, None)),
            }
        }
        spans
    }

    /// The high span containing `t`.
    fn span_at(&self, t: u64) -> Option<(u64, Option<u64>)> {
        self.high_spans()
            .into_iter()
            .find(|&(rise, fall)| t >= rise && fall.map_or(true, |fall| t < fall))
    }

    fn echo_level(&self, t: u64) -> bool {
        self.span_at(t).is_some()
    }

    /// First rising edge strictly after `t`.
    fn next_rise(&self, t: u64) -> Option<u64> {
        self.high_spans()
            .into_iter()
            .map(|(rise, _)| rise)
            .filter(|&rise| rise > t)
            .min()
    }

    /// First falling edge at or after `t`. `Some(None)` means the line rises
    /// and never falls again.
    fn next_fall(&self, t: u64) -> Option<Option<u64>> {
        if let Some((_, fall)) = self.span_at(t) {
            return Some(fall);
        }
        let rise = self.next_rise(t)?;
        self.span_at(rise).map(|(_, fall)| fall)
    }
}

pub struct FakeTrigger(Bench);

impl ErrorType for FakeTrigger {
    type Error = Infallible;
}

impl OutputPin for FakeTrigger {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.edges.borrow_mut().push((self.0.now(), false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.edges.borrow_mut().push((self.0.now(), true));
        Ok(())
    }
}

/// Echo pin. Each poll costs one simulated microsecond; waits jump the
/// clock straight to the edge, or never finish if there is none.
pub struct FakeEcho(Bench);

impl ErrorType for FakeEcho {
    type Error = Infallible;
}

impl InputPin for FakeEcho {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let level = self.0.echo_level(self.0.now());
        self.0.advance(1);
        Ok(level)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.is_high()?)
    }
}

impl FakeEcho {
    async fn until(&mut self, t: Option<u64>) -> Result<(), Infallible> {
        self.0.alarm(t).await;
        Ok(())
    }
}

impl Wait for FakeEcho {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        let now = self.0.now();
        if self.0.echo_level(now) {
            return Ok(());
        }
        let rise = self.0.next_rise(now);
        self.until(rise).await
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        match self.0.span_at(self.0.now()) {
            None => Ok(()),
            Some((_, fall)) => self.until(fall).await,
        }
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        let rise = self.0.next_rise(self.0.now());
        self.until(rise).await
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        let fall = self.0.next_fall(self.0.now()).flatten();
        self.until(fall).await
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        let now = self.0.now();
        let edge = if self.0.echo_level(now) {
            self.0.next_fall(now).flatten()
        } else {
            self.0.next_rise(now)
        };
        self.until(edge).await
    }
}

/// Delay that only moves the simulated clock.
pub struct FakeDelay(Bench);

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        let at = self.0.now() + u64::from(ns).div_ceil(1000);
        self.0.alarm(Some(at)).await;
    }

    async fn delay_us(&mut self, us: u32) {
        let at = self.0.now() + u64::from(us);
        self.0.alarm(Some(at)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        let at = self.0.now() + u64::from(ms) * 1000;
        self.0.alarm(Some(at)).await;
    }
}

/// Fires at simulated time `at`, or never for `None`.
///
/// The first poll only registers the alarm so that every racer is known
/// before any of them fires; later polls fire the earliest registered alarm
/// and move the clock to it.
pub struct Alarm {
    bench: Bench,
    at: Option<u64>,
    armed: bool,
}

impl Alarm {
    fn disarm(&mut self) {
        if let (true, Some(at)) = (self.armed, self.at) {
            let mut alarms = self.bench.alarms.borrow_mut();
            if let Some(i) = alarms.iter().position(|&a| a == at) {
                alarms.swap_remove(i);
            }
        }
        self.armed = false;
    }
}

impl Future for Alarm {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let Some(at) = self.at else {
            return Poll::Pending;
        };
        if at <= self.bench.now() {
            self.disarm();
            return Poll::Ready(());
        }
        if !self.armed {
            self.bench.alarms.borrow_mut().push(at);
            self.armed = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        let earliest = self.bench.alarms.borrow().iter().copied().min();
        if earliest == Some(at) {
            self.bench.now.set(at);
            self.disarm();
            Poll::Ready(())
        } else {
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

impl Drop for Alarm {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokenPin;

impl embedded_hal::digital::Error for BrokenPin {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// A pin whose every access fails.
pub struct DeadPin;

impl ErrorType for DeadPin {
    type Error = BrokenPin;
}

impl OutputPin for DeadPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(BrokenPin)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(BrokenPin)
    }
}

impl InputPin for DeadPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Err(BrokenPin)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Err(BrokenPin)
    }
}

/// An output sink that rejects every write.
pub struct ClosedPort;

impl core::fmt::Write for ClosedPort {
    fn write_str(&mut self, _s: &str) -> core::fmt::Result {
        Err(core::fmt::Error)
    }
}

/// Whether `line` is exactly `Distance: <integer> cm`.
pub fn is_report_line(line: &str) -> bool {
    line.strip_prefix("Distance: ")
        .and_then(|rest| rest.strip_suffix(" cm"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}
