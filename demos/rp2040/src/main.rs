//! Trigger on GPIO9, echo on GPIO10, reports on UART0 (GPIO0) at 9600 baud.

#![no_std]
#![no_main]

use core::fmt::Write;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{self, Blocking, UartTx};
use hcsr04::{Hcsr04, Sampler};
use {defmt_rtt as _, panic_probe as _};

struct Serial<'d>(UartTx<'d, UART0, Blocking>);

impl Write for Serial<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.0.blocking_write(s.as_bytes()).map_err(|_| core::fmt::Error)
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let mut config = uart::Config::default();
    config.baudrate = 9600;
    let tx = UartTx::new_blocking(p.UART0, p.PIN_0, config);

    let sensor = Hcsr04::new(
        Output::new(p.PIN_9, Level::Low),
        Input::new(p.PIN_10, Pull::None),
        embassy_time::Delay,
        || embassy_time::Instant::now().as_micros(),
        hcsr04::wait::Interrupt, // or hcsr04::wait::Poll
    );
    let mut sampler = Sampler::new(sensor, Serial(tx));

    sampler.init().unwrap();
    info!("sampling");

    match sampler.run().await {
        Ok(never) => match never {},
        Err(_) => panic!("sampler stopped"),
    }
}
