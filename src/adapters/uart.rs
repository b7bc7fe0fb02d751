//! ESP-IDF UART transport for the heater bus.
//!
//! The heater talks over a single-wire half-duplex bus; a diode/transistor
//! interface turns it into separate TX/RX lines on the ESP32.  Everything
//! we transmit is echoed back on RX, which the frame decoder treats as an
//! observed controller frame.

use esp_idf_hal::delay::{BLOCK, NON_BLOCK};
use esp_idf_hal::gpio::{AnyIOPin, InputPin, OutputPin};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::uart::{config::Config, Uart, UartDriver};
use esp_idf_hal::units::Hertz;
use esp_idf_hal::sys::EspError;
use log::info;

use crate::protocol::Transport;

/// Line rate of the heater bus.
pub const HEATER_BAUD: u32 = 4_800;

pub struct UartTransport<'d> {
    driver: UartDriver<'d>,
}

impl<'d> UartTransport<'d> {
    pub fn new(
        uart: impl Peripheral<P = impl Uart> + 'd,
        tx: impl Peripheral<P = impl OutputPin> + 'd,
        rx: impl Peripheral<P = impl InputPin> + 'd,
    ) -> Result<Self, EspError> {
        let config = Config::new().baudrate(Hertz(HEATER_BAUD));
        let driver = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )?;
        info!("UART: heater bus at {} baud", HEATER_BAUD);
        Ok(Self { driver })
    }
}

impl Transport for UartTransport<'_> {
    type Error = EspError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
        self.driver.read(buf, NON_BLOCK)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, EspError> {
        self.driver.write(data)
    }

    fn flush(&mut self) -> Result<(), EspError> {
        self.driver.wait_tx_done(BLOCK)
    }

    fn available(&self) -> bool {
        self.driver.remaining_read().is_ok_and(|n| n > 0)
    }
}
