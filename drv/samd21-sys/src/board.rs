// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Board wiring.

/// Arduino MKR Zero.
pub mod mkrzero {
    use crate::{Function, Peripheral, Pin, PinRoute};

    /// The microSD socket: SERCOM2 in SPI mode.
    pub mod sd {
        use super::*;

        pub const SERCOM: Peripheral = Peripheral::Sercom2;

        /// PAD0
        pub const MOSI: PinRoute =
            PinRoute::output(Pin::PA12, Function::C).with_strong_drive();
        /// PAD1
        pub const SCK: PinRoute =
            PinRoute::output(Pin::PA13, Function::C).with_strong_drive();
        /// PAD3
        pub const MISO: PinRoute = PinRoute::input(Pin::PA15, Function::C);

        /// Chip select stays a GPIO, driven by whoever owns the card.
        pub const CS: Pin = Pin::PA14;

        pub const ROUTES: [PinRoute; 3] = [MOSI, SCK, MISO];

        /// DATA out on PAD0, SCK on PAD1.
        pub const DOPO: u8 = 0;
        pub const DIPO: u8 = 3;
    }

    /// The header serial port (Serial1): SERCOM5 in USART mode.
    pub mod serial {
        use super::*;

        pub const SERCOM: Peripheral = Peripheral::Sercom5;

        /// PAD2
        pub const TX: PinRoute = PinRoute::output(Pin::PB22, Function::D);
        /// PAD3
        pub const RX: PinRoute = PinRoute::input(Pin::PB23, Function::D);

        pub const ROUTES: [PinRoute; 2] = [TX, RX];

        /// TX on PAD2.
        pub const TXPO: u8 = 1;
        pub const RXPO: u8 = 3;
    }

    /// Analog input A0.
    pub mod a0 {
        use super::*;

        pub const ROUTE: PinRoute = PinRoute::input(Pin::PA11, Function::B);
        /// AIN19
        pub const CHANNEL: u8 = 19;
    }
}
