// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BAUD register arithmetic.
//!
//! Synchronous modes (SPI) divide the reference clock by `2 * (BAUD + 1)`.
//! Asynchronous USART with 16x arithmetic sampling instead scales it by
//! `(1 - BAUD / 65536) / 16`.
//!
//! Everything here truncates, the way the register does. Rounding would
//! shift the achieved rate by a divisor step without failing visibly, so
//! the rules are kept exactly.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BaudError {
    /// A rate of 0 was requested.
    ZeroRate,
    /// The rate is faster than the reference clock can produce.
    TooFast { requested: u32 },
    /// The divisor does not fit the BAUD register.
    TooSlow { requested: u32 },
}

/// The synchronous divisor for `rate_hz`: `floor(ref_hz / (2 * rate_hz)) - 1`.
///
/// Not limited to what fits in SPI's 8-bit BAUD register; see
/// [`spi_baud`] for that.
pub fn sync_divisor(ref_hz: u32, rate_hz: u32) -> Result<u32, BaudError> {
    if rate_hz == 0 {
        return Err(BaudError::ZeroRate);
    }
    let q = u64::from(ref_hz) / (2 * u64::from(rate_hz));
    if q == 0 {
        return Err(BaudError::TooFast { requested: rate_hz });
    }
    Ok((q - 1) as u32)
}

/// The rate a synchronous divisor actually produces.
pub fn sync_rate(ref_hz: u32, divisor: u32) -> u32 {
    (u64::from(ref_hz) / (2 * (u64::from(divisor) + 1))) as u32
}

/// The SPI BAUD register value for `rate_hz`.
pub fn spi_baud(ref_hz: u32, rate_hz: u32) -> Result<u8, BaudError> {
    let d = sync_divisor(ref_hz, rate_hz)?;
    u8::try_from(d).map_err(|_| BaudError::TooSlow { requested: rate_hz })
}

/// The USART BAUD register value for `baud`, 16x oversampling,
/// arithmetic mode: `65536 * (1 - 16 * baud / ref_hz)`.
pub fn usart_arithmetic(ref_hz: u32, baud: u32) -> Result<u16, BaudError> {
    if baud == 0 {
        return Err(BaudError::ZeroRate);
    }
    let f = u64::from(ref_hz);
    let sample = 16 * u64::from(baud);
    if sample >= f {
        return Err(BaudError::TooFast { requested: baud });
    }
    // 65536 * (f - sample) / f is strictly below 65536 here.
    Ok(((65536 * (f - sample)) / f) as u16)
}

/// The baud rate an arithmetic BAUD value actually produces.
pub fn usart_rate(ref_hz: u32, reg: u16) -> u32 {
    let f = u64::from(ref_hz);
    ((f * (65536 - u64::from(reg))) / (16 * 65536)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const F: u32 = 48_000_000;

    #[test]
    fn divisor_9600() {
        assert_eq!(sync_divisor(F, 9600), Ok(2499));
        assert_eq!(sync_rate(F, 2499), 9600);
        // Which does not fit SPI's register.
        assert_eq!(
            spi_baud(F, 9600),
            Err(BaudError::TooSlow { requested: 9600 })
        );
    }

    #[test]
    fn divisor_12mhz() {
        assert_eq!(sync_divisor(F, 12_000_000), Ok(1));
        assert_eq!(sync_rate(F, 1), 12_000_000);
        assert_eq!(spi_baud(F, 12_000_000), Ok(1));
    }

    #[test]
    fn sd_card_rates() {
        assert_eq!(spi_baud(F, 400_000), Ok(59));
        assert_eq!(sync_rate(F, 59), 400_000);
    }

    #[test]
    fn sync_limits() {
        assert_eq!(spi_baud(F, 24_000_000), Ok(0));
        assert_eq!(
            spi_baud(F, 24_000_001),
            Err(BaudError::TooFast {
                requested: 24_000_001
            })
        );
        assert_eq!(spi_baud(F, 93_750), Ok(255));
        // floor(48e6 / 186_772) - 1 = 255 still fits; one hertz less doesn't.
        assert_eq!(spi_baud(F, 93_386), Ok(255));
        assert_eq!(
            spi_baud(F, 93_385),
            Err(BaudError::TooSlow { requested: 93_385 })
        );
        assert_eq!(sync_divisor(F, 0), Err(BaudError::ZeroRate));
    }

    #[test]
    fn usart_values() {
        assert_eq!(usart_arithmetic(F, 9600), Ok(65326));
        assert_eq!(usart_arithmetic(F, 115_200), Ok(63019));
        assert_eq!(usart_rate(F, 65326), 9613);
        assert_eq!(
            usart_arithmetic(F, 3_000_000),
            Err(BaudError::TooFast {
                requested: 3_000_000
            })
        );
        assert_eq!(usart_arithmetic(F, 0), Err(BaudError::ZeroRate));
    }

    proptest! {
        #[test]
        fn sync_divisor_is_floor_minus_one(
            f in 1_000_000u32..=96_000_000,
            r in 1u32..=48_000_000,
        ) {
            match sync_divisor(f, r) {
                Ok(d) => {
                    prop_assert_eq!(d, f / (2 * r) - 1);
                    // Truncation can only err towards the faster side, and
                    // never by a whole divisor step.
                    prop_assert!(sync_rate(f, d) >= r);
                    prop_assert!(sync_rate(f, d + 1) < r);
                }
                Err(e) => {
                    prop_assert_eq!(e, BaudError::TooFast { requested: r });
                    prop_assert!(u64::from(r) * 2 > u64::from(f));
                }
            }
        }

        #[test]
        fn spi_baud_fits_or_refuses(r in 1u32..=30_000_000) {
            match spi_baud(F, r) {
                Ok(b) => prop_assert!(sync_rate(F, b.into()) >= r),
                Err(BaudError::TooSlow { .. }) => prop_assert!(r < 93_386),
                Err(BaudError::TooFast { .. }) => {
                    prop_assert!(r > 24_000_000)
                }
                Err(e) => prop_assert!(false, "unexpected {:?}", e),
            }
        }

        #[test]
        fn usart_rate_within_one_step(baud in 1u32..3_000_000) {
            let reg = usart_arithmetic(F, baud).unwrap();
            let achieved = usart_rate(F, reg);
            // One BAUD step is F / (16 * 65536) Hz.
            prop_assert!(achieved >= baud);
            prop_assert!(achieved <= baud + F / (16 * 65536));
        }
    }
}
