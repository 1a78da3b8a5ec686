use {
    super::Error,
    embedded_hal::blocking::{
        delay::DelayMs,
        i2c::{Write, WriteRead},
    },
    std::marker::PhantomData,
};

// SDO pulled high, the breakout board default
pub const DEFAULT_ADDRESS: u8 = 0x77;
pub const ALTERNATE_ADDRESS: u8 = 0x76;
// hPa
pub const DEFAULT_SEA_LEVEL_PRESSURE: f32 = 1021.2;

const CHIP_ID: u8 = 0x58;
const RESET_COMMAND: u8 = 0xB6;
// osrs_t = x2, osrs_p = x16, mode = normal
const CTRL_MEAS_NORMAL: u8 = 0b010_101_11;
// t_sb = 0.5 ms, filter off, 3-wire SPI off
const CONFIG_DEFAULT: u8 = 0x00;
const RESET_DELAY_MS: u8 = 2;
// maximum measurement time at x2/x16 oversampling is 43.2 ms
const FIRST_CONVERSION_DELAY_MS: u8 = 45;
// ADC value reported for a measurement that was skipped
const SKIPPED: i32 = 0x80000;

mod registers {
    pub const CALIBRATION: u8 = 0x88;
    pub const CALIBRATION_LENGTH: usize = 24;
    pub const CHIP_ID: u8 = 0xD0;
    pub const RESET: u8 = 0xE0;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const CONFIG: u8 = 0xF5;
    pub const PRESS_MSB: u8 = 0xF7;
    pub const TEMP_MSB: u8 = 0xFA;
}

// dig_T1 .. dig_P9
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
}

impl Calibration {
    fn from_bytes(raw: &[u8; registers::CALIBRATION_LENGTH]) -> Self {
        let u = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);

        Calibration {
            t1: u(0),
            t2: s(2),
            t3: s(4),
            p1: u(6),
            p2: s(8),
            p3: s(10),
            p4: s(12),
            p5: s(14),
            p6: s(16),
            p7: s(18),
            p8: s(20),
            p9: s(22),
        }
    }

    // (t_fine, degrees Celsius), datasheet section 8.1
    fn temperature(&self, adc: i32) -> (f64, f64) {
        let adc = f64::from(adc);
        let t1 = f64::from(self.t1);

        let var1 = (adc / 16384.0 - t1 / 1024.0) * f64::from(self.t2);
        let var2 = adc / 131072.0 - t1 / 8192.0;
        let var2 = var2 * var2 * f64::from(self.t3);
        let t_fine = var1 + var2;

        (t_fine, t_fine / 5120.0)
    }

    // Pa, or None when p1 would divide by zero
    fn pressure(&self, adc: i32, t_fine: f64) -> Option<f64> {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * f64::from(self.p6) / 32768.0;
        var2 += var1 * f64::from(self.p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(self.p4) * 65536.0;
        var1 = (f64::from(self.p3) * var1 * var1 / 524288.0 + f64::from(self.p2) * var1)
            / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * f64::from(self.p1);
        if var1 == 0.0 {
            return None;
        }

        let mut p = 1048576.0 - f64::from(adc);
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        var1 = f64::from(self.p9) * p * p / 2147483648.0;
        var2 = p * f64::from(self.p8) / 32768.0;

        Some(p + (var1 + var2 + f64::from(self.p7)) / 16.0)
    }
}

/// Metres above the point where the pressure is `sea_level_pressure`, both in hPa.
pub fn altitude(pressure: f32, sea_level_pressure: f32) -> f32 {
    44330.0 * (1.0 - (pressure / sea_level_pressure).powf(0.1903))
}

fn adc20(msb: u8, lsb: u8, xlsb: u8) -> i32 {
    (i32::from(msb) << 12) | (i32::from(lsb) << 4) | (i32::from(xlsb) >> 4)
}

pub struct Bmp280<I2C, D> {
    i2c: I2C,
    // only needed during setup
    delay: PhantomData<D>,
    address: u8,
    calibration: Calibration,
    sea_level_pressure: f32,
}

impl<I2C, D, E> Bmp280<I2C, D>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u8>,
{
    /// Checks the chip id, resets the chip and starts continuous measurement. Returns once
    /// the first conversion has landed in the data registers.
    pub fn new(mut i2c: I2C, mut delay: D, address: u8) -> Result<Self, Error<E>> {
        let mut id = [0u8];
        i2c.write_read(address, &[registers::CHIP_ID], &mut id)
            .map_err(Error::Bus)?;
        if id[0] != CHIP_ID {
            return Err(Error::UnexpectedChipId {
                expected: CHIP_ID,
                found: id[0],
            });
        }

        i2c.write(address, &[registers::RESET, RESET_COMMAND])
            .map_err(Error::Bus)?;
        delay.delay_ms(RESET_DELAY_MS);

        let mut raw = [0u8; registers::CALIBRATION_LENGTH];
        i2c.write_read(address, &[registers::CALIBRATION], &mut raw)
            .map_err(Error::Bus)?;

        i2c.write(address, &[registers::CONFIG, CONFIG_DEFAULT])
            .map_err(Error::Bus)?;
        i2c.write(address, &[registers::CTRL_MEAS, CTRL_MEAS_NORMAL])
            .map_err(Error::Bus)?;
        delay.delay_ms(FIRST_CONVERSION_DELAY_MS);

        Ok(Bmp280 {
            i2c,
            delay: PhantomData,
            address,
            calibration: Calibration::from_bytes(&raw),
            sea_level_pressure: DEFAULT_SEA_LEVEL_PRESSURE,
        })
    }

    pub fn sea_level_pressure(&self) -> f32 {
        self.sea_level_pressure
    }

    /// Sets the reference used by [`Bmp280::altitude`], in hPa.
    pub fn set_sea_level_pressure(&mut self, pressure: f32) {
        self.sea_level_pressure = pressure;
    }

    pub fn temperature(&mut self) -> Result<Option<f32>, Error<E>> {
        let mut buf = [0u8; 3];
        self.i2c
            .write_read(self.address, &[registers::TEMP_MSB], &mut buf)
            .map_err(Error::Bus)?;

        let adc = adc20(buf[0], buf[1], buf[2]);
        if adc == SKIPPED {
            return Ok(None);
        }

        Ok(Some(self.calibration.temperature(adc).1 as f32))
    }

    /// Pressure in hPa.
    pub fn pressure(&mut self) -> Result<Option<f32>, Error<E>> {
        // Pressure compensation needs t_fine, so both come from one burst.
        let mut buf = [0u8; 6];
        self.i2c
            .write_read(self.address, &[registers::PRESS_MSB], &mut buf)
            .map_err(Error::Bus)?;

        let adc_p = adc20(buf[0], buf[1], buf[2]);
        let adc_t = adc20(buf[3], buf[4], buf[5]);
        if adc_p == SKIPPED || adc_t == SKIPPED {
            return Ok(None);
        }

        let (t_fine, _) = self.calibration.temperature(adc_t);
        Ok(self
            .calibration
            .pressure(adc_p, t_fine)
            .map(|pa| (pa / 100.0) as f32))
    }

    pub fn altitude(&mut self) -> Result<Option<f32>, Error<E>> {
        let sea_level_pressure = self.sea_level_pressure;
        Ok(self
            .pressure()?
            .map(|pressure| altitude(pressure, sea_level_pressure)))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use {super::*, crate::bus::mock::MockBus};

    // Trimming parameters of the worked example in the datasheet.
    pub const CALIBRATION: [u8; 24] = [
        0x70, 0x6b, 0x43, 0x67, 0x18, 0xfc, 0x7d, 0x8e, 0x43, 0xd6, 0xd0, 0x0b, 0x27, 0x0b,
        0x8c, 0x00, 0xf9, 0xff, 0x8c, 0x3c, 0xf8, 0xc6, 0x70, 0x17,
    ];
    // adc_P = 415148, adc_T = 519888: 1006.5327 hPa at 25.08 degrees
    pub const DATASHEET_BURST: [u8; 6] = [0x65, 0x5a, 0xc0, 0x7e, 0xed, 0x00];
    // adc_P = 409878, adc_T = 487745: 1000.0 hPa at 15.0 degrees
    pub const STANDARD_BURST: [u8; 6] = [0x64, 0x11, 0x60, 0x77, 0x14, 0x10];

    pub fn chip(address: u8) -> MockBus {
        let bus = MockBus::new(address);
        bus.set_registers(registers::CHIP_ID, &[CHIP_ID]);
        bus.set_registers(registers::CALIBRATION, &CALIBRATION);
        bus
    }

    pub fn set_burst(bus: &MockBus, burst: &[u8; 6]) {
        bus.set_registers(registers::PRESS_MSB, burst);
    }
}
