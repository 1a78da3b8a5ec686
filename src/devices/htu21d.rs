use {
    super::Error,
    crc::{Algorithm, Crc},
    embedded_hal::blocking::{
        delay::DelayMs,
        i2c::{Read, Write, WriteRead},
    },
};

pub const ADDRESS: u8 = 0x40;

mod commands {
    pub const TRIGGER_TEMPERATURE: u8 = 0xF3;
    pub const TRIGGER_HUMIDITY: u8 = 0xF5;
    pub const READ_USER_REGISTER: u8 = 0xE7;
    pub const SOFT_RESET: u8 = 0xFE;
}

const RESET_DELAY_MS: u8 = 15;
// 14 bit temperature
const TEMPERATURE_DELAY_MS: u8 = 50;
// 12 bit humidity
const HUMIDITY_DELAY_MS: u8 = 16;
// the two low bits of every result are status bits
const STATUS_MASK: u16 = 0xFFFC;

// x^8 + x^5 + x^4 + 1 over the two data bytes
const CHECKSUM: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0x00,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xA2,
    residue: 0x00,
};

const CRC: Crc<u8> = Crc::<u8>::new(&CHECKSUM);

pub struct Htu21d<I2C, D> {
    i2c: I2C,
    delay: D,
}

impl<I2C, D, E> Htu21d<I2C, D>
where
    I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u8>,
{
    /// Soft resets the chip and reads back its user register to confirm it answers.
    pub fn new(mut i2c: I2C, mut delay: D) -> Result<Self, Error<E>> {
        i2c.write(ADDRESS, &[commands::SOFT_RESET])
            .map_err(Error::Bus)?;
        delay.delay_ms(RESET_DELAY_MS);

        let mut user = [0u8];
        i2c.write_read(ADDRESS, &[commands::READ_USER_REGISTER], &mut user)
            .map_err(Error::Bus)?;

        Ok(Htu21d { i2c, delay })
    }

    pub fn temperature(&mut self) -> Result<f32, Error<E>> {
        let raw = self.measure(commands::TRIGGER_TEMPERATURE, TEMPERATURE_DELAY_MS)?;
        Ok(-46.85 + 175.72 * f32::from(raw) / 65536.0)
    }

    pub fn relative_humidity(&mut self) -> Result<f32, Error<E>> {
        let raw = self.measure(commands::TRIGGER_HUMIDITY, HUMIDITY_DELAY_MS)?;
        Ok(-6.0 + 125.0 * f32::from(raw) / 65536.0)
    }

    // no hold master mode: write the command, wait out the conversion, read back
    fn measure(&mut self, command: u8, wait: u8) -> Result<u16, Error<E>> {
        self.i2c.write(ADDRESS, &[command]).map_err(Error::Bus)?;
        self.delay.delay_ms(wait);

        let mut buf = [0u8; 3];
        self.i2c.read(ADDRESS, &mut buf).map_err(Error::Bus)?;

        let computed = CRC.checksum(&buf[..2]);
        if computed != buf[2] {
            return Err(Error::Crc {
                expected: buf[2],
                computed,
            });
        }

        Ok(u16::from_be_bytes([buf[0], buf[1]]) & STATUS_MASK)
    }
}


#[cfg(test)]
mod tests {
    use {
        super::{fixtures::*, *},
        crate::bus::mock::{MockBus, Nack, NoDelay, Transaction},
    };

    #[test]
    fn crc_matches_datasheet_example() {
        assert_eq!(CRC.checksum(&[0x68, 0x3A]), 0x7C);
        assert_eq!(CRC.checksum(&[0x4E, 0x85]), 0x6B);
        assert_eq!(CRC.checksum(b"123456789"), CHECKSUM.check);
    }

    #[test]
    fn setup_resets_and_reads_user_register() {
        let bus = chip();
        Htu21d::new(bus.clone(), NoDelay).unwrap();

        assert_eq!(
            bus.transactions(),
            vec![
                Transaction::Write(vec![commands::SOFT_RESET]),
                Transaction::WriteRead(vec![commands::READ_USER_REGISTER], 1),
            ]
        );
    }

    #[test]
    fn converts_readings() {
        let mut htu = Htu21d::new(chip(), NoDelay).unwrap();

        let rh = htu.relative_humidity().unwrap();
        assert!((rh - 45.2).abs() < 0.01, "{}", rh);

        let t = htu.temperature().unwrap();
        assert!((t - 23.40).abs() < 0.01, "{}", t);
    }

    #[test]
    fn status_bits_are_ignored() {
        let bus = chip();
        // same humidity with the "humidity measurement" status bit set
        respond_humidity(&bus, &[0x68, 0xDE, CRC.checksum(&[0x68, 0xDE])]);
        let mut htu = Htu21d::new(bus, NoDelay).unwrap();

        let rh = htu.relative_humidity().unwrap();
        assert!((rh - 45.2).abs() < 0.01, "{}", rh);
    }

    #[test]
    fn corrupted_result_fails_crc() {
        let bus = chip();
        respond_humidity(&bus, &[0x68, 0xDC, 0x00]);
        let mut htu = Htu21d::new(bus, NoDelay).unwrap();

        assert_eq!(
            htu.relative_humidity(),
            Err(Error::Crc {
                expected: 0x00,
                computed: 0x1B
            })
        );
    }

    #[test]
    fn missing_chip_is_a_bus_error() {
        let bus = MockBus::new(0x41);
        assert!(matches!(Htu21d::new(bus, NoDelay), Err(Error::Bus(Nack))));
    }
}
