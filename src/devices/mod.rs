pub mod bmp280;
pub mod htu21d;

#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    Bus(E),
    UnexpectedChipId { expected: u8, found: u8 },
    Crc { expected: u8, computed: u8 },
}
