use {crate::error::SetupError, linux_embedded_hal::I2cdev};

pub const DEFAULT_BUS: &str = "/dev/i2c-1";

pub fn open(path: &str) -> Result<I2cdev, SetupError> {
    I2cdev::new(path).map_err(|e| SetupError::BusUnavailable {
        path: path.to_string(),
        reason: format!("{:?}", e),
    })
}

/// An in-memory I2C bus with a single device on it, recording every transaction.
#[cfg(test)]
pub mod mock {
    use {
        embedded_hal::blocking::{
            delay::DelayMs,
            i2c::{Read, Write, WriteRead},
        },
        std::{
            collections::HashMap,
            sync::{Arc, Mutex},
        },
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Transaction {
        Write(Vec<u8>),
        Read(usize),
        WriteRead(Vec<u8>, usize),
    }

    /// The device did not acknowledge.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Nack;

    #[derive(Debug, Default)]
    struct State {
        registers: HashMap<u8, u8>,
        // bytes returned by a plain read following a command write
        responses: HashMap<u8, Vec<u8>>,
        last_command: Option<u8>,
        transactions: Vec<Transaction>,
        offline: bool,
    }

    /// Clones share the same device, so a test can keep one while the driver owns another.
    #[derive(Debug, Clone)]
    pub struct MockBus {
        address: u8,
        state: Arc<Mutex<State>>,
    }

    impl MockBus {
        pub fn new(address: u8) -> Self {
            MockBus {
                address,
                state: Arc::default(),
            }
        }

        pub fn set_registers(&self, start: u8, bytes: &[u8]) {
            let mut state = self.state.lock().unwrap();
            for (i, byte) in bytes.iter().enumerate() {
                state.registers.insert(start.wrapping_add(i as u8), *byte);
            }
        }

        pub fn respond(&self, command: u8, bytes: &[u8]) {
            self.state
                .lock()
                .unwrap()
                .responses
                .insert(command, bytes.to_vec());
        }

        /// Makes the device stop acknowledging anything.
        pub fn set_offline(&self, offline: bool) {
            self.state.lock().unwrap().offline = offline;
        }

        pub fn transactions(&self) -> Vec<Transaction> {
            self.state.lock().unwrap().transactions.clone()
        }

        pub fn clear_transactions(&self) {
            self.state.lock().unwrap().transactions.clear();
        }

        fn record(&self, address: u8, transaction: Transaction) -> Result<(), Nack> {
            let mut state = self.state.lock().unwrap();
            state.transactions.push(transaction);
            if state.offline || address != self.address {
                return Err(Nack);
            }
            Ok(())
        }
    }

    impl Write for MockBus {
        type Error = Nack;

        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Nack> {
            self.record(address, Transaction::Write(bytes.to_vec()))?;

            let mut state = self.state.lock().unwrap();
            if let Some((first, rest)) = bytes.split_first() {
                state.last_command = Some(*first);
                for (i, byte) in rest.iter().enumerate() {
                    state
                        .registers
                        .insert(first.wrapping_add(i as u8), *byte);
                }
            }
            Ok(())
        }
    }

    impl Read for MockBus {
        type Error = Nack;

        fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Nack> {
            self.record(address, Transaction::Read(buffer.len()))?;

            let state = self.state.lock().unwrap();
            let response = state
                .last_command
                .and_then(|command| state.responses.get(&command))
                .ok_or(Nack)?;
            for (slot, byte) in buffer.iter_mut().zip(response) {
                *slot = *byte;
            }
            Ok(())
        }
    }

    impl WriteRead for MockBus {
        type Error = Nack;

        fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Nack> {
            self.record(
                address,
                Transaction::WriteRead(bytes.to_vec(), buffer.len()),
            )?;

            let state = self.state.lock().unwrap();
            let start = bytes.first().copied().unwrap_or(0);
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = state
                    .registers
                    .get(&start.wrapping_add(i as u8))
                    .copied()
                    .unwrap_or(0);
            }
            Ok(())
        }
    }

    pub struct NoDelay;

    /// Records every requested wait instead of sleeping.
    #[derive(Debug, Clone, Default)]
    pub struct DelayLog(Arc<Mutex<Vec<u8>>>);

    impl DelayLog {
        pub fn waits(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl DelayMs<u8> for DelayLog {
        fn delay_ms(&mut self, ms: u8) {
            self.0.lock().unwrap().push(ms);
        }
    }

    impl DelayMs<u8> for NoDelay {
        fn delay_ms(&mut self, _ms: u8) {}
    }
}
