//! EEPROM emulations for the settings medium.
//!
//! Both keep a working copy that `write_byte` mutates; `commit` is the only
//! thing that makes bytes durable.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tank_traits::{BoxError, NonVolatile};
use tracing::{debug, warn};

use crate::atomic::write_atomic;
use crate::error::{HwError, Result};

/// Value of an erased EEPROM cell.
pub const ERASED: u8 = 0xFF;

fn check_addr(addr: usize, capacity: usize) -> Result<()> {
    if addr >= capacity {
        return Err(HwError::AddressOutOfRange { addr, capacity });
    }
    Ok(())
}

/// In-memory EEPROM with a durable image shared between handles.
///
/// [`MemEeprom::reopen`] hands out a fresh handle whose working copy is
/// loaded from the durable image, which is how a power cycle looks to the
/// settings store.
#[derive(Debug)]
pub struct MemEeprom {
    working: Vec<u8>,
    durable: Rc<RefCell<Vec<u8>>>,
    commits: Rc<Cell<usize>>,
    fail_commits: Rc<Cell<bool>>,
}

impl MemEeprom {
    pub fn erased(size: usize) -> Self {
        Self::from_image(vec![ERASED; size])
    }

    pub fn from_image(image: Vec<u8>) -> Self {
        Self {
            working: image.clone(),
            durable: Rc::new(RefCell::new(image)),
            commits: Rc::new(Cell::new(0)),
            fail_commits: Rc::new(Cell::new(false)),
        }
    }

    /// New handle on the same backing, with uncommitted writes discarded.
    pub fn reopen(&self) -> Self {
        Self {
            working: self.durable.borrow().clone(),
            durable: Rc::clone(&self.durable),
            commits: Rc::clone(&self.commits),
            fail_commits: Rc::clone(&self.fail_commits),
        }
    }

    pub fn durable_image(&self) -> Vec<u8> {
        self.durable.borrow().clone()
    }

    /// Successful commits across every handle on this backing.
    pub fn commit_count(&self) -> usize {
        self.commits.get()
    }

    /// Make every following commit fail until switched off again.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.set(fail);
    }

    /// XOR a byte of the durable image, as a bit flip in the cell would.
    pub fn corrupt_durable(&self, addr: usize, mask: u8) {
        if let Some(b) = self.durable.borrow_mut().get_mut(addr) {
            *b ^= mask;
        }
    }
}

impl NonVolatile for MemEeprom {
    fn capacity(&self) -> usize {
        self.working.len()
    }

    fn read_byte(&self, addr: usize) -> std::result::Result<u8, BoxError> {
        check_addr(addr, self.working.len())?;
        Ok(self.working[addr])
    }

    fn write_byte(&mut self, addr: usize, value: u8) -> std::result::Result<(), BoxError> {
        check_addr(addr, self.working.len())?;
        self.working[addr] = value;
        Ok(())
    }

    fn commit(&mut self) -> std::result::Result<(), BoxError> {
        if self.fail_commits.get() {
            return Err(Box::new(HwError::CommitFailed("injected failure".into())));
        }
        self.durable.borrow_mut().clone_from(&self.working);
        self.commits.set(self.commits.get() + 1);
        Ok(())
    }
}

/// EEPROM image kept in a file on the host; commits replace the file
/// atomically.
#[derive(Debug)]
pub struct FileEeprom {
    path: PathBuf,
    working: Vec<u8>,
}

impl FileEeprom {
    /// Open `path` as a `size`-byte medium. A missing file reads as erased; a
    /// file of the wrong length is truncated or padded with erased cells.
    pub fn open(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let working = match std::fs::read(&path) {
            Ok(mut bytes) => {
                if bytes.len() != size {
                    warn!(
                        path = %path.display(),
                        found = bytes.len(),
                        expected = size,
                        "eeprom image has unexpected length"
                    );
                }
                bytes.resize(size, ERASED);
                bytes
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no eeprom image, starting erased");
                vec![ERASED; size]
            }
            Err(e) => return Err(HwError::Io(e)),
        };
        Ok(Self { path, working })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NonVolatile for FileEeprom {
    fn capacity(&self) -> usize {
        self.working.len()
    }

    fn read_byte(&self, addr: usize) -> std::result::Result<u8, BoxError> {
        check_addr(addr, self.working.len())?;
        Ok(self.working[addr])
    }

    fn write_byte(&mut self, addr: usize, value: u8) -> std::result::Result<(), BoxError> {
        check_addr(addr, self.working.len())?;
        self.working[addr] = value;
        Ok(())
    }

    fn commit(&mut self) -> std::result::Result<(), BoxError> {
        write_atomic(&self.path, &self.working).map_err(HwError::Io)?;
        debug!(path = %self.path.display(), "eeprom image committed");
        Ok(())
    }
}
