use crate::error::Result;

/// A byte channel to a sensor.
///
/// The receive loop polls [`Link::is_data_available`] and drains whatever is
/// buffered with [`Link::read_available`]; neither call blocks for longer than
/// the link's configured read timeout. Commands go out through [`Link::write`].
pub trait Link: Send {
    /// Whether at least one byte is waiting to be read.
    fn is_data_available(&mut self) -> Result<bool>;

    /// Read every byte currently buffered. May return an empty vector.
    fn read_available(&mut self) -> Result<Vec<u8>>;

    /// Write a complete byte sequence.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Release the underlying handle. Further calls return [`crate::LinkError::Closed`].
    fn close(&mut self);

    /// Whether [`Link::close`] has not been called yet.
    fn is_open(&self) -> bool;

    /// Link name for diagnostics (port path or "memory").
    fn name(&self) -> &str;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn is_data_available(&mut self) -> Result<bool> {
        (**self).is_data_available()
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        (**self).read_available()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
