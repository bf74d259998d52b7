use {
    super::Source,
    crate::error::{Result, end_of_data, read_error},
    std::io::Read,
};

/// [`Source`] over any [`Read`].
///
/// Reads are issued directly against the inner reader, so wrap unbuffered handles (files,
/// sockets) in a [`std::io::BufReader`] first.
#[derive(Debug)]
pub struct StreamSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: Read> StreamSource<R> {
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Source for StreamSource<R> {
    #[inline]
    fn read_exact(&mut self, dst: &mut [u8]) -> Result<()> {
        self.reader.read_exact(dst).map_err(read_error)
    }

    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.reader.read_exact(&mut byte).map_err(read_error)?;
        Ok(byte[0])
    }

    fn slice(&mut self, len: usize) -> Result<&[u8]> {
        self.buf.clear();
        // Grow with the data actually delivered rather than trusting `len` up front.
        let read = self
            .reader
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut self.buf)
            .map_err(read_error)?;
        if read != len {
            return Err(end_of_data());
        }
        Ok(&self.buf)
    }

    #[inline]
    fn remaining(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::error::Error,
        std::io::{self, Cursor},
    };

    /// Yields at most one byte per `read` call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match (self.0.split_first(), buf.first_mut()) {
                (Some((&byte, rest)), Some(slot)) => {
                    *slot = byte;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("broken pipe"))
        }
    }

    #[test]
    fn reads_through_a_trickling_reader() {
        let data = b"hello, world";
        let mut source = StreamSource::new(Trickle(data));
        assert_eq!(source.read_byte().unwrap(), b'h');
        assert_eq!(source.slice(4).unwrap(), b"ello");
        let mut rest = [0u8; 7];
        source.read_exact(&mut rest).unwrap();
        assert_eq!(&rest, b", world");
        assert!(matches!(source.read_byte(), Err(Error::EndOfData)));
        assert_eq!(source.remaining(), None);
    }

    #[test]
    fn short_slices_are_end_of_data() {
        let mut source = StreamSource::new(Cursor::new(vec![1u8, 2, 3]));
        assert!(matches!(source.slice(4), Err(Error::EndOfData)));
    }

    #[test]
    fn huge_lengths_do_not_preallocate() {
        let mut source = StreamSource::new(Cursor::new(vec![0u8; 8]));
        assert!(matches!(source.slice(usize::MAX), Err(Error::EndOfData)));
        assert!(source.buf.capacity() < 1 << 20);
    }

    #[test]
    fn io_failures_are_read_errors() {
        let mut source = StreamSource::new(Broken);
        assert!(matches!(source.read_byte(), Err(Error::Read(_))));
        assert!(matches!(source.slice(1), Err(Error::Read(_))));
    }
}
