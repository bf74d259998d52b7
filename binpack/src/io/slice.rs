use {
    super::Source,
    crate::error::{Result, end_of_data},
    bytes::Bytes,
};

/// In-memory [`Source`] that hands out views of the input buffer.
///
/// When built with [`SliceSource::from_shared`], [`Source::slice_shared`] returns slices of the
/// same [`Bytes`] allocation instead of copying.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
    owner: Option<&'a Bytes>,
}

impl<'a> SliceSource<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            owner: None,
        }
    }

    pub fn from_shared(data: &'a Bytes) -> Self {
        Self {
            data: data.as_ref(),
            pos: 0,
            owner: Some(data),
        }
    }

    /// Number of bytes consumed so far.
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(end_of_data)?;
        let data = self.data;
        let src = &data[self.pos..end];
        self.pos = end;
        Ok(src)
    }
}

impl Source for SliceSource<'_> {
    #[inline]
    fn read_exact(&mut self, dst: &mut [u8]) -> Result<()> {
        let src = self.take(dst.len())?;
        dst.copy_from_slice(src);
        Ok(())
    }

    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or_else(end_of_data)?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn slice(&mut self, len: usize) -> Result<&[u8]> {
        self.take(len)
    }

    fn slice_shared(&mut self, len: usize) -> Result<Bytes> {
        let start = self.pos;
        let src = self.take(len)?;
        Ok(match self.owner {
            Some(owner) => owner.slice(start..start + len),
            None => Bytes::copy_from_slice(src),
        })
    }

    #[inline]
    fn remaining(&self) -> Option<usize> {
        Some(self.data.len() - self.pos)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{error::Error, proptest_config::proptest_cfg},
        proptest::prelude::*,
    };

    #[test]
    fn slice_is_a_view_of_the_input() {
        let data = [1u8, 2, 3, 4, 5];
        let mut source = SliceSource::new(&data);
        assert_eq!(source.read_byte().unwrap(), 1);
        let view = source.slice(3).unwrap();
        assert_eq!(view, &[2, 3, 4]);
        assert!(core::ptr::eq(view.as_ptr(), data[1..].as_ptr()));
        assert_eq!(source.remaining(), Some(1));
        assert_eq!(source.position(), 4);
    }

    #[test]
    fn reads_past_the_end_fail() {
        let mut source = SliceSource::new(&[7]);
        assert!(matches!(source.slice(2), Err(Error::EndOfData)));
        assert_eq!(source.read_byte().unwrap(), 7);
        assert!(matches!(source.read_byte(), Err(Error::EndOfData)));
        let mut buf = [0u8; 1];
        assert!(matches!(source.read_exact(&mut buf), Err(Error::EndOfData)));
        assert!(matches!(source.slice(usize::MAX), Err(Error::EndOfData)));
    }

    #[test]
    fn shared_slices_reuse_the_allocation() {
        let data = Bytes::from(vec![9u8; 64]);
        let mut source = SliceSource::from_shared(&data);
        source.read_byte().unwrap();
        let shared = source.slice_shared(16).unwrap();
        assert_eq!(shared.as_ptr(), data[1..].as_ptr());
        assert_eq!(shared.len(), 16);
    }

    #[test]
    fn unowned_shared_slices_copy() {
        let data = [3u8; 8];
        let mut source = SliceSource::new(&data);
        let shared = source.slice_shared(8).unwrap();
        assert_eq!(&shared[..], &data[..]);
        assert_ne!(shared.as_ptr(), data.as_ptr());
    }

    proptest! {
        #![proptest_config(proptest_cfg())]

        #[test]
        fn test_slice_source_chunks(data in proptest::collection::vec(any::<u8>(), 0..256), chunk in 1usize..16) {
            let mut source = SliceSource::new(&data);
            let mut out = Vec::with_capacity(data.len());
            while source.remaining().unwrap() >= chunk {
                out.extend_from_slice(source.slice(chunk).unwrap());
            }
            let rest = source.remaining().unwrap();
            let mut tail = vec![0u8; rest];
            source.read_exact(&mut tail).unwrap();
            out.extend_from_slice(&tail);
            prop_assert_eq!(&out, &data);
            prop_assert_eq!(source.remaining(), Some(0));
        }
    }
}
