use crate::{Error, Result};

/// A readable stream of binary data.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    /// The underlying data of the reader.
    data: &'a [u8],
    /// The current offset in bytes. Is not guaranteed to be in range.
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a new readable stream of binary data.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Create a new readable stream of binary data at a specific position.
    #[inline]
    pub fn new_at(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    /// The remaining data from the current offset.
    #[inline]
    pub fn tail(&self) -> Result<&'a [u8]> {
        self.data.get(self.offset..).ok_or(Error::OutOfBounds)
    }

    /// Returns the current offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Try to read `T` from the data.
    #[inline]
    pub fn read<T: Structure<'a>>(&mut self) -> Result<T> {
        T::read(self)
    }

    /// Read a certain number of bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).ok_or(Error::Overflow)?;
        let v = self.data.get(self.offset..end).ok_or(Error::OutOfBounds)?;
        self.offset = end;
        Ok(v)
    }

    /// Skip the next `n` bytes from the stream.
    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Jump to a specific location.
    #[inline]
    pub fn jump(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Check whether the reader is at the end of the buffer.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Try to read a vector of `T` from the data.
    pub fn read_vector<T: Structure<'a>>(&mut self, count: usize) -> Result<Vec<T>> {
        // Don't trust the count for the allocation, the data might be short.
        let mut res = Vec::with_capacity(count.min(self.data.len()));
        for _ in 0..count {
            res.push(self.read::<T>()?);
        }
        Ok(res)
    }
}

/// A writable stream of binary data.
#[derive(Debug, Default)]
pub struct Writer(Vec<u8>);

impl Writer {
    /// Create a new writable stream of binary data.
    #[inline]
    pub fn new() -> Self {
        Self(Vec::with_capacity(1024))
    }

    /// Create a new writable stream of binary data with a capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Write `T` into the data.
    #[inline]
    pub fn write<'a, T: Structure<'a>>(&mut self, data: T) {
        data.write(self);
    }

    /// Give bytes into the writer.
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    /// Align the contents to a byte boundary.
    #[inline]
    pub fn align(&mut self, to: usize) {
        while self.0.len() % to != 0 {
            self.0.push(0);
        }
    }

    /// The number of written bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Overwrite previously written bytes, e.g. a length field that is only
    /// known once the rest has been written.
    pub fn patch<'a, T: Structure<'a>>(&mut self, offset: usize, data: T) -> Result<()> {
        let mut w = Writer::with_capacity(4);
        w.write(data);
        let end = offset.checked_add(w.len()).ok_or(Error::Overflow)?;
        self.0
            .get_mut(offset..end)
            .ok_or(Error::OutOfBounds)?
            .copy_from_slice(&w.0);
        Ok(())
    }

    /// Return the written bytes.
    #[inline]
    pub fn finish(self) -> Vec<u8> {
        self.0
    }
}

/// A value that can be read from and written to a big-endian byte stream.
pub trait Structure<'a>: Sized {
    /// Read `Self` from the reader.
    fn read(r: &mut Reader<'a>) -> Result<Self>;

    /// Write `Self` into the writer.
    fn write(&self, w: &mut Writer);

    /// Read `Self` at a fixed offset.
    fn read_at(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut r = Reader::new_at(data, offset);
        Self::read(&mut r)
    }
}

impl<const N: usize> Structure<'_> for [u8; N] {
    fn read(r: &mut Reader) -> Result<Self> {
        let mut bytes = [0; N];
        bytes.copy_from_slice(r.read_bytes(N)?);
        Ok(bytes)
    }

    fn write(&self, w: &mut Writer) {
        w.extend(self)
    }
}

macro_rules! impl_primitive {
    ($($ty:ty),*) => {$(
        impl Structure<'_> for $ty {
            fn read(r: &mut Reader) -> Result<Self> {
                r.read::<[u8; std::mem::size_of::<$ty>()]>().map(Self::from_be_bytes)
            }

            fn write(&self, w: &mut Writer) {
                w.write::<[u8; std::mem::size_of::<$ty>()]>(self.to_be_bytes());
            }
        }
    )*};
}

impl_primitive!(u8, i8, u16, i16, u32, i32);
