//! Declarative wire layouts for fixed-size records.
//!
//! Every on-disk record the subsetter touches is described by a constant
//! slice of [`Field`]s. The layout, not the in-memory struct, is what gets
//! read and written: fields are big-endian on the wire unless they are raw
//! (like table tags), in which case their bytes are copied verbatim.
//!
//! Records are declared with the [`record!`] macro, which derives the layout
//! from the field types and implements [`Structure`] on top of it.

use crate::stream::{Reader, Structure, Writer};
use crate::{Error, Result, Tag};

/// The width of a single field on the wire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Width {
    Byte,
    Word,
    Long,
}

impl Width {
    /// The number of bytes the field occupies.
    pub const fn len(self) -> usize {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
            Width::Long => 4,
        }
    }
}

/// One field of a record layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Field {
    pub width: Width,
    /// Whether the field is converted from big-endian. Raw fields keep their
    /// wire bytes in memory order.
    pub swap: bool,
}

impl Field {
    pub const BYTE: Self = Self { width: Width::Byte, swap: true };
    pub const WORD: Self = Self { width: Width::Word, swap: true };
    pub const LONG: Self = Self { width: Width::Long, swap: true };
    pub const RAW_LONG: Self = Self { width: Width::Long, swap: false };

    fn decode(self, bytes: &[u8]) -> u32 {
        let n = self.width.len();
        let mut raw = [0; 4];
        if self.swap {
            raw[4 - n..].copy_from_slice(bytes);
            u32::from_be_bytes(raw)
        } else {
            raw[..n].copy_from_slice(bytes);
            u32::from_ne_bytes(raw)
        }
    }

    fn encode(self, value: u32, w: &mut Writer) {
        let n = self.width.len();
        if self.swap {
            w.extend(&value.to_be_bytes()[4 - n..]);
        } else {
            w.extend(&value.to_ne_bytes()[..n]);
        }
    }
}

/// The total wire size of a layout.
pub const fn layout_size(layout: &[Field]) -> usize {
    let mut size = 0;
    let mut i = 0;
    while i < layout.len() {
        size += layout[i].width.len();
        i += 1;
    }
    size
}

/// A type that can be stored in a single field.
pub trait FieldValue: Sized {
    const FIELD: Field;

    fn from_raw(raw: u32) -> Self;

    fn to_raw(&self) -> u32;
}

macro_rules! field_value {
    ($($ty:ty => $field:ident via $unsigned:ty),* $(,)?) => {$(
        impl FieldValue for $ty {
            const FIELD: Field = Field::$field;

            fn from_raw(raw: u32) -> Self {
                raw as $unsigned as $ty
            }

            fn to_raw(&self) -> u32 {
                *self as $unsigned as u32
            }
        }
    )*};
}

field_value! {
    u8 => BYTE via u8,
    i8 => BYTE via u8,
    u16 => WORD via u16,
    i16 => WORD via u16,
    u32 => LONG via u32,
    i32 => LONG via u32,
}

impl FieldValue for Tag {
    const FIELD: Field = Field::RAW_LONG;

    fn from_raw(raw: u32) -> Self {
        Tag(raw.to_ne_bytes())
    }

    fn to_raw(&self) -> u32 {
        u32::from_ne_bytes(self.0)
    }
}

/// A fixed-size record with a declarative layout.
pub trait Record: Sized {
    const LAYOUT: &'static [Field];
    const SIZE: usize = layout_size(Self::LAYOUT);

    /// Build the record from one raw value per layout field.
    fn from_values(values: &[u32]) -> Self;

    /// One raw value per layout field.
    fn values(&self) -> Vec<u32>;
}

/// Read raw field values according to a layout.
pub fn read_values(r: &mut Reader, layout: &[Field]) -> Result<Vec<u32>> {
    // Check the whole record up front, partial reads are never useful.
    let bytes = r.read_bytes(layout_size(layout))?;
    let mut values = Vec::with_capacity(layout.len());
    let mut pos = 0;
    for field in layout {
        let end = pos + field.width.len();
        values.push(field.decode(bytes.get(pos..end).ok_or(Error::OutOfBounds)?));
        pos = end;
    }
    Ok(values)
}

/// Write raw field values according to a layout.
pub fn write_values(w: &mut Writer, layout: &[Field], values: &[u32]) {
    for (field, value) in layout.iter().zip(values) {
        field.encode(*value, w);
    }
}

pub fn read_record<R: Record>(r: &mut Reader) -> Result<R> {
    read_values(r, R::LAYOUT).map(|values| R::from_values(&values))
}

pub fn write_record<R: Record>(w: &mut Writer, record: &R) {
    write_values(w, R::LAYOUT, &record.values());
}

/// Read a record at `offset`, returning it and the number of bytes consumed.
pub fn read_at<R: Record>(data: &[u8], offset: usize) -> Result<(R, usize)> {
    let mut r = Reader::new_at(data, offset);
    let record = read_record(&mut r)?;
    Ok((record, R::SIZE))
}

/// Overwrite a record in place, returning the number of bytes produced.
///
/// Fails if the record would not fit within the current length of `data`.
pub fn write_at<R: Record>(data: &mut [u8], offset: usize, record: &R) -> Result<usize> {
    let end = offset.checked_add(R::SIZE).ok_or(Error::Overflow)?;
    let target = data.get_mut(offset..end).ok_or(Error::OutOfBounds)?;
    let mut w = Writer::with_capacity(R::SIZE);
    write_record(&mut w, record);
    target.copy_from_slice(&w.finish());
    Ok(R::SIZE)
}

/// Declare a fixed-size record whose wire layout follows its field order.
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$fmeta:meta])* $field:ident: $ty:ty,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
        $vis struct $name {
            $($(#[$fmeta])* pub $field: $ty,)*
        }

        impl $crate::codec::Record for $name {
            const LAYOUT: &'static [$crate::codec::Field] =
                &[$(<$ty as $crate::codec::FieldValue>::FIELD,)*];

            fn from_values(values: &[u32]) -> Self {
                let mut values = values.iter().copied();
                Self {
                    $($field: <$ty as $crate::codec::FieldValue>::from_raw(
                        values.next().unwrap_or(0),
                    ),)*
                }
            }

            fn values(&self) -> Vec<u32> {
                vec![$($crate::codec::FieldValue::to_raw(&self.$field),)*]
            }
        }

        impl<'a> $crate::stream::Structure<'a> for $name {
            fn read(r: &mut $crate::stream::Reader<'a>) -> $crate::Result<Self> {
                $crate::codec::read_record(r)
            }

            fn write(&self, w: &mut $crate::stream::Writer) {
                $crate::codec::write_record(w, self)
            }
        }
    };
}

impl<'a> Structure<'a> for Tag {
    fn read(r: &mut Reader<'a>) -> Result<Self> {
        r.read::<[u8; 4]>().map(Self)
    }

    fn write(&self, w: &mut Writer) {
        w.write::<[u8; 4]>(self.0)
    }
}
