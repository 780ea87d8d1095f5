use alloc::borrow::Cow;
use alloc::string::String;

use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::{Error, Result};
use crate::format::{NodeKind, Scalar, ScalarKind};

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl Save for $ty {
            const NODE: NodeKind = NodeKind::Value;

            #[inline]
            fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
                ar.save_scalar(Scalar::$variant(*self))
            }
        }

        impl Load for $ty {
            const NODE: NodeKind = NodeKind::Value;

            fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
                match ar.load_scalar(ScalarKind::$variant)? {
                    Scalar::$variant(value) => Ok(value),
                    other => Err(Error::mismatch(stringify!($ty), format_args!("{other:?}"))),
                }
            }
        }
    )*};
}

impl_scalar! {
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

// Pointer-sized integers are always 64 bit on the wire.
macro_rules! impl_pointer_sized {
    ($($ty:ty => $wide:ty),*) => {$(
        impl Save for $ty {
            const NODE: NodeKind = NodeKind::Value;

            #[inline]
            fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
                (*self as $wide).save(ar)
            }
        }

        impl Load for $ty {
            const NODE: NodeKind = NodeKind::Value;

            fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
                let wide = <$wide>::load(ar)?;
                <$ty>::try_from(wide).map_err(|_| Error::out_of_range(stringify!($ty), wide))
            }
        }
    )*};
}

impl_pointer_sized!(usize => u64, isize => i64);

impl Save for str {
    const NODE: NodeKind = NodeKind::Value;

    #[inline]
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.save_scalar(Scalar::Str(Cow::Borrowed(self)))
    }
}

impl Save for String {
    const NODE: NodeKind = NodeKind::Value;

    #[inline]
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        self.as_str().save(ar)
    }
}

impl Load for String {
    const NODE: NodeKind = NodeKind::Value;

    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        match ar.load_scalar(ScalarKind::Str)? {
            Scalar::Str(value) => Ok(value.into_owned()),
            other => Err(Error::mismatch("string", format_args!("{other:?}"))),
        }
    }
}

impl Save for Cow<'_, str> {
    const NODE: NodeKind = NodeKind::Value;

    #[inline]
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        (**self).save(ar)
    }
}

impl Load for Cow<'static, str> {
    const NODE: NodeKind = NodeKind::Value;

    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        String::load(ar).map(Cow::Owned)
    }
}

/// The unit value is an empty node.
impl Save for () {
    #[inline]
    fn save(&self, _: &mut OutputArchive<'_>) -> Result<()> {
        Ok(())
    }
}

impl Load for () {
    #[inline]
    fn load(_: &mut InputArchive<'_>) -> Result<Self> {
        Ok(())
    }
}
