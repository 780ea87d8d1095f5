//! Reconstruction through a one-shot proxy.
//!
//! Types that cannot be assembled field by field (private invariants, a
//! constructor that validates, a handle that must be built before its
//! children are read) implement [`LoadAndConstruct`] and hand the finished
//! value to a [`Construct`] proxy.

use core::any::type_name;
use core::fmt::Debug;

use crate::archive::InputArchive;
use crate::error::{Error, Result};

// -----------------------------------------------------------------------------
// Construct

/// Receives the value built by [`LoadAndConstruct::load_and_construct`].
///
/// The proxy accepts exactly one value.
pub struct Construct<T> {
    value: Option<T>,
}

impl<T> Construct<T> {
    #[inline]
    const fn new() -> Self {
        Self { value: None }
    }

    /// Stores the constructed value.
    pub fn call(&mut self, value: T) -> Result<()> {
        if self.value.is_some() {
            return Err(Error::ConstructInvokedTwice(type_name::<T>()));
        }
        self.value = Some(value);
        Ok(())
    }

    /// The stored value, for post-construction reads.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }

    fn take(self) -> Result<T> {
        self.value
            .ok_or(Error::ConstructNotInvoked(type_name::<T>()))
    }
}

impl<T: Debug> Debug for Construct<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Construct")
            .field("value", &self.value)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// LoadAndConstruct

/// A load binding that builds the value through a [`Construct`] proxy.
///
/// Pair it with a [`Save`](crate::Save) impl and
/// [`impl_load_and_construct!`](crate::impl_load_and_construct) to obtain the
/// [`Load`](crate::Load) impl.
///
/// # Examples
///
/// ```
/// use vc_archive::{
///     Construct, InputArchive, LoadAndConstruct, OutputArchive, Result, Save,
///     impl_load_and_construct,
/// };
///
/// struct Even(u32);
///
/// impl Even {
///     fn new(n: u32) -> Option<Self> {
///         (n % 2 == 0).then_some(Even(n))
///     }
/// }
///
/// impl Save for Even {
///     fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
///         ar.nvp("n", &self.0)
///     }
/// }
///
/// impl LoadAndConstruct for Even {
///     fn load_and_construct(ar: &mut InputArchive<'_>, construct: &mut Construct<Self>) -> Result<()> {
///         let n: u32 = ar.nvp("n")?;
///         construct.call(Even::new(n).unwrap_or(Even(0)))
///     }
/// }
///
/// impl_load_and_construct!(Even);
///
/// let mut bytes = Vec::new();
/// OutputArchive::binary(&mut bytes).save(&Even(8)).unwrap();
/// let even: Even = InputArchive::binary(bytes.as_slice()).load().unwrap();
/// assert_eq!(even.0, 8);
/// ```
pub trait LoadAndConstruct: Sized {
    fn load_and_construct(ar: &mut InputArchive<'_>, construct: &mut Construct<Self>)
    -> Result<()>;
}

/// Runs `T`'s reconstruction callback and returns the value it built.
pub fn load_and_construct<T: LoadAndConstruct>(ar: &mut InputArchive<'_>) -> Result<T> {
    let mut construct = Construct::new();
    T::load_and_construct(ar, &mut construct)?;
    construct.take()
}

/// Implements [`Load`](crate::Load) through [`LoadAndConstruct`].
#[macro_export]
macro_rules! impl_load_and_construct {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Load for $ty {
                #[inline]
                fn load(ar: &mut $crate::InputArchive<'_>) -> $crate::Result<Self> {
                    $crate::load_and_construct(ar)
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::{Construct, LoadAndConstruct};
    use crate::{Error, InputArchive, OutputArchive, Result};

    #[derive(Debug)]
    struct Twice;

    impl LoadAndConstruct for Twice {
        fn load_and_construct(_: &mut InputArchive<'_>, c: &mut Construct<Self>) -> Result<()> {
            c.call(Twice)?;
            c.call(Twice)
        }
    }

    #[derive(Debug)]
    struct Never;

    impl LoadAndConstruct for Never {
        fn load_and_construct(_: &mut InputArchive<'_>, _: &mut Construct<Self>) -> Result<()> {
            Ok(())
        }
    }

    impl_load_and_construct!(Twice, Never);

    #[test]
    fn proxy_must_be_called_exactly_once() {
        let bytes = Vec::new();
        let mut ar = InputArchive::binary(bytes.as_slice());
        let error = ar.load::<Twice>().unwrap_err();
        assert!(matches!(error.root_cause(), Error::ConstructInvokedTwice(_)));

        let mut ar = InputArchive::binary(bytes.as_slice());
        let error = ar.load::<Never>().unwrap_err();
        assert!(matches!(error.root_cause(), Error::ConstructNotInvoked(_)));
    }

    #[test]
    fn constructed_value_is_returned() {
        struct Pair(u8, u8);
        impl LoadAndConstruct for Pair {
            fn load_and_construct(ar: &mut InputArchive<'_>, c: &mut Construct<Self>) -> Result<()> {
                c.call(Pair(ar.nvp("a")?, ar.nvp("b")?))?;
                if let Some(pair) = c.get_mut() {
                    pair.1 += 1;
                }
                Ok(())
            }
        }
        impl_load_and_construct!(Pair);

        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.nvp("a", &1_u8).unwrap();
        ar.nvp("b", &2_u8).unwrap();
        ar.finish().unwrap();

        let mut ar = InputArchive::binary(bytes.as_slice());
        let pair = crate::load_and_construct::<Pair>(&mut ar).unwrap();
        assert_eq!((pair.0, pair.1), (1, 3));
    }
}
