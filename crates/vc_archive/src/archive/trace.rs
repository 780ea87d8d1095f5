//! Node path tracking for error messages.
//!
//! Only active with the `debug` feature in debug builds. Otherwise every
//! method compiles to nothing.

use crate::error::Result;

#[derive(Debug, Default)]
pub(crate) struct Trace {
    #[cfg(all(debug_assertions, feature = "debug"))]
    path: alloc::vec::Vec<alloc::string::String>,
}

impl Trace {
    #[inline]
    pub fn push(&mut self, name: Option<&str>) {
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.path.push(name.map_or_else(|| alloc::string::String::from("_"), Into::into));
        #[cfg(not(all(debug_assertions, feature = "debug")))]
        let _ = name;
    }

    #[inline]
    pub fn pop(&mut self) {
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.path.pop();
    }

    /// Wraps an error with the current path, once, at the innermost node.
    #[inline]
    pub fn attach<T>(&self, result: Result<T>) -> Result<T> {
        #[cfg(all(debug_assertions, feature = "debug"))]
        let result = result.map_err(|error| match error {
            crate::Error::Context { .. } | crate::Error::Closed => error,
            error => crate::Error::Context {
                path: self.path.join("/"),
                source: alloc::boxed::Box::new(error),
            },
        });
        result
    }
}
