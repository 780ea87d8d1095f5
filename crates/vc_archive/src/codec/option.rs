use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::Result;

/// A node with a `some` flag and, when set, a `value`.
impl<T: Save> Save for Option<T> {
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.nvp("some", &self.is_some())?;
        match self {
            Some(value) => ar.nvp("value", value),
            None => Ok(()),
        }
    }
}

impl<T: Load> Load for Option<T> {
    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        if ar.nvp("some")? {
            ar.nvp("value").map(Some)
        } else {
            Ok(None)
        }
    }
}

/// A node with an `ok` flag and either `value` or `error`.
impl<T: Save, E: Save> Save for core::result::Result<T, E> {
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.nvp("ok", &self.is_ok())?;
        match self {
            Ok(value) => ar.nvp("value", value),
            Err(error) => ar.nvp("error", error),
        }
    }
}

impl<T: Load, E: Load> Load for core::result::Result<T, E> {
    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        if ar.nvp("ok")? {
            ar.nvp("value").map(Ok)
        } else {
            ar.nvp("error").map(Err)
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use crate::{InputArchive, OutputArchive};

    #[cfg(feature = "xml")]
    #[test]
    fn options_and_results_in_xml() {
        let values: (Option<u8>, Option<u8>, Result<i32, String>) =
            (Some(3), None, Err(String::from("nope")));

        let mut text = Vec::new();
        OutputArchive::xml(&mut text).nvp("values", &values).unwrap();
        let loaded: (Option<u8>, Option<u8>, Result<i32, String>) =
            InputArchive::xml(text.as_slice()).unwrap().nvp("values").unwrap();
        assert_eq!(loaded, values);
    }
}
