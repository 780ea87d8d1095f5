use alloc::collections::BTreeMap;
use alloc::string::String;
use core::ops::{Deref, DerefMut};

use crate::archive::{InputArchive, OutputArchive};
use crate::binding::{Load, Save};
use crate::error::Result;
use crate::format::NodeKind;

use super::map::{load_entries, save_entries};

/// A string-keyed map whose keys become node names in text archives.
///
/// Text archives write `{"volume": 7, "theme": "dark"}` instead of an array
/// of `key`/`value` entries, and read back whatever names the node holds,
/// including ones added by hand. Binary archives fall back to the ordinary
/// map layout.
///
/// Keys must be valid node names in text archives, otherwise saving fails
/// with [`Error::InvalidName`](crate::Error::InvalidName).
///
/// # Examples
///
/// ```
/// use vc_archive::{InputArchive, NamedMap, OutputArchive};
///
/// let mut options = NamedMap::new();
/// options.insert(String::from("theme"), String::from("dark"));
///
/// let mut text = Vec::new();
/// OutputArchive::json(&mut text).nvp("options", &options).unwrap();
/// assert!(String::from_utf8_lossy(&text).contains(r#""theme": "dark""#));
///
/// let mut ar = InputArchive::json(text.as_slice()).unwrap();
/// assert_eq!(ar.nvp::<NamedMap<String>>("options").unwrap(), options);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedMap<V>(pub BTreeMap<String, V>);

impl<V> NamedMap<V> {
    #[inline]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[inline]
    pub fn into_inner(self) -> BTreeMap<String, V> {
        self.0
    }
}

impl<V> Default for NamedMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Deref for NamedMap<V> {
    type Target = BTreeMap<String, V>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<V> DerefMut for NamedMap<V> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<V> From<BTreeMap<String, V>> for NamedMap<V> {
    #[inline]
    fn from(map: BTreeMap<String, V>) -> Self {
        Self(map)
    }
}

impl<V> FromIterator<(String, V)> for NamedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<V: Save> Save for NamedMap<V> {
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        if !ar.is_text() {
            return save_entries(ar, self.0.len(), &self.0);
        }
        self.0.iter().try_for_each(|(key, value)| ar.nvp(key, value))
    }
}

impl<V: Load> Load for NamedMap<V> {
    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let mut map = BTreeMap::new();
        if !ar.is_text() {
            load_entries(ar, |key, value| {
                map.insert(key, value);
            })?;
            return Ok(Self(map));
        }
        while let Some(name) = ar.next_name().map(String::from) {
            let value = ar.nvp(&name)?;
            map.insert(name, value);
        }
        Ok(Self(map))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use super::NamedMap;
    use crate::{Error, InputArchive, OutputArchive};

    fn sample() -> NamedMap<u32> {
        [(String::from("width"), 640), (String::from("height"), 480)]
            .into_iter()
            .collect()
    }

    #[test]
    fn binary_archives_use_entries() {
        let mut bytes = Vec::new();
        let mut ar = OutputArchive::binary(&mut bytes);
        ar.save(&sample()).unwrap();
        ar.finish().unwrap();
        // size, then two length-prefixed keys with their values
        assert_eq!(bytes.len(), 8 + (8 + 6 + 4) + (8 + 5 + 4));

        let mut ar = InputArchive::binary(bytes.as_slice());
        assert_eq!(ar.load::<NamedMap<u32>>().unwrap(), sample());
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_keys_are_node_names() {
        let mut text = Vec::new();
        OutputArchive::json(&mut text).nvp("size", &sample()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&text).unwrap();
        assert_eq!(json["size"], serde_json::json!({ "height": 480, "width": 640 }));

        let edited = r#"{ "size": { "depth": 32, "width": 800 } }"#;
        let mut ar = InputArchive::json(edited.as_bytes()).unwrap();
        let loaded: NamedMap<u32> = ar.nvp("size").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["depth"], 32);
        assert_eq!(loaded["width"], 800);
    }

    #[cfg(feature = "xml")]
    #[test]
    fn xml_rejects_keys_that_are_not_names() {
        let mut map = sample();
        map.insert(String::from("two words"), 2);

        let mut text = Vec::new();
        let err = OutputArchive::xml(&mut text).nvp("size", &map).unwrap_err();
        assert!(matches!(err.root_cause(), Error::InvalidName(name) if name == "two words"));
    }
}
