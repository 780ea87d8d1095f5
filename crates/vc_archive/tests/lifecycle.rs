mod common;

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use vc_archive::{
    ArchiveState, Error, InputArchive, LoadMinimal, OutputArchive, Result, SaveMinimal,
    impl_minimal,
};

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn tree_formats_flush_when_closed() {
    let buf = SharedBuf::default();
    {
        let mut ar = OutputArchive::json(buf.clone());
        assert_eq!(ar.state(), ArchiveState::Open);
        ar.nvp("a", &1_u8).unwrap();
        assert_eq!(ar.state(), ArchiveState::Writing);
        assert!(buf.0.borrow().is_empty());
    }
    assert!(!buf.0.borrow().is_empty());

    let buf = SharedBuf::default();
    {
        let mut ar = OutputArchive::xml(buf.clone());
        ar.nvp("a", &1_u8).unwrap();
        assert!(buf.0.borrow().is_empty());
        ar.finish().unwrap();
    }
    let text = String::from_utf8(buf.0.take()).unwrap();
    assert!(text.contains("<a>1</a>"), "{text}");
}

#[test]
fn binary_formats_write_as_they_go() {
    let buf = SharedBuf::default();
    let mut ar = OutputArchive::binary(buf.clone());
    ar.nvp("a", &7_u32).unwrap();
    assert_eq!(buf.0.borrow().len(), 4);
}

#[test]
fn errors_close_the_archive() {
    let mut ar = InputArchive::binary(&[1_u8][..]);
    assert!(ar.load::<u32>().is_err());
    assert_eq!(ar.state(), ArchiveState::Closed);
    assert!(matches!(ar.load::<u8>(), Err(Error::Closed)));
    assert!(matches!(ar.resolve_deferred(), Err(Error::Closed)));
}

#[test]
fn invalid_names_are_rejected_by_tree_formats() {
    let mut text = Vec::new();
    let mut ar = OutputArchive::xml(&mut text);
    let err = ar.nvp("two words", &1_u8).unwrap_err();
    assert!(matches!(err.root_cause(), Error::InvalidName(_)));
}

// -----------------------------------------------------------------------------
// Minimal bindings

#[derive(Debug, PartialEq)]
struct UserId(u64);

impl SaveMinimal for UserId {
    type Repr = u64;

    fn save_minimal(&self) -> u64 {
        self.0
    }
}

impl LoadMinimal for UserId {
    type Repr = u64;

    fn load_minimal(repr: u64) -> Result<Self> {
        Ok(UserId(repr))
    }
}

impl_minimal!(UserId);

#[test]
fn minimal_bindings_are_leaves() {
    let ids = vec![UserId(5), UserId(6)];
    let mut text = Vec::new();
    OutputArchive::xml(&mut text).nvp("ids", &ids).unwrap();
    let text = String::from_utf8(text).unwrap();
    assert!(text.contains("<value0>5</value0>"), "{text}");

    for format in common::ALL {
        let loaded: Vec<UserId> =
            common::round_trip(format, None, |ar| ar.save(&ids), |ar| ar.load());
        assert_eq!(loaded, ids, "{format:?}");
    }
}
