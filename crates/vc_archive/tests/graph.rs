mod common;

use std::cell::RefCell;
use std::rc::{self, Rc};
use std::sync::Arc;

use common::{ALL, Format, round_trip};
use vc_archive::{
    Archive, Deferred, Error, InputArchive, Load, OutputArchive, Result, Save,
};

#[derive(Archive, Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
    z: i32,
}

#[derive(Archive)]
struct Scene {
    first: Rc<Point>,
    second: Rc<Point>,
    name: Arc<str>,
    alias: Arc<str>,
    watcher: rc::Weak<Point>,
}

#[test]
fn shared_handles_are_written_once() {
    let point = Rc::new(Point { x: 1, y: 2, z: 3 });
    let name: Arc<str> = Arc::from("scene");
    let scene = Scene {
        first: Rc::clone(&point),
        second: Rc::clone(&point),
        name: Arc::clone(&name),
        alias: name,
        watcher: Rc::downgrade(&point),
    };

    for format in ALL {
        let loaded: Scene = round_trip(format, None, |ar| ar.save(&scene), |ar| ar.load());
        assert!(Rc::ptr_eq(&loaded.first, &loaded.second), "{format:?}");
        assert!(Arc::ptr_eq(&loaded.name, &loaded.alias), "{format:?}");
        let watched = loaded.watcher.upgrade().expect("target was loaded first");
        assert!(Rc::ptr_eq(&watched, &loaded.first), "{format:?}");
        assert_eq!(*loaded.first, Point { x: 1, y: 2, z: 3 });
    }

    let mut text = Vec::new();
    OutputArchive::json(&mut text).save(&scene).unwrap();
    let text = String::from_utf8(text).unwrap();
    assert_eq!(text.matches("\"data\"").count(), 2, "{text}");
    assert_eq!(text.matches("\"z\"").count(), 1, "{text}");
}

#[test]
fn weak_before_strong_resolves_empty() {
    let point = Rc::new(Point { x: 0, y: 0, z: 0 });
    let pair = (Rc::downgrade(&point), Rc::clone(&point));
    for format in ALL {
        let (weak, strong): (rc::Weak<Point>, Rc<Point>) =
            round_trip(format, None, |ar| ar.save(&pair), |ar| ar.load());
        assert!(weak.upgrade().is_none(), "{format:?}");
        assert_eq!(*strong, Point { x: 0, y: 0, z: 0 });
    }
}

// -----------------------------------------------------------------------------
// Deferred edges

#[derive(Archive)]
struct Node {
    label: String,
}

#[derive(Archive)]
struct Edge {
    to: Deferred<Rc<Node>>,
}

/// Edges come before the nodes they point to, so they are deferred.
struct Graph {
    edges: Vec<Edge>,
    nodes: Vec<Rc<Node>>,
}

impl Save for Graph {
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.nvp("edges", &self.edges)?;
        ar.nvp("nodes", &self.nodes)?;
        ar.resolve_deferred()
    }
}

impl Load for Graph {
    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        let edges = ar.nvp("edges")?;
        let nodes = ar.nvp("nodes")?;
        ar.resolve_deferred()?;
        Ok(Graph { edges, nodes })
    }
}

#[test]
fn deferred_edge_points_at_the_loaded_node() {
    let nodes = vec![
        Rc::new(Node { label: String::from("one") }),
        Rc::new(Node { label: String::from("two") }),
    ];
    let graph = Graph {
        edges: vec![Edge {
            to: Deferred::new(Rc::clone(&nodes[1])),
        }],
        nodes,
    };

    for format in ALL {
        let loaded: Graph = round_trip(format, None, |ar| ar.save(&graph), |ar| ar.load());
        let target = loaded.edges[0].to.get().expect("edge resolved");
        assert!(Rc::ptr_eq(target, &loaded.nodes[1]), "{format:?}");
        assert_eq!(target.label, "two");
    }
}

#[derive(Archive)]
struct Link {
    name: String,
    next: Deferred<Rc<Link>>,
}

#[test]
fn deferred_cycles_close() {
    let a = Rc::new(Link {
        name: String::from("a"),
        next: Deferred::empty(),
    });
    let b = Rc::new(Link {
        name: String::from("b"),
        next: Deferred::new(Rc::clone(&a)),
    });
    assert!(a.next.set(Rc::clone(&b)).is_ok());

    for format in ALL {
        let a: Rc<Link> = round_trip(
            format,
            None,
            |ar| {
                ar.nvp("root", &a)?;
                ar.resolve_deferred()
            },
            |ar| {
                let root: Rc<Link> = ar.nvp("root")?;
                ar.resolve_deferred()?;
                Ok(root)
            },
        );
        let b = a.next.get().expect("a -> b");
        assert_eq!(b.name, "b");
        assert!(Rc::ptr_eq(b.next.get().expect("b -> a"), &a), "{format:?}");
    }
}

// -----------------------------------------------------------------------------
// Strong cycles

#[derive(Debug)]
struct Cell {
    next: RefCell<Option<Rc<Cell>>>,
}

impl Save for Cell {
    fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
        ar.nvp("next", &*self.next.borrow())
    }
}

impl Load for Cell {
    fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
        Ok(Cell {
            next: RefCell::new(ar.nvp("next")?),
        })
    }
}

#[test]
fn strong_cycles_fail_to_load() {
    let a = Rc::new(Cell {
        next: RefCell::new(None),
    });
    let b = Rc::new(Cell {
        next: RefCell::new(Some(Rc::clone(&a))),
    });
    *a.next.borrow_mut() = Some(Rc::clone(&b));

    let mut bytes = Vec::new();
    let mut ar = common::output(Format::Binary, &mut bytes);
    ar.save(&a).unwrap();
    ar.finish().unwrap();

    let mut ar = common::input(Format::Binary, &bytes);
    let err = ar.load::<Rc<Cell>>().unwrap_err();
    assert!(matches!(err.root_cause(), Error::UnknownReference(1)));

    a.next.borrow_mut().take();
}
