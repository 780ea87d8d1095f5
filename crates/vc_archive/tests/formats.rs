mod common;

use std::collections::{BTreeMap, HashSet, VecDeque};

use common::{ALL, Format, TEXT, round_trip};
use vc_archive::{Archive, Error, InputArchive, NamedMap, OutputArchive};
use vc_utils::collections::{MultiMap, MultiSet};

#[derive(Archive, Debug, Clone, PartialEq)]
struct Point {
    x: i32,
    y: i32,
    z: i32,
}

#[derive(Archive, Debug, Clone, PartialEq)]
enum Shape {
    Empty,
    Circle { radius: f64 },
    Line(i32, i32),
    #[archive(rename = "poly")]
    Polygon(Vec<(i32, i32)>),
}

#[derive(Archive, Debug, PartialEq)]
struct Inventory {
    owner: String,
    slots: Vec<Option<u16>>,
    counts: BTreeMap<String, u32>,
    tags: HashSet<String>,
    grid: [[u8; 2]; 2],
    pair: (char, bool),
    history: VecDeque<i64>,
    outcome: Result<u8, String>,
    origin: Box<Point>,
    #[archive(skip)]
    cache: Vec<u8>,
    #[archive(rename = "kind")]
    shape: Shape,
    nothing: (),
}

fn inventory() -> Inventory {
    Inventory {
        owner: String::from("ada <&> \"lovelace\""),
        slots: vec![Some(3), None, Some(65535)],
        counts: BTreeMap::from([(String::from("arrow"), 20), (String::from("bow"), 1)]),
        tags: HashSet::from([String::from("quest"), String::from("rare")]),
        grid: [[1, 2], [3, 4]],
        pair: ('λ', true),
        history: VecDeque::from([-1, 0, i64::MAX]),
        outcome: Err(String::from("broken")),
        origin: Box::new(Point { x: -5, y: 0, z: 5 }),
        cache: vec![9, 9, 9],
        shape: Shape::Polygon(vec![(0, 0), (1, 0), (0, 1)]),
        nothing: (),
    }
}

#[test]
fn point_round_trips_in_every_format() {
    let point = Point { x: 1, y: 2, z: 3 };
    for format in ALL {
        let loaded: Point = round_trip(format, None, |ar| ar.save(&point), |ar| ar.load());
        assert_eq!(loaded, point, "{format:?}");
    }
}

#[test]
fn binary_layout_is_packed() {
    let point = Point { x: 1, y: 2, z: 3 };

    let mut bytes = Vec::new();
    OutputArchive::binary(&mut bytes).save(&point).unwrap();
    assert_eq!(bytes.len(), 12);

    let mut bytes = Vec::new();
    common::output(Format::PortableBig, &mut bytes)
        .save(&point)
        .unwrap();
    assert_eq!(bytes.len(), 13);
    assert_eq!(bytes[0], 0);
    assert_eq!(bytes[1..5], 1_i32.to_be_bytes());

    let mut ar = InputArchive::portable(bytes.as_slice()).unwrap();
    assert_eq!(ar.load::<Point>().unwrap(), point);
}

#[test]
fn containers_and_enums_round_trip() {
    let expected = inventory();
    for format in ALL {
        let loaded: Inventory =
            round_trip(format, None, |ar| ar.nvp("inventory", &expected), |ar| ar.nvp("inventory"));
        assert!(loaded.cache.is_empty(), "{format:?}");
        assert_eq!(
            Inventory {
                cache: expected.cache.clone(),
                ..loaded
            },
            expected,
            "{format:?}"
        );
    }
}

#[test]
fn every_enum_variant() {
    let shapes = vec![
        Shape::Empty,
        Shape::Circle { radius: 0.5 },
        Shape::Line(-3, 7),
        Shape::Polygon(Vec::new()),
    ];
    for format in ALL {
        let loaded: Vec<Shape> = round_trip(format, None, |ar| ar.save(&shapes), |ar| ar.load());
        assert_eq!(loaded, shapes, "{format:?}");
    }
}

#[test]
fn text_tags_use_variant_names() {
    let mut text = Vec::new();
    OutputArchive::json(&mut text)
        .nvp("shape", &Shape::Polygon(Vec::new()))
        .unwrap();
    let text = String::from_utf8(text).unwrap();
    assert!(text.contains(r#""variant": "poly""#), "{text}");

    let err = InputArchive::json(r#"{ "shape": { "variant": "Hexagon" } }"#.as_bytes())
        .unwrap()
        .nvp::<Shape>("shape")
        .unwrap_err();
    assert!(matches!(err.root_cause(), Error::UnknownVariant { .. }));
}

#[test]
fn multi_key_containers_keep_every_entry() {
    let mut owners: MultiMap<String, u32> = MultiMap::new();
    for (name, id) in [("zed", 3), ("amy", 1), ("zed", 3), ("bob", 2), ("amy", 4)] {
        owners.insert(String::from(name), id);
    }
    let rolls: MultiSet<u8> = [6, 1, 6, 6, 3, 1].into_iter().collect();

    for format in ALL {
        let (loaded_owners, loaded_rolls): (MultiMap<String, u32>, MultiSet<u8>) = round_trip(
            format,
            None,
            |ar| {
                ar.nvp("owners", &owners)?;
                ar.nvp("rolls", &rolls)
            },
            |ar| Ok((ar.nvp("owners")?, ar.nvp("rolls")?)),
        );
        assert_eq!(loaded_owners, owners, "{format:?}");
        assert_eq!(loaded_owners.len(), 5, "{format:?}");
        assert_eq!(loaded_owners.get("zed"), [3, 3], "{format:?}");
        assert_eq!(loaded_owners.get("amy"), [1, 4], "{format:?}");
        assert_eq!(loaded_rolls.count(&6), 3, "{format:?}");
        assert_eq!(loaded_rolls.count(&1), 2, "{format:?}");
        assert_eq!(loaded_rolls.len(), 6, "{format:?}");
    }

    // A repeated key is a repeated entry, not a nested array.
    let mut text = Vec::new();
    OutputArchive::json(&mut text).nvp("owners", &owners).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&text).unwrap();
    assert_eq!(value["owners"].as_array().map(Vec::len), Some(5));
    assert_eq!(value["owners"][3], serde_json::json!({ "key": "zed", "value": 3 }));
    assert_eq!(value["owners"][4], serde_json::json!({ "key": "zed", "value": 3 }));
}

#[test]
fn hand_written_multi_map_entries_load_in_any_order() {
    let text = r#"{
        "owners": [
            { "key": "b", "value": 2 },
            { "key": "a", "value": 1 },
            { "key": "b", "value": 5 }
        ]
    }"#;
    let mut ar = InputArchive::json(text.as_bytes()).unwrap();
    let owners: MultiMap<String, u32> = ar.nvp("owners").unwrap();
    ar.finish().unwrap();
    assert_eq!(owners.len(), 3);
    assert_eq!(owners.get("b"), [2, 5]);
    assert_eq!(owners.get("a"), [1]);
}

#[test]
fn named_maps_in_every_format() {
    let labels: NamedMap<String> = [("ok", "Accept"), ("cancel", "Dismiss")]
        .into_iter()
        .map(|(k, v)| (String::from(k), String::from(v)))
        .collect();
    for format in ALL {
        let loaded: NamedMap<String> =
            round_trip(format, None, |ar| ar.nvp("labels", &labels), |ar| ar.nvp("labels"));
        assert_eq!(loaded, labels, "{format:?}");
    }

    let text = r#"<?xml version="1.0" encoding="utf-8"?>
<archive>
    <labels>
        <ok>Accept</ok>
        <help>Open manual</help>
    </labels>
</archive>
"#;
    let mut ar = InputArchive::xml(text.as_bytes()).unwrap();
    let loaded: NamedMap<String> = ar.nvp("labels").unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded["help"], "Open manual");
}

#[test]
fn next_name_is_only_known_to_text_archives() {
    for format in ALL {
        let mut bytes = Vec::new();
        let mut ar = common::output(format, &mut bytes);
        ar.nvp("first", &1_u8).unwrap();
        ar.finish().unwrap();

        let ar = common::input(format, &bytes);
        let expected = TEXT.contains(&format).then_some("first");
        assert_eq!(ar.next_name(), expected, "{format:?}");
    }
}

/// Keeps its state behind a private boxed type.
mod opaque {
    use vc_archive::{Archive, InputArchive, Load, OutputArchive, Result, Save};

    #[derive(Archive, Debug, PartialEq)]
    struct Inner {
        hits: u32,
        misses: u32,
    }

    #[derive(Debug, PartialEq)]
    pub struct Cache {
        inner: Box<Inner>,
    }

    impl Cache {
        pub fn new(hits: u32, misses: u32) -> Self {
            Self {
                inner: Box::new(Inner { hits, misses }),
            }
        }
    }

    impl Save for Cache {
        fn save(&self, ar: &mut OutputArchive<'_>) -> Result<()> {
            ar.nvp("inner", &self.inner)
        }
    }

    impl Load for Cache {
        fn load(ar: &mut InputArchive<'_>) -> Result<Self> {
            Ok(Self {
                inner: ar.nvp("inner")?,
            })
        }
    }
}

#[test]
fn private_boxed_state_round_trips() {
    let cache = opaque::Cache::new(10, 3);
    for format in ALL {
        let loaded: opaque::Cache = round_trip(format, None, |ar| ar.save(&cache), |ar| ar.load());
        assert_eq!(loaded, cache, "{format:?}");
    }
}

#[test]
fn json_layout() {
    let mut text = Vec::new();
    let mut ar = OutputArchive::json(&mut text);
    ar.save(&Point { x: 1, y: 2, z: 3 }).unwrap();
    ar.nvp("tags", &vec![7_u8, 8]).unwrap();
    ar.finish().unwrap();

    let value: serde_json::Value = serde_json::from_slice(&text).unwrap();
    assert_eq!(value["value0"]["x"], 1);
    assert_eq!(value["value0"]["z"], 3);
    assert_eq!(value["tags"], serde_json::json!([7, 8]));
}

#[test]
fn named_reads_in_any_order() {
    for format in TEXT {
        let (b, a, s): (u8, u8, String) = round_trip(
            format,
            None,
            |ar| {
                ar.nvp("a", &1_u8)?;
                ar.nvp("b", &2_u8)?;
                ar.nvp("s", "three")
            },
            |ar| Ok((ar.nvp("b")?, ar.nvp("a")?, ar.nvp("s")?)),
        );
        assert_eq!((a, b, s.as_str()), (1, 2, "three"), "{format:?}");
    }
}

#[test]
fn hand_edited_json_picks_up_extra_elements() {
    let text = r#"{
        "list": [1, 2, 3, 4],
        "point": { "z": 30, "x": 10, "y": 20 }
    }"#;
    let mut ar = InputArchive::json(text.as_bytes()).unwrap();
    let point: Point = ar.nvp("point").unwrap();
    let list: Vec<u8> = ar.nvp("list").unwrap();
    ar.finish().unwrap();
    assert_eq!(point, Point { x: 10, y: 20, z: 30 });
    assert_eq!(list, [1, 2, 3, 4]);
}

#[test]
fn hand_edited_xml_picks_up_extra_elements() {
    let text = r#"<?xml version="1.0" encoding="utf-8"?>
<archive>
    <b>2</b>
    <a>1</a>
    <list size="dynamic">
        <value0>1</value0>
        <value1>2</value1>
        <added>3</added>
    </list>
</archive>
"#;
    let mut ar = InputArchive::xml(text.as_bytes()).unwrap();
    assert_eq!(ar.nvp::<u8>("a").unwrap(), 1);
    assert_eq!(ar.nvp::<u8>("b").unwrap(), 2);
    assert_eq!(ar.nvp::<Vec<u32>>("list").unwrap(), [1, 2, 3]);
}

#[test]
fn missing_names_are_reported() {
    let mut ar = InputArchive::json(r#"{ "a": 1 }"#.as_bytes()).unwrap();
    let err = ar.nvp::<u8>("b").unwrap_err();
    assert!(matches!(err.root_cause(), Error::MissingNode(name) if name == "b"));
    assert!(matches!(ar.nvp::<u8>("a"), Err(Error::Closed)));
}

#[test]
fn type_mismatches_are_reported() {
    let mut ar = InputArchive::json(r#"{ "a": "text" }"#.as_bytes()).unwrap();
    let err = ar.nvp::<u8>("a").unwrap_err();
    assert!(matches!(err.root_cause(), Error::TypeMismatch { .. }));

    let mut ar = InputArchive::json(r#"{ "a": 300 }"#.as_bytes()).unwrap();
    let err = ar.nvp::<u8>("a").unwrap_err();
    assert!(matches!(err.root_cause(), Error::OutOfRange { .. }));
}

#[test]
fn truncated_binary_fails() {
    let mut bytes = Vec::new();
    OutputArchive::binary(&mut bytes)
        .save(&Point { x: 1, y: 2, z: 3 })
        .unwrap();
    bytes.truncate(7);
    let err = InputArchive::binary(bytes.as_slice())
        .load::<Point>()
        .unwrap_err();
    assert!(matches!(err.root_cause(), Error::Io(_)));
}

#[test]
fn blobs() {
    let blob: Vec<u8> = (0..=255).collect();
    for format in ALL {
        let loaded = round_trip(format, None, |ar| ar.nvp_bytes("blob", &blob), |ar| ar.nvp_bytes("blob"));
        assert_eq!(loaded, blob, "{format:?}");
    }
}
