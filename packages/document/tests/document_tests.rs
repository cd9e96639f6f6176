//! Load, edit and re-serialize a realistic project tree

use pretty_assertions::assert_eq;
use splice_document::{parse, serialize, XmlDocument};

const PROJECT: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<!DOCTYPE mlt>
<mlt LC_NUMERIC="C" producer="main_bin" version="7.24.0">
  <profile frame_rate_num="25" frame_rate_den="1" width="1920" height="1080"/>
  <producer id="producer1" in="0" out="249">
    <property name="resource">/media/intro &amp; titles.mp4</property>
    <property name="mlt_service">avformat</property>
  </producer>
  <!-- bin -->
  <playlist id="main_bin">
    <property name="kdenlive:docproperties.version">1.1</property>
    <entry producer="producer1" in="0" out="249"/>
  </playlist>
  <playlist id="playlist0">
    <entry producer="producer1" in="0" out="99">
      <filter id="filter0"><property name="mlt_service">brightness</property></filter>
    </entry>
    <blank length="20"/>
  </playlist>
  <tractor id="tractor0" in="0" out="119">
    <track producer="playlist0"/>
  </tractor>
</mlt>
"#;

#[test]
fn test_query_project_structure() {
    let doc = parse(PROJECT).unwrap();

    let playlists = doc.find_all("playlist");
    assert_eq!(playlists.len(), 2);

    let producer = doc.find_first("producer", "id", "producer1").unwrap();
    let resource = doc.find_child(producer, "property", "name", "resource").unwrap();
    assert_eq!(doc.text(resource), Some("/media/intro & titles.mp4"));
}

#[test]
fn test_moving_an_entry_keeps_its_filters() {
    let mut doc = parse(PROJECT).unwrap();
    let main_bin = doc.find_first("playlist", "id", "main_bin").unwrap();
    let playlist = doc.find_first("playlist", "id", "playlist0").unwrap();
    let entry = doc.child_elements(playlist, "entry").next().unwrap();

    doc.append_child(main_bin, entry);

    assert_eq!(doc.child_elements(playlist, "entry").count(), 0);
    let moved = doc.child_elements(main_bin, "entry").last().unwrap();
    let filter = doc.children(moved)[0];
    assert_eq!(doc.tag(filter), "filter");
    assert_eq!(doc.attr(filter, "id"), Some("filter0"));
}

#[test]
fn test_serialization_round_trip_is_byte_stable() {
    let doc = parse(PROJECT).unwrap();
    let once = serialize(&doc);
    let twice = serialize(&parse(&once).unwrap());
    assert_eq!(once, twice);
    assert!(once.contains("intro &amp; titles.mp4"));
    assert!(!once.contains("<!--"));
}

#[test]
fn test_detached_nodes_are_not_serialized() {
    let mut doc: XmlDocument = parse(PROJECT).unwrap();
    let playlist = doc.find_first("playlist", "id", "playlist0").unwrap();
    let root = doc.root();
    assert!(doc.remove_child(root, playlist));

    let out = serialize(&doc);
    assert!(!out.contains("playlist0\">"));
    assert!(doc.arena_len() > doc.descendants(root).len());
}
