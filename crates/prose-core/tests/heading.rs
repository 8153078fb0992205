use manos_prose_core::{
    BlockKind, Document, Editor, EditorConfig, ImageAttrs, ListKind, Marks, Node, Point,
    PointRange,
};

fn editor_with(children: Vec<Node>) -> Editor {
    Editor::from_config(Document::new(children), EditorConfig::default())
}

#[test]
fn heading_toggle_sets_level_and_toggles_back() {
    let mut editor = editor_with(vec![Node::paragraph("Title")]);

    editor
        .run_command("heading.toggle", Some(serde_json::json!({ "level": 2 })))
        .unwrap();
    assert_eq!(editor.doc().children[0], Node::heading(2, "Title"));
    assert_eq!(
        editor.run_query::<Option<u8>>("heading.level", None).unwrap(),
        Some(2)
    );

    editor
        .run_command("heading.toggle", Some(serde_json::json!({ "level": 2 })))
        .unwrap();
    assert_eq!(editor.doc().children[0], Node::paragraph("Title"));
    assert_eq!(
        editor.run_query::<Option<u8>>("heading.level", None).unwrap(),
        None
    );
}

#[test]
fn heading_toggle_switches_between_levels() {
    let mut editor = editor_with(vec![Node::heading(2, "Title")]);

    editor
        .run_command("heading.toggle", Some(serde_json::json!({ "level": 3 })))
        .unwrap();

    let Node::Element(block) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    assert_eq!(block.kind, BlockKind::Heading { level: 3 });
}

#[test]
fn heading_toggle_rejects_levels_outside_the_config() {
    let mut editor = editor_with(vec![Node::paragraph("Title")]);

    let err = editor
        .run_command("heading.toggle", Some(serde_json::json!({ "level": 4 })))
        .unwrap_err();
    assert!(err.message().contains("Unsupported heading level"));
    assert_eq!(editor.doc().children[0], Node::paragraph("Title"));

    assert!(editor.run_command("heading.toggle", None).is_err());
}

#[test]
fn heading_toggle_clears_bold_italic_and_strike() {
    let marks = Marks {
        bold: true,
        italic: true,
        strike: true,
        ..Marks::default()
    };
    let mut editor = editor_with(vec![Node::element(
        BlockKind::Paragraph,
        vec![Node::marked_text("Loud", marks)],
    )]);

    editor
        .run_command("heading.toggle", Some(serde_json::json!({ "level": 3 })))
        .unwrap();

    assert_eq!(editor.doc().children[0], Node::heading(3, "Loud"));
}

#[test]
fn heading_toggle_lifts_a_list_item_out_of_its_list() {
    let mut editor = editor_with(vec![Node::list(ListKind::Bullet, ["one", "two", "three"])]);
    editor.set_point_selection(PointRange::collapsed(Point::new(vec![0, 1, 0, 0], 1)));

    editor
        .run_command("heading.toggle", Some(serde_json::json!({ "level": 3 })))
        .unwrap();

    let children = &editor.doc().children;
    assert_eq!(children.len(), 4);
    assert_eq!(children[0], Node::list(ListKind::Bullet, ["one"]));
    assert_eq!(children[1], Node::heading(3, "two"));
    assert_eq!(children[2], Node::list(ListKind::Bullet, ["three"]));
    assert_eq!(children[3], Node::paragraph(""));
    assert_eq!(editor.point_selection().focus, Point::new(vec![1, 0], 1));
}

#[test]
fn heading_toggle_is_ignored_inside_an_image() {
    let mut editor = editor_with(vec![
        Node::image(ImageAttrs::with_src("cat.png"), "caption"),
        Node::paragraph(""),
    ]);
    let before = editor.doc().clone();

    editor
        .run_command("heading.toggle", Some(serde_json::json!({ "level": 2 })))
        .unwrap();

    assert_eq!(editor.doc(), &before);
}

#[test]
fn mark_toggles_are_ignored_inside_headings() {
    let mut editor = editor_with(vec![Node::heading(2, "Title")]);
    editor.set_point_selection(PointRange {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 0], 5),
    });
    let before = editor.doc().clone();

    editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "bold" })))
        .unwrap();
    editor
        .run_command("link.set", Some(serde_json::json!({ "href": "https://example.com" })))
        .unwrap();

    assert_eq!(editor.doc(), &before);
}

#[test]
fn heading_levels_are_clamped_to_the_configured_set() {
    let editor = editor_with(vec![
        Node::heading(1, "Big"),
        Node::heading(5, "Small"),
        Node::paragraph(""),
    ]);

    assert_eq!(editor.doc().children[0], Node::heading(2, "Big"));
    assert_eq!(editor.doc().children[1], Node::heading(3, "Small"));

    let config = EditorConfig {
        heading_levels: vec![2],
        ..EditorConfig::default()
    };
    let editor = Editor::from_config(
        Document::new(vec![Node::heading(3, "Only two"), Node::paragraph("")]),
        config,
    );
    assert_eq!(editor.doc().children[0], Node::heading(2, "Only two"));
}
