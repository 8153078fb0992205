use manos_prose_core::{
    BlockKind, Document, Editor, EditorConfig, ImageAttrs, ListKind, Marks, Node, Point,
    PointRange,
};

fn editor_with(children: Vec<Node>) -> Editor {
    Editor::from_config(Document::new(children), EditorConfig::default())
}

#[test]
fn blockquote_toggle_wraps_and_unwraps_the_active_paragraph() {
    let mut editor = editor_with(vec![Node::paragraph("quote me")]);
    editor.set_point_selection(PointRange::collapsed(Point::new(vec![0, 0], 3)));

    editor.run_command("blockquote.toggle", None).unwrap();

    assert_eq!(
        editor.doc().children,
        vec![Node::blockquote("quote me"), Node::paragraph("")]
    );
    assert!(editor.run_query::<bool>("blockquote.is_active", None).unwrap());
    assert_eq!(editor.point_selection().focus, Point::new(vec![0, 0, 0], 3));

    editor.run_command("blockquote.toggle", None).unwrap();

    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("quote me"), Node::paragraph("")]
    );
    assert!(!editor.run_query::<bool>("blockquote.is_active", None).unwrap());
    assert_eq!(editor.point_selection().focus, Point::new(vec![0, 0], 3));
}

#[test]
fn blockquote_toggle_turns_headings_into_plain_paragraphs() {
    let bold = Marks {
        bold: true,
        ..Marks::default()
    };
    let mut editor = editor_with(vec![
        Node::heading(2, "Heading"),
        Node::element(BlockKind::Paragraph, vec![Node::marked_text("loud", bold)]),
    ]);

    editor.run_command("blockquote.toggle", None).unwrap();
    assert_eq!(editor.doc().children[0], Node::blockquote("Heading"));

    editor.set_point_selection(PointRange::collapsed(Point::new(vec![1, 0], 0)));
    editor.run_command("blockquote.toggle", None).unwrap();
    assert_eq!(editor.doc().children[1], Node::blockquote("loud"));
}

#[test]
fn blockquote_toggle_lifts_list_items() {
    let mut editor = editor_with(vec![Node::list(ListKind::Ordered, ["a", "b"])]);
    editor.set_point_selection(PointRange::collapsed(Point::new(vec![0, 1, 0, 0], 0)));

    editor.run_command("blockquote.toggle", None).unwrap();

    let children = &editor.doc().children;
    assert_eq!(children[0], Node::list(ListKind::Ordered, ["a"]));
    assert_eq!(children[1], Node::blockquote("b"));
    assert_eq!(children[2], Node::paragraph(""));
}

#[test]
fn blockquote_toggle_is_ignored_inside_an_image() {
    let mut editor = editor_with(vec![
        Node::image(ImageAttrs::with_src("cat.png"), "caption"),
        Node::paragraph(""),
    ]);
    let before = editor.doc().clone();

    editor.run_command("blockquote.toggle", None).unwrap();

    assert_eq!(editor.doc(), &before);
}

#[test]
fn marks_applied_inside_a_blockquote_are_stripped() {
    let mut editor = editor_with(vec![Node::blockquote("quote"), Node::paragraph("")]);
    editor.set_point_selection(PointRange {
        anchor: Point::new(vec![0, 0, 0], 0),
        focus: Point::new(vec![0, 0, 0], 5),
    });

    editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "bold" })))
        .unwrap();

    assert_eq!(editor.doc().children[0], Node::blockquote("quote"));
}

#[test]
fn blockquotes_are_repaired_to_hold_a_single_paragraph() {
    let editor = editor_with(vec![
        Node::element(
            BlockKind::Blockquote,
            vec![Node::paragraph("first"), Node::heading(2, "second")],
        ),
        Node::element(BlockKind::Blockquote, vec![]),
        Node::paragraph(""),
    ]);

    assert_eq!(
        editor.doc().children,
        vec![
            Node::blockquote("first"),
            Node::heading(2, "second"),
            Node::blockquote(""),
            Node::paragraph(""),
        ]
    );
}
