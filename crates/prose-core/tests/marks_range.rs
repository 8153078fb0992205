use manos_prose_core::{
    BlockKind, Document, Editor, EditorConfig, Marks, Node, Point, PointRange,
};

fn editor_with(children: Vec<Node>) -> Editor {
    Editor::from_config(Document::new(children), EditorConfig::default())
}

fn select(editor: &mut Editor, anchor: (Vec<usize>, usize), focus: (Vec<usize>, usize)) {
    editor.set_point_selection(PointRange {
        anchor: Point::new(anchor.0, anchor.1),
        focus: Point::new(focus.0, focus.1),
    });
}

fn bold() -> Marks {
    Marks {
        bold: true,
        ..Marks::default()
    }
}

#[test]
fn mark_toggle_splits_the_leaf_at_the_selection_edges() {
    let mut editor = editor_with(vec![Node::paragraph("hello world")]);
    select(&mut editor, (vec![0, 0], 0), (vec![0, 0], 5));

    editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "bold" })))
        .unwrap();

    assert_eq!(
        editor.doc().children[0],
        Node::element(
            BlockKind::Paragraph,
            vec![Node::marked_text("hello", bold()), Node::text(" world")]
        )
    );

    editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "bold" })))
        .unwrap();

    assert_eq!(editor.doc().children[0], Node::paragraph("hello world"));
}

#[test]
fn mark_toggle_spans_several_blocks() {
    let mut editor = editor_with(vec![Node::paragraph("ab"), Node::paragraph("cd")]);
    select(&mut editor, (vec![0, 0], 1), (vec![1, 0], 1));

    editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "italic" })))
        .unwrap();

    let italic = Marks {
        italic: true,
        ..Marks::default()
    };
    assert_eq!(
        editor.doc().children[0],
        Node::element(
            BlockKind::Paragraph,
            vec![Node::text("a"), Node::marked_text("b", italic.clone())]
        )
    );
    assert_eq!(
        editor.doc().children[1],
        Node::element(
            BlockKind::Paragraph,
            vec![Node::marked_text("c", italic), Node::text("d")]
        )
    );
}

#[test]
fn mark_toggle_at_the_caret_applies_to_typed_text() {
    let mut editor = editor_with(vec![Node::paragraph("ab")]);
    select(&mut editor, (vec![0, 0], 2), (vec![0, 0], 2));

    editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "bold" })))
        .unwrap();
    assert!(
        editor
            .run_query::<bool>("marks.is_active", Some(serde_json::json!({ "mark": "bold" })))
            .unwrap()
    );

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "c" })))
        .unwrap();

    assert_eq!(
        editor.doc().children[0],
        Node::element(
            BlockKind::Paragraph,
            vec![Node::text("ab"), Node::marked_text("c", bold())]
        )
    );
    assert_eq!(editor.run_query::<Marks>("marks.get_active", None).unwrap(), bold());
}

#[test]
fn typing_at_the_edge_of_a_non_inclusive_mark_leaves_it_behind() {
    let mut editor = editor_with(vec![Node::element(
        BlockKind::Paragraph,
        vec![Node::marked_text("ab", bold())],
    )]);
    select(&mut editor, (vec![0, 0], 2), (vec![0, 0], 2));

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "c" })))
        .unwrap();

    assert_eq!(
        editor.doc().children[0],
        Node::element(
            BlockKind::Paragraph,
            vec![Node::marked_text("ab", bold()), Node::text("c")]
        )
    );
}

#[test]
fn typing_at_the_edge_of_an_inclusive_mark_extends_it() {
    let underline = Marks {
        underline: true,
        ..Marks::default()
    };
    let mut editor = editor_with(vec![Node::element(
        BlockKind::Paragraph,
        vec![Node::marked_text("ab", underline.clone())],
    )]);
    select(&mut editor, (vec![0, 0], 2), (vec![0, 0], 2));

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "c" })))
        .unwrap();

    assert_eq!(
        editor.doc().children[0],
        Node::element(
            BlockKind::Paragraph,
            vec![Node::marked_text("abc", underline)]
        )
    );
}

#[test]
fn typing_inside_a_marked_leaf_keeps_its_marks() {
    let mut editor = editor_with(vec![Node::element(
        BlockKind::Paragraph,
        vec![Node::marked_text("ac", bold())],
    )]);
    select(&mut editor, (vec![0, 0], 1), (vec![0, 0], 1));

    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "b" })))
        .unwrap();

    assert_eq!(
        editor.doc().children[0],
        Node::element(BlockKind::Paragraph, vec![Node::marked_text("abc", bold())])
    );
}

#[test]
fn mark_toggle_rejects_unknown_marks_and_links() {
    let mut editor = editor_with(vec![Node::paragraph("text")]);

    assert!(
        editor
            .run_command("marks.toggle", Some(serde_json::json!({ "mark": "sparkle" })))
            .is_err()
    );
    assert!(
        editor
            .run_command("marks.toggle", Some(serde_json::json!({ "mark": "link" })))
            .is_err()
    );
    assert!(editor.run_command("marks.toggle", None).is_err());
}

#[test]
fn caret_mark_leaves_are_dropped_once_the_caret_moves_on() {
    let mut editor = editor_with(vec![Node::paragraph("hello")]);
    let caret = |editor: &mut Editor, path: Vec<usize>, offset: usize| {
        editor.set_point_selection(PointRange::collapsed(Point::new(path, offset)));
    };

    caret(&mut editor, vec![0, 0], 1);
    editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "bold" })))
        .unwrap();
    caret(&mut editor, vec![0, 2], 2);
    editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "bold" })))
        .unwrap();

    assert_eq!(
        editor.doc().children[0],
        Node::element(
            BlockKind::Paragraph,
            vec![
                Node::text("hel"),
                Node::marked_text("", bold()),
                Node::text("lo"),
            ]
        )
    );
    assert_eq!(editor.point_selection().focus, Point::new(vec![0, 1], 0));

    caret(&mut editor, vec![0, 0], 0);
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "x" })))
        .unwrap();

    assert_eq!(editor.doc().children[0], Node::paragraph("xhello"));
}
