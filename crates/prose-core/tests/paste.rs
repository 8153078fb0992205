use manos_prose_core::{
    BlockKind, Document, Editor, EditorConfig, ListKind, Marks, Node, PasteProfile, Point,
    PointRange, coerce_pasted_heading, paste_html, slice_from_html,
};

fn editor_with(children: Vec<Node>) -> Editor {
    Editor::from_config(Document::new(children), EditorConfig::default())
}

#[test]
fn html_slices_keep_inline_marks_and_links() {
    let nodes = slice_from_html(
        r#"<p>Hello <b>bold</b> and <a href="https://e.example?a=1&amp;b=2">link</a></p>"#,
        PasteProfile::Schema,
    );

    assert_eq!(
        nodes,
        vec![Node::element(
            BlockKind::Paragraph,
            vec![
                Node::text("Hello "),
                Node::marked_text(
                    "bold",
                    Marks {
                        bold: true,
                        ..Marks::default()
                    }
                ),
                Node::text(" and "),
                Node::marked_text(
                    "link",
                    Marks {
                        link: Some("https://e.example?a=1&b=2".to_string()),
                        ..Marks::default()
                    }
                ),
            ]
        )]
    );
}

#[test]
fn html_slices_build_lists_and_quotes() {
    let nodes = slice_from_html(
        "<ul><li>one</li><li>two</li></ul><blockquote><p>q</p></blockquote><p>Fish &amp; chips</p>",
        PasteProfile::Schema,
    );

    assert_eq!(
        nodes,
        vec![
            Node::list(ListKind::Bullet, ["one", "two"]),
            Node::blockquote("q"),
            Node::paragraph("Fish & chips"),
        ]
    );
}

#[test]
fn empty_hrefs_and_scripts_are_dropped() {
    let nodes = slice_from_html(
        r#"<script>alert(1)</script><p><a href="">plain</a></p>"#,
        PasteProfile::Schema,
    );

    assert_eq!(nodes, vec![Node::paragraph("plain")]);
}

#[test]
fn quill_profile_coerces_pasted_heading_levels() {
    assert_eq!(coerce_pasted_heading(1), Some(2));
    assert_eq!(coerce_pasted_heading(3), Some(3));
    assert_eq!(coerce_pasted_heading(5), None);

    let html = "<h1>A</h1><h2>B</h2><h4>C</h4>";
    assert_eq!(
        slice_from_html(html, PasteProfile::Quill),
        vec![Node::heading(2, "A"), Node::heading(2, "B"), Node::paragraph("C")]
    );
    assert_eq!(
        slice_from_html(html, PasteProfile::Schema),
        vec![Node::heading(1, "A"), Node::heading(2, "B"), Node::heading(4, "C")]
    );
}

#[test]
fn a_single_pasted_paragraph_is_inserted_inline() {
    let mut editor = editor_with(vec![Node::paragraph("ab")]);
    editor.set_point_selection(PointRange::collapsed(Point::new(vec![0, 0], 1)));

    paste_html(&mut editor, "<p>XY</p>").unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("aXYb")]);
}

#[test]
fn pasting_replaces_a_selection_inside_one_block() {
    let mut editor = editor_with(vec![Node::paragraph("hello world")]);
    editor.set_point_selection(PointRange {
        anchor: Point::new(vec![0, 0], 6),
        focus: Point::new(vec![0, 0], 11),
    });

    paste_html(&mut editor, "there").unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("hello there")]);
}

#[test]
fn pasted_blocks_replace_an_empty_paragraph() {
    let mut editor = Editor::with_richtext_plugins();

    paste_html(&mut editor, "<h1>Title</h1><p>body</p>").unwrap();

    assert_eq!(
        editor.doc().children,
        vec![Node::heading(2, "Title"), Node::paragraph("body")]
    );
    assert_eq!(editor.point_selection().focus, Point::new(vec![1, 0], 4));
}

#[test]
fn pasted_heading_levels_are_clamped_without_the_quill_profile() {
    let config = EditorConfig {
        paste_profile: PasteProfile::Schema,
        ..EditorConfig::default()
    };
    let mut editor = Editor::from_config(Document::default(), config);

    paste_html(&mut editor, "<h5>Deep</h5><p>body</p>").unwrap();

    assert_eq!(editor.doc().children[0], Node::heading(3, "Deep"));
}

#[test]
fn marks_pasted_into_a_blockquote_are_stripped() {
    let mut editor = editor_with(vec![Node::blockquote("ab"), Node::paragraph("")]);
    editor.set_point_selection(PointRange::collapsed(Point::new(vec![0, 0, 0], 1)));

    paste_html(&mut editor, "<b>X</b>").unwrap();

    assert_eq!(editor.doc().children[0], Node::blockquote("aXb"));
}
