use manos_prose_core::{
    Document, Editor, EditorConfig, ImageAttrs, KeyOutcome, NavKey, NavState, Node, Point,
    PointRange, Selection, handle_key, nav_state,
};

fn editor_with(children: Vec<Node>) -> Editor {
    Editor::from_config(Document::new(children), EditorConfig::default())
}

fn caret(editor: &mut Editor, path: Vec<usize>, offset: usize) {
    editor.set_point_selection(PointRange::collapsed(Point::new(path, offset)));
}

fn image(caption: &str) -> Node {
    Node::image(ImageAttrs::with_src("cat.png"), caption)
}

#[test]
fn arrow_down_from_an_image_lands_at_the_end_of_the_next_block() {
    let mut editor = editor_with(vec![image(""), Node::paragraph("hello")]);
    assert_eq!(nav_state(&editor), NavState::InImage);
    assert_eq!(editor.selection(), Selection::collapsed(1));

    let outcome = handle_key(&mut editor, NavKey::ArrowDown).unwrap();

    assert_eq!(outcome, KeyOutcome::Handled);
    assert_eq!(editor.selection(), Selection::collapsed(8));
    assert_eq!(editor.point_selection().focus, Point::new(vec![1, 0], 5));
    assert_eq!(nav_state(&editor), NavState::Normal);
}

#[test]
fn arrow_down_from_an_image_into_a_blockquote_stays_inside_the_quote() {
    let mut editor = editor_with(vec![image(""), Node::blockquote("quote"), Node::paragraph("")]);

    handle_key(&mut editor, NavKey::ArrowDown).unwrap();

    assert_eq!(editor.selection(), Selection::collapsed(9));
    assert_eq!(editor.point_selection().focus, Point::new(vec![1, 0, 0], 5));
    assert_eq!(nav_state(&editor), NavState::InBlockquote);
}

#[test]
fn arrow_up_from_an_image_lands_at_the_end_of_the_previous_block() {
    let mut editor = editor_with(vec![Node::paragraph("ab"), image(""), Node::paragraph("")]);
    caret(&mut editor, vec![1, 0], 0);
    assert_eq!(editor.selection(), Selection::collapsed(5));

    let outcome = handle_key(&mut editor, NavKey::ArrowUp).unwrap();

    assert_eq!(outcome, KeyOutcome::Handled);
    assert_eq!(editor.selection(), Selection::collapsed(3));
    assert_eq!(editor.point_selection().focus, Point::new(vec![0, 0], 2));
}

#[test]
fn arrow_up_from_a_leading_image_is_consumed_without_moving() {
    let mut editor = editor_with(vec![image("cap"), Node::paragraph("")]);
    let before = editor.selection();

    let outcome = handle_key(&mut editor, NavKey::ArrowUp).unwrap();

    assert_eq!(outcome, KeyOutcome::Handled);
    assert_eq!(editor.selection(), before);
}

#[test]
fn arrow_up_from_an_image_below_an_embed_falls_through() {
    let mut editor = editor_with(vec![Node::youtube("abc"), image("cap"), Node::paragraph("")]);
    caret(&mut editor, vec![1, 0], 2);
    let before = editor.point_selection().clone();

    let outcome = handle_key(&mut editor, NavKey::ArrowUp).unwrap();

    assert_eq!(outcome, KeyOutcome::Fallthrough);
    assert_eq!(editor.point_selection(), &before);
}

#[test]
fn arrow_up_past_an_embed_lands_in_the_text_above_it() {
    let mut editor = editor_with(vec![
        Node::paragraph("ab"),
        Node::youtube("abc"),
        image("cap"),
        Node::paragraph(""),
    ]);
    caret(&mut editor, vec![2, 0], 1);

    let outcome = handle_key(&mut editor, NavKey::ArrowUp).unwrap();

    assert_eq!(outcome, KeyOutcome::Handled);
    assert_eq!(editor.selection(), Selection::collapsed(3));
    assert_eq!(editor.point_selection().focus, Point::new(vec![0, 0], 2));
}

#[test]
fn enter_in_an_image_caption_jumps_past_the_image() {
    let mut editor = editor_with(vec![image("cap"), Node::paragraph("next")]);
    caret(&mut editor, vec![0, 0], 3);
    let before = editor.doc().clone();

    let outcome = handle_key(&mut editor, NavKey::Enter).unwrap();

    assert_eq!(outcome, KeyOutcome::Handled);
    assert_eq!(editor.doc(), &before);
    assert_eq!(editor.selection(), Selection::collapsed(10));
    assert_eq!(editor.point_selection().focus, Point::new(vec![1, 0], 4));
}

#[test]
fn enter_in_a_blockquote_jumps_to_the_next_block_without_splitting() {
    let mut editor = editor_with(vec![Node::blockquote("quote"), Node::paragraph("after")]);
    caret(&mut editor, vec![0, 0, 0], 2);
    let before = editor.doc().clone();

    let outcome = handle_key(&mut editor, NavKey::Enter).unwrap();

    assert_eq!(outcome, KeyOutcome::Handled);
    assert_eq!(editor.doc(), &before);
    assert_eq!(editor.selection(), Selection::collapsed(10));
    assert_eq!(editor.point_selection().focus, Point::new(vec![1, 0], 0));
}

#[test]
fn keys_outside_images_and_quotes_fall_through() {
    let mut editor = editor_with(vec![Node::paragraph("text"), Node::blockquote("quote")]);

    assert_eq!(
        handle_key(&mut editor, NavKey::Enter).unwrap(),
        KeyOutcome::Fallthrough
    );
    assert_eq!(
        handle_key(&mut editor, NavKey::Backspace).unwrap(),
        KeyOutcome::Fallthrough
    );

    caret(&mut editor, vec![1, 0, 0], 1);
    assert_eq!(
        handle_key(&mut editor, NavKey::ArrowDown).unwrap(),
        KeyOutcome::Fallthrough
    );
    assert_eq!(
        handle_key(&mut editor, NavKey::ArrowUp).unwrap(),
        KeyOutcome::Fallthrough
    );
}

#[test]
fn backspace_at_the_caption_start_turns_the_image_into_a_paragraph() {
    let mut editor = editor_with(vec![
        Node::paragraph("a"),
        image("cap"),
        Node::paragraph("b"),
    ]);
    caret(&mut editor, vec![1, 0], 0);

    let outcome = handle_key(&mut editor, NavKey::Backspace).unwrap();

    assert_eq!(outcome, KeyOutcome::Handled);
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("a"), Node::paragraph(""), Node::paragraph("b")]
    );
    assert_eq!(editor.point_selection().focus, Point::new(vec![1, 0], 0));
}

#[test]
fn backspace_inside_a_caption_falls_through() {
    let mut editor = editor_with(vec![image("cap"), Node::paragraph("")]);
    caret(&mut editor, vec![0, 0], 1);
    let before = editor.doc().clone();

    assert_eq!(
        handle_key(&mut editor, NavKey::Backspace).unwrap(),
        KeyOutcome::Fallthrough
    );
    assert_eq!(editor.doc(), &before);
}

#[test]
fn nav_state_query_reports_the_caret_context() {
    let mut editor = editor_with(vec![
        image(""),
        Node::blockquote("quote"),
        Node::paragraph(""),
    ]);
    assert_eq!(
        editor.run_query::<String>("nav.state", None).unwrap(),
        "in_image"
    );

    caret(&mut editor, vec![1, 0, 0], 0);
    assert_eq!(
        editor.run_query::<String>("nav.state", None).unwrap(),
        "in_blockquote"
    );

    caret(&mut editor, vec![2, 0], 0);
    assert_eq!(
        editor.run_query::<String>("nav.state", None).unwrap(),
        "normal"
    );
}
