use std::future::Future;

use manos_prose_core::{
    BlockKind, Document, Editor, EditorConfig, ImageAttrs, ImageError, ImageFile, ImageState,
    ImageUploader, Node, NodeType, Point, PointRange, UploadId, UploadResponse, delete_image,
    drop_files, finish_upload, image_state, insert_image_file, paste_files, paste_html,
    upload_image,
};

fn editor_with(children: Vec<Node>) -> Editor {
    Editor::from_config(Document::new(children), EditorConfig::default())
}

fn png(name: &str) -> ImageFile {
    ImageFile::new(name, Some("image/png"), vec![1u8, 2, 3])
}

fn image_attrs(editor: &Editor, ix: usize) -> ImageAttrs {
    let Node::Element(block) = &editor.doc().children[ix] else {
        panic!("expected element block");
    };
    block
        .kind
        .image_attrs()
        .cloned()
        .unwrap_or_else(|| panic!("expected image at {ix}, found {:?}", block.kind))
}

struct StaticUploader;

impl ImageUploader for StaticUploader {
    fn upload(&self, file: &ImageFile) -> impl Future<Output = anyhow::Result<UploadResponse>> {
        let name = format!("stored-{}", file.name);
        async move {
            Ok(UploadResponse {
                url: format!("https://cdn.example/{name}"),
                name,
                width: 640,
                height: 480,
            })
        }
    }
}

struct FailingUploader;

impl ImageUploader for FailingUploader {
    fn upload(&self, _file: &ImageFile) -> impl Future<Output = anyhow::Result<UploadResponse>> {
        async { Err(anyhow::anyhow!("network down")) }
    }
}

#[test]
fn inserted_file_shows_a_preview_until_the_upload_lands() {
    let mut editor = Editor::with_richtext_plugins();

    let ticket = insert_image_file(&mut editor, png("photo.png")).unwrap();

    assert_eq!(ticket.id, UploadId(1));
    assert_eq!(editor.doc().children.len(), 2);
    let attrs = image_attrs(&editor, 0);
    assert_eq!(attrs.src, "data:image/png;base64,AQID");
    assert!(!attrs.is_new);
    assert_eq!(image_state(&editor, ticket.id), Some(ImageState::PendingUpload));
    assert_eq!(editor.point_selection().focus, Point::new(vec![0, 0], 0));

    pollster::block_on(upload_image(&mut editor, &StaticUploader, ticket.clone())).unwrap();

    let attrs = image_attrs(&editor, 0);
    assert_eq!(attrs.src, "stored-photo.png");
    assert_eq!(attrs.width, Some(640));
    assert_eq!(attrs.height, Some(480));
    assert!(!attrs.is_new);
    assert_eq!(image_state(&editor, ticket.id), Some(ImageState::Uploaded));
}

#[test]
fn failed_upload_keeps_the_preview() {
    let mut editor = Editor::with_richtext_plugins();
    let ticket = insert_image_file(&mut editor, png("photo.png")).unwrap();

    pollster::block_on(upload_image(&mut editor, &FailingUploader, ticket.clone())).unwrap();

    assert_eq!(image_attrs(&editor, 0).src, "data:image/png;base64,AQID");
    assert_eq!(image_state(&editor, ticket.id), Some(ImageState::PendingUpload));
}

#[test]
fn upload_finishing_after_delete_changes_nothing() {
    let mut editor = Editor::with_richtext_plugins();
    let ticket = insert_image_file(&mut editor, png("photo.png")).unwrap();

    assert!(delete_image(&mut editor).unwrap());
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph(""), Node::paragraph("")]
    );
    assert_eq!(image_state(&editor, ticket.id), Some(ImageState::Deleted));

    let before = editor.doc().clone();
    finish_upload(
        &mut editor,
        ticket.id,
        Ok(UploadResponse {
            url: String::new(),
            name: "late.png".to_string(),
            width: 1,
            height: 1,
        }),
    )
    .unwrap();
    assert_eq!(editor.doc(), &before);
}

#[test]
fn upload_finds_its_image_after_it_moved() {
    let mut editor = editor_with(vec![Node::paragraph("a"), Node::paragraph("b")]);
    editor.set_point_selection(PointRange::collapsed(Point::new(vec![1, 0], 0)));
    let ticket = insert_image_file(&mut editor, png("photo.png")).unwrap();
    assert_eq!(editor.doc().children[1].node_type(), NodeType::Image);

    editor.set_point_selection(PointRange::collapsed(Point::new(vec![0, 0], 0)));
    paste_html(&mut editor, "<h2>Title</h2><p>intro</p>").unwrap();
    assert_eq!(editor.doc().children[3].node_type(), NodeType::Image);

    finish_upload(
        &mut editor,
        ticket.id,
        Ok(UploadResponse {
            url: String::new(),
            name: "first.png".to_string(),
            width: 10,
            height: 20,
        }),
    )
    .unwrap();

    let attrs = image_attrs(&editor, 3);
    assert_eq!(attrs.src, "first.png");
    assert_eq!((attrs.width, attrs.height), (Some(10), Some(20)));
}

#[test]
fn pasted_files_get_their_own_upload_ids() {
    let mut editor = Editor::with_richtext_plugins();

    let tickets = paste_files(&mut editor, vec![png("one.png"), png("two.png")]).unwrap();

    assert_eq!(tickets.len(), 2);
    assert_ne!(tickets[0].id, tickets[1].id);
    assert_eq!(editor.doc().children[0].node_type(), NodeType::Image);
    assert_eq!(editor.doc().children[1].node_type(), NodeType::Image);
    assert_eq!(
        image_state(&editor, tickets[1].id),
        Some(ImageState::PendingUpload)
    );
    assert_eq!(image_state(&editor, UploadId(99)), None);
}

#[test]
fn inserting_mid_paragraph_splits_it() {
    let mut editor = editor_with(vec![Node::paragraph("hello")]);
    editor.set_point_selection(PointRange::collapsed(Point::new(vec![0, 0], 2)));

    insert_image_file(&mut editor, png("photo.png")).unwrap();

    let children = &editor.doc().children;
    assert_eq!(children.len(), 3);
    assert_eq!(children[0], Node::paragraph("he"));
    assert_eq!(children[1].node_type(), NodeType::Image);
    assert_eq!(children[2], Node::paragraph("llo"));
}

#[test]
fn non_image_files_are_rejected() {
    let mut editor = Editor::with_richtext_plugins();
    let before = editor.doc().clone();

    let err = insert_image_file(&mut editor, ImageFile::new("notes.txt", None, vec![0u8])).unwrap_err();

    assert!(matches!(err, ImageError::NotAnImage { ref mime, .. } if mime == "text/plain"));
    assert_eq!(editor.doc(), &before);
}

#[test]
fn mime_type_is_guessed_from_the_file_name() {
    assert_eq!(ImageFile::new("cat.jpg", None, vec![0u8]).mime(), "image/jpeg");
    assert_eq!(ImageFile::new("cat", Some("Image/GIF"), vec![0u8]).mime(), "image/gif");
    assert!(!ImageFile::new("archive.zip", None, vec![0u8]).is_image());
}

#[test]
fn dropped_files_land_at_the_drop_position_and_skip_non_images() {
    let mut editor = editor_with(vec![Node::paragraph("a"), Node::paragraph("b")]);

    let tickets = drop_files(
        &mut editor,
        4,
        vec![ImageFile::new("notes.txt", None, vec![0u8]), png("photo.png")],
    )
    .unwrap();

    assert_eq!(tickets.len(), 1);
    let children = &editor.doc().children;
    assert_eq!(children[0], Node::paragraph("a"));
    assert_eq!(children[1].node_type(), NodeType::Image);
    assert_eq!(children[2], Node::paragraph("b"));
}

#[test]
fn image_commands_insert_edit_alt_and_delete() {
    let mut editor = Editor::with_richtext_plugins();

    editor
        .run_command(
            "image.insert",
            Some(serde_json::json!({ "src": " stored.png ", "alt": "A cat" })),
        )
        .unwrap();
    assert!(editor.run_query::<bool>("image.is_active", None).unwrap());
    let attrs = editor.run_query::<Option<ImageAttrs>>("image.attrs", None).unwrap().unwrap();
    assert_eq!(attrs.src, "stored.png");
    assert_eq!(attrs.alt, "A cat");

    editor
        .run_command("image.set_alt", Some(serde_json::json!({ "alt": "A dog" })))
        .unwrap();
    editor
        .run_command("image.set_alt", Some(serde_json::json!({ "alt": "   " })))
        .unwrap();
    assert_eq!(image_attrs(&editor, 0).alt, "A dog");

    assert!(editor.run_command("image.insert", Some(serde_json::json!({ "src": "" }))).is_err());

    editor.run_command("image.delete", None).unwrap();
    let Node::Element(block) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    assert_eq!(block.kind, BlockKind::Paragraph);
    assert!(!editor.run_query::<bool>("image.is_active", None).unwrap());
}
