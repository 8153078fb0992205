use manos_prose_core::{
    ApplyError, BlockKind, ContentModel, Document, Editor, EditorConfig, ListKind, MarkSet,
    MarkStripRule, MarkType, Marks, Node, NodeType, Op, PluginRegistry, SchemaError, Transaction,
    TransactionRewriter,
};

fn editor_with(children: Vec<Node>) -> Editor {
    Editor::from_config(Document::new(children), EditorConfig::default())
}

#[test]
fn richtext_schema_describes_every_node() {
    let editor = Editor::with_richtext_plugins();
    let schema = editor.schema();

    assert_eq!(
        schema.node_type(NodeType::Blockquote),
        Some(&ContentModel::Single(NodeType::Paragraph))
    );
    assert_eq!(
        schema.node_type(NodeType::ListItem),
        Some(&ContentModel::OneOrMore(NodeType::Paragraph))
    );
    assert_eq!(
        schema.node_type(NodeType::BulletList),
        Some(&ContentModel::OneOrMore(NodeType::ListItem))
    );
    assert_eq!(schema.node_type(NodeType::Heading), Some(&ContentModel::Inline));
    assert_eq!(schema.node_type(NodeType::Youtube), Some(&ContentModel::Leaf));

    assert!(schema.allows_child(NodeType::Doc, NodeType::Image));
    assert!(schema.allows_child(NodeType::Doc, NodeType::Youtube));
    assert!(!schema.allows_child(NodeType::Doc, NodeType::ListItem));
    assert!(!schema.allows_child(NodeType::ListItem, NodeType::Image));

    let image = schema.lookup("imageComponent").unwrap();
    assert_eq!(image.node_type, NodeType::Image);
    assert!(image.draggable && image.isolating);
    assert!(schema.spec(NodeType::Youtube).unwrap().atom);

    let caption = schema.allowed_marks(NodeType::Image);
    assert!(caption.contains(MarkType::Bold));
    assert!(caption.contains(MarkType::Link));
    assert!(!caption.contains(MarkType::Italic));
    assert!(schema.allowed_marks(NodeType::Heading).is_empty());
    assert!(schema.allowed_marks(NodeType::Blockquote).is_empty());

    assert!(!schema.is_inclusive(MarkType::Bold));
    assert!(!schema.is_inclusive(MarkType::Link));
    assert!(schema.is_inclusive(MarkType::Underline));
}

#[test]
fn ops_that_break_the_content_model_are_rejected() {
    let mut editor = editor_with(vec![Node::list(ListKind::Bullet, ["a"])]);
    let before = editor.doc().clone();

    let err = editor
        .apply(Transaction::new(vec![Op::InsertNode {
            path: vec![0, 0, 1],
            node: Node::heading(2, "nope"),
        }]))
        .unwrap_err();

    assert!(matches!(
        err,
        ApplyError::Schema(SchemaError::DisallowedChild {
            parent: NodeType::ListItem,
            child: NodeType::Heading,
        })
    ));
    assert_eq!(editor.doc(), &before);
}

#[test]
fn schema_check_reports_marks_outside_the_whitelist() {
    let registry = PluginRegistry::richtext(&EditorConfig::default());
    let doc = Document::new(vec![Node::element(
        BlockKind::Heading { level: 2 },
        vec![Node::marked_text(
            "Loud",
            Marks {
                bold: true,
                ..Marks::default()
            },
        )],
    )]);

    assert_eq!(
        registry.schema().check(&doc),
        Err(SchemaError::DisallowedMark {
            mark: MarkType::Bold,
            path: vec![0, 0],
        })
    );
    assert!(registry.schema().check(&Document::new(vec![Node::heading(2, "Calm")])).is_ok());
}

#[test]
fn schema_check_reports_child_counts() {
    let registry = PluginRegistry::richtext(&EditorConfig::default());
    let doc = Document::new(vec![Node::element(
        BlockKind::Blockquote,
        vec![Node::paragraph("a"), Node::paragraph("b")],
    )]);

    assert!(matches!(
        registry.schema().check(&doc),
        Err(SchemaError::ChildCount {
            node: NodeType::Blockquote,
            found: 2,
            ..
        })
    ));
    assert!(matches!(
        registry.schema().check(&Document::default()),
        Err(SchemaError::ChildCount {
            node: NodeType::Doc,
            ..
        })
    ));
}

#[test]
fn every_document_ends_with_a_paragraph() {
    let editor = Editor::with_richtext_plugins();
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);

    let editor = editor_with(vec![Node::heading(2, "Title")]);
    assert_eq!(
        editor.doc().children,
        vec![Node::heading(2, "Title"), Node::paragraph("")]
    );

    let editor = editor_with(vec![Node::youtube("abc")]);
    assert_eq!(
        editor.doc().children,
        vec![Node::youtube("abc"), Node::paragraph("")]
    );
}

#[test]
fn mark_strip_rule_emits_one_corrective_transaction() {
    let mut rewriter = TransactionRewriter::default();
    rewriter.push(Box::new(MarkStripRule::new(
        "test.strip",
        NodeType::Blockquote,
        MarkSet::NONE.with(MarkType::Code),
    )));

    let marked = Document::new(vec![Node::element(
        BlockKind::Blockquote,
        vec![Node::element(
            BlockKind::Paragraph,
            vec![Node::marked_text(
                "q",
                Marks {
                    bold: true,
                    code: true,
                    ..Marks::default()
                },
            )],
        )],
    )]);

    let correction = rewriter
        .rewrite(&Document::default(), &marked, &Transaction::default())
        .unwrap();
    assert_eq!(
        correction.ops,
        vec![Op::SetTextMarks {
            path: vec![0, 0, 0],
            marks: Marks {
                code: true,
                ..Marks::default()
            },
        }]
    );
    assert_eq!(correction.meta.source.as_deref(), Some("rewrite:test.strip"));

    let mut corrected = marked.clone();
    set_text_marks(&mut corrected, &correction.ops);
    assert!(
        rewriter
            .rewrite(&marked, &corrected, &Transaction::default())
            .is_none()
    );
}

fn set_text_marks(doc: &mut Document, ops: &[Op]) {
    for op in ops {
        let Op::SetTextMarks { path, marks } = op else {
            panic!("unexpected op {op:?}");
        };
        let (leaf, parents) = path.split_last().unwrap();
        let mut children = &mut doc.children;
        for &ix in parents {
            children = match &mut children[ix] {
                Node::Element(el) => &mut el.children,
                other => panic!("expected element, got {other:?}"),
            };
        }
        let Node::Text(text) = &mut children[*leaf] else {
            panic!("expected text leaf");
        };
        text.marks = marks.clone();
    }
}

#[test]
fn every_registered_command_and_query_is_reachable() {
    let mut editor = Editor::with_richtext_plugins();

    for id in [
        "marks.toggle",
        "link.set",
        "text.insert",
        "heading.toggle",
        "blockquote.toggle",
        "list.toggle_bullet",
        "list.toggle_ordered",
        "image.insert",
        "image.set_alt",
        "image.delete",
        "youtube.insert",
    ] {
        assert!(editor.registry().command(id).is_some(), "missing command {id}");
    }
    for id in [
        "marks.get_active",
        "marks.is_active",
        "link.href",
        "heading.level",
        "blockquote.is_active",
        "list.active_type",
        "image.is_active",
        "image.attrs",
        "nav.state",
        "block.active_types",
    ] {
        assert!(editor.registry().query(id).is_some(), "missing query {id}");
    }

    let err = editor.run_command("nope", None).unwrap_err();
    assert_eq!(err.message(), "Unknown command: nope");
    assert!(editor.run_query_json("nope", None).is_err());

    editor
        .run_command("youtube.insert", Some(serde_json::json!({ "src": "  " })))
        .unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);

    editor
        .run_command("youtube.insert", Some(serde_json::json!({ "src": "abc" })))
        .unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph(""), Node::youtube("abc"), Node::paragraph("")]
    );
    assert_eq!(
        editor
            .run_query::<Vec<NodeType>>("block.active_types", None)
            .unwrap(),
        vec![NodeType::Paragraph]
    );
}

#[test]
fn config_reads_from_json_with_defaults() {
    let config = EditorConfig::from_json_str(r#"{ "heading_levels": [3, 2, 9], "paste_profile": "schema" }"#)
        .unwrap();

    assert_eq!(config.heading_levels, vec![2, 3]);
    assert_eq!(config.max_normalize_iterations, 100);
    assert!(config.editable);

    let read_only = EditorConfig::read_only();
    assert!(!read_only.editable);
    assert_eq!(read_only.heading_levels, vec![2, 3]);
}
