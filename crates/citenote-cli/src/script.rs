use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::{Context, Result};
use citenote_engine::commands::{
    AnnotationEntry, ImportEnv, IndentDirection, attach_imported_image, change_indent,
    insert_annotations_and_citations, set_citation, toggle_alignment, toggle_dir, toggle_list,
    toggle_mark,
};
use citenote_engine::model::{Align, Citation, MarkAttrs, MarkType, NodeType, TextDir};
use citenote_engine::plugins::{DimensionsStore, ImageHost, ImageImport};
use citenote_engine::{Editor, Selection};
use log::info;
use serde::Deserialize;

/// One editing step of a script file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ScriptStep {
    SetSelection {
        selection: Selection,
    },
    ToggleMark {
        mark: MarkType,
        #[serde(default)]
        attrs: MarkAttrs,
        #[serde(default)]
        force: bool,
    },
    ToggleAlignment {
        align: Align,
    },
    ToggleDir {
        dir: TextDir,
    },
    Indent,
    Outdent,
    ToggleList {
        list: ListKind,
    },
    InsertAnnotations {
        entries: Vec<AnnotationEntry>,
        #[serde(default)]
        pos: Option<usize>,
    },
    SetCitation {
        node_id: String,
        citation: Citation,
    },
    /// Report natural dimensions as a host would after loading the image.
    SetDimensions {
        node_id: String,
        width: u32,
        height: u32,
    },
    AttachImage {
        node_id: String,
        key: String,
    },
    Undo,
    Redo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    Bullet,
    Ordered,
}

impl ListKind {
    fn node_type(self) -> NodeType {
        match self {
            ListKind::Bullet => NodeType::BulletList,
            ListKind::Ordered => NodeType::OrderedList,
        }
    }
}

pub fn parse_script(json: &str) -> Result<Vec<ScriptStep>> {
    serde_json::from_str(json).context("Script must be a JSON array of steps")
}

/// Stands in for an attachment store: records what the engine reports and
/// hands back dimensions queued by `setDimensions` steps.
#[derive(Debug, Default)]
pub struct ScriptHost {
    pub attachment_keys: Vec<String>,
    pub imports: Vec<ImageImport>,
    pub dimensions: DimensionsStore,
}

impl ImageHost for ScriptHost {
    fn sync_attachment_keys(&mut self, keys: &[String]) {
        info!("Document references attachments {keys:?}");
        self.attachment_keys = keys.to_vec();
    }

    fn import_images(&mut self, images: &[ImageImport]) {
        for image in images {
            info!("Image {} is waiting to be stored", image.node_id);
        }
        self.imports.extend_from_slice(images);
    }

    fn take_pending_dimensions(&mut self) -> HashMap<String, (u32, u32)> {
        self.dimensions.take()
    }
}

/// Run one step. Returns whether it applied.
pub fn run_step(
    editor: &mut Editor,
    host: &RefCell<ScriptHost>,
    env: ImportEnv<'_>,
    step: ScriptStep,
) -> Result<bool> {
    let applied = match step {
        ScriptStep::SetSelection { selection } => {
            let mut tr = editor.state().tr();
            tr.set_selection(selection);
            editor
                .dispatch(tr)
                .context("Selection does not fit the document")?;
            true
        }
        ScriptStep::ToggleMark { mark, attrs, force } => {
            editor.exec(&toggle_mark(mark, attrs, force))
        }
        ScriptStep::ToggleAlignment { align } => editor.exec(&toggle_alignment(align)),
        ScriptStep::ToggleDir { dir } => editor.exec(&toggle_dir(dir)),
        ScriptStep::Indent => editor.exec(&change_indent(IndentDirection::Indent)),
        ScriptStep::Outdent => editor.exec(&change_indent(IndentDirection::Outdent)),
        ScriptStep::ToggleList { list } => {
            editor.exec(&toggle_list(list.node_type(), NodeType::ListItem))
        }
        ScriptStep::InsertAnnotations { entries, pos } => {
            editor.exec(&insert_annotations_and_citations(entries, pos, env))
        }
        ScriptStep::SetCitation { node_id, citation } => {
            editor.exec(&set_citation(node_id, citation))
        }
        ScriptStep::SetDimensions {
            node_id,
            width,
            height,
        } => {
            host.borrow_mut().dimensions.insert(node_id, width, height);
            true
        }
        ScriptStep::AttachImage { node_id, key } => {
            editor.exec(&attach_imported_image(node_id, key))
        }
        ScriptStep::Undo => editor.undo(),
        ScriptStep::Redo => editor.redo(),
    };
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use citenote_engine::EditorState;
    use citenote_engine::ids::RandomIds;
    use citenote_engine::markup::HtmlMarkup;
    use citenote_engine::model::build::{doc, p, text};
    use citenote_engine::plugins::ImageSyncPlugin;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::rc::Rc;

    fn editor(host: &Rc<RefCell<ScriptHost>>) -> Editor {
        let state = EditorState::with_selection(
            doc(vec![p(vec![text("hello world")])]),
            Selection::cursor(1),
        );
        Editor::new(state).with_plugin(ImageSyncPlugin::new(Rc::clone(host)))
    }

    fn run_all(
        editor: &mut Editor,
        host: &RefCell<ScriptHost>,
        steps: Vec<ScriptStep>,
    ) -> Vec<bool> {
        let env = ImportEnv::new(&HtmlMarkup, &RandomIds);
        steps
            .into_iter()
            .map(|step| run_step(editor, host, env, step).unwrap())
            .collect()
    }

    #[test]
    fn parses_steps() {
        let steps = parse_script(
            r#"[
                {"command": "setSelection", "selection": {"type": "text", "anchor": 1, "head": 6}},
                {"command": "toggleMark", "mark": "strong"},
                {"command": "toggleList", "list": "ordered"},
                {"command": "attachImage", "nodeId": "n1", "key": "K"},
                {"command": "undo"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            steps,
            vec![
                ScriptStep::SetSelection {
                    selection: Selection::text(1, 6)
                },
                ScriptStep::ToggleMark {
                    mark: MarkType::Strong,
                    attrs: MarkAttrs::default(),
                    force: false,
                },
                ScriptStep::ToggleList {
                    list: ListKind::Ordered
                },
                ScriptStep::AttachImage {
                    node_id: "n1".to_string(),
                    key: "K".to_string(),
                },
                ScriptStep::Undo,
            ]
        );
    }

    #[rstest]
    #[case::not_an_array(r#"{"command": "undo"}"#)]
    #[case::unknown_command(r#"[{"command": "explode"}]"#)]
    #[case::missing_field(r#"[{"command": "toggleAlignment"}]"#)]
    fn rejects_malformed_scripts(#[case] json: &str) {
        assert!(parse_script(json).is_err());
    }

    #[test]
    fn mark_then_undo() {
        let host = Rc::new(RefCell::new(ScriptHost::default()));
        let mut editor = editor(&host);
        let original = editor.state().doc.clone();

        let applied = run_all(
            &mut editor,
            &host,
            vec![
                ScriptStep::SetSelection {
                    selection: Selection::text(1, 6),
                },
                ScriptStep::ToggleMark {
                    mark: MarkType::Strong,
                    attrs: MarkAttrs::default(),
                    force: false,
                },
            ],
        );
        assert_eq!(applied, vec![true, true]);
        assert_ne!(editor.state().doc, original);

        assert_eq!(run_all(&mut editor, &host, vec![ScriptStep::Undo]), vec![true]);
        assert_eq!(editor.state().doc, original);
    }

    #[test]
    fn outdent_at_floor_does_not_apply() {
        let host = Rc::new(RefCell::new(ScriptHost::default()));
        let mut editor = editor(&host);

        assert_eq!(
            run_all(&mut editor, &host, vec![ScriptStep::Outdent, ScriptStep::Indent]),
            vec![false, true]
        );
        assert_eq!(editor.state().doc.child(0).attrs().indent, 1);
    }

    #[test]
    fn imported_image_is_attached_with_dimensions() {
        let host = Rc::new(RefCell::new(ScriptHost::default()));
        let mut editor = editor(&host);
        let entries: Vec<AnnotationEntry> = serde_json::from_str(
            r#"[{"annotation": {
                "uri": "zotero://attachment/1",
                "position": {"pageIndex": 0, "rects": [[0, 0, 100, 50]]},
                "image": "data:image/png;base64,AA"
            }}]"#,
        )
        .unwrap();

        run_all(
            &mut editor,
            &host,
            vec![ScriptStep::InsertAnnotations { entries, pos: None }],
        );
        let node_id = host.borrow().imports[0].node_id.clone();
        run_all(
            &mut editor,
            &host,
            vec![
                ScriptStep::SetDimensions {
                    node_id: node_id.clone(),
                    width: 200,
                    height: 100,
                },
                ScriptStep::AttachImage {
                    node_id,
                    key: "KEY9".to_string(),
                },
            ],
        );

        assert_eq!(host.borrow().attachment_keys, vec!["KEY9".to_string()]);
        assert!(host.borrow().dimensions.is_empty());
        let image = editor.state().doc.child(0).child(0).clone();
        assert_eq!(image.attrs().natural_width, Some(200));
        assert_eq!(image.attrs().src, None);
    }
}
