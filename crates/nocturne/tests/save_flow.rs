//! Save, apply and catalog flows against a scratch workspace.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use nocturne::cli::{self, Cli};
use nocturne::{Broadcaster, Config, Error, SaveService, StateEvent, Store};
use serde_json::json;
use tempfile::TempDir;

const SITE_CSS: &str = "\
.title { color: #222; font-size: 2em; }
.nav a { color: navy; border-color: silver; }

@media (min-width: 40em) {
  .nav { display: flex; }
}
";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("styles")).unwrap();
        fs::write(dir.path().join("styles/site.css"), SITE_CSS).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config(&self) -> Config {
        Config {
            stylesheet_dir: self.path().join("styles"),
            color_map: self.path().join("public/dark-mode-colors.json"),
            catalog: self.path().join("public/color-properties.json"),
            ..Config::default()
        }
    }

    fn service(&self, broadcaster: Arc<Broadcaster>) -> SaveService {
        SaveService::new(Store::new(&self.config()), broadcaster)
    }

    fn css(&self, name: &str) -> String {
        fs::read_to_string(self.path().join("styles").join(name)).unwrap()
    }

    fn run(&self, args: &[&str]) -> (bool, String) {
        let mut argv = vec![
            "nocturne".to_string(),
            "--stylesheet-dir".to_string(),
            self.path().join("styles").display().to_string(),
            "--color-map".to_string(),
            self.path().join("public/dark-mode-colors.json").display().to_string(),
            "--catalog".to_string(),
            self.path().join("public/color-properties.json").display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        let cli = Cli::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        let complete = cli::run(&cli, &mut out).unwrap();
        (complete, String::from_utf8(out).unwrap())
    }
}

#[test]
fn save_updates_stylesheet_and_notifies() {
    let ws = Workspace::new();
    let broadcaster = Arc::new(Broadcaster::new());
    let reloads = broadcaster.subscribe();
    let mut service = ws.service(broadcaster);

    let report = service
        .save_payload(json!({
            "site.css": {
                ".title": { "color": "#eee" },
                ".nav a": { "color": "skyblue", "border-color": "#444" }
            }
        }))
        .unwrap();

    assert_eq!(report.message, "Colors saved successfully.");
    assert_eq!(report.updated_files, vec!["site.css"]);
    assert_eq!(reloads.try_recv(), Ok(StateEvent::Update));

    let css = ws.css("site.css");
    assert!(css.starts_with(SITE_CSS));
    assert!(css.ends_with(
        "@media (prefers-color-scheme: dark) {\n  \
         .title {\n    color: #eee;\n  }\n  \
         .nav a {\n    color: skyblue;\n    border-color: #444;\n  }\n}\n"
    ));

    let stored = fs::read_to_string(ws.path().join("public/dark-mode-colors.json")).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(stored["site.css"][".nav a"]["border-color"], "#444");
}

#[test]
fn repeated_save_leaves_stylesheet_untouched() {
    let ws = Workspace::new();
    let mut service = ws.service(Arc::new(Broadcaster::new()));
    let payload = json!({ "site.css": { ".title": { "color": "#eee" } } });

    service.save_payload(payload.clone()).unwrap();
    let first = ws.css("site.css");
    service.save_payload(payload).unwrap();

    assert_eq!(ws.css("site.css"), first);
}

#[test]
fn emptied_sheet_restores_original_text() {
    let ws = Workspace::new();
    let mut service = ws.service(Arc::new(Broadcaster::new()));

    service
        .save_payload(json!({ "site.css": { ".title": { "color": "#eee" } } }))
        .unwrap();
    assert_ne!(ws.css("site.css"), SITE_CSS);

    service.save_payload(json!({ "site.css": {} })).unwrap();
    assert_eq!(ws.css("site.css"), SITE_CSS);
}

#[test]
fn invalid_payload_is_rejected_before_any_write() {
    let ws = Workspace::new();
    let broadcaster = Arc::new(Broadcaster::new());
    let reloads = broadcaster.subscribe();
    let mut service = ws.service(broadcaster);

    for payload in [
        json!(["site.css"]),
        json!({ "site.css": { ".title": "red" } }),
        json!({ "site.css": { ".title": { "color": 3 } } }),
    ] {
        let err = service.save_payload(payload).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{}", err);
    }

    assert_eq!(ws.css("site.css"), SITE_CSS);
    assert!(!ws.path().join("public/dark-mode-colors.json").exists());
    assert!(reloads.try_recv().is_err());
}

#[test]
fn one_bad_stylesheet_does_not_block_the_rest() {
    let ws = Workspace::new();
    fs::write(ws.path().join("styles/broken.css"), ".a { color: red; ").unwrap();
    let broadcaster = Arc::new(Broadcaster::new());
    let reloads = broadcaster.subscribe();
    let mut service = ws.service(broadcaster);

    let report = service
        .save_payload(json!({
            "broken.css": { ".a": { "color": "white" } },
            "gone.css": { ".a": { "color": "white" } },
            "site.css": { ".title": { "color": "white" } }
        }))
        .unwrap();

    assert_eq!(report.updated_files, vec!["site.css"]);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].file, "broken.css");
    assert_eq!(report.failures[1].file, "gone.css");
    assert!(report.failures[1].error.contains("not found"));
    assert_eq!(reloads.try_recv(), Ok(StateEvent::Update));
    assert!(ws.css("site.css").contains("color: white;"));
}

#[test]
fn cli_apply_uses_stored_map() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.path().join("public")).unwrap();
    fs::write(
        ws.path().join("public/dark-mode-colors.json"),
        r##"{ "site.css": { ".title": { "color": "#ddd" } } }"##,
    )
    .unwrap();

    let (complete, out) = ws.run(&["apply"]);

    assert!(complete);
    assert!(out.contains("updated site.css (3 changes)"), "{}", out);
    assert!(ws.css("site.css").contains("color: #ddd;"));

    let (_, out) = ws.run(&["apply"]);
    assert!(out.contains("updated site.css (unchanged)"), "{}", out);
}

#[test]
fn cli_save_prints_json_report() {
    let ws = Workspace::new();
    let payload = ws.path().join("payload.json");
    fs::write(&payload, r##"{ "site.css": { ".title": { "color": "#ddd" } } }"##).unwrap();

    let (complete, out) = ws.run(&["save", payload.to_str().unwrap()]);

    assert!(complete);
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["updatedFiles"], json!(["site.css"]));
    assert_eq!(report["failures"], json!([]));
}

#[test]
fn cli_set_and_unset_round_trip() {
    let ws = Workspace::new();

    let (complete, _) = ws.run(&["set", "site.css", ".nav a", "color", "#9cf"]);
    assert!(complete);
    assert!(ws.css("site.css").contains("  .nav a {\n    color: #9cf;\n  }\n"));

    let (_, shown) = ws.run(&["show"]);
    assert!(shown.contains("#9cf"));

    let (complete, _) = ws.run(&["unset", "site.css", ".nav a", "color"]);
    assert!(complete);
    assert_eq!(ws.css("site.css"), SITE_CSS);
}

#[test]
fn cli_catalog_writes_color_attributes() {
    let ws = Workspace::new();
    fs::write(ws.path().join("styles/plain.css"), "p { margin: 0; }").unwrap();

    let (complete, out) = ws.run(&["catalog"]);
    assert!(complete);
    assert!(out.starts_with("Cataloged 3 attributes in 1 stylesheets"));

    let catalog = fs::read_to_string(ws.path().join("public/color-properties.json")).unwrap();
    let catalog: serde_json::Value = serde_json::from_str(&catalog).unwrap();
    assert_eq!(
        catalog,
        json!({
            "site.css": {
                ".title": ["color"],
                ".nav a": ["color", "border-color"]
            }
        })
    );
}
