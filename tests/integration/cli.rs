use super::support::Fixture;
use cairn::config::CairnConfig;
use cairn::tooling::cli::{CliContext, Commands};
use std::fs;

fn context_with_store(fx: &Fixture) -> CliContext {
    let mut config = CairnConfig::default();
    config.store.root = Some(fx.store());
    config.index.path = fx.index_path();
    CliContext::from_config(config)
}

#[test]
fn index_copy_reconstruct_through_commands() {
    let fx = Fixture::new();
    fx.write("a/x.txt", "hello\n");
    fx.write("a/y.txt", "hello\n");
    let cli = context_with_store(&fx);

    let out = cli
        .execute(&Commands::Index {
            dirs: vec![fx.source()],
            index: None,
            follow_symlinks: false,
            format: "json".to_string(),
        })
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["records_added"], 2);
    assert_eq!(json["stats"]["files_hashed"], 2);

    let out = cli
        .execute(&Commands::Copy {
            indexes: vec![fx.index_path()],
            out: None,
            source: Some("laptop".to_string()),
            format: "json".to_string(),
        })
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["copied"], 1);
    let archived: Vec<String> = fs::read_dir(fx.store())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("laptop.file_index.bak-"))
        .collect();
    assert_eq!(archived.len(), 1);

    let dest = fx.temp.path().join("restore");
    let out = cli
        .execute(&Commands::Reconstruct {
            indexes: vec![fx.index_path()],
            source: None,
            root: dest.clone(),
            filter: vec!["*/y.txt".to_string()],
            translate: vec![".*/".to_string(), "/flat/".to_string()],
            format: "json".to_string(),
        })
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["links_created"], 1);
    assert_eq!(json["filtered_out"], 1);
    assert_eq!(fs::read_to_string(dest.join("flat/y.txt")).unwrap(), "hello\n");
}

#[test]
fn ls_lists_the_virtual_root() {
    let fx = Fixture::new();
    fx.write("x.txt", "data");
    fx.index();
    let cli = context_with_store(&fx);

    let out = cli
        .execute(&Commands::Ls {
            index: fx.index_path(),
            path: "/".to_string(),
            store: None,
            format: "json".to_string(),
        })
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["directory"], true);

    let text = cli
        .execute(&Commands::Ls {
            index: fx.index_path(),
            path: "/".to_string(),
            store: None,
            format: "text".to_string(),
        })
        .unwrap();
    assert!(text.contains("Inode"));
}

#[cfg(not(feature = "fuse"))]
#[test]
fn mount_requires_fuse_feature() {
    let fx = Fixture::new();
    let cli = context_with_store(&fx);
    let err = cli
        .execute(&Commands::Mount {
            index: fx.index_path(),
            mountpoint: fx.temp.path().join("mnt"),
            store: None,
            uid: None,
            gid: None,
            fs_name: None,
            debug_fuse: false,
        })
        .unwrap_err();
    assert!(matches!(err, cairn::error::ApiError::Unsupported(_)));
}
