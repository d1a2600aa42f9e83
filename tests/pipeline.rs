use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docvfs::archive::{split_at_existing, ArchiveClassifier, ArchiveMaterializer};
use docvfs::core::{path, ResolvedNode, RelativePathRecord};
use docvfs::crawl::list_tree;
use docvfs::query::build_query;
use docvfs::storage::{ScratchProvider, ScratchSpace};
use docvfs::vfs::{VirtualFs, ZipFs};
use zip::write::FileOptions;
use zip::ZipWriter;

fn tmp_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("docvfs-it-{}-{}", tag, nanos));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut w = ZipWriter::new(std::fs::File::create(path).unwrap());
    for (name, data) in entries {
        w.start_file(*name, FileOptions::default()).unwrap();
        w.write_all(data).unwrap();
    }
    w.finish().unwrap();
}

fn slash(p: &Path) -> String {
    path::normalize(&p.to_string_lossy())
}

#[test]
fn crawl_materialize_and_record() {
    let root = tmp_dir("pipeline");
    let docs = root.join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    std::fs::write(docs.join("plain.txt"), b"plain text").unwrap();
    write_zip(
        &docs.join("bundle.zip"),
        &[
            ("reports/q1.txt", b"first quarter".as_slice()),
            ("reports/q2.txt", b"second quarter".as_slice()),
        ],
    );

    let vfs: Arc<dyn VirtualFs> = Arc::new(ZipFs::default());
    let classifier = ArchiveClassifier::new(vfs.clone());
    let scratch = Arc::new(ScratchSpace::with_budget(&root.join("scratch"), 1 << 20, 1 << 20).unwrap());
    let materializer = ArchiveMaterializer::new(vfs.clone(), scratch.clone());

    let index_root = format!("{}/index", slash(&root));
    let mut records = Vec::new();

    for (p, node) in list_tree(vfs.as_ref(), &classifier, &docs) {
        match &node {
            ResolvedNode::RealFile { .. } => {
                records.push((RelativePathRecord::encode(&index_root, &p), std::fs::read(&p).unwrap()));
            }
            ResolvedNode::ArchiveEntry(_) => {
                let real = materializer.materialize(&node).unwrap().unwrap();
                records.push((RelativePathRecord::encode(&index_root, &p), std::fs::read(real).unwrap()));
            }
            _ => {}
        }
    }

    assert_eq!(records.len(), 3);
    assert_eq!(scratch.file_count(), 2);
    assert_eq!(
        scratch.remaining(),
        (1 << 20) - ("first quarter".len() + "second quarter".len()) as u64
    );

    let stored: Vec<&str> = records.iter().map(|(r, _)| r.as_str()).collect();
    assert_eq!(
        stored,
        vec![
            "../docs/bundle.zip/reports/q1.txt",
            "../docs/bundle.zip/reports/q2.txt",
            "../docs/plain.txt",
        ]
    );
    assert_eq!(records[0].1, b"first quarter");

    // 记录经过 JSON 存取后仍能还原，并能拆回真实归档
    let json = serde_json::to_string(&records[1].0).unwrap();
    let loaded: RelativePathRecord = serde_json::from_str(&json).unwrap();
    let abs = loaded.resolve(&index_root);
    let split = split_at_existing(&abs).unwrap();
    assert_eq!(split.existing, format!("{}/bundle.zip", slash(&docs)));
    assert_eq!(split.suffix, "reports/q2.txt");

    scratch.cleanup();
    assert_eq!(scratch.file_count(), 0);
}

#[test]
fn query_flags_follow_operator_preference() {
    let and = build_query("quarter report", false).unwrap();
    assert_eq!(and.query.to_string(), "+content:quarter +content:report");
    let or = build_query("quarter report", true).unwrap();
    assert_eq!(or.query.to_string(), "content:quarter content:report");
    assert!(build_query("\"first quarter\"", true).unwrap().is_phrase_query);
}
