use std::path::Path;

use ignore::WalkBuilder;
use rayon::prelude::*;

use crate::archive::ArchiveClassifier;
use crate::core::{path, ResolvedNode};
use crate::vfs::VirtualFs;

/// 列出 root 下的全部节点（含归档内部），按路径排序。
///
/// 真实目录用 `ignore` 遍历（不跳过隐藏文件，不读 .gitignore 等规则），
/// 分类在 rayon 上并行；归档容器及其内部目录通过 `list_dir` 递归展开。
/// 单个归档读取失败只记日志并跳过，不影响其余节点。
pub fn list_tree(
    vfs: &dyn VirtualFs,
    classifier: &ArchiveClassifier,
    root: &Path,
) -> Vec<(String, ResolvedNode)> {
    let real: Vec<String> = WalkBuilder::new(root)
        .standard_filters(false)
        .build()
        .filter_map(|e| match e {
            Ok(e) => Some(path::normalize(&e.path().to_string_lossy())),
            Err(err) => {
                tracing::warn!("Walk error under {:?}: {}", root, err);
                None
            }
        })
        .collect();

    let mut nodes: Vec<(String, ResolvedNode)> = real
        .par_iter()
        .filter_map(|p| classifier.classify(p).map(|n| (p.clone(), n)))
        .flat_map_iter(|(p, node)| {
            let mut out = Vec::new();
            if matches!(node, ResolvedNode::ArchiveContainer { .. }) {
                expand(vfs, classifier, &p, &mut out);
            }
            out.push((p, node));
            out
        })
        .collect();

    nodes.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::debug!("Listed {} nodes under {:?}", nodes.len(), root);
    nodes
}

fn expand(
    vfs: &dyn VirtualFs,
    classifier: &ArchiveClassifier,
    dir: &str,
    out: &mut Vec<(String, ResolvedNode)>,
) {
    let children = match vfs.list_dir(dir) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Cannot list {}: {}", dir, e);
            return;
        }
    };

    for child in children {
        let Some(node) = classifier.classify(&child.path) else {
            continue;
        };
        if node.is_browsable() {
            expand(vfs, classifier, &child.path, out);
        }
        out.push((child.path, node));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::vfs::zipfs::testutil::*;
    use crate::vfs::ZipFs;

    #[test]
    fn lists_real_and_archived_nodes() {
        let dir = unique_tmp_dir("crawl");
        std::fs::write(dir.join("a.txt"), b"a").unwrap();
        std::fs::write(dir.join(".hidden"), b"h").unwrap();
        std::fs::write(dir.join("fake.zip"), b"not a zip").unwrap();
        std::fs::create_dir(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub").join("b.txt"), b"b").unwrap();
        std::fs::write(dir.join(".ignore"), b"a.txt\n").unwrap();

        let inner = zip_bytes(&[("y.txt", b"y".as_slice())]);
        write_zip(
            &dir.join("pack.zip"),
            &[
                ("docs/x.txt", b"x".as_slice()),
                ("inner.zip", inner.as_slice()),
            ],
        );

        let vfs: Arc<dyn VirtualFs> = Arc::new(ZipFs::default());
        let classifier = ArchiveClassifier::new(vfs.clone());
        let base = slash(&dir);

        let listed: Vec<(String, &'static str)> = list_tree(vfs.as_ref(), &classifier, &dir)
            .into_iter()
            .map(|(p, n)| {
                let rel = p.strip_prefix(&base).unwrap().trim_start_matches('/').to_string();
                (rel, n.kind_name())
            })
            .collect();

        let expected = vec![
            ("", "real_directory"),
            (".hidden", "real_file"),
            (".ignore", "real_file"),
            ("a.txt", "real_file"),
            ("fake.zip", "real_file"),
            ("pack.zip", "archive_container"),
            ("pack.zip/docs", "archive_folder"),
            ("pack.zip/docs/x.txt", "archive_entry"),
            ("pack.zip/inner.zip", "archive_container"),
            ("pack.zip/inner.zip/y.txt", "archive_entry"),
            ("sub", "real_directory"),
            ("sub/b.txt", "real_file"),
        ];
        let expected: Vec<(String, &str)> =
            expected.into_iter().map(|(p, k)| (p.to_string(), k)).collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn missing_root_is_empty() {
        let vfs: Arc<dyn VirtualFs> = Arc::new(ZipFs::default());
        let classifier = ArchiveClassifier::new(vfs.clone());
        let missing = std::env::temp_dir().join("docvfs-crawl-missing-root");
        assert!(list_tree(vfs.as_ref(), &classifier, &missing).is_empty());
    }
}
