use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::core::path;
use crate::vfs::{ArchiveDetector, DirEntry, NodeKind, View, VirtualFs, VirtualNode};

/// 导航到目标节点后要做的事
enum Visit<'a> {
    Stat,
    Copy { dst: &'a mut dyn Write, written: u64 },
    List { names: Vec<String> },
}

/// zip 实现的虚拟文件系统：真实目录 + 任意层嵌套 zip。
///
/// 外层归档直接从磁盘读；嵌套归档整段读入内存后再打开。
/// 名字匹配 detector 但打不开的文件按普通文件处理。
pub struct ZipFs {
    detector: ArchiveDetector,
}

impl ZipFs {
    pub fn new(detector: ArchiveDetector) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &ArchiveDetector {
        &self.detector
    }

    fn walk(&self, raw: &str, view: View, visit: &mut Visit<'_>) -> io::Result<Option<VirtualNode>> {
        let norm = path::normalize(raw);
        let root = path::root_of(&norm);
        let mut segs = path::segments(&norm);
        if path::drive_letter(&norm).is_some() && !segs.is_empty() {
            segs.remove(0);
        }

        let mut cur = root;
        if segs.is_empty() {
            let probe = if cur.is_empty() { "." } else { cur.as_str() };
            return match std::fs::metadata(probe) {
                Ok(md) if md.is_dir() => self.finish_real_dir(probe, visit),
                _ => Ok(None),
            };
        }

        for (i, seg) in segs.iter().enumerate() {
            if !cur.is_empty() && !cur.ends_with('/') {
                cur.push('/');
            }
            cur.push_str(seg);

            let md = match std::fs::metadata(&cur) {
                Ok(m) => m,
                Err(_) => return Ok(None),
            };
            let is_last = i + 1 == segs.len();

            if md.is_dir() {
                if is_last {
                    return self.finish_real_dir(&cur, visit);
                }
                continue;
            }
            if !md.is_file() {
                return Ok(None);
            }

            let detect = !is_last || view == View::Detecting;
            if detect && self.detector.matches(seg) {
                match open_real_archive(Path::new(&cur)) {
                    Ok(mut zip) => {
                        let container = PathBuf::from(&cur);
                        return self.walk_archive(&mut zip, &segs[i + 1..], view, visit, 1, &container);
                    }
                    Err(e) => {
                        tracing::debug!("{} matches archive patterns but cannot be opened: {}", cur, e);
                    }
                }
            }

            if !is_last {
                // 普通文件下面不会再有子路径
                return Ok(None);
            }
            return Ok(Some(VirtualNode {
                kind: NodeKind::File,
                depth: 0,
                container: None,
                length: md.len(),
                compressed_length: md.len(),
            }));
        }
        Ok(None)
    }

    fn finish_real_dir(&self, dir: &str, visit: &mut Visit<'_>) -> io::Result<Option<VirtualNode>> {
        if let Visit::List { names } = visit {
            let mut out = Vec::new();
            for ent in std::fs::read_dir(dir)? {
                let Ok(ent) = ent else { continue };
                out.push(ent.file_name().to_string_lossy().into_owned());
            }
            out.sort();
            *names = out;
        }
        Ok(Some(VirtualNode {
            kind: NodeKind::Directory,
            depth: 0,
            container: None,
            length: 0,
            compressed_length: 0,
        }))
    }

    /// 在已打开的归档（第 `depth` 层）内继续解析剩余段
    fn walk_archive<R: Read + Seek>(
        &self,
        zip: &mut ZipArchive<R>,
        rest: &[&str],
        view: View,
        visit: &mut Visit<'_>,
        depth: usize,
        container: &Path,
    ) -> io::Result<Option<VirtualNode>> {
        if rest.is_empty() {
            if let Visit::List { names } = visit {
                *names = child_names(zip, "");
            }
            let outer = depth - 1;
            return Ok(Some(VirtualNode {
                kind: NodeKind::Archive,
                depth: outer,
                container: (outer > 0).then(|| container.to_path_buf()),
                length: 0,
                compressed_length: 0,
            }));
        }

        for i in 0..rest.len() {
            let name = rest[..=i].join("/");
            let is_last = i + 1 == rest.len();

            let found = match zip.by_name(&name) {
                Ok(f) if !f.is_dir() => Some((f.size(), f.compressed_size())),
                _ => None,
            };

            if let Some((size, compressed)) = found {
                let detect = !is_last || view == View::Detecting;
                if detect && self.detector.matches(rest[i]) {
                    match read_entry(zip, &name).and_then(open_nested_archive) {
                        Ok(mut inner) => {
                            return self.walk_archive(&mut inner, &rest[i + 1..], view, visit, depth + 1, container);
                        }
                        Err(e) => {
                            tracing::debug!(
                                "{} in {:?} matches archive patterns but cannot be opened: {}",
                                name,
                                container,
                                e
                            );
                        }
                    }
                }

                if !is_last {
                    return Ok(None);
                }
                if let Visit::Copy { dst, written } = visit {
                    let mut f = zip.by_name(&name).map_err(zip_io_error)?;
                    *written = io::copy(&mut f, dst)?;
                }
                return Ok(Some(VirtualNode {
                    kind: NodeKind::File,
                    depth,
                    container: Some(container.to_path_buf()),
                    length: size,
                    compressed_length: compressed,
                }));
            }

            // 目录：显式的 `name/` 条目，或由更深的条目名隐含
            let prefix = format!("{name}/");
            if !zip.file_names().any(|n| n.starts_with(&prefix)) {
                return Ok(None);
            }
            if is_last {
                if let Visit::List { names } = visit {
                    *names = child_names(zip, &prefix);
                }
                return Ok(Some(VirtualNode {
                    kind: NodeKind::Directory,
                    depth,
                    container: Some(container.to_path_buf()),
                    length: 0,
                    compressed_length: 0,
                }));
            }
        }
        Ok(None)
    }
}

impl Default for ZipFs {
    fn default() -> Self {
        Self::new(ArchiveDetector::default())
    }
}

impl VirtualFs for ZipFs {
    fn lookup(&self, path: &str, view: View) -> Option<VirtualNode> {
        match self.walk(path, view, &mut Visit::Stat) {
            Ok(node) => node,
            Err(e) => {
                tracing::debug!("lookup {} failed: {}", path, e);
                None
            }
        }
    }

    fn copy_entry(&self, path: &str, dst: &mut dyn Write) -> io::Result<u64> {
        let mut visit = Visit::Copy { dst, written: 0 };
        let node = self.walk(path, View::Detecting, &mut visit)?;
        match (node, visit) {
            (Some(n), Visit::Copy { written, .. }) if n.kind == NodeKind::File && n.is_entry() => Ok(written),
            (Some(_), _) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not an archive entry: {path}"),
            )),
            (None, _) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such entry: {path}"),
            )),
        }
    }

    fn list_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let mut visit = Visit::List { names: Vec::new() };
        let node = self.walk(path, View::Detecting, &mut visit)?;
        match (node, visit) {
            (Some(n), Visit::List { names }) if n.kind != NodeKind::File => {
                let base = path::normalize(path);
                Ok(names
                    .into_iter()
                    .map(|name| DirEntry {
                        path: path::join(&base, &name),
                        name,
                    })
                    .collect())
            }
            (Some(_), _) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory: {path}"),
            )),
            (None, _) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {path}"),
            )),
        }
    }
}

fn zip_io_error(e: zip::result::ZipError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

fn open_real_archive(p: &Path) -> io::Result<ZipArchive<BufReader<File>>> {
    let f = File::open(p)?;
    ZipArchive::new(BufReader::new(f)).map_err(zip_io_error)
}

fn open_nested_archive(bytes: Vec<u8>) -> io::Result<ZipArchive<Cursor<Vec<u8>>>> {
    ZipArchive::new(Cursor::new(bytes)).map_err(zip_io_error)
}

const PREALLOC_LIMIT: u64 = 1 << 20;

fn read_entry<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> io::Result<Vec<u8>> {
    let mut f = zip.by_name(name).map_err(zip_io_error)?;
    // 头部记录的大小不可信（损坏或伪造的 zip64），预分配设上限
    let mut buf = Vec::with_capacity(f.size().min(PREALLOC_LIMIT) as usize);
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

/// `prefix` 之下的直接子项名（去重、有序）
fn child_names<R: Read + Seek>(zip: &ZipArchive<R>, prefix: &str) -> Vec<String> {
    let mut set = BTreeSet::new();
    for n in zip.file_names() {
        if let Some(rest) = n.strip_prefix(prefix) {
            if let Some(first) = rest.split('/').next().filter(|s| !s.is_empty()) {
                set.insert(first.to_string());
            }
        }
    }
    set.into_iter().collect()
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;

    fn fixture(tag: &str) -> (PathBuf, String) {
        let dir = unique_tmp_dir(tag);
        let inner = zip_bytes(&[("deep.txt", b"deep".as_slice()), ("sub/more.txt", b"more".as_slice())]);
        write_zip(
            &dir.join("archive.zip"),
            &[
                ("inner/doc.txt", b"hello archive".as_slice()),
                ("empty/", b"".as_slice()),
                ("nested.zip", inner.as_slice()),
            ],
        );
        let base = slash(&dir);
        (dir, base)
    }

    #[test]
    fn lookup_real_and_archive_nodes() {
        let (dir, base) = fixture("lookup");
        std::fs::write(dir.join("plain.txt"), b"x").unwrap();
        let fs = ZipFs::default();

        let plain = fs.lookup(&format!("{base}/plain.txt"), View::Detecting).unwrap();
        assert_eq!(plain.kind, NodeKind::File);
        assert!(!plain.is_entry());

        let arc = fs.lookup(&format!("{base}/archive.zip"), View::Detecting).unwrap();
        assert_eq!(arc.kind, NodeKind::Archive);
        assert_eq!(arc.depth, 0);

        let as_file = fs.lookup(&format!("{base}/archive.zip"), View::LeafAsFile).unwrap();
        assert_eq!(as_file.kind, NodeKind::File);

        let doc = fs
            .lookup(&format!("{base}/archive.zip/inner/doc.txt"), View::Detecting)
            .unwrap();
        assert_eq!(doc.kind, NodeKind::File);
        assert_eq!(doc.depth, 1);
        assert_eq!(doc.length, 13);
        assert_eq!(doc.container.as_deref(), Some(dir.join("archive.zip").as_path()));

        let folder = fs.lookup(&format!("{base}/archive.zip/inner"), View::Detecting).unwrap();
        assert_eq!(folder.kind, NodeKind::Directory);
        let empty = fs.lookup(&format!("{base}/archive.zip/empty"), View::Detecting).unwrap();
        assert_eq!(empty.kind, NodeKind::Directory);

        assert!(fs.lookup(&format!("{base}/archive.zip/missing.txt"), View::Detecting).is_none());
        assert!(fs.lookup(&format!("{base}/plain.txt/below"), View::Detecting).is_none());
    }

    #[test]
    fn nested_archives_are_entered() {
        let (dir, base) = fixture("nested");
        let fs = ZipFs::default();

        let nested = fs
            .lookup(&format!("{base}/archive.zip/nested.zip"), View::Detecting)
            .unwrap();
        assert_eq!(nested.kind, NodeKind::Archive);
        assert_eq!(nested.depth, 1);

        let deep = fs
            .lookup(&format!("{base}/archive.zip/nested.zip/sub/more.txt"), View::Detecting)
            .unwrap();
        assert_eq!(deep.kind, NodeKind::File);
        assert_eq!(deep.depth, 2);
        assert_eq!(deep.container, Some(dir.join("archive.zip")));

        let mut out = Vec::new();
        let n = fs
            .copy_entry(&format!("{base}/archive.zip/nested.zip/deep.txt"), &mut out)
            .unwrap();
        assert_eq!(n, 4);
        assert_eq!(out, b"deep");
    }

    #[test]
    fn oversized_header_does_not_panic() {
        use zip::write::FileOptions;
        use zip::{CompressionMethod, ZipWriter};

        let inner = zip_bytes(&[("deep.txt", b"deep".as_slice())]);
        let mut w = ZipWriter::new(Cursor::new(Vec::new()));
        w.start_file(
            "nested.zip",
            FileOptions::default().compression_method(CompressionMethod::Stored),
        )
        .unwrap();
        w.write_all(&inner).unwrap();
        let mut bytes = w.finish().unwrap().into_inner();

        // 中央目录里把 nested.zip 的解压后大小改成 0xFFFFFFFF
        let at = bytes
            .windows(4)
            .rposition(|w| w == b"PK\x01\x02")
            .unwrap();
        bytes[at + 24..at + 28].copy_from_slice(&[0xFF; 4]);

        let dir = unique_tmp_dir("huge");
        std::fs::write(dir.join("outer.zip"), &bytes).unwrap();
        let fs = ZipFs::default();
        let base = slash(&dir);
        assert!(fs.lookup(&format!("{base}/outer.zip/nested.zip"), View::Detecting).is_some());
        let _ = fs.lookup(&format!("{base}/outer.zip/nested.zip/deep.txt"), View::Detecting);
    }

    #[test]
    fn fake_archive_is_plain_file() {
        let dir = unique_tmp_dir("fake");
        std::fs::write(dir.join("report.zip"), b"not really a zip").unwrap();
        let fs = ZipFs::default();
        let node = fs
            .lookup(&format!("{}/report.zip", slash(&dir)), View::Detecting)
            .unwrap();
        assert_eq!(node.kind, NodeKind::File);
        assert!(!node.is_entry());
    }

    #[test]
    fn list_dir_inside_archive() {
        let (_dir, base) = fixture("list");
        let fs = ZipFs::default();
        let names: Vec<String> = fs
            .list_dir(&format!("{base}/archive.zip"))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["empty", "inner", "nested.zip"]);

        let sub = fs.list_dir(&format!("{base}/archive.zip/nested.zip/sub")).unwrap();
        assert_eq!(sub.len(), 1);
        assert_eq!(sub[0].path, format!("{base}/archive.zip/nested.zip/sub/more.txt"));

        assert!(fs.list_dir(&format!("{base}/archive.zip/inner/doc.txt")).is_err());
    }

    #[test]
    fn copy_rejects_real_files() {
        let dir = unique_tmp_dir("copy-real");
        std::fs::write(dir.join("a.txt"), b"x").unwrap();
        let fs = ZipFs::default();
        let mut sink = Vec::new();
        let err = fs
            .copy_entry(&format!("{}/a.txt", slash(&dir)), &mut sink)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(sink.is_empty());
    }
}
