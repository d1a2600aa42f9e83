use std::path::PathBuf;

/// 路径拆分走到尽头（相对路径最左段 / 根）仍未找到真实文件
#[derive(Debug, thiserror::Error)]
#[error("file not found: {path}")]
pub struct NotFoundError {
    pub path: String,
}

/// scratch 配额不足：在复制任何字节之前抛出
#[derive(Debug, thiserror::Error)]
#[error("not enough scratch space: {required} bytes required, {remaining} bytes remaining")]
pub struct DiskSpaceError {
    pub required: u64,
    pub remaining: u64,
}

/// 解包归档条目时的底层 I/O 失败
#[derive(Debug, thiserror::Error)]
#[error("failed to unpack {entry} to {target:?}: {source}")]
pub struct IndexingError {
    pub entry: String,
    pub target: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error(transparent)]
    DiskSpace(#[from] DiskSpaceError),
    #[error(transparent)]
    Indexing(#[from] IndexingError),
}

/// 查询语法错误；`query` 保留用户原文，直接展示给用户
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid query: {reason}\n{query}")]
pub struct SearchError {
    pub query: String,
    pub reason: String,
}

impl SearchError {
    pub fn new(query: &str, reason: impl Into<String>) -> Self {
        Self {
            query: query.to_string(),
            reason: reason.into(),
        }
    }
}
