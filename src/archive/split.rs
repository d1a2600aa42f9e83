use std::path::Path;

use crate::core::{path, NotFoundError, SplitResult};

/// 在复合路径中找出最长的真实文件前缀。
///
/// `/docs/archive.zip/folder/file.txt` → (`/docs/archive.zip`, `folder/file.txt`)，
/// 事先不需要知道有几段属于归档内部。`right` 为调用方已经剥离的虚拟后缀，通常传空串。
pub fn split(left: &str, right: &str) -> Result<SplitResult, NotFoundError> {
    let original = path::join(left, right);
    let not_found = || NotFoundError {
        path: original.clone(),
    };

    let mut left = path::normalize(left);
    let mut right = path::normalize(right);
    loop {
        if Path::new(&left).is_file() {
            return Ok(SplitResult {
                existing: left,
                suffix: right,
            });
        }

        // 相对路径的最左段
        let Some((new_left, last)) = path::split_last(&left) else {
            return Err(not_found());
        };

        // Unix 根 / 盘符根
        if path::is_unix_root(new_left) || path::is_drive_root(new_left) {
            return Err(not_found());
        }

        right = path::join(last, &right);
        left = new_left.to_string();
    }
}

/// `split(path, "")`
pub fn split_at_existing(path: &str) -> Result<SplitResult, NotFoundError> {
    split(path, "")
}
