//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了层级缓存键的路径工具。
//!
//! 缓存键以 `/` 分隔层级，例如 `news/list/2`。失效检查需要按从根到叶的顺序
//! 依次得到所有祖先前缀：`news`、`news/list`、`news/list/2`。

use std::iter::FusedIterator;

/// 层级分隔符
pub const SEPARATOR: char = '/';

/// 祖先前缀迭代器
///
/// 每个元素都是原始键的切片，不分配内存。
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    key: &'a str,
    /// 下一次查找分隔符的起始位置，`None` 表示已结束
    cursor: Option<usize>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.cursor?;
        match self.key[start..].find(SEPARATOR) {
            Some(offset) => {
                let end = start + offset;
                self.cursor = Some(end + SEPARATOR.len_utf8());
                Some(&self.key[..end])
            }
            None => {
                self.cursor = None;
                Some(self.key)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.cursor {
            Some(start) => {
                let n = self.key[start..].matches(SEPARATOR).count() + 1;
                (n, Some(n))
            }
            None => (0, Some(0)),
        }
    }
}

impl ExactSizeIterator for Ancestors<'_> {}

impl FusedIterator for Ancestors<'_> {}

/// 返回 `key` 的所有祖先前缀（包括 `key` 本身），从根到叶
///
/// 空段会被保留：`a//b` 得到 `a`、`a/`、`a//b`；空键只产生一个空前缀。
///
/// # 示例
///
/// ```
/// use pathcache::key_path::ancestors;
///
/// let prefixes: Vec<&str> = ancestors("news/list/2").collect();
/// assert_eq!(prefixes, vec!["news", "news/list", "news/list/2"]);
/// ```
pub fn ancestors(key: &str) -> Ancestors<'_> {
    Ancestors {
        key,
        cursor: Some(0),
    }
}

/// 键的层级深度，即祖先前缀的数量
pub fn depth(key: &str) -> usize {
    key.matches(SEPARATOR).count() + 1
}

/// 判断 `prefix` 是否按段边界覆盖 `key`
///
/// `news` 覆盖 `news` 与 `news/list/2`，但不覆盖 `newsletter/1`。
pub fn is_ancestor_or_self(prefix: &str, key: &str) -> bool {
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}
