//! 预筛计划（Aho-Corasick 锚点 + 规则正则）
//!
//! 设计目标：
//! - 从规则正则中抽取“必现”的字面量锚点，构建全局 AC 自动机。
//! - 扫描时先用 AC 判定哪些规则的锚点出现过，只对这些规则运行正则。
//! - 抽不出锚点的规则（含交替、内联标志等）每次都参与匹配。

use std::collections::{BTreeSet, HashMap, HashSet};
use std::iter::Peekable;
use std::str::Chars;

use aho_corasick::AhoCorasick;
use anyhow::Result;
use tracing::{debug, warn};

use crate::rules::RuleSpec;

/// 编译后的规则
pub(crate) struct CompiledRule {
    pub(crate) id: String,
    pub(crate) regex: regex::bytes::Regex,
}

/// 预筛计划（只读，可跨线程共享）
pub(crate) struct PrefilterPlan {
    pub(crate) rules: Vec<CompiledRule>,
    /// 全局锚点自动机；没有任何锚点时为 None
    ac: Option<AhoCorasick>,
    /// 锚点索引 -> 规则索引列表
    anchor_to_rules: Vec<Vec<usize>>,
    /// 无锚点、需要全量匹配的规则
    unanchored: Vec<usize>,
}

impl PrefilterPlan {
    /// 返回需要在 `buf` 上运行正则的规则索引（升序）
    pub(crate) fn candidate_rules(&self, buf: &[u8]) -> Vec<usize> {
        let mut set: BTreeSet<usize> = self.unanchored.iter().copied().collect();
        if let Some(ac) = &self.ac {
            for m in ac.find_overlapping_iter(buf) {
                if let Some(rules) = self.anchor_to_rules.get(m.pattern().as_usize()) {
                    set.extend(rules.iter().copied());
                }
                if set.len() == self.rules.len() { break; }
            }
        }
        set.into_iter().collect()
    }
}

/// 从 RuleSpec 列表构建预筛计划；无法编译的正则跳过并告警
pub(crate) fn build_prefilter_plan(specs: &[RuleSpec]) -> Result<PrefilterPlan> {
    let mut rules: Vec<CompiledRule> = Vec::with_capacity(specs.len());
    let mut all_anchors: Vec<Vec<u8>> = Vec::new();
    let mut anchor_index: HashMap<Vec<u8>, usize> = HashMap::new();
    let mut anchor_to_rules: Vec<Vec<usize>> = Vec::new();
    let mut unanchored: Vec<usize> = Vec::new();

    for spec in specs {
        let regex = match regex::bytes::Regex::new(&spec.pattern) {
            Ok(rx) => rx,
            Err(err) => {
                warn!(rule = %spec.id, %err, "skipping rule with invalid pattern");
                continue;
            }
        };
        let idx = rules.len();
        rules.push(CompiledRule { id: spec.id.clone(), regex });

        let anchors = extract_anchors_from_pattern(&spec.pattern);
        if anchors.is_empty() {
            unanchored.push(idx);
            continue;
        }
        for a in anchors {
            let id = *anchor_index.entry(a.clone()).or_insert_with(|| {
                all_anchors.push(a);
                anchor_to_rules.push(Vec::new());
                all_anchors.len() - 1
            });
            anchor_to_rules[id].push(idx);
        }
    }

    // 默认 Standard 语义，支持重叠查找，避免较长锚点遮蔽较短锚点
    let ac = if all_anchors.is_empty() { None } else { Some(AhoCorasick::new(&all_anchors)?) };
    debug!(rules = rules.len(), anchors = all_anchors.len(), unanchored = unanchored.len(), "prefilter plan built");

    Ok(PrefilterPlan { rules, ac, anchor_to_rules, unanchored })
}

/// 从正则模式中抽取必现的锚点字面量（保守）：
/// - 含 `|` 或 `(?` 的模式不抽取，交替与内联标志（如大小写不敏感）无法保证字面量必现
/// - 只取分组外的连续字面量片段；被 `?`、`*`、`{m,n}` 修饰的末字符剔除
/// - 转义序列（含 `\xNN`、`\x{..}`、`\u`、`\U`、`\p{..}`）整体跳过并视为断点
/// - 字符类（含嵌套与开头的 `]`、`^]`）整体跳过并视为断点
/// - 长度不足 3 的片段丢弃
fn extract_anchors_from_pattern(pat: &str) -> Vec<Vec<u8>> {
    if pat.contains('|') || pat.contains("(?") { return Vec::new(); }

    let mut out: HashSet<Vec<u8>> = HashSet::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    let mut class_depth = 0usize;
    // 2 = 刚进入字符类，1 = 已读到 `^`；此时出现的 `]` 是字面量
    let mut class_open = 0u8;
    // 空格与 `#` 只在非 (?x) 模式下是字面量；上面已排除所有 `(?` 模式
    let literal = |ch: char| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '/' | ':' | ' ' | '=' | '@' | '#');

    let mut chars = pat.chars().peekable();
    while let Some(ch) = chars.next() {
        if class_depth > 0 {
            let opening = class_open;
            class_open = 0;
            match ch {
                '^' if opening == 2 => class_open = 1,
                ']' if opening > 0 => {}
                '\\' => skip_escape(&mut chars),
                '[' => { class_depth += 1; class_open = 2; }
                ']' => class_depth -= 1,
                _ => {}
            }
            continue;
        }
        match ch {
            '\\' => { flush_literal(&mut cur, &mut out); skip_escape(&mut chars); }
            '[' => { flush_literal(&mut cur, &mut out); class_depth = 1; class_open = 2; }
            '(' => { flush_literal(&mut cur, &mut out); depth += 1; }
            ')' => { flush_literal(&mut cur, &mut out); depth = depth.saturating_sub(1); }
            '?' | '*' => { cur.pop(); flush_literal(&mut cur, &mut out); }
            '{' => {
                cur.pop();
                flush_literal(&mut cur, &mut out);
                for c in chars.by_ref() { if c == '}' { break; } }
            }
            _ if depth == 0 && literal(ch) => cur.push(ch),
            _ => flush_literal(&mut cur, &mut out),
        }
    }
    flush_literal(&mut cur, &mut out);

    // 排序以稳定（长度降序，字典序）
    let mut v: Vec<Vec<u8>> = out.into_iter().collect();
    v.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    v
}

/// 跳过反斜杠之后的整个转义序列
fn skip_escape(chars: &mut Peekable<Chars<'_>>) {
    match chars.next() {
        Some('x') => skip_hex(chars, 2),
        Some('u') => skip_hex(chars, 4),
        Some('U') => skip_hex(chars, 8),
        Some('p' | 'P') => {
            if chars.peek() == Some(&'{') {
                skip_braced(chars);
            } else {
                chars.next();
            }
        }
        _ => {}
    }
}

/// `{..}` 形式或至多 `n` 位十六进制数字
fn skip_hex(chars: &mut Peekable<Chars<'_>>, n: usize) {
    if chars.peek() == Some(&'{') {
        skip_braced(chars);
        return;
    }
    for _ in 0..n {
        if chars.next_if(|c| c.is_ascii_hexdigit()).is_none() { break; }
    }
}

fn skip_braced(chars: &mut Peekable<Chars<'_>>) {
    for c in chars.by_ref() { if c == '}' { break; } }
}

fn flush_literal(cur: &mut String, out: &mut HashSet<Vec<u8>>) {
    if cur.len() >= 3 {
        out.insert(cur.as_bytes().to_vec());
    }
    cur.clear();
}
