//! 字节级扫描引擎（小文件整读 + 大文件分块）
use anyhow::Result;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::findings::Hit;
use crate::prefilter::PrefilterPlan;

/// 小文件阈值（字节）。小文件整读，超出则分块扫描。
pub(crate) const SMALL_FILE_MAX: u64 = 1024 * 1024; // 1 MiB
/// 分块大小与重叠字节数
/// 跨越块边界的命中只有在起点落入上一块末尾 `CHUNK_OVERLAP` 字节内时才能找到，
/// 即长度不超过 `CHUNK_OVERLAP` 的特征串不会因分块漏检；更长的跨块命中可能漏检。
pub(crate) const CHUNK_SIZE: usize = 4 * 1024 * 1024; // 4 MiB
pub(crate) const CHUNK_OVERLAP: usize = 512;

/// 整读扫描单个文件
pub(crate) fn scan_file_whole(path: &Path, plan: &PrefilterPlan) -> Result<Vec<Hit>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;

    let mut seen = HashSet::new();
    Ok(scan_buffer(&buf, 0, plan, &mut seen))
}

/// 分块扫描大文件
pub(crate) fn scan_file_chunked(path: &Path, plan: &PrefilterPlan) -> Result<Vec<Hit>> {
    let file = File::open(path)?;
    scan_reader_chunked(BufReader::new(file), plan, CHUNK_SIZE, CHUNK_OVERLAP)
}

/// 分块读取并扫描；相邻块之间保留 `overlap` 字节，命中偏移映射回全局偏移
pub(crate) fn scan_reader_chunked<R: Read>(mut reader: R, plan: &PrefilterPlan, chunk_size: usize, overlap: usize) -> Result<Vec<Hit>> {
    let mut hits: Vec<Hit> = Vec::new();
    let mut seen: HashSet<usize> = HashSet::new();

    let mut buf = vec![0u8; chunk_size];
    let mut carry: Vec<u8> = Vec::new();
    let mut file_offset: usize = 0; // 已读取的字节数（不含本块）

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 { break; }
        let mut chunk: Vec<u8> = Vec::with_capacity(carry.len() + n);
        chunk.extend_from_slice(&carry);
        chunk.extend_from_slice(&buf[..n]);

        let base = file_offset - carry.len();
        hits.extend(scan_buffer(&chunk, base, plan, &mut seen));
        // 全部规则已命中，无需继续读取
        if seen.len() == plan.rules.len() { break; }

        // 保留当前 chunk 的末尾重叠区域
        let keep = overlap.min(chunk.len());
        carry = chunk[chunk.len() - keep..].to_vec();
        file_offset += n;
    }

    Ok(hits)
}

/// 在缓冲区上运行候选规则；`seen` 记录已命中的规则，每条规则只报告一次
fn scan_buffer(buf: &[u8], base_offset: usize, plan: &PrefilterPlan, seen: &mut HashSet<usize>) -> Vec<Hit> {
    let mut hits = Vec::new();
    for ri in plan.candidate_rules(buf) {
        if seen.contains(&ri) { continue; }
        let rule = &plan.rules[ri];
        if let Some(m) = rule.regex.find(buf) {
            seen.insert(ri);
            hits.push(Hit { rule_id: rule.id.clone(), offset: base_offset + m.start() });
        }
    }
    hits
}
