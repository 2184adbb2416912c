//! `markdown`: a section of a markdown file, identified by anchor, readable
//! and (unless `readonly`) writable with mtime-based conflict detection.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pulsearc_domain::constants::fnv1a_32;
use pulsearc_domain::{row_from_pairs, ConflictError, Row, SourceConfig, SourceError, SourceKind, WriteAction, WriteError};
use regex::Regex;
use serde_json::Value;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::source::{Source, WritableSource};

static ANCHOR_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*\{#([A-Za-z0-9_-]+)\}\s*$").unwrap());
static PLAIN_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*$").unwrap());
static ID_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<rest>.*?)\s*<!--\s*id:(?P<id>[A-Za-z0-9_]+)\s*-->\s*$").unwrap());
static SCAN_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"<!--\s*id:([A-Za-z0-9_]+)\s*-->").unwrap());
static TASK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<indent>\s*)-\s*\[(?P<mark>[ xX])\]\s*(?P<text>.*)$").unwrap());
static BULLET_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?P<indent>\s*)-\s+(?P<text>.*)$").unwrap());

/// A section's detected item format. `Table` carries the header line's
/// absolute line index and its parsed column names (the separator row
/// immediately follows at `header_idx + 1`).
#[derive(Debug, Clone)]
enum SectionFormat {
    Task,
    Bullet,
    Table { header_idx: usize, headers: Vec<String> },
}

/// Targets one section of one markdown file. Reads locate the section
/// fresh every time; writes serialize under `mtime`, which also carries
/// the last-observed modification time used for conflict detection.
pub struct MarkdownSource {
    name: String,
    path: PathBuf,
    anchor: String,
    readonly: bool,
    mtime: Arc<Mutex<Option<SystemTime>>>,
}

impl MarkdownSource {
    pub fn new(config: &SourceConfig, site_dir: &Path) -> Result<Self, SourceError> {
        let SourceKind::Markdown { file, anchor, readonly } = &config.kind else {
            return Err(validation_err(&config.name, "type", "expected a markdown descriptor"));
        };
        if file.trim().is_empty() {
            return Err(validation_err(&config.name, "file", "must not be empty"));
        }
        if anchor.trim().is_empty() {
            return Err(validation_err(&config.name, "anchor", "must not be empty"));
        }
        Ok(Self {
            name: config.name.clone(),
            path: site_dir.join(file),
            anchor: anchor.clone(),
            readonly: *readonly,
            mtime: Arc::new(Mutex::new(None)),
        })
    }

    async fn do_fetch(&self) -> Result<Vec<Row>, SourceError> {
        let path = self.path.clone();
        let anchor = self.anchor.clone();
        let name = self.name.clone();
        let mtime = Arc::clone(&self.mtime);
        task::spawn_blocking(move || {
            let observed = stat_mtime(&name, &path)?;
            *mtime.lock().unwrap_or_else(PoisonError::into_inner) = Some(observed);

            let content = std::fs::read_to_string(&path).map_err(|err| io_err(&name, "read", &path, &err))?;
            let lines: Vec<&str> = content.lines().collect();
            let (_, body_start, body_end) =
                locate_section(&lines, &anchor).ok_or_else(|| anchor_not_found(&name, &anchor))?;
            Ok(parse_section_rows(&lines[body_start..body_end]))
        })
        .await
        .map_err(|err| join_err(&name, err))?
    }

    async fn do_write(&self, action: WriteAction) -> Result<(), WriteError> {
        if self.readonly {
            return Err(WriteError::Source(validation_err(&self.name, "readonly", "this source does not accept writes")));
        }

        let path = self.path.clone();
        let anchor = self.anchor.clone();
        let name = self.name.clone();
        let mtime = Arc::clone(&self.mtime);
        task::spawn_blocking(move || -> Result<(), WriteError> {
            let mut guard = mtime.lock().unwrap_or_else(PoisonError::into_inner);

            let current_mtime = stat_mtime(&name, &path).map_err(WriteError::Source)?;
            if let Some(prior) = *guard {
                if prior != current_mtime {
                    let content = std::fs::read_to_string(&path)
                        .map_err(|err| WriteError::Source(io_err(&name, "read", &path, &err)))?;
                    let conflict_path = conflict_path_for(&path);
                    std::fs::write(&conflict_path, &content)
                        .map_err(|err| WriteError::Source(io_err(&name, "write conflict copy", &conflict_path, &err)))?;
                    return Err(WriteError::Conflict(ConflictError {
                        original_path: path.clone(),
                        conflict_path,
                        message: "file changed on disk since it was last read".to_string(),
                    }));
                }
            }

            let content = std::fs::read_to_string(&path).map_err(|err| WriteError::Source(io_err(&name, "read", &path, &err)))?;
            let trailing_newline = content.ends_with('\n');
            let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
            let (_, body_start, body_end) = {
                let borrowed: Vec<&str> = lines.iter().map(String::as_str).collect();
                locate_section(&borrowed, &anchor).ok_or_else(|| WriteError::Source(anchor_not_found(&name, &anchor)))?
            };
            let format = detect_format(&lines, body_start, body_end);

            apply_action(&mut lines, body_start, body_end, format, &name, &action).map_err(WriteError::Source)?;

            let mut new_content = lines.join("\n");
            if trailing_newline {
                new_content.push('\n');
            }
            write_atomically(&path, &new_content).map_err(|err| WriteError::Source(io_err(&name, "write", &path, &err)))?;

            let new_mtime = stat_mtime(&name, &path).map_err(WriteError::Source)?;
            *guard = Some(new_mtime);
            Ok(())
        })
        .await
        .map_err(|err| WriteError::Source(join_err(&self.name, err)))?
    }
}

fn stat_mtime(name: &str, path: &Path) -> Result<SystemTime, SourceError> {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|err| io_err(name, "stat", path, &err))
}

fn write_atomically(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp-write");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)
}

fn conflict_path_for(path: &Path) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|s| s.to_str());
    let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let file_name = match ext {
        Some(ext) => format!("{stem}.conflict-{timestamp}.{ext}"),
        None => format!("{stem}.conflict-{timestamp}"),
    };
    path.with_file_name(file_name)
}

/// Resolves `anchor` to a heading: first an explicit `{#anchor}` suffix,
/// otherwise the first heading whose slugified text matches (headings
/// carrying their own explicit anchor are skipped in that second pass).
/// Returns `(header_idx, body_start, body_end)`.
fn locate_section(lines: &[&str], anchor: &str) -> Option<(usize, usize, usize)> {
    for (idx, line) in lines.iter().enumerate() {
        if let Some(caps) = ANCHOR_HEADING.captures(line) {
            if &caps[3] == anchor {
                return Some(section_bounds(lines, idx, caps[1].len()));
            }
        }
    }
    for (idx, line) in lines.iter().enumerate() {
        if ANCHOR_HEADING.is_match(line) {
            continue;
        }
        if let Some(caps) = PLAIN_HEADING.captures(line) {
            if slugify(caps[2].trim()) == anchor {
                return Some(section_bounds(lines, idx, caps[1].len()));
            }
        }
    }
    None
}

fn section_bounds(lines: &[&str], header_idx: usize, depth: usize) -> (usize, usize, usize) {
    let body_start = header_idx + 1;
    let body_end = (body_start..lines.len())
        .find(|&idx| PLAIN_HEADING.captures(lines[idx]).is_some_and(|caps| caps[1].len() <= depth))
        .unwrap_or(lines.len());
    (header_idx, body_start, body_end)
}

fn slugify(text: &str) -> String {
    let mut out = String::new();
    let mut prev_dash = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Splits a leading HTML id comment off the end of a line. Returns the
/// remaining visible content and the id token, if any.
fn strip_id_comment(line: &str) -> (String, Option<String>) {
    match ID_COMMENT.captures(line) {
        Some(caps) => (caps["rest"].to_string(), Some(caps["id"].to_string())),
        None => (line.trim_end().to_string(), None),
    }
}

fn compute_id(explicit: Option<&str>, canonical: &str) -> String {
    explicit.map_or_else(|| format!("{:08x}", fnv1a_32(canonical.as_bytes())), str::to_string)
}

fn fresh_id() -> String {
    format!("{:08x}", rand::random::<u32>())
}

fn is_table_separator(line: &str) -> bool {
    let trimmed = line.trim().trim_start_matches('|').trim_end_matches('|');
    if trimmed.is_empty() {
        return false;
    }
    trimmed.split('|').all(|cell| {
        let cell = cell.trim();
        !cell.is_empty() && cell.chars().all(|ch| ch == '-' || ch == ':')
    })
}

fn split_table_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim().trim_start_matches('|').trim_end_matches('|');
    trimmed.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parses a section body (read-only; used by `fetch`). Lines that don't
/// match the detected format are silently skipped rather than failing the
/// whole read.
fn parse_section_rows(body: &[&str]) -> Vec<Row> {
    let Some(first_idx) = body.iter().position(|line| !line.trim().is_empty()) else {
        return Vec::new();
    };
    let (first_visible, _) = strip_id_comment(body[first_idx]);
    if TASK_LINE.is_match(&first_visible) {
        return body.iter().filter(|line| !line.trim().is_empty()).filter_map(|line| parse_task_line(line)).collect();
    }
    if first_visible.trim_start().starts_with('|') {
        return parse_table_rows(body);
    }
    body.iter().filter(|line| !line.trim().is_empty()).filter_map(|line| parse_bullet_line(line)).collect()
}

fn parse_task_line(line: &str) -> Option<Row> {
    let (visible, explicit) = strip_id_comment(line);
    let caps = TASK_LINE.captures(&visible)?;
    let done = caps["mark"].eq_ignore_ascii_case("x");
    let text = caps["text"].trim().to_string();
    let id = compute_id(explicit.as_deref(), &text);
    Some(row_from_pairs([
        ("id", Value::from(id)),
        ("text", Value::from(text)),
        ("done", Value::from(done)),
    ]))
}

fn parse_bullet_line(line: &str) -> Option<Row> {
    let (visible, explicit) = strip_id_comment(line);
    let caps = BULLET_LINE.captures(&visible)?;
    let text = caps["text"].trim().to_string();
    let id = compute_id(explicit.as_deref(), &text);
    Some(row_from_pairs([("id", Value::from(id)), ("text", Value::from(text))]))
}

fn parse_table_rows(body: &[&str]) -> Vec<Row> {
    let mut nonblank = body.iter().filter(|line| !line.trim().is_empty());
    let Some(header_line) = nonblank.next() else { return Vec::new() };
    let (header_visible, _) = strip_id_comment(header_line);
    let headers = split_table_cells(&header_visible);
    let Some(sep_line) = nonblank.next() else { return Vec::new() };
    if !is_table_separator(sep_line) {
        return Vec::new();
    }

    nonblank
        .map(|line| {
            let (visible, explicit) = strip_id_comment(line);
            let cells = split_table_cells(&visible);
            let id = compute_id(explicit.as_deref(), &cells.join("|"));
            let mut row = Row::new();
            row.insert("id".to_string(), Value::from(id));
            for (header, cell) in headers.iter().zip(cells.iter()) {
                row.insert(header.clone(), Value::from(cell.clone()));
            }
            row
        })
        .collect()
}

fn detect_format(lines: &[String], body_start: usize, body_end: usize) -> Option<SectionFormat> {
    let first = (body_start..body_end).find(|&idx| !lines[idx].trim().is_empty())?;
    let (visible, _) = strip_id_comment(&lines[first]);
    if TASK_LINE.is_match(&visible) {
        return Some(SectionFormat::Task);
    }
    if visible.trim_start().starts_with('|') {
        return Some(SectionFormat::Table { header_idx: first, headers: split_table_cells(&visible) });
    }
    Some(SectionFormat::Bullet)
}

fn line_matches_id(is_table: bool, line: &str, target_id: &str) -> bool {
    let (visible, explicit) = strip_id_comment(line);
    match explicit {
        Some(id) => id == target_id,
        None => {
            let canonical = if is_table {
                split_table_cells(&visible).join("|")
            } else if let Some(caps) = TASK_LINE.captures(&visible) {
                caps["text"].trim().to_string()
            } else if let Some(caps) = BULLET_LINE.captures(&visible) {
                caps["text"].trim().to_string()
            } else {
                return false;
            };
            compute_id(None, &canonical) == target_id
        }
    }
}

fn find_row_index(lines: &[String], body_start: usize, body_end: usize, format: &SectionFormat, target_id: &str) -> Option<usize> {
    let (range_start, is_table) = match format {
        SectionFormat::Table { header_idx, .. } => (header_idx + 2, true),
        SectionFormat::Task | SectionFormat::Bullet => (body_start, false),
    };
    (range_start..body_end).find(|&idx| !lines[idx].trim().is_empty() && line_matches_id(is_table, &lines[idx], target_id))
}

/// Finds the index right after the section's last non-blank line (or
/// `body_start` if the section is empty), which is where a new item is
/// appended.
fn append_index(lines: &[String], body_start: usize, body_end: usize) -> usize {
    (body_start..body_end).rev().find(|&idx| !lines[idx].trim().is_empty()).map_or(body_start, |idx| idx + 1)
}

fn apply_action(
    lines: &mut Vec<String>,
    body_start: usize,
    body_end: usize,
    format: Option<SectionFormat>,
    name: &str,
    action: &WriteAction,
) -> Result<(), SourceError> {
    match action {
        WriteAction::Add { data } => apply_add(lines, body_start, body_end, format, name, data),
        WriteAction::Toggle { data } => apply_toggle(lines, body_start, body_end, format, name, data),
        WriteAction::Delete { data } => apply_delete(lines, body_start, body_end, format, name, data),
        WriteAction::Update { data } => apply_update(lines, body_start, body_end, format, name, data),
    }
}

fn apply_add(lines: &mut Vec<String>, body_start: usize, body_end: usize, format: Option<SectionFormat>, name: &str, data: &Row) -> Result<(), SourceError> {
    let insert_at = append_index(lines, body_start, body_end);
    let id = fresh_id();

    let wants_task = matches!(format, Some(SectionFormat::Task)) || (format.is_none() && data.contains_key("done"));

    let new_line = if let Some(SectionFormat::Table { headers, .. }) = &format {
        let cells: Vec<String> = headers.iter().map(|header| data.get(header).map(value_display).unwrap_or_default()).collect();
        format!("| {} | <!-- id:{id} -->", cells.join(" | "))
    } else if wants_task {
        let text = data.get("text").and_then(Value::as_str).ok_or_else(|| validation_err(name, "text", "add requires `text`"))?;
        let done = data.get("done").and_then(Value::as_bool).unwrap_or(false);
        format!("- [{}] {} <!-- id:{id} -->", if done { "x" } else { " " }, text)
    } else {
        let text = data.get("text").and_then(Value::as_str).ok_or_else(|| validation_err(name, "text", "add requires `text`"))?;
        format!("- {text} <!-- id:{id} -->")
    };

    lines.insert(insert_at, new_line);
    Ok(())
}

fn apply_toggle(lines: &mut [String], body_start: usize, body_end: usize, format: Option<SectionFormat>, name: &str, data: &Row) -> Result<(), SourceError> {
    if !matches!(format, Some(SectionFormat::Task)) {
        return Err(validation_err(name, "action", "toggle requires a task-format section"));
    }
    let format = format.expect("checked above");
    let id = data.get("id").and_then(Value::as_str).ok_or_else(|| validation_err(name, "id", "toggle requires an id"))?;
    let idx = find_row_index(lines, body_start, body_end, &format, id).ok_or_else(|| validation_err(name, "id", &format!("no item with id {id}")))?;

    let (visible, explicit) = strip_id_comment(&lines[idx]);
    let caps = TASK_LINE.captures(&visible).ok_or_else(|| validation_err(name, "id", "matched line is not a task item"))?;
    let currently_done = caps["mark"].eq_ignore_ascii_case("x");
    let new_mark = if currently_done { " " } else { "x" };
    let new_visible = format!("{}- [{}] {}", &caps["indent"], new_mark, caps["text"].trim());
    lines[idx] = match explicit {
        Some(existing_id) => format!("{new_visible} <!-- id:{existing_id} -->"),
        None => new_visible,
    };
    Ok(())
}

fn apply_delete(lines: &mut Vec<String>, body_start: usize, body_end: usize, format: Option<SectionFormat>, name: &str, data: &Row) -> Result<(), SourceError> {
    let format = format.ok_or_else(|| validation_err(name, "action", "delete on an empty section"))?;
    let id = data.get("id").and_then(Value::as_str).ok_or_else(|| validation_err(name, "id", "delete requires an id"))?;
    let idx = find_row_index(lines, body_start, body_end, &format, id).ok_or_else(|| validation_err(name, "id", &format!("no item with id {id}")))?;
    lines.remove(idx);
    Ok(())
}

fn apply_update(lines: &mut [String], body_start: usize, body_end: usize, format: Option<SectionFormat>, name: &str, data: &Row) -> Result<(), SourceError> {
    let format = format.ok_or_else(|| validation_err(name, "action", "update on an empty section"))?;
    let id = data.get("id").and_then(Value::as_str).ok_or_else(|| validation_err(name, "id", "update requires an id"))?;
    let idx = find_row_index(lines, body_start, body_end, &format, id).ok_or_else(|| validation_err(name, "id", &format!("no item with id {id}")))?;

    match &format {
        SectionFormat::Table { headers, .. } => {
            let (visible, explicit) = strip_id_comment(&lines[idx]);
            let existing = split_table_cells(&visible);
            let cells: Vec<String> = headers
                .iter()
                .enumerate()
                .map(|(i, header)| data.get(header).map(value_display).unwrap_or_else(|| existing.get(i).cloned().unwrap_or_default()))
                .collect();
            let row_line = format!("| {} |", cells.join(" | "));
            lines[idx] = match explicit {
                Some(existing_id) => format!("{row_line} <!-- id:{existing_id} -->"),
                None => row_line,
            };
        }
        SectionFormat::Task | SectionFormat::Bullet => {
            let text = data.get("text").and_then(Value::as_str).ok_or_else(|| validation_err(name, "text", "update requires `text`"))?;
            let (visible, explicit) = strip_id_comment(&lines[idx]);
            let new_visible = if matches!(format, SectionFormat::Task) {
                let caps = TASK_LINE.captures(&visible).ok_or_else(|| validation_err(name, "id", "matched line is not a task item"))?;
                format!("{}- [{}] {}", &caps["indent"], &caps["mark"], text)
            } else {
                let caps = BULLET_LINE.captures(&visible).ok_or_else(|| validation_err(name, "id", "matched line is not a bullet item"))?;
                format!("{}- {}", &caps["indent"], text)
            };
            lines[idx] = match explicit {
                Some(existing_id) => format!("{new_visible} <!-- id:{existing_id} -->"),
                None => new_visible,
            };
        }
    }
    Ok(())
}

/// Every `id:TOKEN` comment present in `content`, in document order.
pub fn scan_for_ids(content: &str) -> Vec<String> {
    SCAN_ID.captures_iter(content).map(|caps| caps[1].to_string()).collect()
}

/// Re-randomizes any id that occurs more than once. Returns the rewritten
/// content and whether anything changed.
pub fn ensure_unique_ids(content: &str) -> (String, bool) {
    let mut seen = std::collections::HashSet::new();
    let mut modified = false;
    let rewritten = SCAN_ID.replace_all(content, |caps: &regex::Captures<'_>| {
        let id = caps[1].to_string();
        if seen.insert(id.clone()) {
            caps[0].to_string()
        } else {
            modified = true;
            format!("<!-- id:{} -->", fresh_id())
        }
    });
    (rewritten.into_owned(), modified)
}

/// Appends `id:TOKEN` comments to items that lack one. Table rows skip the
/// header and separator line of their own table; unlike the system this
/// was ported from, the "first row of this table" tracking resets at
/// every table rather than persisting across the whole document, so a
/// second table later in the file can't inherit a stale flag from the
/// first.
pub fn add_ids_to_items(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if line.trim_start().starts_with('|') && i + 1 < lines.len() && is_table_separator(lines[i + 1]) {
            out.push(line.to_string());
            out.push(lines[i + 1].to_string());
            i += 2;
            while i < lines.len() && lines[i].trim_start().starts_with('|') {
                out.push(ensure_line_has_id(lines[i], true));
                i += 1;
            }
            continue;
        }
        if !line.trim().is_empty() && (TASK_LINE.is_match(line) || BULLET_LINE.is_match(line)) {
            out.push(ensure_line_has_id(line, false));
        } else {
            out.push(line.to_string());
        }
        i += 1;
    }
    let mut result = out.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    result
}

fn ensure_line_has_id(line: &str, is_table: bool) -> String {
    let (visible, explicit) = strip_id_comment(line);
    if explicit.is_some() {
        return line.to_string();
    }
    let canonical = if is_table {
        split_table_cells(&visible).join("|")
    } else if let Some(caps) = TASK_LINE.captures(&visible) {
        caps["text"].trim().to_string()
    } else if let Some(caps) = BULLET_LINE.captures(&visible) {
        caps["text"].trim().to_string()
    } else {
        return line.to_string();
    };
    format!("{visible} <!-- id:{} -->", compute_id(None, &canonical))
}

fn io_err(name: &str, operation: &str, path: &Path, err: &std::io::Error) -> SourceError {
    SourceError::Source { source: name.to_string(), operation: operation.to_string(), wrapped: format!("{}: {err}", path.display()), retryable: false }
}

fn join_err(name: &str, err: task::JoinError) -> SourceError {
    SourceError::Source { source: name.to_string(), operation: "spawn_blocking".to_string(), wrapped: err.to_string(), retryable: false }
}

fn anchor_not_found(name: &str, anchor: &str) -> SourceError {
    SourceError::Validation { source: name.to_string(), field: "anchor".to_string(), reason: format!("no section matches anchor `{anchor}`") }
}

fn validation_err(source: &str, field: &str, reason: &str) -> SourceError {
    SourceError::Validation { source: source.to_string(), field: field.to_string(), reason: reason.to_string() }
}

#[async_trait]
impl Source for MarkdownSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _cancel: &CancellationToken) -> Result<Vec<Row>, SourceError> {
        self.do_fetch().await
    }

    async fn close(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

#[async_trait]
impl WritableSource for MarkdownSource {
    async fn write_item(&self, _cancel: &CancellationToken, action: WriteAction) -> Result<(), WriteError> {
        let result = self.do_write(action).await;
        if let Err(WriteError::Source(SourceError::Source { .. })) = &result {
            warn!(source = %self.name, "markdown write failed");
        }
        result
    }

    fn is_readonly(&self) -> bool {
        self.readonly
    }
}
