//! Reading and writing knowledge-graph files.
//!
//! Inputs are the merged graph document, curated "expert" graphs with the
//! same layout, and processed JSONL records from the harvesters. Bad JSONL
//! lines are skipped with a warning; they never abort a build.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{QcbdError, QcbdResult};
use crate::ids::{make_id, normalize_id};
use crate::model::{Entity, EntityKind, KnowledgeGraph};

/// Entities read from one JSONL file.
#[derive(Debug, Default)]
pub struct JsonlBatch {
    pub entities: Vec<Entity>,
    pub skipped: usize,
}

/// Load a knowledge-graph document. A missing file is an empty graph.
pub fn load_graph(path: &Path) -> QcbdResult<KnowledgeGraph> {
    if !path.exists() {
        debug!(path = %path.display(), "Graph file does not exist yet, starting empty");
        return Ok(KnowledgeGraph::default());
    }
    let text = fs::read_to_string(path)?;
    let graph: KnowledgeGraph = serde_json::from_str(&text)?;
    debug!(path = %path.display(), entities = graph.len(), "Loaded knowledge graph");
    Ok(graph)
}

/// Load a curated graph. Unlike [`load_graph`], the file must exist.
pub fn load_expert_graph(path: &Path) -> QcbdResult<KnowledgeGraph> {
    if !path.exists() {
        return Err(QcbdError::NotFound(path.display().to_string()));
    }
    load_graph(path)
}

/// Load processed JSONL records, one entity per line.
pub fn load_jsonl(path: &Path) -> QcbdResult<JsonlBatch> {
    let file = fs::File::open(path)?;
    let mut batch = JsonlBatch::default();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(&line) {
            Ok(entity) => batch.entities.push(entity),
            Err(reason) => {
                warn!(path = %path.display(), line = line_no + 1, %reason, "Skipping JSONL record");
                batch.skipped += 1;
            }
        }
    }

    info!(
        path = %path.display(),
        entities = batch.entities.len(),
        skipped = batch.skipped,
        "Loaded JSONL records"
    );
    Ok(batch)
}

/// Parse one JSONL record. The kind comes from `type`/`kind`, else from the ID prefix.
fn parse_record(line: &str) -> Result<Entity, String> {
    let value: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let Value::Object(mut map) = value else {
        return Err("record is not a JSON object".to_string());
    };

    let declared = ["type", "kind"]
        .iter()
        .filter_map(|key| map.remove(*key))
        .find_map(|v| v.as_str().and_then(EntityKind::parse));

    let raw_id = map
        .get("id")
        .and_then(Value::as_str)
        .map(normalize_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| "record has no id".to_string())?;

    let id = match (declared, EntityKind::from_id(&raw_id)) {
        (_, Some(_)) => raw_id,
        (Some(kind), None) => make_id(kind, &raw_id),
        (None, None) => return Err(format!("cannot determine kind of '{}'", raw_id)),
    };
    map.insert("id".to_string(), Value::String(id));

    serde_json::from_value(Value::Object(map)).map_err(|e| e.to_string())
}

/// Expand input paths: files are kept, directories contribute their `*.jsonl` files.
pub fn collect_inputs(paths: &[PathBuf]) -> QcbdResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/// Save the graph as pretty JSON.
///
/// Writes to a temp file and renames it into place. When `snapshot_dir` is
/// set and a previous file exists, it is copied there first as
/// `<stem>_<timestamp>.json`; the snapshot path is returned.
pub fn save_graph(
    path: &Path,
    graph: &KnowledgeGraph,
    snapshot_dir: Option<&Path>,
) -> QcbdResult<Option<PathBuf>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let snapshot = match snapshot_dir {
        Some(dir) if path.exists() => Some(snapshot_file(path, dir)?),
        _ => None,
    };

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(graph)?)?;
    fs::rename(&tmp, path)?;

    info!(path = %path.display(), entities = graph.len(), "Saved knowledge graph");
    Ok(snapshot)
}

fn snapshot_file(path: &Path, dir: &Path) -> QcbdResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("knowledge_graph");
    let stamp = chrono::Local::now().format("%Y%m%dT%H%M%S");

    let mut target = dir.join(format!("{}_{}.json", stem, stamp));
    let mut n = 1;
    while target.exists() {
        target = dir.join(format!("{}_{}_{}.json", stem, stamp, n));
        n += 1;
    }

    fs::copy(path, &target)?;
    debug!(snapshot = %target.display(), "Snapshot written");
    Ok(target)
}
