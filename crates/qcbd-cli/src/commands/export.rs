//! `qcbd export`: write graph entities as JSON or JSONL.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use qcbd_core::config::Config;
use qcbd_core::{loader, Entity, EntityKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// One pretty-printed JSON array
    Json,
    /// One entity per line, each tagged with its `type`
    Jsonl,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Only export one entity kind
    #[arg(short, long)]
    pub kind: Option<EntityKind>,

    #[arg(short, long, value_enum, default_value_t = ExportFormat::Jsonl)]
    pub format: ExportFormat,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn execute(args: ExportArgs, config: &Config) -> Result<()> {
    let graph = loader::load_graph(&config.paths.graph)?;
    let selected: Vec<(EntityKind, &Entity)> = graph
        .entities()
        .filter(|(kind, _)| args.kind.map_or(true, |k| k == *kind))
        .collect();

    let mut writer: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    write_entities(&mut writer, &selected, args.format)?;
    writer.flush()?;

    info!(count = selected.len(), format = ?args.format, "Exported entities");
    Ok(())
}

fn write_entities<W: Write>(writer: &mut W, entities: &[(EntityKind, &Entity)], format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Json => {
            let list: Vec<&Entity> = entities.iter().map(|(_, e)| *e).collect();
            serde_json::to_writer_pretty(&mut *writer, &list)?;
            writeln!(writer)?;
        }
        ExportFormat::Jsonl => {
            for (kind, entity) in entities {
                let mut value = serde_json::to_value(entity)?;
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("type".to_string(), kind.as_str().into());
                }
                serde_json::to_writer(&mut *writer, &value)?;
                writeln!(writer)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonl_lines_are_reloadable() {
        let dft = Entity::new("method.dft", "DFT");
        let orca = Entity::new("tool.orca", "ORCA");
        let entities = vec![(EntityKind::Method, &dft), (EntityKind::Tool, &orca)];

        let mut buf = Vec::new();
        write_entities(&mut buf, &entities, ExportFormat::Jsonl).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "method");
        assert_eq!(first["id"], "method.dft");
    }

    #[test]
    fn test_json_is_array() {
        let dft = Entity::new("method.dft", "DFT");
        let mut buf = Vec::new();
        write_entities(&mut buf, &[(EntityKind::Method, &dft)], ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value.as_array().map(|a| a.len()), Some(1));
        assert!(value[0].get("type").is_none());
    }
}
