//! CLI command implementations
//!
//! Every command loads the schema path, compiles it, and then works on
//! stdin/stdout. Log lines go to stderr so stdout carries data only.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Map as JsonMap, Value as Json};

use crate::codec::{CodecConfig, StatefulCodec};
use crate::compiler::{compile as compile_types, emit_rust, CompiledTypes, RecordTypeDescriptor};
use crate::observability::{set_min_severity, Severity};
use crate::record::{readable_to_json, record_from_json, Record, Value};
use crate::schema::SchemaLoader;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_input, read_json, write_json, write_line};

/// Parse arguments and run the selected command on stdin/stdout
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let severity = Severity::parse(&cli.log_level)
        .ok_or_else(|| CliError::usage(format!("unknown log level '{}'", cli.log_level)))?;
    set_min_severity(severity);

    let stdin = io::stdin();
    let stdout = io::stdout();
    run_command(cli.command, &mut stdin.lock(), &mut stdout.lock())
}

/// Run one command against the given input and output
pub fn run_command<R: Read, W: Write>(cmd: Command, input: &mut R, output: &mut W) -> CliResult<()> {
    match cmd {
        Command::Compile { schema } => compile(&schema, output),
        Command::Generate { schema, out } => generate(&schema, out.as_deref(), output),
        Command::Encode {
            schema,
            record,
            config,
            framed,
        } => encode(&schema, &record, config.as_deref(), framed, input, output),
        Command::Decode {
            schema,
            record,
            config,
            framed,
        } => decode(&schema, &record, config.as_deref(), framed, input, output),
    }
}

/// Loads every schema under `path` and compiles the result
pub fn load_types(path: &Path) -> CliResult<CompiledTypes> {
    let mut loader = SchemaLoader::new();
    loader.load(path)?;
    Ok(compile_types(loader.roots())?)
}

/// Prints a JSON summary of the compiled descriptors
pub fn compile<W: Write>(schema: &Path, output: &mut W) -> CliResult<()> {
    let types = load_types(schema)?;
    write_json(output, &types_summary(&types))
}

/// Generates Rust source into `out`, or onto the output when absent
pub fn generate<W: Write>(schema: &Path, out: Option<&Path>, output: &mut W) -> CliResult<()> {
    let types = load_types(schema)?;
    let source = emit_rust(&types);
    match out {
        Some(path) => {
            fs::write(path, &source)
                .map_err(|e| CliError::io_error(format!("cannot write {}: {}", path.display(), e)))?;
            write_json(
                output,
                &json!({
                    "written": path.display().to_string(),
                    "bytes": source.len(),
                    "records": types.record_count(),
                }),
            )
        }
        None => {
            output.write_all(source.as_bytes())?;
            output.flush()?;
            Ok(())
        }
    }
}

/// Encodes a JSON document from the input; prints the payload as base64
pub fn encode<R: Read, W: Write>(
    schema: &Path,
    record_name: &str,
    config: Option<&Path>,
    framed: bool,
    input: &mut R,
    output: &mut W,
) -> CliResult<()> {
    let (types, codec) = open_codec(schema, record_name, config)?;
    let document = read_json(input)?;
    let record = record_from_json(codec.descriptor(), &document, &types)?;

    let bytes = if framed {
        codec.encode_framed(&record)?
    } else {
        codec.encode(&record)?
    };
    write_line(output, &STANDARD.encode(bytes))
}

/// Decodes a base64 payload from the input; prints values and state as JSON
pub fn decode<R: Read, W: Write>(
    schema: &Path,
    record_name: &str,
    config: Option<&Path>,
    framed: bool,
    input: &mut R,
    output: &mut W,
) -> CliResult<()> {
    let (_, codec) = open_codec(schema, record_name, config)?;
    let bytes = STANDARD.decode(read_input(input)?)?;

    let record = if framed {
        codec.decode_framed(&bytes, None)?.0
    } else {
        codec.decode(&bytes, None)?
    };
    write_json(output, &decoded_summary(&record)?)
}

fn open_codec(schema: &Path, record_name: &str, config: Option<&Path>) -> CliResult<(Arc<CompiledTypes>, StatefulCodec)> {
    let config = match config {
        Some(path) => CodecConfig::load(path)?,
        None => CodecConfig::default(),
    };
    let types = Arc::new(load_types(schema)?);
    if types.get(record_name).is_none() {
        let known: Vec<&str> = types.records().iter().map(|d| d.full_name()).collect();
        return Err(CliError::usage(format!(
            "unknown record type '{}' (known: {})",
            record_name,
            known.join(", ")
        )));
    }
    let codec = StatefulCodec::new(Arc::clone(&types), record_name, config)?;
    Ok((types, codec))
}

/// Descriptor summary: records with their field tables, enums and fixed types
pub fn types_summary(types: &CompiledTypes) -> Json {
    let records: Vec<Json> = types.records().iter().map(|d| descriptor_summary(d)).collect();
    let enums: Vec<Json> = types
        .enums()
        .iter()
        .map(|e| json!({ "name": e.full_name(), "symbols": e.symbols }))
        .collect();
    let fixed: Vec<Json> = types
        .fixed()
        .iter()
        .map(|f| json!({ "name": f.full_name(), "size": f.size }))
        .collect();
    json!({ "records": records, "enums": enums, "fixed": fixed })
}

fn descriptor_summary(descriptor: &RecordTypeDescriptor) -> Json {
    let fields: Vec<Json> = descriptor
        .fields()
        .iter()
        .map(|field| {
            json!({
                "name": field.name(),
                "index": field.index(),
                "constant": field.constant_name(),
                "kind": field.kind(),
                "nullable": field.is_nullable(),
                "schema": field.schema().to_string(),
                "accessors": field.accessors(),
            })
        })
        .collect();
    json!({ "name": descriptor.full_name(), "fields": fields })
}

/// Readable values plus dirty bits, readable bits and map entry states
pub fn decoded_summary(record: &Record) -> CliResult<Json> {
    let descriptor = record.descriptor();
    let names = |indices: Vec<usize>| -> Vec<String> {
        indices
            .into_iter()
            .map(|i| descriptor.fields()[i].name().to_string())
            .collect()
    };

    let mut entry_states = JsonMap::new();
    for index in record.readable_fields() {
        if let Value::Map(map) = record.get(index)? {
            let mut states = JsonMap::new();
            for key in map.keys() {
                if let Some(state) = map.state(key) {
                    states.insert(key.clone(), json!(state.as_str()));
                }
            }
            for (key, state) in map.states() {
                states.insert(key.clone(), json!(state.as_str()));
            }
            entry_states.insert(descriptor.fields()[index].name().to_string(), Json::Object(states));
        }
    }

    Ok(json!({
        "type": record.type_name(),
        "values": readable_to_json(record),
        "dirty": names(record.dirty_fields().collect()),
        "readable": names(record.readable_fields().collect()),
        "entry_states": entry_states,
    }))
}
