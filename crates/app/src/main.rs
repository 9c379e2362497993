//! objinfo: parse an OBJ file and log what a renderer would upload.

use anyhow::{Result, bail};
use asset::{IndexPolicy, ParseOptions, ParseResult, obj};

fn parse_index_policy_arg(args: &[String]) -> IndexPolicy {
    // Accept: --strict | --index-policy=lenient|strict
    let mut policy = IndexPolicy::Lenient;
    for arg in args {
        if arg == "--strict" {
            policy = IndexPolicy::Strict;
        } else if let Some(val) = arg.strip_prefix("--index-policy=") {
            policy = match val.to_ascii_lowercase().as_str() {
                "lenient" => IndexPolicy::Lenient,
                "strict" => IndexPolicy::Strict,
                other => {
                    log::warn!("Unknown index policy '{}', falling back to lenient.", other);
                    IndexPolicy::Lenient
                }
            };
        }
    }
    policy
}

fn parse_bytes_arg(args: &[String]) -> bool {
    args.iter().any(|arg| arg == "--bytes")
}

fn parse_input_arg(args: &[String]) -> Option<&str> {
    args.iter()
        .map(String::as_str)
        .find(|arg| !arg.starts_with("--"))
}

fn log_summary(result: &ParseResult, show_bytes: bool) {
    for lib in &result.material_libs {
        log::info!("mtllib: {}", lib);
    }

    for (i, geometry) in result.geometries.iter().enumerate() {
        let attributes: Vec<&str> = geometry.data.iter().map(|(kind, _)| kind.name()).collect();
        log::info!(
            "#{} object='{}' groups={:?} material='{}' triangles={} attributes={:?}",
            i,
            geometry.object,
            geometry.groups,
            geometry.material,
            geometry.triangle_count(),
            attributes
        );
        if show_bytes {
            for (kind, _) in geometry.data.iter() {
                let bytes = geometry.data.as_bytes(kind).map_or(0, <[u8]>::len);
                log::info!("    {}: {} bytes", kind, bytes);
            }
        }
    }

    match result.extents() {
        Some(extents) => log::info!(
            "Extents min={:?} max={:?} center={:?} offset={:?} diagonal={:.3}",
            extents.min,
            extents.max,
            extents.center(),
            extents.recentering_offset(),
            extents.diagonal()
        ),
        None => log::info!("No positions."),
    }

    if !result.diagnostics.is_empty() {
        log::warn!("{} diagnostics while parsing", result.diagnostics.len());
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = ParseOptions {
        index_policy: parse_index_policy_arg(&args),
    };
    let show_bytes = parse_bytes_arg(&args);
    let Some(path) = parse_input_arg(&args) else {
        bail!("Usage: objinfo [--strict | --index-policy=lenient|strict] [--bytes] <file.obj>");
    };

    log::info!("Parsing {} ({:?})", path, options.index_policy);
    let result = obj::load_obj_from_path(path, &options)?;
    log::info!(
        "{} geometries, {} triangles",
        result.geometries.len(),
        result.triangle_count()
    );
    log_summary(&result, show_bytes);
    Ok(())
}
