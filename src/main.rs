use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use combiner_raytrace::combiner::{AddressMode, CombinerOpcode, FilterMode, variant_key};
use combiner_raytrace::logging::{LoggingConfig, init_logging};
use combiner_raytrace::renderer::{NagaCompiler, ProgramKind, ShaderVariantCache, ShaderVariantSet};
use combiner_raytrace::SynthConfig;

#[derive(Debug, Clone)]
struct Cli {
    opcode: CombinerOpcode,
    filter: FilterMode,
    address_u: AddressMode,
    address_v: AddressMode,
    normal_map: bool,
    specular_map: bool,
    config: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            opcode: CombinerOpcode(0),
            filter: FilterMode::Linear,
            address_u: AddressMode::Wrap,
            address_v: AddressMode::Wrap,
            normal_map: false,
            specular_map: false,
            config: None,
            output_dir: None,
        }
    }
}

const USAGE: &str = "supported: --opcode <u32|0xhex>, --filter <point|linear>, \
--address-u <wrap|mirror|clamp>, --address-v <wrap|mirror|clamp>, --normal-map, \
--specular-map, --config <synth.json>, --outputdir <dir>";

fn parse_opcode(s: &str) -> Result<CombinerOpcode> {
    let bits = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    }
    .map_err(|e| anyhow!("invalid --opcode {s}: {e}"))?;
    Ok(CombinerOpcode(bits))
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .map(String::as_str)
                .ok_or_else(|| anyhow!("missing value for {flag}"))
        };
        match flag {
            "--opcode" => {
                cli.opcode = parse_opcode(value()?)?;
                i += 2;
            }
            "--filter" => {
                let v = value()?;
                cli.filter =
                    FilterMode::parse(v).ok_or_else(|| anyhow!("invalid --filter {v}"))?;
                i += 2;
            }
            "--address-u" | "--address-v" => {
                let v = value()?;
                let mode = AddressMode::parse(v).ok_or_else(|| anyhow!("invalid {flag} {v}"))?;
                if flag == "--address-u" {
                    cli.address_u = mode;
                } else {
                    cli.address_v = mode;
                }
                i += 2;
            }
            "--normal-map" => {
                cli.normal_map = true;
                i += 1;
            }
            "--specular-map" => {
                cli.specular_map = true;
                i += 1;
            }
            "--config" => {
                cli.config = Some(PathBuf::from(value()?));
                i += 2;
            }
            "--outputdir" | "--output-dir" => {
                cli.output_dir = Some(PathBuf::from(value()?));
                i += 2;
            }
            other => {
                return Err(anyhow!("unknown argument: {other} ({USAGE})"));
            }
        }
    }
    Ok(cli)
}

fn write_variant(set: &ShaderVariantSet, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    for kind in ProgramKind::ALL {
        let program = set.program(kind);
        let path = output_dir.join(format!("{}.wgsl", program.bundle.name));
        std::fs::write(&path, &program.bundle.module)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("[emit] saved: {}", path.display());
    }

    let manifest = serde_json::json!({
        "key": set.key,
        "formula": set.formula,
        "layout": set.layout,
        "sampler": set.sampler(),
        "programs": ProgramKind::ALL.map(|kind| {
            let program = set.program(kind);
            serde_json::json!({
                "kind": kind,
                "name": program.bundle.name,
                "entryPoints": kind.entry_points(),
                "bindings": program.signature,
            })
        }),
    });
    let path = output_dir.join(format!("{}.json", set.key.base_name()));
    let text = serde_json::to_string_pretty(&manifest).context("failed to encode manifest")?;
    std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    println!("[emit] saved: {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&args)?;

    let config = match &cli.config {
        Some(path) => SynthConfig::load(path)?,
        None => SynthConfig::default(),
    };

    let mut cache = ShaderVariantCache::new(NagaCompiler::new(), config);
    let slot = cache.register_sampler(cli.filter, cli.address_u, cli.address_v);
    let key = variant_key(cli.opcode, slot, cli.normal_map, cli.specular_map);
    let set = cache.get_or_create(key)?;

    match &cli.output_dir {
        Some(dir) => write_variant(set, dir)?,
        None => {
            for kind in ProgramKind::ALL {
                let program = set.program(kind);
                println!(
                    "{}: {} bytes, {} bindings",
                    program.bundle.name,
                    program.bundle.module.len(),
                    program.signature.entries.len()
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_all_flags() {
        let cli = parse_cli(&args(&[
            "--opcode",
            "0x01000123",
            "--filter",
            "point",
            "--address-u",
            "clamp",
            "--address-v",
            "mirror",
            "--normal-map",
            "--specular-map",
            "--outputdir",
            "out",
        ]))
        .unwrap();
        assert_eq!(cli.opcode, CombinerOpcode(0x0100_0123));
        assert_eq!(cli.filter, FilterMode::Point);
        assert_eq!(cli.address_u, AddressMode::Clamp);
        assert_eq!(cli.address_v, AddressMode::Mirror);
        assert!(cli.normal_map && cli.specular_map);
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn rejects_unknown_and_incomplete_flags() {
        assert!(parse_cli(&args(&["--bogus"])).is_err());
        assert!(parse_cli(&args(&["--opcode"])).is_err());
        assert!(parse_cli(&args(&["--filter", "cubic"])).is_err());
    }

    #[test]
    fn decimal_opcodes_parse() {
        assert_eq!(parse_opcode("42").unwrap(), CombinerOpcode(42));
    }
}
