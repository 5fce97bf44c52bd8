//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use jamcheck_core::{ExpectedPaths, MatchMode, normalize_relative};

use super::{CliResult, ExitCode, HarnessArgs};
use crate::config::{HarnessConfig, parse_timeout};

/// Build the harness config: defaults, then `JAMCHECK_*` variables, then flags.
pub fn harness_config(args: &HarnessArgs) -> CliResult<HarnessConfig> {
    let config = HarnessConfig::from_env()?;
    Ok(apply_overrides(config, args)?)
}

fn apply_overrides(mut config: HarnessConfig, args: &HarnessArgs) -> crate::HarnessResult<HarnessConfig> {
    if let Some(tool) = &args.tool {
        config.program = tool.clone();
    }
    if !args.tool_args.is_empty() {
        config.default_args = args.tool_args.clone();
    }
    if let Some(toolset) = &args.toolset {
        config.toolset = toolset.clone();
    }
    if let Some(variant) = &args.variant {
        config.variant = variant.clone();
    }
    if let Some(timeout) = &args.timeout {
        config.timeout = parse_timeout(timeout)?;
    }
    if let Some(fixtures) = &args.fixtures {
        config.fixtures_dir = fixtures.clone();
    }
    if args.at_least {
        config.match_mode = MatchMode::AtLeast;
    }
    if args.no_toolset_arg {
        config.pass_toolset = false;
    }
    Ok(config)
}

/// Print the rendered expansion of `prefix` x `suffixes`, one path per line.
pub fn expand_paths(prefix: &str, suffixes: &str, args: &HarnessArgs, no_translate: bool) -> CliResult<ExitCode> {
    let config = harness_config(args)?.with_translate_suffixes(!no_translate);
    for path in rendered_expansion(&config, prefix, suffixes)? {
        println!("{}", path);
    }
    Ok(ExitCode::SUCCESS)
}

fn rendered_expansion(config: &HarnessConfig, prefix: &str, suffixes: &str) -> CliResult<Vec<String>> {
    let profile = config.profile();
    let mut rendered = Vec::new();
    for path in ExpectedPaths::product(prefix, suffixes).expand() {
        let path = normalize_relative(&profile.render(&path)).map_err(crate::HarnessError::from)?;
        rendered.push(path);
    }
    rendered.sort();
    rendered.dedup();
    Ok(rendered)
}
