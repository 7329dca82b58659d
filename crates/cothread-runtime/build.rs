//! Build script for cothread-runtime
//!
//! Merges configuration defaults:
//! 1. Start with library defaults
//! 2. If COT_CONFIG_RS is set, parse the user's config file
//! 3. User values win over defaults
//! 4. Write OUT_DIR/cot_merged_config.rs
//!
//! The user file only lists the values it changes.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

struct ConfigParam {
    name: &'static str,
    rust_type: &'static str,
    default_value: &'static str,
}

const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam {
        name: "STACK_SIZE",
        rust_type: "usize",
        default_value: "cothread_core::constants::DEFAULT_STACK_SIZE",
    },
    ConfigParam {
        name: "GUARD_PAGE",
        rust_type: "bool",
        default_value: "true",
    },
    ConfigParam {
        name: "DEBUG_LOGGING",
        rust_type: "bool",
        default_value: "false",
    },
    ConfigParam {
        name: "REGISTRY_CAPACITY",
        rust_type: "usize",
        default_value: "cothread_core::constants::DEFAULT_REGISTRY_CAPACITY",
    },
];

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest_path = Path::new(&out_dir).join("cot_merged_config.rs");

    let mut config: HashMap<&str, String> = CONFIG_PARAMS
        .iter()
        .map(|p| (p.name, p.default_value.to_string()))
        .collect();

    let user_path = env::var("COT_CONFIG_RS").ok();
    if let Some(user_path) = &user_path {
        println!("cargo:rerun-if-changed={}", user_path);

        match fs::read_to_string(user_path) {
            Ok(content) => {
                for name in parse_and_merge(&content, &mut config) {
                    println!("cargo:warning=Unknown config parameter: {}", name);
                }
                println!("cargo:warning=Using custom config: {}", user_path);
            }
            Err(e) => {
                println!(
                    "cargo:warning=Failed to read COT_CONFIG_RS ({}): {}",
                    user_path, e
                );
            }
        }
    }

    println!("cargo:rerun-if-env-changed=COT_CONFIG_RS");
    println!("cargo:rerun-if-changed=build.rs");

    let output = generate_config(&config, user_path.is_some());
    fs::write(&dest_path, output).expect("Failed to write merged config");
}

/// Merge `pub const NAME: TYPE = VALUE;` lines into `config`.
///
/// Returns the names that are not known parameters.
fn parse_and_merge(content: &str, config: &mut HashMap<&str, String>) -> Vec<String> {
    let mut unknown = Vec::new();

    for line in content.lines().map(str::trim) {
        if !line.starts_with("pub const ") {
            continue;
        }
        let Some((name, value)) = parse_const_line(line) else {
            continue;
        };
        match CONFIG_PARAMS.iter().find(|p| p.name == name) {
            Some(param) => {
                config.insert(param.name, value);
            }
            None => unknown.push(name),
        }
    }

    unknown
}

fn parse_const_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("pub const ")?.trim();

    let colon_pos = rest.find(':')?;
    let name = rest[..colon_pos].trim().to_string();

    let eq_pos = rest.find('=')?;
    let semi_pos = rest.rfind(';').unwrap_or(rest.len());
    if semi_pos <= eq_pos {
        return None;
    }
    let value = rest[eq_pos + 1..semi_pos].trim().to_string();

    Some((name, value))
}

fn generate_config(config: &HashMap<&str, String>, custom: bool) -> String {
    let mut output = String::new();

    output.push_str("// Auto-generated by build.rs - do not edit\n");
    if custom {
        output.push_str("// Library defaults merged with COT_CONFIG_RS\n\n");
    } else {
        output.push_str("// Library defaults\n\n");
    }

    for param in CONFIG_PARAMS {
        output.push_str(&format!(
            "pub const {}: {} = {};\n",
            param.name, param.rust_type, config[param.name]
        ));
    }

    output
}
