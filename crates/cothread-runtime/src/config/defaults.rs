//! Compile-time defaults, generated by build.rs

include!(concat!(env!("OUT_DIR"), "/cot_merged_config.rs"));
